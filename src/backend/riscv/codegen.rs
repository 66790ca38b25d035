//! RISC-V assembly generator. Produces RV32 assembly text from `LinearCode`.
//!
//! The IR addresses memory in 4-byte elements; everything here scales by 4.
//! Locals live `sp`-relative at `slot * 4`, the return address in the extra
//! word at the top of the frame, and all globals in one blob under the
//! symbol `g`. `t0` is the address scratch, `t1`/`t2` hold operands, `t6`
//! steps in when a stack offset overflows the signed 12-bit immediate.

use log::debug;

use crate::frontend::sema::builtins;
use crate::ir::ir::{
    BinOp, CmpOp, CodeLine, GlobalFuncDef, LinearCode, Operand, UnOp, FIRST_USER_FUNC,
};

const WORD: i64 = 4;

fn fits_imm12(value: i64) -> bool {
    (-2048..=2047).contains(&value)
}

/// RISC-V code generator. One instance per program.
pub struct RiscvCodegen {
    output: String,
    /// Branch labels are per-function in the IR; this running base keeps the
    /// emitted `.l<n>` names unique across the whole file.
    label_base: u32,
    /// Byte size of the current function's frame.
    frame_size: i64,
}

impl RiscvCodegen {
    pub fn new() -> Self {
        Self { output: String::new(), label_base: 0, frame_size: 0 }
    }

    pub fn generate(mut self, program: &LinearCode) -> String {
        self.emit_globals(program);
        self.emit(".text");
        self.emit(".globl main");
        for (position, func) in program.funcs.iter().enumerate() {
            let index = position as u32 + FIRST_USER_FUNC;
            let name = if position == program.main_index {
                "main".to_string()
            } else {
                format!("f{}", index)
            };
            debug!("codegen: {} ({} lines)", name, func.code.len());
            self.generate_function(program, &name, index, func);
            self.label_base += func.label_offsets.len() as u32;
        }
        self.output
    }

    fn emit_globals(&mut self, program: &LinearCode) {
        if program.global_len == 0 {
            return;
        }
        self.emit(".data");
        self.emit_label("g");
        // Runs of .zero between the nonzero words, which come out of lowering
        // in ascending offset order.
        let mut cursor = 0u32;
        for &(offset, value) in &program.global_init {
            if offset > cursor {
                self.emit_ins(&format!(".zero {}", (offset - cursor) as i64 * WORD));
            }
            self.emit_ins(&format!(".word {}", value));
            cursor = offset + 1;
        }
        if program.global_len > cursor {
            self.emit_ins(&format!(".zero {}", (program.global_len - cursor) as i64 * WORD));
        }
    }

    fn generate_function(
        &mut self,
        program: &LinearCode,
        name: &str,
        index: u32,
        func: &GlobalFuncDef,
    ) {
        self.frame_size = (func.local_slots as i64 + 1) * WORD;
        self.emit_label(name);

        // Prologue: grow the frame, park ra in its top word, spill the
        // argument registers into the leading slots.
        if fits_imm12(-self.frame_size) {
            self.emit_ins(&format!("addi sp, sp, -{}", self.frame_size));
        } else {
            self.emit_ins(&format!("li t0, {}", self.frame_size));
            self.emit_ins("sub sp, sp, t0");
        }
        self.stack_access("sw", "ra", self.frame_size - WORD);
        for param in 0..func.param_count {
            self.stack_access("sw", &format!("a{}", param), param as i64 * WORD);
        }

        let mut pc = 0;
        while pc < func.code.len() {
            pc = self.generate_line(program, index, func, pc);
        }

        // Epilogue, reached by every Return through its jump.
        self.emit_label(&format!(".endf{}", index));
        self.stack_access("lw", "ra", self.frame_size - WORD);
        if fits_imm12(self.frame_size) {
            self.emit_ins(&format!("addi sp, sp, {}", self.frame_size));
        } else {
            self.emit_ins(&format!("li t0, {}", self.frame_size));
            self.emit_ins("add sp, sp, t0");
        }
        self.emit_ins("ret");
    }

    /// Emit one IR line; returns the index of the next line to handle. Calls
    /// consume their trailing Parameter lines here.
    fn generate_line(
        &mut self,
        program: &LinearCode,
        func_index: u32,
        func: &GlobalFuncDef,
        pc: usize,
    ) -> usize {
        match &func.code[pc] {
            CodeLine::Binary { op, dest, src1, src2 } => {
                self.load_operand(*src1, "t1");
                self.load_operand(*src2, "t2");
                match op {
                    BinOp::Add => self.emit_ins("add t1, t1, t2"),
                    BinOp::Sub => self.emit_ins("sub t1, t1, t2"),
                    BinOp::Mul => self.emit_ins("mul t1, t1, t2"),
                    BinOp::Div => self.emit_ins("div t1, t1, t2"),
                    BinOp::Mod => self.emit_ins("rem t1, t1, t2"),
                    BinOp::Eq => {
                        self.emit_ins("sub t1, t1, t2");
                        self.emit_ins("seqz t1, t1");
                    }
                    BinOp::Ne => {
                        self.emit_ins("sub t1, t1, t2");
                        self.emit_ins("snez t1, t1");
                    }
                    BinOp::Lt => self.emit_ins("slt t1, t1, t2"),
                    BinOp::Gt => self.emit_ins("slt t1, t2, t1"),
                    BinOp::Le => {
                        self.emit_ins("slt t1, t2, t1");
                        self.emit_ins("xori t1, t1, 1");
                    }
                    BinOp::Ge => {
                        self.emit_ins("slt t1, t1, t2");
                        self.emit_ins("xori t1, t1, 1");
                    }
                }
                self.store_operand(*dest, "t1");
            }
            CodeLine::Unary { op, dest, src } => {
                self.load_operand(*src, "t1");
                match op {
                    UnOp::Mov => {}
                    UnOp::Neg => self.emit_ins("neg t1, t1"),
                    UnOp::Not => self.emit_ins("seqz t1, t1"),
                }
                self.store_operand(*dest, "t1");
            }
            CodeLine::LoadAddr { dest, base, offset } => {
                self.address_into_t0(*base, *offset);
                self.stack_access("sw", "t0", *dest as i64 * WORD);
            }
            CodeLine::Load { dest, base, offset } => {
                match self.direct_element(*base, *offset) {
                    Some(Direct::Stack(byte)) => self.stack_access("lw", "t1", byte),
                    Some(Direct::Global(byte)) => self.global_access("lw", "t1", byte),
                    None => {
                        self.address_into_t0(*base, *offset);
                        self.emit_ins("lw t1, 0(t0)");
                    }
                }
                self.store_operand(*dest, "t1");
            }
            CodeLine::Store { base, offset, src } => match self.direct_element(*base, *offset) {
                Some(Direct::Stack(byte)) => {
                    self.load_operand(*src, "t1");
                    self.stack_access("sw", "t1", byte);
                }
                Some(Direct::Global(byte)) => {
                    self.load_operand(*src, "t1");
                    self.global_access("sw", "t1", byte);
                }
                None => {
                    // The source goes first: loading a global routes through
                    // t0, which the address computation owns afterwards.
                    self.load_operand(*src, "t2");
                    self.address_into_t0(*base, *offset);
                    self.emit_ins("sw t2, 0(t0)");
                }
            },
            CodeLine::Call { func: callee, dest } => {
                let mut next = pc + 1;
                let mut arg = 0;
                while let Some(CodeLine::Parameter { value }) = func.code.get(next) {
                    self.load_operand(*value, &format!("a{}", arg));
                    arg += 1;
                    next += 1;
                }
                let symbol = if *callee < FIRST_USER_FUNC {
                    builtins::symbol(*callee).to_string()
                } else if (*callee - FIRST_USER_FUNC) as usize == program.main_index {
                    "main".to_string()
                } else {
                    format!("f{}", callee)
                };
                self.emit_ins(&format!("call {}", symbol));
                if let Some(dest) = dest {
                    self.store_operand(*dest, "a0");
                }
                return next;
            }
            CodeLine::Parameter { .. } => {
                unreachable!("parameter lines are consumed by their call")
            }
            CodeLine::Label(label) => {
                self.emit_label(&format!(".l{}", self.label_base + label.0));
            }
            CodeLine::JumpIf { target, op, src1, src2 } => {
                self.load_operand(*src1, "t1");
                self.load_operand(*src2, "t2");
                let branch = match op {
                    CmpOp::Eq => "beq",
                    CmpOp::Ne => "bne",
                    CmpOp::Lt => "blt",
                    CmpOp::Gt => "bgt",
                    CmpOp::Le => "ble",
                    CmpOp::Ge => "bge",
                };
                self.emit_ins(&format!(
                    "{} t1, t2, .l{}",
                    branch,
                    self.label_base + target.0
                ));
            }
            CodeLine::Goto(target) => {
                self.emit_ins(&format!("j .l{}", self.label_base + target.0));
            }
            CodeLine::Return(value) => {
                if let Some(value) = value {
                    self.load_operand(*value, "a0");
                }
                self.emit_ins(&format!("j .endf{}", func_index));
            }
        }
        pc + 1
    }

    /// Read an operand's value into `reg`. May clobber `t0` for globals.
    fn load_operand(&mut self, operand: Operand, reg: &str) {
        match operand {
            Operand::Number(value) => self.emit_ins(&format!("li {}, {}", reg, value)),
            Operand::Local(slot) | Operand::Addr(slot) => {
                self.stack_access("lw", reg, slot as i64 * WORD)
            }
            Operand::Global(slot) => self.global_access("lw", reg, slot as i64 * WORD),
        }
    }

    /// Write `reg` into a direct-reference destination. May clobber `t0`.
    fn store_operand(&mut self, dest: Operand, reg: &str) {
        match dest {
            Operand::Local(slot) => self.stack_access("sw", reg, slot as i64 * WORD),
            Operand::Global(slot) => self.global_access("sw", reg, slot as i64 * WORD),
            _ => unreachable!("destinations are always direct references"),
        }
    }

    /// A `base + offset` element that resolves to a fixed stack or global
    /// word, needing no address arithmetic.
    fn direct_element(&self, base: Operand, offset: Operand) -> Option<Direct> {
        let Operand::Number(offset) = offset else { return None };
        match base {
            Operand::Local(slot) => {
                let byte = (slot as i64 + offset as i64) * WORD;
                fits_imm12(byte).then_some(Direct::Stack(byte))
            }
            Operand::Global(slot) => {
                Some(Direct::Global((slot as i64 + offset as i64) * WORD))
            }
            _ => None,
        }
    }

    /// Compute the byte address of `base + offset` into `t0`. Clobbers `t1`
    /// when the offset is a runtime value.
    fn address_into_t0(&mut self, base: Operand, offset: Operand) {
        match base {
            Operand::Local(slot) => {
                let byte = slot as i64 * WORD;
                if fits_imm12(byte) {
                    self.emit_ins(&format!("addi t0, sp, {}", byte));
                } else {
                    self.emit_ins(&format!("li t0, {}", byte));
                    self.emit_ins("add t0, t0, sp");
                }
            }
            Operand::Addr(slot) => self.stack_access("lw", "t0", slot as i64 * WORD),
            Operand::Global(slot) => {
                let byte = slot as i64 * WORD;
                self.emit_ins(&format!("lui t0, %hi(g+{})", byte));
                self.emit_ins(&format!("addi t0, t0, %lo(g+{})", byte));
            }
            Operand::Number(_) => unreachable!("a number is never an address base"),
        }
        match offset {
            Operand::Number(0) => {}
            Operand::Number(value) => {
                let byte = value as i64 * WORD;
                if fits_imm12(byte) {
                    self.emit_ins(&format!("addi t0, t0, {}", byte));
                } else {
                    self.emit_ins(&format!("li t1, {}", byte));
                    self.emit_ins("add t0, t0, t1");
                }
            }
            operand => {
                self.load_operand(operand, "t1");
                self.emit_ins("slli t1, t1, 2");
                self.emit_ins("add t0, t0, t1");
            }
        }
    }

    /// `lw`/`sw` of `reg` at a byte offset from `sp`, via `t6` when the
    /// offset overflows imm12.
    fn stack_access(&mut self, mnemonic: &str, reg: &str, byte: i64) {
        if fits_imm12(byte) {
            self.emit_ins(&format!("{} {}, {}(sp)", mnemonic, reg, byte));
        } else {
            self.emit_ins(&format!("li t6, {}", byte));
            self.emit_ins("add t6, t6, sp");
            self.emit_ins(&format!("{} {}, 0(t6)", mnemonic, reg));
        }
    }

    /// `lw`/`sw` of `reg` at a byte offset into the globals blob.
    fn global_access(&mut self, mnemonic: &str, reg: &str, byte: i64) {
        self.emit_ins(&format!("lui t0, %hi(g+{})", byte));
        self.emit_ins(&format!("{} {}, %lo(g+{})(t0)", mnemonic, reg, byte));
    }

    fn emit(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn emit_label(&mut self, name: &str) {
        self.output.push_str(name);
        self.output.push_str(":\n");
    }

    fn emit_ins(&mut self, ins: &str) {
        self.output.push_str("    ");
        self.output.push_str(ins);
        self.output.push('\n');
    }
}

enum Direct {
    Stack(i64),
    Global(i64),
}

impl Default for RiscvCodegen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_to_ir;

    fn gen(source: &str) -> String {
        let program = compile_to_ir(source).unwrap();
        RiscvCodegen::new().generate(&program)
    }

    #[test]
    fn test_frame_and_epilogue() {
        let asm = gen("int main() { return 3; }");
        // No locals: one word for ra.
        assert!(asm.contains("main:\n"));
        assert!(asm.contains("addi sp, sp, -4"));
        assert!(asm.contains("sw ra, 0(sp)"));
        assert!(asm.contains("li a0, 3"));
        assert!(asm.contains("j .endf8"));
        assert!(asm.contains(".endf8:\n"));
        assert!(asm.contains("addi sp, sp, 4"));
        assert!(asm.ends_with("    ret\n"));
    }

    #[test]
    fn test_globals_blob_runs() {
        let asm = gen("int a[4] = {0, 5};\nint x = 7;\nint main() { return 0; }");
        let data = asm.split(".text").next().unwrap();
        assert!(data.contains(".data"));
        assert!(data.contains("g:\n"));
        // a: one zero word, 5, two zero words; then x = 7.
        assert!(data.contains(".zero 4"));
        assert!(data.contains(".word 5"));
        assert!(data.contains(".zero 8"));
        assert!(data.contains(".word 7"));
    }

    #[test]
    fn test_no_data_section_without_globals() {
        let asm = gen("int main() { return 0; }");
        assert!(!asm.contains(".data"));
        assert!(!asm.contains("g:"));
    }

    #[test]
    fn test_parameters_spilled_from_argument_registers() {
        let asm = gen("int add(int a, int b) { return a + b; }\nint main() { return add(1, 2); }");
        assert!(asm.contains("f8:\n"));
        assert!(asm.contains("sw a0, 0(sp)"));
        assert!(asm.contains("sw a1, 4(sp)"));
    }

    #[test]
    fn test_call_loads_arguments_and_stores_result() {
        let asm = gen("int id(int x) { return x; }\nint main() { return id(5); }");
        assert!(asm.contains("li a0, 5"));
        assert!(asm.contains("call f8"));
    }

    #[test]
    fn test_builtin_call_symbols() {
        let asm = gen("int main() { starttime(); putint(getint()); stoptime(); return 0; }");
        assert!(asm.contains("call _sysy_starttime"));
        assert!(asm.contains("call getint"));
        assert!(asm.contains("call putint"));
        assert!(asm.contains("call _sysy_stoptime"));
    }

    #[test]
    fn test_branch_labels_unique_across_functions() {
        let source = "
            int f() { int i = 0; while (i < 3) { i = i + 1; } return i; }
            int main() { int i = 0; while (i < 3) { i = i + 1; } return f(); }";
        let asm = gen(source);
        // Each loop binds two labels; the second function continues numbering.
        assert!(asm.contains(".l0:\n"));
        assert!(asm.contains(".l1:\n"));
        assert!(asm.contains(".l2:\n"));
        assert!(asm.contains(".l3:\n"));
    }

    #[test]
    fn test_constant_subscript_is_sp_relative() {
        let asm = gen("int main() { int a[3]; a[1] = 9; return a[1]; }");
        // The fast path turns a[1] into the plain slot below; no address
        // arithmetic should appear.
        assert!(asm.contains("sw t1, 4(sp)"));
        assert!(!asm.contains("slli"));
    }

    #[test]
    fn test_runtime_subscript_scales_by_word() {
        let asm = gen("int main() { int a[8]; int i = getint(); return a[i]; }");
        assert!(asm.contains("slli t1, t1, 2"));
        assert!(asm.contains("lw t1, 0(t0)"));
    }

    #[test]
    fn test_store_of_global_keeps_element_address() {
        // a[i] = g0: the global must land in t2 before the element address
        // takes over t0, and the store must use the computed address.
        let asm = gen(
            "int g0 = 1;\nint main() { int a[4]; int i = getint(); a[i] = g0; return a[i]; }",
        );
        let source = asm.find("lw t2, %lo(g+0)(t0)").unwrap();
        let scale = asm.find("slli t1, t1, 2").unwrap();
        let store = asm.find("sw t2, 0(t0)").unwrap();
        assert!(source < scale);
        assert!(scale < store);
    }

    #[test]
    fn test_global_access_uses_hi_lo_split() {
        let asm = gen("int g0 = 1;\nint main() { return g0; }");
        assert!(asm.contains("lui t0, %hi(g+0)"));
        assert!(asm.contains("lw a0, %lo(g+0)(t0)"));
    }

    #[test]
    fn test_large_frame_uses_li_sub() {
        let asm = gen("int main() { int a[2000]; a[0] = 1; return a[0]; }");
        // Frame is over 8000 bytes, past the addi immediate.
        assert!(asm.contains("li t0, 8004"));
        assert!(asm.contains("sub sp, sp, t0"));
        assert!(asm.contains("li t6, 8000"));
    }

    #[test]
    fn test_comparison_lowering() {
        let asm = gen("int main() { int a = getint(); int b = getint(); return a <= b; }");
        assert!(asm.contains("slt t1, t2, t1"));
        assert!(asm.contains("xori t1, t1, 1"));
    }
}
