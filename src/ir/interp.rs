//! Reference interpreter: executes `LinearCode` directly.
//!
//! Memory is a single word-addressed array, globals first, then one frame per
//! active call; element addresses computed by the IR are plain indices into
//! it, so pointers passed into callees dereference naturally. Input and
//! output go through the generic reader/writer so tests can drive the
//! library builtins.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::ir::ir::{BinOp, CmpOp, CodeLine, LinearCode, Operand, UnOp, FIRST_USER_FUNC};

/// Errors raised while executing IR. These are runtime faults of the program
/// being run, distinct from `CompileError`.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("memory access out of range")]
    OutOfBounds,
    #[error("division by zero")]
    DivideByZero,
    #[error("call stack overflow")]
    StackOverflow,
    #[error("malformed input: expected an integer")]
    BadInput,
    #[error("unexpected end of input")]
    EndOfInput,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

const MAX_CALL_DEPTH: u32 = 65536;

pub struct Interpreter<'a, R, W> {
    program: &'a LinearCode,
    /// Globals in `[0, global_len)`, then stack frames.
    memory: Vec<i32>,
    input: R,
    output: W,
    depth: u32,
}

impl<'a, R: BufRead, W: Write> Interpreter<'a, R, W> {
    pub fn new(program: &'a LinearCode, input: R, output: W) -> Self {
        let mut memory = vec![0; program.global_len as usize];
        for &(offset, value) in &program.global_init {
            memory[offset as usize] = value;
        }
        Self { program, memory, input, output, depth: 0 }
    }

    /// Run `main` to completion and return its value.
    pub fn run(mut self) -> Result<i32, RuntimeError> {
        let main_index = self.program.main_index;
        let result = self.call_user(main_index, &[])?;
        self.output.flush()?;
        Ok(result)
    }

    fn call_user(&mut self, func_position: usize, args: &[i32]) -> Result<i32, RuntimeError> {
        self.depth += 1;
        if self.depth > MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow);
        }
        let func = &self.program.funcs[func_position];
        let frame = self.memory.len();
        self.memory.resize(frame + func.local_slots as usize, 0);
        self.memory[frame..frame + args.len()].copy_from_slice(args);

        let mut result = 0;
        let mut pc = 0;
        while pc < func.code.len() {
            match &func.code[pc] {
                CodeLine::Binary { op, dest, src1, src2 } => {
                    let value =
                        eval_binary(*op, self.value(*src1, frame)?, self.value(*src2, frame)?)?;
                    self.write(*dest, frame, value)?;
                }
                CodeLine::Unary { op, dest, src } => {
                    let src = self.value(*src, frame)?;
                    let value = match op {
                        UnOp::Mov => src,
                        UnOp::Neg => src.wrapping_neg(),
                        UnOp::Not => (src == 0) as i32,
                    };
                    self.write(*dest, frame, value)?;
                }
                CodeLine::LoadAddr { dest, base, offset } => {
                    let address = self.address(*base, *offset, frame)?;
                    self.memory[frame + *dest as usize] = address as i32;
                }
                CodeLine::Load { dest, base, offset } => {
                    let address = self.address(*base, *offset, frame)?;
                    let value = *self.memory.get(address).ok_or(RuntimeError::OutOfBounds)?;
                    self.write(*dest, frame, value)?;
                }
                CodeLine::Store { base, offset, src } => {
                    let value = self.value(*src, frame)?;
                    let address = self.address(*base, *offset, frame)?;
                    *self.memory.get_mut(address).ok_or(RuntimeError::OutOfBounds)? = value;
                }
                CodeLine::Call { func: callee, dest } => {
                    // The arguments are the Parameter lines right after us.
                    let mut args = Vec::new();
                    let mut next = pc + 1;
                    while let Some(CodeLine::Parameter { value }) = func.code.get(next) {
                        args.push(self.value(*value, frame)?);
                        next += 1;
                    }
                    let value = if *callee < FIRST_USER_FUNC {
                        self.call_builtin(*callee, &args)?
                    } else {
                        self.call_user((*callee - FIRST_USER_FUNC) as usize, &args)?
                    };
                    if let Some(dest) = dest {
                        self.write(*dest, frame, value)?;
                    }
                    pc = next;
                    continue;
                }
                CodeLine::Parameter { .. } => {
                    unreachable!("parameter lines are consumed by their call")
                }
                CodeLine::Label(_) => {}
                CodeLine::JumpIf { target, op, src1, src2 } => {
                    let left = self.value(*src1, frame)?;
                    let right = self.value(*src2, frame)?;
                    let taken = match op {
                        CmpOp::Eq => left == right,
                        CmpOp::Ne => left != right,
                        CmpOp::Lt => left < right,
                        CmpOp::Gt => left > right,
                        CmpOp::Le => left <= right,
                        CmpOp::Ge => left >= right,
                    };
                    if taken {
                        pc = func.label_offsets[target.0 as usize] as usize;
                        continue;
                    }
                }
                CodeLine::Goto(target) => {
                    pc = func.label_offsets[target.0 as usize] as usize;
                    continue;
                }
                CodeLine::Return(value) => {
                    if let Some(value) = value {
                        result = self.value(*value, frame)?;
                    }
                    break;
                }
            }
            pc += 1;
        }

        self.memory.truncate(frame);
        self.depth -= 1;
        Ok(result)
    }

    fn call_builtin(&mut self, index: u32, args: &[i32]) -> Result<i32, RuntimeError> {
        match index {
            // getint
            0 => self.read_int(),
            // getch
            1 => {
                let byte = self.next_nonspace()?.ok_or(RuntimeError::EndOfInput)?;
                Ok(byte as i32)
            }
            // getarray
            2 => {
                let base = args[0] as usize;
                let count = self.read_int()?;
                for position in 0..count.max(0) as usize {
                    let value = self.read_int()?;
                    *self
                        .memory
                        .get_mut(base + position)
                        .ok_or(RuntimeError::OutOfBounds)? = value;
                }
                Ok(count)
            }
            // putint
            3 => {
                write!(self.output, "{}", args[0])?;
                Ok(0)
            }
            // putch
            4 => {
                self.output.write_all(&[args[0] as u8])?;
                Ok(0)
            }
            // putarray
            5 => {
                let count = args[0].max(0) as usize;
                let base = args[1] as usize;
                write!(self.output, "{}:", args[0])?;
                for position in 0..count {
                    let value =
                        *self.memory.get(base + position).ok_or(RuntimeError::OutOfBounds)?;
                    write!(self.output, " {}", value)?;
                }
                writeln!(self.output)?;
                Ok(0)
            }
            // starttime / stoptime: timing hooks, nothing to observe here
            6 | 7 => Ok(0),
            _ => unreachable!("builtin indices are below FIRST_USER_FUNC"),
        }
    }

    fn value(&self, operand: Operand, frame: usize) -> Result<i32, RuntimeError> {
        let index = match operand {
            Operand::Number(value) => return Ok(value),
            Operand::Local(slot) | Operand::Addr(slot) => frame + slot as usize,
            Operand::Global(slot) => slot as usize,
        };
        self.memory.get(index).copied().ok_or(RuntimeError::OutOfBounds)
    }

    fn write(&mut self, dest: Operand, frame: usize, value: i32) -> Result<(), RuntimeError> {
        let index = match dest {
            Operand::Local(slot) => frame + slot as usize,
            Operand::Global(slot) => slot as usize,
            _ => unreachable!("destinations are always direct references"),
        };
        *self.memory.get_mut(index).ok_or(RuntimeError::OutOfBounds)? = value;
        Ok(())
    }

    /// Element address of `base + offset`, bounds-checked against memory.
    fn address(&self, base: Operand, offset: Operand, frame: usize) -> Result<usize, RuntimeError> {
        let base = match base {
            Operand::Local(slot) => (frame + slot as usize) as i64,
            Operand::Global(slot) => slot as i64,
            Operand::Addr(slot) => self
                .memory
                .get(frame + slot as usize)
                .copied()
                .ok_or(RuntimeError::OutOfBounds)? as i64,
            Operand::Number(_) => unreachable!("a number is never an address base"),
        };
        let offset = match offset {
            Operand::Number(value) => value as i64,
            operand => self.value(operand, frame)? as i64,
        };
        let address = base + offset;
        if address < 0 || address as usize >= self.memory.len() {
            return Err(RuntimeError::OutOfBounds);
        }
        Ok(address as usize)
    }

    // === Buffered input ===

    fn next_nonspace(&mut self) -> Result<Option<u8>, RuntimeError> {
        loop {
            let buffer = self.input.fill_buf()?;
            let Some(&byte) = buffer.first() else { return Ok(None) };
            self.input.consume(1);
            if !byte.is_ascii_whitespace() {
                return Ok(Some(byte));
            }
        }
    }

    fn peek_byte(&mut self) -> Result<Option<u8>, RuntimeError> {
        Ok(self.input.fill_buf()?.first().copied())
    }

    /// Read a whitespace-delimited decimal integer, with optional sign.
    fn read_int(&mut self) -> Result<i32, RuntimeError> {
        let first = self.next_nonspace()?.ok_or(RuntimeError::EndOfInput)?;
        let (negative, start) = match first {
            b'-' => (true, None),
            b'+' => (false, None),
            digit @ b'0'..=b'9' => (false, Some((digit - b'0') as i64)),
            _ => return Err(RuntimeError::BadInput),
        };
        let mut value = start.unwrap_or(0);
        let mut seen_digit = first.is_ascii_digit();
        while let Some(byte @ b'0'..=b'9') = self.peek_byte()? {
            self.input.consume(1);
            seen_digit = true;
            value = (value * 10 + (byte - b'0') as i64).min(u32::MAX as i64);
        }
        if !seen_digit {
            return Err(RuntimeError::BadInput);
        }
        let value = if negative { -value } else { value };
        Ok(value as i32)
    }
}

fn eval_binary(op: BinOp, left: i32, right: i32) -> Result<i32, RuntimeError> {
    let value = match op {
        BinOp::Add => left.wrapping_add(right),
        BinOp::Sub => left.wrapping_sub(right),
        BinOp::Mul => left.wrapping_mul(right),
        BinOp::Div => {
            if right == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            left.wrapping_div(right)
        }
        BinOp::Mod => {
            if right == 0 {
                return Err(RuntimeError::DivideByZero);
            }
            left.wrapping_rem(right)
        }
        BinOp::Eq => (left == right) as i32,
        BinOp::Ne => (left != right) as i32,
        BinOp::Lt => (left < right) as i32,
        BinOp::Gt => (left > right) as i32,
        BinOp::Le => (left <= right) as i32,
        BinOp::Ge => (left >= right) as i32,
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_to_ir;
    use std::io::Cursor;

    fn run_with_input(source: &str, input: &str) -> (i32, String) {
        let program = compile_to_ir(source).unwrap();
        let mut output = Vec::new();
        let result = Interpreter::new(&program, Cursor::new(input), &mut output)
            .run()
            .unwrap();
        (result, String::from_utf8(output).unwrap())
    }

    fn run(source: &str) -> i32 {
        run_with_input(source, "").0
    }

    #[test]
    fn test_initializer_flattening_observed_at_runtime() {
        // Row 0 = [1,2,0], row 1 = [3,0,0].
        let source = "int main(){ int a[2][3]={{1,2},{3}}; return a[1][0]; }";
        assert_eq!(run(source), 3);
        assert_eq!(run("int main(){ int a[2][3]={{1,2},{3}}; return a[0][2]; }"), 0);
    }

    #[test]
    fn test_shadowing_returns_outer_value() {
        assert_eq!(run("int main() { int x = 1; { int x = 2; } return x; }"), 1);
    }

    #[test]
    fn test_folding_is_observationally_transparent() {
        // The same arithmetic through constants and through variables.
        let folded = run("int main() { return (7 * 3 - 1) % 5; }");
        let computed = run(
            "int main() { int a = 7; int b = 3; int c = 1; int d = 5; return (a * b - c) % d; }",
        );
        assert_eq!(folded, computed);
        assert_eq!(folded, 0);
    }

    #[test]
    fn test_short_circuit_skips_side_effects() {
        let source = "
            int g = 0;
            int touch() { g = 1; return 1; }
            int main() {
                int a = 0;
                a && touch();
                (1 - 1) || 0 || (g && touch());
                return g;
            }";
        assert_eq!(run(source), 0);
    }

    #[test]
    fn test_short_circuit_normalizes_to_bool() {
        assert_eq!(run("int main() { int a = 5; return a && 7; }"), 1);
        assert_eq!(run("int main() { int a = 0; return a || 9; }"), 1);
        assert_eq!(run("int main() { int a = 0; return a && 7; }"), 0);
    }

    #[test]
    fn test_while_loop_and_break_continue() {
        let source = "
            int main() {
                int sum = 0; int i = 0;
                while (i < 10) {
                    i = i + 1;
                    if (i % 2) { continue; }
                    if (i > 8) { break; }
                    sum = sum + i;
                }
                return sum;
            }";
        // 2 + 4 + 6 + 8 = 20, loop leaves at i == 10 via break guard.
        assert_eq!(run(source), 20);
    }

    #[test]
    fn test_nested_loops_resolve_outer_labels() {
        let source = "
            int main() {
                int total = 0; int i = 0;
                while (i < 3) {
                    int j = 0;
                    while (j < 3) {
                        j = j + 1;
                        if (j == 2) { break; }
                        total = total + 1;
                    }
                    i = i + 1;
                    if (i == 2) { continue; }
                    total = total + 10;
                }
                return total;
            }";
        // Inner loop adds 1 per outer pass; outer adds 10 except when i == 2.
        assert_eq!(run(source), 23);
    }

    #[test]
    fn test_recursion() {
        let source = "
            int fib(int n) { if (n < 2) { return n; } return fib(n - 1) + fib(n - 2); }
            int main() { return fib(12); }";
        assert_eq!(run(source), 144);
    }

    #[test]
    fn test_globals_shared_across_functions() {
        let source = "
            int counter = 5;
            void bump() { counter = counter + 3; }
            int main() { bump(); bump(); return counter; }";
        assert_eq!(run(source), 11);
    }

    #[test]
    fn test_array_parameter_writes_visible_in_caller() {
        let source = "
            void fill(int a[], int n) {
                int i = 0;
                while (i < n) { a[i] = i * i; i = i + 1; }
            }
            int main() { int a[5]; fill(a, 5); return a[4]; }";
        assert_eq!(run(source), 16);
    }

    #[test]
    fn test_matrix_parameter_addressing() {
        let source = "
            int get(int m[][4], int r, int c) { return m[r][c]; }
            int main() {
                int m[3][4];
                int i = 0;
                while (i < 12) { m[i / 4][i % 4] = i; i = i + 1; }
                return get(m, 2, 3);
            }";
        assert_eq!(run(source), 11);
    }

    #[test]
    fn test_zero_fill_loop_initialization() {
        let source = "
            int main() {
                int a[100] = {42};
                int i = 1; int bad = 0;
                while (i < 100) { bad = bad + a[i]; i = i + 1; }
                return a[0] + bad;
            }";
        assert_eq!(run(source), 42);
    }

    #[test]
    fn test_global_array_initializers() {
        let source = "
            int a[10] = {0, 7, 0, 9};
            int main() { return a[1] + a[3] + a[9]; }";
        assert_eq!(run(source), 16);
    }

    #[test]
    fn test_const_fold_matches_runtime_index() {
        let source = "
            const int t[2][3] = {{1, 2}, {3}};
            int main() { int i = 0; int a[2][3] = {{1, 2}, {3}}; return t[1][0] - a[1][0]; }";
        assert_eq!(run(source), 0);
    }

    #[test]
    fn test_getint_putint_roundtrip() {
        let (result, output) = run_with_input(
            "int main() { int x = getint(); putint(x * 2); return 0; }",
            "  21 ",
        );
        assert_eq!(result, 0);
        assert_eq!(output, "42");
    }

    #[test]
    fn test_getch_skips_whitespace() {
        let (result, _) = run_with_input("int main() { return getch(); }", "  A");
        assert_eq!(result, 'A' as i32);
    }

    #[test]
    fn test_negative_input() {
        let (result, _) = run_with_input("int main() { return getint(); }", "-37");
        assert_eq!(result, -37);
    }

    #[test]
    fn test_getarray_putarray() {
        let source = "
            int main() {
                int a[8];
                int n = getarray(a);
                putarray(n, a);
                return n;
            }";
        let (result, output) = run_with_input(source, "3 10 20 30");
        assert_eq!(result, 3);
        assert_eq!(output, "3: 10 20 30\n");
    }

    #[test]
    fn test_putch() {
        let (_, output) = run_with_input(
            "int main() { putch(104); putch(105); putch(10); return 0; }",
            "",
        );
        assert_eq!(output, "hi\n");
    }

    #[test]
    fn test_division_by_zero_is_a_runtime_error() {
        let program = compile_to_ir("int main() { int z = 0; return 1 / z; }").unwrap();
        let result = Interpreter::new(&program, Cursor::new(""), Vec::new()).run();
        assert!(matches!(result, Err(RuntimeError::DivideByZero)));
    }

    #[test]
    fn test_missing_input_is_a_runtime_error() {
        let program = compile_to_ir("int main() { return getint(); }").unwrap();
        let result = Interpreter::new(&program, Cursor::new(""), Vec::new()).run();
        assert!(matches!(result, Err(RuntimeError::EndOfInput)));
    }

    #[test]
    fn test_signed_arithmetic() {
        assert_eq!(run("int main() { return -7 / 2; }"), -3);
        assert_eq!(run("int main() { int a = -7; int b = 2; return a % b; }"), -1);
        assert_eq!(run("int main() { int a = -1; return a < 0; }"), 1);
    }

    #[test]
    fn test_wrap_around_matches_fold() {
        let folded = run("int main() { return 2147483647 + 1; }");
        let computed = run("int main() { int x = 2147483647; return x + 1; }");
        assert_eq!(folded, computed);
    }
}
