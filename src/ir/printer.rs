//! Human-readable dump of `LinearCode`, behind `--emit-ir`.

use std::fmt::{self, Write};

use crate::ir::ir::{BinOp, CmpOp, CodeLine, LinearCode, Operand, UnOp, FIRST_USER_FUNC};

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Number(value) => write!(f, "#{}", value),
            Operand::Local(slot) => write!(f, "l{}", slot),
            Operand::Global(slot) => write!(f, "g{}", slot),
            Operand::Addr(slot) => write!(f, "a{}", slot),
        }
    }
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
        }
    }
}

impl CmpOp {
    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
        }
    }
}

/// Render the whole program as text. Globals come first as one sized blob
/// with its nonzero words, then each function with its parameter and slot
/// counts and its lines.
pub fn render(program: &LinearCode) -> String {
    let mut out = String::new();
    render_into(program, &mut out).expect("writing to a string cannot fail");
    out
}

fn render_into(program: &LinearCode, out: &mut String) -> fmt::Result {
    writeln!(out, "globals: {} word(s)", program.global_len)?;
    for &(offset, value) in &program.global_init {
        writeln!(out, "\t[{}] = {}", offset, value)?;
    }
    for (position, func) in program.funcs.iter().enumerate() {
        let name = if position == program.main_index { "main" } else { "" };
        writeln!(
            out,
            "f{}{}{}: {} param(s), {} slot(s)",
            position as u32 + FIRST_USER_FUNC,
            if name.is_empty() { "" } else { " " },
            name,
            func.param_count,
            func.local_slots,
        )?;
        for line in &func.code {
            render_line(line, out)?;
        }
    }
    Ok(())
}

fn render_line(line: &CodeLine, out: &mut String) -> fmt::Result {
    match line {
        CodeLine::Binary { op, dest, src1, src2 } => {
            writeln!(out, "\t{} = {} {} {}", dest, src1, op.symbol(), src2)
        }
        CodeLine::Unary { op, dest, src } => match op {
            UnOp::Mov => writeln!(out, "\t{} = {}", dest, src),
            UnOp::Neg => writeln!(out, "\t{} = -{}", dest, src),
            UnOp::Not => writeln!(out, "\t{} = !{}", dest, src),
        },
        CodeLine::LoadAddr { dest, base, offset } => {
            writeln!(out, "\tl{} = &{}[{}]", dest, base, offset)
        }
        CodeLine::Load { dest, base, offset } => {
            writeln!(out, "\t{} = {}[{}]", dest, base, offset)
        }
        CodeLine::Store { base, offset, src } => {
            writeln!(out, "\t{}[{}] = {}", base, offset, src)
        }
        CodeLine::Parameter { value } => writeln!(out, "\tparam {}", value),
        CodeLine::Call { func, dest } => match dest {
            Some(dest) => writeln!(out, "\t{} = call f{}", dest, func),
            None => writeln!(out, "\tcall f{}", func),
        },
        CodeLine::Label(label) => writeln!(out, ".l{}:", label.0),
        CodeLine::JumpIf { target, op, src1, src2 } => {
            writeln!(out, "\tif {} {} {} goto .l{}", src1, op.symbol(), src2, target.0)
        }
        CodeLine::Goto(target) => writeln!(out, "\tgoto .l{}", target.0),
        CodeLine::Return(value) => match value {
            Some(value) => writeln!(out, "\treturn {}", value),
            None => writeln!(out, "\treturn"),
        },
    }
}
