//! Syntax tree definitions.
//!
//! The tree is produced by the parser and consumed read-only by lowering.
//! Expressions, statements and top-level items are each one closed enum, so
//! every consumer matches exhaustively.

/// Unary operators (`+`, `-`, `!`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Pos,
    Neg,
    Not,
}

/// Binary operators, including assignment and the short-circuit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Assign,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinaryOp {
    /// Precedence level, tightest first. `Assign` is the loosest and the only
    /// right-associative operator.
    pub fn priority(self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 0,
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 2,
            BinaryOp::Eq | BinaryOp::Ne => 3,
            BinaryOp::And => 4,
            BinaryOp::Or => 5,
            BinaryOp::Assign => 6,
        }
    }
}

/// An expression node.
#[derive(Debug, Clone)]
pub enum Exp {
    /// A variable reference, possibly subscripted: `a`, `a[i][j]`.
    Var { name: String, subscripts: Vec<Exp> },
    /// A function call: `f(x, y)`.
    Call { name: String, args: Vec<Exp> },
    /// An integer literal.
    Integer(i32),
    Unary { op: UnaryOp, child: Box<Exp> },
    Binary { op: BinaryOp, left: Box<Exp>, right: Box<Exp> },
}

/// A brace initializer: either a single expression or a nested list.
#[derive(Debug, Clone)]
pub enum Initializer {
    Exp(Exp),
    List(Vec<Initializer>),
}

/// One variable definition. A multi-declarator source line (`int a, b[2];`)
/// is split by the parser into one `VarDef` per name.
#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    /// Array dimension expressions, outermost first; empty for scalars.
    /// Each must be a positive compile-time constant.
    pub dims: Vec<Exp>,
    pub init: Option<Initializer>,
    pub is_const: bool,
}

/// A function parameter. `dims` is `None` for a scalar `int` parameter and
/// `Some(tail)` for an array parameter `int p[][d1][d2]...` — the elided
/// leading dimension is not part of `tail`.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub dims: Option<Vec<Exp>>,
}

/// A statement (block item).
#[derive(Debug, Clone)]
pub enum Stmt {
    VarDef(VarDef),
    Exp(Exp),
    Block(Block),
    If { cond: Exp, then_block: Block, else_block: Block },
    While { cond: Exp, body: Block },
    Break,
    Continue,
    Return(Option<Exp>),
}

pub type Block = Vec<Stmt>;

/// A function definition. `returns_int` is false for `void` functions.
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub returns_int: bool,
}

/// A top-level item.
#[derive(Debug, Clone)]
pub enum Item {
    Var(VarDef),
    Func(FuncDef),
}

pub type SyntaxTree = Vec<Item>;
