//! The linear IR: flat three-operand instructions produced by lowering and
//! consumed by the RISC-V backend and the reference interpreter.
//!
//! Address and offset arithmetic is in *elements* (words); the backend scales
//! by 4 when it materializes byte addresses, the interpreter indexes memory
//! directly.

/// Where an operand's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// An immediate constant.
    Number(i32),
    /// The value of a local slot (stack word, 0-based within the frame).
    Local(u32),
    /// The value of a global slot (word offset into the global data blob).
    Global(u32),
    /// A local slot that holds an element *address* rather than a plain value.
    /// Reading the operand yields the address; `Load`/`Store` through it
    /// dereference that address.
    Addr(u32),
}

impl Operand {
    /// True for operands that name a writable storage location.
    pub fn is_ref(self) -> bool {
        matches!(self, Operand::Local(_) | Operand::Global(_))
    }
}

/// Arithmetic and comparison operators of `CodeLine::Binary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

/// Operators of `CodeLine::Unary`. `Mov` is a plain copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Mov,
    Neg,
    Not,
}

/// Comparison used by `JumpIf` (jump taken when `src1 op src2` holds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

/// A branch target, allocated before its code offset is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelId(pub u32);

/// One IR instruction.
#[derive(Debug, Clone)]
pub enum CodeLine {
    /// `dest = src1 op src2`. Comparisons yield 0 or 1.
    Binary { op: BinOp, dest: Operand, src1: Operand, src2: Operand },
    /// `dest = op src`.
    Unary { op: UnOp, dest: Operand, src: Operand },
    /// Compute the address of element `base + offset` into local slot `dest`,
    /// which thereafter reads as an `Operand::Addr`.
    LoadAddr { dest: u32, base: Operand, offset: Operand },
    /// `dest = element at (base + offset)`.
    Load { dest: Operand, base: Operand, offset: Operand },
    /// `element at (base + offset) = src`.
    Store { base: Operand, offset: Operand, src: Operand },
    /// One call argument; `Parameter` lines follow their `Call` line in order.
    Parameter { value: Operand },
    /// Call function `func` (global function index; 0..7 are the library
    /// builtins). The arguments are the `Parameter` lines immediately after.
    Call { func: u32, dest: Option<Operand> },
    /// Branch target marker; also recorded in the function's label map.
    Label(LabelId),
    /// Conditional branch: jump to `target` when `src1 op src2`.
    JumpIf { target: LabelId, op: CmpOp, src1: Operand, src2: Operand },
    /// Unconditional branch.
    Goto(LabelId),
    /// Function return, with a value in int functions.
    Return(Option<Operand>),
}

/// Per-function arena of branch targets.
///
/// A label is allocated at the point a construct decides it needs one and
/// bound to a code offset later, when the target site is emitted. Every
/// allocated label must be bound exactly once before the function is
/// finalized; a violation is an internal invariant failure, not a user error.
#[derive(Debug, Default)]
pub struct LabelArena {
    offsets: Vec<Option<u32>>,
}

impl LabelArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self) -> LabelId {
        let id = LabelId(self.offsets.len() as u32);
        self.offsets.push(None);
        id
    }

    pub fn bind(&mut self, id: LabelId, offset: u32) {
        let slot = &mut self.offsets[id.0 as usize];
        assert!(slot.is_none(), "label {} bound twice", id.0);
        *slot = Some(offset);
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Consume the arena into the finalized id -> offset map.
    ///
    /// Panics if any label was never bound.
    pub fn finalize(self) -> Vec<u32> {
        self.offsets
            .into_iter()
            .enumerate()
            .map(|(id, offset)| offset.unwrap_or_else(|| panic!("label {} never bound", id)))
            .collect()
    }
}

/// One compiled function.
#[derive(Debug)]
pub struct GlobalFuncDef {
    pub param_count: u32,
    /// High-water mark of simultaneously live local slots; the frame size.
    pub local_slots: u32,
    pub is_int: bool,
    pub code: Vec<CodeLine>,
    /// Label id -> code offset, finalized by the label arena.
    pub label_offsets: Vec<u32>,
}

/// The whole compiled program.
#[derive(Debug)]
pub struct LinearCode {
    /// Total global words.
    pub global_len: u32,
    /// Sparse (word offset, value) initializers; gaps are zero. Offsets are
    /// strictly increasing.
    pub global_init: Vec<(u32, i32)>,
    /// User functions in definition order; function index = position + 8
    /// (past the library builtins).
    pub funcs: Vec<GlobalFuncDef>,
    /// Position of `main` in `funcs`.
    pub main_index: usize,
}

/// Global function indices below this are library builtins.
pub const FIRST_USER_FUNC: u32 = 8;
