//! Lowering: syntax tree to linear IR.
//!
//! One `Lowerer` owns the symbol tables and the growing program for a single
//! compilation; each function is lowered with a fresh `FuncContext` (code
//! buffer, label arena, loop-label stack), so consecutive functions never see
//! each other's per-function state.
//!
//! Expressions fold to plain numbers wherever every input is compile-time
//! known, and a folded expression emits no instructions at all. This is what
//! makes short-circuit operators with a constant left side free: the right
//! side is lowered only if it is actually reachable.

use log::debug;

use crate::common::error::{CompileError, CompileResult};
use crate::frontend::parser::ast::{self, Block, Exp, FuncDef, Initializer, Item, Stmt, SyntaxTree, VarDef};
use crate::frontend::sema::const_eval::{self, fold_binary, fold_unary};
use crate::frontend::sema::init;
use crate::frontend::sema::symbols::{
    ArraySize, FuncEntry, FuncTable, ParamShape, Scopes, Storage,
};
use crate::ir::ir::{
    BinOp, CmpOp, CodeLine, GlobalFuncDef, LabelArena, LabelId, LinearCode, Operand, UnOp,
    FIRST_USER_FUNC,
};

/// The calling convention passes arguments in registers; this is the file size.
pub const MAX_CALL_ARGS: usize = 8;

/// Where a lowered expression's value lives.
#[derive(Debug, Clone)]
enum VarInfo {
    /// A compile-time constant; lowering it emitted nothing.
    Number(i32),
    /// A named local variable's slot.
    LocalRef(u32),
    /// A global variable's slot.
    GlobalRef(u32),
    /// A compiler temporary's slot.
    Temp(u32),
    /// A partially indexed (or whole) array, as passed to array parameters.
    Array(ArrayRef),
    /// The result of a void call; using it as a value is an error.
    Void,
}

/// A decayed array value: where its base lives and what shape remains.
#[derive(Debug, Clone)]
struct ArrayRef {
    /// `Local`/`Global` for an array starting at that slot, `Addr` for a slot
    /// holding a computed element address.
    base: Operand,
    /// Remaining dimensions. The leading entry is a placeholder when the
    /// leading dimension is unknown (a decayed pointer); only the trailing
    /// dimensions take part in shape checks.
    dims: Vec<u32>,
}

impl ArrayRef {
    /// The shape a callee parameter must declare to accept this argument.
    fn shape(&self) -> ParamShape {
        ParamShape::array(self.dims[1..].to_vec())
    }
}

/// An assignment destination.
enum LValue {
    /// A directly addressable slot.
    Ref(Operand),
    /// A local slot holding the computed element address.
    Indirect(u32),
}

/// Result of resolving a (possibly subscripted) runtime variable use.
enum Access {
    /// Compile-time-resolved direct reference (the fast path).
    Value(Operand),
    /// Fully indexed through a computed address held in this slot.
    Element(u32),
    /// Not fully indexed: an array value.
    Slice(ArrayRef),
}

/// Per-function lowering state, constructed fresh for every function.
struct FuncContext {
    code: Vec<CodeLine>,
    labels: LabelArena,
    /// Innermost loop last: (continue target, break target).
    loop_labels: Vec<(LabelId, LabelId)>,
    is_int: bool,
}

impl FuncContext {
    fn new(is_int: bool) -> Self {
        Self { code: Vec::new(), labels: LabelArena::new(), loop_labels: Vec::new(), is_int }
    }

    fn emit(&mut self, line: CodeLine) {
        self.code.push(line);
    }

    /// Bind a label to the current offset and mark it in the code stream.
    fn place_label(&mut self, id: LabelId) {
        self.labels.bind(id, self.code.len() as u32);
        self.code.push(CodeLine::Label(id));
    }
}

/// Lowers a whole syntax tree into a `LinearCode` program.
pub struct Lowerer {
    scopes: Scopes,
    funcs: FuncTable,
    global_init: Vec<(u32, i32)>,
    func_defs: Vec<GlobalFuncDef>,
    main_index: Option<usize>,
}

impl Lowerer {
    pub fn new() -> Self {
        Self {
            scopes: Scopes::new(),
            funcs: FuncTable::new(),
            global_init: Vec::new(),
            func_defs: Vec::new(),
            main_index: None,
        }
    }

    pub fn lower(mut self, tree: &SyntaxTree) -> CompileResult<LinearCode> {
        for item in tree {
            match item {
                Item::Var(def) => self.lower_global_var(def)?,
                Item::Func(def) => self.lower_func(def)?,
            }
        }
        let main_index = self
            .main_index
            .ok_or_else(|| CompileError::semantic("main function is undefined"))?;
        debug!(
            "lowered {} function(s), {} global word(s)",
            self.func_defs.len(),
            self.scopes.global_len()
        );
        Ok(LinearCode {
            global_len: self.scopes.global_len(),
            global_init: self.global_init,
            funcs: self.func_defs,
            main_index,
        })
    }

    // === Declarations ===

    fn eval_array_size(&self, dims: &[Exp]) -> CompileResult<ArraySize> {
        let dims = dims
            .iter()
            .map(|dim| const_eval::eval_dim(dim, &self.scopes))
            .collect::<CompileResult<Vec<u32>>>()?;
        ArraySize::new(dims)
    }

    /// Fold a `const` definition into a content buffer and register it. Const
    /// entries never occupy a runtime slot, so this is the same for globals
    /// and locals.
    fn lower_const_var(&mut self, def: &VarDef, size: ArraySize) -> CompileResult<()> {
        let init = def
            .init
            .as_ref()
            .ok_or_else(|| CompileError::semantic("const variable must be initialized"))?;
        let pairs = if size.is_array() {
            init::flatten_eager(&size, init, &self.scopes)?
        } else {
            match init::flatten_scalar(init)? {
                Some(exp) => vec![(0, const_eval::eval_exp(exp, &self.scopes)?)],
                None => Vec::new(),
            }
        };
        self.scopes.add_const_var(&def.name, size, &pairs)?;
        Ok(())
    }

    fn lower_global_var(&mut self, def: &VarDef) -> CompileResult<()> {
        let size = self.eval_array_size(&def.dims)?;
        if def.is_const {
            return self.lower_const_var(def, size);
        }
        let entry = self.scopes.add_var(&def.name, size.clone(), false)?;
        let Storage::Slot { index, .. } = entry.storage else { unreachable!() };
        let Some(init) = &def.init else { return Ok(()) };
        // Global initializers must fold at compile time.
        let pairs = if size.is_array() {
            init::flatten_eager(&size, init, &self.scopes)?
        } else {
            match init::flatten_scalar(init)? {
                Some(exp) => vec![(0, const_eval::eval_exp(exp, &self.scopes)?)],
                None => Vec::new(),
            }
        };
        for (offset, value) in pairs {
            if value != 0 {
                self.global_init.push((index + offset, value));
            }
        }
        Ok(())
    }

    fn lower_func(&mut self, def: &FuncDef) -> CompileResult<()> {
        // Parameter shapes are evaluated in the global scope; an array
        // parameter's elided leading dimension makes it a pointer.
        let mut shapes = Vec::with_capacity(def.params.len());
        let mut sizes = Vec::with_capacity(def.params.len());
        for param in &def.params {
            match &param.dims {
                None => {
                    shapes.push(ParamShape::scalar());
                    sizes.push(ArraySize::scalar());
                }
                Some(tail_exps) => {
                    let tail = tail_exps
                        .iter()
                        .map(|dim| const_eval::eval_dim(dim, &self.scopes))
                        .collect::<CompileResult<Vec<u32>>>()?;
                    shapes.push(ParamShape::array(tail.clone()));
                    let mut dims = vec![1];
                    dims.extend(tail);
                    sizes.push(ArraySize::new(dims)?);
                }
            }
        }
        if def.params.len() > MAX_CALL_ARGS {
            return Err(CompileError::Semantic(format!(
                "function \"{}\" has too many parameters (max {})",
                def.name, MAX_CALL_ARGS
            )));
        }

        let index = FIRST_USER_FUNC + self.func_defs.len() as u32;
        // Registered before the body so the function can call itself.
        self.funcs.add(
            &def.name,
            FuncEntry { index, is_int: def.returns_int, params: shapes },
        )?;
        if def.name == "main" {
            if !def.returns_int {
                return Err(CompileError::semantic("main function must return int"));
            }
            if !def.params.is_empty() {
                return Err(CompileError::semantic("main function must not take parameters"));
            }
            self.main_index = Some(self.func_defs.len());
        }

        debug!("lowering function \"{}\" (index {})", def.name, index);
        let mut ctx = FuncContext::new(def.returns_int);
        self.scopes.begin_function();
        for (param, size) in def.params.iter().zip(sizes) {
            self.scopes.add_var(&param.name, size, true)?;
        }
        self.lower_block_scoped(&def.body, &mut ctx)?;
        // Control must not fall off the end of the code block.
        let fallback = if ctx.is_int { Some(Operand::Number(0)) } else { None };
        ctx.emit(CodeLine::Return(fallback));

        let local_slots = self.scopes.end_function();
        assert!(ctx.loop_labels.is_empty(), "unbalanced loop label stack");
        self.func_defs.push(GlobalFuncDef {
            param_count: def.params.len() as u32,
            local_slots,
            is_int: def.returns_int,
            code: ctx.code,
            label_offsets: ctx.labels.finalize(),
        });
        Ok(())
    }

    fn lower_local_var(&mut self, def: &VarDef, ctx: &mut FuncContext) -> CompileResult<()> {
        let size = self.eval_array_size(&def.dims)?;
        if def.is_const {
            return self.lower_const_var(def, size);
        }
        let entry = self.scopes.add_var(&def.name, size.clone(), false)?;
        let Storage::Slot { index, .. } = entry.storage else { unreachable!() };
        let Some(init) = &def.init else { return Ok(()) };

        let mark = self.scopes.local_mark();
        if !size.is_array() {
            if let Some(exp) = init::flatten_scalar(init)? {
                let value = self.lower_value(exp, ctx)?;
                ctx.emit(CodeLine::Unary {
                    op: UnOp::Mov,
                    dest: Operand::Local(index),
                    src: value,
                });
            }
        } else {
            self.lower_local_array_init(index, &size, init, ctx)?;
        }
        self.scopes.reset_local_mark(mark);
        Ok(())
    }

    /// Initialize a non-const local array. Small or dense initializers store
    /// every slot in increasing offset order (zero for gaps); large sparse
    /// ones zero-fill the whole array with a loop and then store only the
    /// supplied values.
    fn lower_local_array_init(
        &mut self,
        base: u32,
        size: &ArraySize,
        initializer: &Initializer,
        ctx: &mut FuncContext,
    ) -> CompileResult<()> {
        let pairs = init::flatten(size, initializer)?;
        let len = size.len();
        let dense = len <= 8 || pairs.len() as u64 * 2 >= len as u64;
        if dense {
            let mut next = pairs.into_iter().peekable();
            for offset in 0..len {
                let mark = self.scopes.local_mark();
                let src = match next.peek() {
                    Some(&(pair_offset, exp)) if pair_offset == offset => {
                        next.next();
                        self.lower_value(exp, ctx)?
                    }
                    _ => Operand::Number(0),
                };
                ctx.emit(CodeLine::Unary {
                    op: UnOp::Mov,
                    dest: Operand::Local(base + offset),
                    src,
                });
                self.scopes.reset_local_mark(mark);
            }
        } else {
            let counter = self.scopes.alloc_local(1)?;
            ctx.emit(CodeLine::Unary {
                op: UnOp::Mov,
                dest: Operand::Local(counter),
                src: Operand::Number(0),
            });
            let test = ctx.labels.alloc();
            let done = ctx.labels.alloc();
            ctx.place_label(test);
            ctx.emit(CodeLine::JumpIf {
                target: done,
                op: CmpOp::Ge,
                src1: Operand::Local(counter),
                src2: Operand::Number(len as i32),
            });
            ctx.emit(CodeLine::Store {
                base: Operand::Local(base),
                offset: Operand::Local(counter),
                src: Operand::Number(0),
            });
            ctx.emit(CodeLine::Binary {
                op: BinOp::Add,
                dest: Operand::Local(counter),
                src1: Operand::Local(counter),
                src2: Operand::Number(1),
            });
            ctx.emit(CodeLine::Goto(test));
            ctx.place_label(done);
            for (offset, exp) in pairs {
                let mark = self.scopes.local_mark();
                let src = self.lower_value(exp, ctx)?;
                ctx.emit(CodeLine::Unary {
                    op: UnOp::Mov,
                    dest: Operand::Local(base + offset),
                    src,
                });
                self.scopes.reset_local_mark(mark);
            }
        }
        Ok(())
    }

    // === Statements ===

    fn lower_block_scoped(&mut self, block: &Block, ctx: &mut FuncContext) -> CompileResult<()> {
        self.scopes.enter_scope();
        for stmt in block {
            self.lower_stmt(stmt, ctx)?;
        }
        self.scopes.leave_scope();
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt, ctx: &mut FuncContext) -> CompileResult<()> {
        match stmt {
            Stmt::VarDef(def) => self.lower_local_var(def, ctx),
            Stmt::Exp(exp) => {
                let mark = self.scopes.local_mark();
                self.lower_exp(exp, ctx)?;
                self.scopes.reset_local_mark(mark);
                Ok(())
            }
            Stmt::Block(block) => self.lower_block_scoped(block, ctx),
            Stmt::If { cond, then_block, else_block } => self.lower_if(cond, then_block, else_block, ctx),
            Stmt::While { cond, body } => self.lower_while(cond, body, ctx),
            Stmt::Break => {
                let &(_, break_label) = ctx.loop_labels.last().ok_or_else(|| {
                    CompileError::semantic("break statement not within a loop")
                })?;
                ctx.emit(CodeLine::Goto(break_label));
                Ok(())
            }
            Stmt::Continue => {
                let &(continue_label, _) = ctx.loop_labels.last().ok_or_else(|| {
                    CompileError::semantic("continue statement not within a loop")
                })?;
                ctx.emit(CodeLine::Goto(continue_label));
                Ok(())
            }
            Stmt::Return(value) => {
                let mark = self.scopes.local_mark();
                match (ctx.is_int, value) {
                    (false, Some(_)) => {
                        return Err(CompileError::semantic(
                            "void function cannot return a value",
                        ));
                    }
                    (true, Some(exp)) => {
                        let value = self.lower_value(exp, ctx)?;
                        ctx.emit(CodeLine::Return(Some(value)));
                    }
                    // `return;` in an int function yields 0 so both IR
                    // consumers agree on the result.
                    (true, None) => ctx.emit(CodeLine::Return(Some(Operand::Number(0)))),
                    (false, None) => ctx.emit(CodeLine::Return(None)),
                }
                self.scopes.reset_local_mark(mark);
                Ok(())
            }
        }
    }

    /// A compile-time-constant condition selects the taken branch at compile
    /// time; the untaken branch is neither emitted nor symbol-checked.
    fn lower_if(
        &mut self,
        cond: &Exp,
        then_block: &Block,
        else_block: &Block,
        ctx: &mut FuncContext,
    ) -> CompileResult<()> {
        if let Some(value) = self.try_fold(cond) {
            let taken = if value != 0 { then_block } else { else_block };
            return self.lower_block_scoped(taken, ctx);
        }
        let mark = self.scopes.local_mark();
        let cond_value = self.lower_value(cond, ctx)?;
        let else_label = ctx.labels.alloc();
        ctx.emit(CodeLine::JumpIf {
            target: else_label,
            op: CmpOp::Eq,
            src1: cond_value,
            src2: Operand::Number(0),
        });
        self.lower_block_scoped(then_block, ctx)?;
        if else_block.is_empty() {
            ctx.place_label(else_label);
        } else {
            let end_label = ctx.labels.alloc();
            ctx.emit(CodeLine::Goto(end_label));
            ctx.place_label(else_label);
            self.lower_block_scoped(else_block, ctx)?;
            ctx.place_label(end_label);
        }
        self.scopes.reset_local_mark(mark);
        Ok(())
    }

    /// A statically false loop vanishes entirely; a statically true one keeps
    /// only the back edge. Entering the loop saves the enclosing loop's
    /// labels on a stack so `break`/`continue` after the inner loop still
    /// resolve to the outer one.
    fn lower_while(&mut self, cond: &Exp, body: &Block, ctx: &mut FuncContext) -> CompileResult<()> {
        if let Some(value) = self.try_fold(cond) {
            if value == 0 {
                return Ok(());
            }
            let begin = ctx.labels.alloc();
            let exit = ctx.labels.alloc();
            ctx.place_label(begin);
            ctx.loop_labels.push((begin, exit));
            self.lower_block_scoped(body, ctx)?;
            ctx.loop_labels.pop();
            ctx.emit(CodeLine::Goto(begin));
            ctx.place_label(exit);
            return Ok(());
        }
        let mark = self.scopes.local_mark();
        let test = ctx.labels.alloc();
        let exit = ctx.labels.alloc();
        ctx.place_label(test);
        let cond_value = self.lower_value(cond, ctx)?;
        ctx.emit(CodeLine::JumpIf {
            target: exit,
            op: CmpOp::Eq,
            src1: cond_value,
            src2: Operand::Number(0),
        });
        ctx.loop_labels.push((test, exit));
        self.lower_block_scoped(body, ctx)?;
        ctx.loop_labels.pop();
        ctx.emit(CodeLine::Goto(test));
        ctx.place_label(exit);
        self.scopes.reset_local_mark(mark);
        Ok(())
    }

    // === Expressions ===

    /// Fold an expression to a compile-time constant if every input is known.
    ///
    /// Mirrors the reachability rules of lowering exactly: a short-circuit
    /// operator whose left side decides the result never looks at the right
    /// side, so `0 && f()` folds even though `f()` cannot. Any failure
    /// (non-const variable, call, division by zero) just declines to fold;
    /// real errors surface when the expression is lowered structurally.
    fn try_fold(&self, exp: &Exp) -> Option<i32> {
        match exp {
            Exp::Integer(value) => Some(*value),
            Exp::Call { .. } => None,
            Exp::Var { name, subscripts } => {
                let entry = self.scopes.find_var(name).ok()?;
                if !entry.is_const() {
                    return None;
                }
                let indices = subscripts
                    .iter()
                    .map(|subscript| const_eval::eval_subscript(subscript, &self.scopes).ok())
                    .collect::<Option<Vec<u32>>>()?;
                const_eval::read_const_var(entry, &indices).ok()
            }
            Exp::Unary { op, child } => Some(fold_unary(*op, self.try_fold(child)?)),
            Exp::Binary { op: ast::BinaryOp::Assign, .. } => None,
            Exp::Binary { op: ast::BinaryOp::And, left, right } => {
                match self.try_fold(left)? {
                    0 => Some(0),
                    _ => Some((self.try_fold(right)? != 0) as i32),
                }
            }
            Exp::Binary { op: ast::BinaryOp::Or, left, right } => match self.try_fold(left)? {
                0 => Some((self.try_fold(right)? != 0) as i32),
                _ => Some(1),
            },
            Exp::Binary { op, left, right } => {
                fold_binary(*op, self.try_fold(left)?, self.try_fold(right)?)
            }
        }
    }

    fn lower_exp(&mut self, exp: &Exp, ctx: &mut FuncContext) -> CompileResult<VarInfo> {
        if let Some(value) = self.try_fold(exp) {
            return Ok(VarInfo::Number(value));
        }
        match exp {
            Exp::Integer(value) => Ok(VarInfo::Number(*value)),
            Exp::Var { name, subscripts } => self.lower_var(name, subscripts, ctx),
            Exp::Call { name, args } => self.lower_call(name, args, ctx),
            Exp::Unary { op, child } => {
                let child_info = self.lower_exp(child, ctx)?;
                if let VarInfo::Number(value) = child_info {
                    return Ok(VarInfo::Number(fold_unary(*op, value)));
                }
                if *op == ast::UnaryOp::Pos {
                    return Ok(child_info);
                }
                let src = as_value(child_info)?;
                let temp = self.scopes.alloc_local(1)?;
                let op = match op {
                    ast::UnaryOp::Pos => unreachable!(),
                    ast::UnaryOp::Neg => UnOp::Neg,
                    ast::UnaryOp::Not => UnOp::Not,
                };
                ctx.emit(CodeLine::Unary { op, dest: Operand::Local(temp), src });
                Ok(VarInfo::Temp(temp))
            }
            Exp::Binary { op: ast::BinaryOp::Assign, left, right } => {
                self.lower_assign(left, right, ctx)
            }
            Exp::Binary { op: op @ (ast::BinaryOp::And | ast::BinaryOp::Or), left, right } => {
                self.lower_short_circuit(*op, left, right, ctx)
            }
            Exp::Binary { op, left, right } => {
                let left_info = self.lower_exp(left, ctx)?;
                let right_info = self.lower_exp(right, ctx)?;
                if let (VarInfo::Number(l), VarInfo::Number(r)) = (&left_info, &right_info) {
                    // Division by zero has no compile-time value; emit it and
                    // let the runtime fault.
                    if let Some(value) = fold_binary(*op, *l, *r) {
                        return Ok(VarInfo::Number(value));
                    }
                }
                let src1 = as_value(left_info)?;
                let src2 = as_value(right_info)?;
                let temp = self.scopes.alloc_local(1)?;
                ctx.emit(CodeLine::Binary {
                    op: binop_of(*op),
                    dest: Operand::Local(temp),
                    src1,
                    src2,
                });
                Ok(VarInfo::Temp(temp))
            }
        }
    }

    /// Lower an expression and insist on a scalar value operand.
    fn lower_value(&mut self, exp: &Exp, ctx: &mut FuncContext) -> CompileResult<Operand> {
        let info = self.lower_exp(exp, ctx)?;
        as_value(info)
    }

    /// `&&`/`||` with an unknown left side: the result temp starts at the
    /// operator's short-circuit value, the right side is skipped when the
    /// left alone decides, and otherwise its truthiness overwrites the temp.
    fn lower_short_circuit(
        &mut self,
        op: ast::BinaryOp,
        left: &Exp,
        right: &Exp,
        ctx: &mut FuncContext,
    ) -> CompileResult<VarInfo> {
        let left_info = self.lower_exp(left, ctx)?;
        if let VarInfo::Number(left_value) = left_info {
            // The left side decided at compile time; the right side is
            // lowered only if it is actually reachable.
            match (op, left_value != 0) {
                (ast::BinaryOp::And, false) => return Ok(VarInfo::Number(0)),
                (ast::BinaryOp::Or, true) => return Ok(VarInfo::Number(1)),
                _ => {}
            }
            let right_info = self.lower_exp(right, ctx)?;
            if let VarInfo::Number(right_value) = right_info {
                return Ok(VarInfo::Number((right_value != 0) as i32));
            }
            let src = as_value(right_info)?;
            let temp = self.scopes.alloc_local(1)?;
            ctx.emit(CodeLine::Binary {
                op: BinOp::Ne,
                dest: Operand::Local(temp),
                src1: src,
                src2: Operand::Number(0),
            });
            return Ok(VarInfo::Temp(temp));
        }

        let left_value = as_value(left_info)?;
        let temp = self.scopes.alloc_local(1)?;
        let skip = ctx.labels.alloc();
        let (initial, skip_op) = match op {
            ast::BinaryOp::And => (0, CmpOp::Eq),
            ast::BinaryOp::Or => (1, CmpOp::Ne),
            _ => unreachable!(),
        };
        ctx.emit(CodeLine::Unary {
            op: UnOp::Mov,
            dest: Operand::Local(temp),
            src: Operand::Number(initial),
        });
        ctx.emit(CodeLine::JumpIf {
            target: skip,
            op: skip_op,
            src1: left_value,
            src2: Operand::Number(0),
        });
        let right_value = self.lower_value(right, ctx)?;
        ctx.emit(CodeLine::Binary {
            op: BinOp::Ne,
            dest: Operand::Local(temp),
            src1: right_value,
            src2: Operand::Number(0),
        });
        ctx.place_label(skip);
        Ok(VarInfo::Temp(temp))
    }

    fn lower_assign(&mut self, left: &Exp, right: &Exp, ctx: &mut FuncContext) -> CompileResult<VarInfo> {
        let Exp::Var { name, subscripts } = left else {
            return Err(CompileError::semantic("expression must be a modifiable lvalue"));
        };
        let lvalue = self.lower_lvalue(name, subscripts, ctx)?;
        let value = self.lower_value(right, ctx)?;
        match lvalue {
            LValue::Ref(dest) => {
                ctx.emit(CodeLine::Unary { op: UnOp::Mov, dest, src: value });
            }
            LValue::Indirect(slot) => {
                ctx.emit(CodeLine::Store {
                    base: Operand::Addr(slot),
                    offset: Operand::Number(0),
                    src: value,
                });
            }
        }
        Ok(VarInfo::from_value(value))
    }

    fn lower_lvalue(
        &mut self,
        name: &str,
        subscripts: &[Exp],
        ctx: &mut FuncContext,
    ) -> CompileResult<LValue> {
        let entry = self.scopes.find_var(name)?.clone();
        let Storage::Slot { index, is_global, is_pointer } = entry.storage else {
            return Err(CompileError::semantic("expression must be a modifiable lvalue"));
        };
        match self.lower_access(index, is_global, is_pointer, &entry.size, subscripts, ctx)? {
            Access::Value(operand) => Ok(LValue::Ref(operand)),
            Access::Element(slot) => Ok(LValue::Indirect(slot)),
            Access::Slice(_) => {
                Err(CompileError::semantic("expression must be a modifiable lvalue"))
            }
        }
    }

    fn lower_var(
        &mut self,
        name: &str,
        subscripts: &[Exp],
        ctx: &mut FuncContext,
    ) -> CompileResult<VarInfo> {
        let entry = self.scopes.find_var(name)?.clone();
        match entry.storage {
            Storage::Const(_) => {
                // Const entries have no runtime storage; every use must be a
                // fully constant read (try_fold handles the common case, this
                // path exists to report the error).
                let indices = subscripts
                    .iter()
                    .map(|subscript| const_eval::eval_subscript(subscript, &self.scopes))
                    .collect::<CompileResult<Vec<u32>>>()?;
                Ok(VarInfo::Number(const_eval::read_const_var(&entry, &indices)?))
            }
            Storage::Slot { index, is_global, is_pointer } => {
                let access =
                    self.lower_access(index, is_global, is_pointer, &entry.size, subscripts, ctx)?;
                match access {
                    Access::Value(Operand::Local(slot)) => Ok(VarInfo::LocalRef(slot)),
                    Access::Value(Operand::Global(slot)) => Ok(VarInfo::GlobalRef(slot)),
                    Access::Value(_) => unreachable!("fast path yields direct references"),
                    Access::Element(addr_slot) => {
                        let temp = self.scopes.alloc_local(1)?;
                        ctx.emit(CodeLine::Load {
                            dest: Operand::Local(temp),
                            base: Operand::Addr(addr_slot),
                            offset: Operand::Number(0),
                        });
                        Ok(VarInfo::Temp(temp))
                    }
                    Access::Slice(array) => Ok(VarInfo::Array(array)),
                }
            }
        }
    }

    /// Resolve a subscripted use of a runtime variable.
    ///
    /// Index expressions are walked left to right against the shrinking
    /// stride. Constant indices accumulate into a compile-time offset;
    /// dynamic ones multiply into a running offset temp. If everything was
    /// constant, the access is fully indexed and the variable is not a
    /// decayed pointer, the result is a direct slot reference with no emitted
    /// address arithmetic, range-checked against the array's total length.
    fn lower_access(
        &mut self,
        index: u32,
        is_global: bool,
        is_pointer: bool,
        size: &ArraySize,
        subscripts: &[Exp],
        ctx: &mut FuncContext,
    ) -> CompileResult<Access> {
        let dims = size.dims();
        let depth = subscripts.len();
        if depth > dims.len() {
            return Err(CompileError::semantic("too many array subscripts"));
        }

        let mut const_offset: i64 = 0;
        let mut runtime: Option<u32> = None;
        for (position, subscript) in subscripts.iter().enumerate() {
            let stride: u32 = dims[position + 1..].iter().product();
            let info = self.lower_exp(subscript, ctx)?;
            match info {
                VarInfo::Number(value) => {
                    if value < 0 {
                        return Err(CompileError::semantic(
                            "array subscript must not be negative",
                        ));
                    }
                    const_offset += value as i64 * stride as i64;
                    if const_offset > i32::MAX as i64 {
                        return Err(CompileError::semantic(
                            "can not access position past the end of an array",
                        ));
                    }
                }
                info => {
                    let value = as_value(info)?;
                    match runtime {
                        None => {
                            let temp = self.scopes.alloc_local(1)?;
                            if stride == 1 {
                                ctx.emit(CodeLine::Unary {
                                    op: UnOp::Mov,
                                    dest: Operand::Local(temp),
                                    src: value,
                                });
                            } else {
                                ctx.emit(CodeLine::Binary {
                                    op: BinOp::Mul,
                                    dest: Operand::Local(temp),
                                    src1: value,
                                    src2: Operand::Number(stride as i32),
                                });
                            }
                            runtime = Some(temp);
                        }
                        Some(accumulator) => {
                            let addend = if stride == 1 {
                                value
                            } else {
                                let temp = self.scopes.alloc_local(1)?;
                                ctx.emit(CodeLine::Binary {
                                    op: BinOp::Mul,
                                    dest: Operand::Local(temp),
                                    src1: value,
                                    src2: Operand::Number(stride as i32),
                                });
                                Operand::Local(temp)
                            };
                            ctx.emit(CodeLine::Binary {
                                op: BinOp::Add,
                                dest: Operand::Local(accumulator),
                                src1: Operand::Local(accumulator),
                                src2: addend,
                            });
                        }
                    }
                }
            }
        }

        // Fast path: compile-time-resolved direct reference.
        if runtime.is_none() && depth == dims.len() && !is_pointer {
            if const_offset >= size.len() as i64 {
                return Err(CompileError::semantic(
                    "can not access position past the end of an array",
                ));
            }
            let slot = index + const_offset as u32;
            let operand =
                if is_global { Operand::Global(slot) } else { Operand::Local(slot) };
            return Ok(Access::Value(operand));
        }

        let base = if is_pointer {
            Operand::Addr(index)
        } else if is_global {
            Operand::Global(index)
        } else {
            Operand::Local(index)
        };
        let offset = match runtime {
            Some(accumulator) => {
                if const_offset != 0 {
                    ctx.emit(CodeLine::Binary {
                        op: BinOp::Add,
                        dest: Operand::Local(accumulator),
                        src1: Operand::Local(accumulator),
                        src2: Operand::Number(const_offset as i32),
                    });
                }
                Operand::Local(accumulator)
            }
            None => Operand::Number(const_offset as i32),
        };

        if depth == dims.len() {
            let addr = self.scopes.alloc_local(1)?;
            ctx.emit(CodeLine::LoadAddr { dest: addr, base, offset });
            return Ok(Access::Element(addr));
        }
        if depth == 0 {
            return Ok(Access::Slice(ArrayRef { base, dims: dims.to_vec() }));
        }
        let addr = self.scopes.alloc_local(1)?;
        ctx.emit(CodeLine::LoadAddr { dest: addr, base, offset });
        Ok(Access::Slice(ArrayRef { base: Operand::Addr(addr), dims: dims[depth..].to_vec() }))
    }

    /// Calls: the argument count and every argument's decayed shape must
    /// match the callee exactly. The `Call` line is followed by one
    /// `Parameter` line per argument in order; argument side effects have
    /// already happened by then, the `Parameter` operands are plain reads.
    fn lower_call(&mut self, name: &str, args: &[Exp], ctx: &mut FuncContext) -> CompileResult<VarInfo> {
        let entry = self.funcs.find(name)?.clone();
        if args.len() != entry.params.len() {
            return Err(CompileError::Semantic(format!(
                "function \"{}\" expects {} argument(s), got {}",
                name,
                entry.params.len(),
                args.len()
            )));
        }
        let mut operands = Vec::with_capacity(args.len());
        for (arg, shape) in args.iter().zip(&entry.params) {
            let info = self.lower_exp(arg, ctx)?;
            match info {
                VarInfo::Array(array) => {
                    if !shape.is_array || array.shape() != *shape {
                        return Err(CompileError::Semantic(format!(
                            "argument type mismatch in call to \"{}\"",
                            name
                        )));
                    }
                    // Reduce the array to an element address in a slot.
                    let operand = match array.base {
                        addr @ Operand::Addr(_) => addr,
                        base => {
                            let slot = self.scopes.alloc_local(1)?;
                            ctx.emit(CodeLine::LoadAddr {
                                dest: slot,
                                base,
                                offset: Operand::Number(0),
                            });
                            Operand::Addr(slot)
                        }
                    };
                    operands.push(operand);
                }
                info => {
                    if shape.is_array {
                        return Err(CompileError::Semantic(format!(
                            "argument type mismatch in call to \"{}\"",
                            name
                        )));
                    }
                    operands.push(as_value(info)?);
                }
            }
        }
        let dest = if entry.is_int {
            Some(Operand::Local(self.scopes.alloc_local(1)?))
        } else {
            None
        };
        ctx.emit(CodeLine::Call { func: entry.index, dest });
        for operand in operands {
            ctx.emit(CodeLine::Parameter { value: operand });
        }
        match dest {
            Some(Operand::Local(slot)) => Ok(VarInfo::Temp(slot)),
            _ => Ok(VarInfo::Void),
        }
    }
}

impl Default for Lowerer {
    fn default() -> Self {
        Self::new()
    }
}

impl VarInfo {
    fn from_value(operand: Operand) -> Self {
        match operand {
            Operand::Number(value) => VarInfo::Number(value),
            Operand::Local(slot) => VarInfo::LocalRef(slot),
            Operand::Global(slot) => VarInfo::GlobalRef(slot),
            Operand::Addr(_) => unreachable!("addresses are not scalar values"),
        }
    }
}

/// Extract the scalar value operand of an expression result.
fn as_value(info: VarInfo) -> CompileResult<Operand> {
    match info {
        VarInfo::Number(value) => Ok(Operand::Number(value)),
        VarInfo::LocalRef(slot) | VarInfo::Temp(slot) => Ok(Operand::Local(slot)),
        VarInfo::GlobalRef(slot) => Ok(Operand::Global(slot)),
        VarInfo::Array(_) | VarInfo::Void => {
            Err(CompileError::semantic("expression must have a value type"))
        }
    }
}

fn binop_of(op: ast::BinaryOp) -> BinOp {
    match op {
        ast::BinaryOp::Add => BinOp::Add,
        ast::BinaryOp::Sub => BinOp::Sub,
        ast::BinaryOp::Mul => BinOp::Mul,
        ast::BinaryOp::Div => BinOp::Div,
        ast::BinaryOp::Mod => BinOp::Mod,
        ast::BinaryOp::Eq => BinOp::Eq,
        ast::BinaryOp::Ne => BinOp::Ne,
        ast::BinaryOp::Lt => BinOp::Lt,
        ast::BinaryOp::Gt => BinOp::Gt,
        ast::BinaryOp::Le => BinOp::Le,
        ast::BinaryOp::Ge => BinOp::Ge,
        ast::BinaryOp::Assign | ast::BinaryOp::And | ast::BinaryOp::Or => {
            unreachable!("handled by dedicated lowering paths")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_to_ir;

    fn compile(source: &str) -> LinearCode {
        compile_to_ir(source).unwrap()
    }

    fn compile_err(source: &str) -> CompileError {
        compile_to_ir(source).unwrap_err()
    }

    fn main_code(code: &LinearCode) -> &[CodeLine] {
        &code.funcs[code.main_index].code
    }

    #[test]
    fn test_constant_expression_folds_to_nothing() {
        let code = compile("int main() { return 1 + 2 * 3 - !0; }");
        // Only the explicit return and the synthetic trailing return.
        let lines = main_code(&code);
        assert_eq!(lines.len(), 2);
        assert!(matches!(lines[0], CodeLine::Return(Some(Operand::Number(6)))));
    }

    #[test]
    fn test_false_and_lowers_no_call() {
        let code = compile("int f() { return 1; } int main() { return 0 && f(); }");
        assert!(!main_code(&code).iter().any(|l| matches!(l, CodeLine::Call { .. })));
    }

    #[test]
    fn test_true_or_lowers_no_call() {
        let code = compile("int f() { return 1; } int main() { return 1 || f(); }");
        assert!(!main_code(&code).iter().any(|l| matches!(l, CodeLine::Call { .. })));
        assert!(matches!(
            main_code(&code)[0],
            CodeLine::Return(Some(Operand::Number(1)))
        ));
    }

    #[test]
    fn test_reachable_right_side_is_lowered() {
        let code = compile("int f() { return 1; } int main() { return 1 && f(); }");
        assert!(main_code(&code).iter().any(|l| matches!(l, CodeLine::Call { .. })));
    }

    #[test]
    fn test_dynamic_short_circuit_shape() {
        let code = compile("int main() { int a = 1; return a && a; }");
        let lines = main_code(&code);
        // mov a; mov temp, 0; jumpif ==0 skip; ne temp, a, 0; label; return.
        assert!(matches!(
            lines[2],
            CodeLine::JumpIf { op: CmpOp::Eq, src2: Operand::Number(0), .. }
        ));
        assert!(lines.iter().any(|l| matches!(
            l,
            CodeLine::Binary { op: BinOp::Ne, src2: Operand::Number(0), .. }
        )));
        assert!(lines.iter().any(|l| matches!(l, CodeLine::Label(_))));
    }

    #[test]
    fn test_shadowing_inner_block() {
        let code = compile("int main() { int x = 1; { int x = 2; } return x; }");
        let lines = main_code(&code);
        // Outer x in slot 0, inner in slot 1; the return reads slot 0.
        assert!(matches!(
            lines[0],
            CodeLine::Unary { dest: Operand::Local(0), src: Operand::Number(1), .. }
        ));
        assert!(matches!(
            lines[1],
            CodeLine::Unary { dest: Operand::Local(1), src: Operand::Number(2), .. }
        ));
        assert!(matches!(lines[2], CodeLine::Return(Some(Operand::Local(0)))));
    }

    #[test]
    fn test_dead_branch_is_not_symbol_checked() {
        // The untaken branch of a constant condition is skipped entirely,
        // undefined names and all.
        compile("int main() { if (0) { return nowhere; } return 0; }");
        compile("int main() { while (0) { nothing = 1; } return 0; }");
    }

    #[test]
    fn test_static_true_while_keeps_only_back_edge() {
        let code = compile("int main() { while (1) { return 3; } return 0; }");
        let lines = main_code(&code);
        assert!(!lines.iter().any(|l| matches!(l, CodeLine::JumpIf { .. })));
        assert!(lines.iter().any(|l| matches!(l, CodeLine::Goto(_))));
    }

    #[test]
    fn test_constant_if_emits_taken_branch_only() {
        let code = compile("int main() { if (2 > 1) { return 5; } else { return 6; } }");
        let lines = main_code(&code);
        assert!(matches!(lines[0], CodeLine::Return(Some(Operand::Number(5)))));
        assert!(!lines.iter().any(|l| matches!(l, CodeLine::JumpIf { .. })));
    }

    #[test]
    fn test_nested_loop_label_restore() {
        // break after the inner loop must target the outer loop's exit.
        let code = compile(
            "int main() {
                int n = 0;
                while (n < 3) {
                    while (n < 1) { n = n + 1; }
                    break;
                }
                return n;
            }",
        );
        let func = &code.funcs[code.main_index];
        // Every Goto/JumpIf target resolves inside the code block.
        for line in &func.code {
            if let CodeLine::Goto(target) | CodeLine::JumpIf { target, .. } = line {
                assert!((func.label_offsets[target.0 as usize] as usize) <= func.code.len());
            }
        }
    }

    #[test]
    fn test_break_outside_loop_rejected() {
        assert!(matches!(
            compile_err("int main() { break; return 0; }"),
            CompileError::Semantic(_)
        ));
        compile_err("int main() { continue; return 0; }");
    }

    #[test]
    fn test_call_emits_call_then_parameters() {
        let code = compile(
            "int add(int a, int b) { return a + b; }
             int main() { return add(1, 2); }",
        );
        let lines = main_code(&code);
        let call_at = lines
            .iter()
            .position(|l| matches!(l, CodeLine::Call { .. }))
            .unwrap();
        assert!(matches!(
            lines[call_at],
            CodeLine::Call { func: FIRST_USER_FUNC, dest: Some(_) }
        ));
        assert!(matches!(
            lines[call_at + 1],
            CodeLine::Parameter { value: Operand::Number(1) }
        ));
        assert!(matches!(
            lines[call_at + 2],
            CodeLine::Parameter { value: Operand::Number(2) }
        ));
    }

    #[test]
    fn test_builtin_call_uses_fixed_index() {
        let code = compile("int main() { putint(7); return 0; }");
        assert!(main_code(&code)
            .iter()
            .any(|l| matches!(l, CodeLine::Call { func: 3, dest: None })));
    }

    #[test]
    fn test_argument_count_and_shape_mismatches() {
        compile_err("void f(int a) {} int main() { f(); return 0; }");
        // Scalar where an array is expected.
        compile_err("void f(int a[]) {} int main() { int x; f(x); return 0; }");
        // Array where a scalar is expected.
        compile_err("void f(int a) {} int main() { int x[2]; f(x); return 0; }");
        // Trailing dimensions must match exactly.
        compile_err(
            "void f(int a[][3]) {} int main() { int x[2][4]; f(x); return 0; }",
        );
        // Matching shapes are fine, including a partially indexed row.
        compile(
            "void f(int a[]) {} int main() { int x[2][3]; f(x[1]); return 0; }",
        );
    }

    #[test]
    fn test_void_call_has_no_value() {
        compile_err("void f() {} int main() { return f(); }");
        compile_err("void f() {} int main() { return 1 + f(); }");
    }

    #[test]
    fn test_void_return_with_value_rejected() {
        compile_err("void f() { return 1; } int main() { return 0; }");
    }

    #[test]
    fn test_constant_subscript_fast_path() {
        let code = compile("int main() { int a[2][3]; a[1][2] = 9; return a[1][2]; }");
        let lines = main_code(&code);
        // No address arithmetic: direct slot 0 + 1*3 + 2 = 5.
        assert!(!lines.iter().any(|l| matches!(l, CodeLine::LoadAddr { .. })));
        assert!(matches!(
            lines[0],
            CodeLine::Unary { dest: Operand::Local(5), src: Operand::Number(9), .. }
        ));
        assert!(matches!(lines[1], CodeLine::Return(Some(Operand::Local(5)))));
    }

    #[test]
    fn test_constant_subscript_out_of_range_rejected() {
        compile_err("int main() { int a[2][3]; return a[1][3]; }");
        compile_err("int main() { int a[4]; a[4] = 1; return 0; }");
        compile_err("int main() { int a[4]; return a[0 - 1]; }");
    }

    #[test]
    fn test_dynamic_subscript_emits_address_and_load() {
        let code = compile("int main() { int a[2][3]; int i = 1; return a[i][2]; }");
        let lines = main_code(&code);
        // i*3 into a temp, +2 folded into the offset, address, load.
        assert!(lines.iter().any(|l| matches!(
            l,
            CodeLine::Binary { op: BinOp::Mul, src2: Operand::Number(3), .. }
        )));
        assert!(lines.iter().any(|l| matches!(l, CodeLine::LoadAddr { .. })));
        assert!(lines.iter().any(|l| matches!(
            l,
            CodeLine::Load { base: Operand::Addr(_), offset: Operand::Number(0), .. }
        )));
    }

    #[test]
    fn test_pointer_parameter_never_uses_fast_path() {
        let code = compile("int f(int a[]) { return a[0]; } int main() { return 0; }");
        let f = &code.funcs[0];
        assert!(f.code.iter().any(|l| matches!(
            l,
            CodeLine::LoadAddr { base: Operand::Addr(0), .. }
        )));
    }

    #[test]
    fn test_store_through_computed_address() {
        let code = compile("int main() { int a[4]; int i = 2; a[i] = 7; return 0; }");
        assert!(main_code(&code).iter().any(|l| matches!(
            l,
            CodeLine::Store { base: Operand::Addr(_), offset: Operand::Number(0), src: Operand::Number(7) }
        )));
    }

    #[test]
    fn test_two_computed_assignments_in_one_statement() {
        // The explicit lvalue descriptor is reentrant: a computed store on
        // both sides of a nested assignment works.
        compile("int main() { int a[4]; int i = 1; a[i] = a[i + 1] = 5; return 0; }");
    }

    #[test]
    fn test_assignment_requires_lvalue() {
        compile_err("int main() { 1 = 2; return 0; }");
        compile_err("int main() { int a[2]; a = 1; return 0; }");
        compile_err("const int c = 1; int main() { c = 2; return 0; }");
    }

    #[test]
    fn test_small_array_initializer_stores_every_slot() {
        let code = compile("int main() { int a[4] = {1, 2}; return a[0]; }");
        let movs: Vec<_> = main_code(&code)
            .iter()
            .filter_map(|l| match l {
                CodeLine::Unary { op: UnOp::Mov, dest: Operand::Local(slot), src } => {
                    Some((*slot, *src))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            movs,
            vec![
                (0, Operand::Number(1)),
                (1, Operand::Number(2)),
                (2, Operand::Number(0)),
                (3, Operand::Number(0)),
            ]
        );
    }

    #[test]
    fn test_large_sparse_initializer_uses_zero_fill_loop() {
        let code = compile("int main() { int a[100] = {5}; return a[0]; }");
        let lines = main_code(&code);
        // A loop: store through the counter, plus the one explicit value.
        assert!(lines.iter().any(|l| matches!(
            l,
            CodeLine::Store { offset: Operand::Local(_), src: Operand::Number(0), .. }
        )));
        assert!(lines.iter().any(|l| matches!(
            l,
            CodeLine::JumpIf { op: CmpOp::Ge, src2: Operand::Number(100), .. }
        )));
        assert!(lines.iter().any(|l| matches!(
            l,
            CodeLine::Unary { dest: Operand::Local(0), src: Operand::Number(5), .. }
        )));
    }

    #[test]
    fn test_dense_initializer_avoids_loop() {
        let code = compile(
            "int main() { int a[10] = {1,2,3,4,5}; return a[0]; }",
        );
        assert!(!main_code(&code).iter().any(|l| matches!(l, CodeLine::JumpIf { .. })));
    }

    #[test]
    fn test_global_initializers_are_sparse() {
        let code = compile("int g0; int a[10] = {0, 3, 0, 4}; int main() { return a[1]; }");
        assert_eq!(code.global_len, 11);
        assert_eq!(code.global_init, vec![(2, 3), (4, 4)]);
    }

    #[test]
    fn test_global_initializer_must_be_constant() {
        compile_err("int x = getint(); int main() { return x; }");
    }

    #[test]
    fn test_const_array_reads_fold() {
        let code = compile(
            "const int t[2][3] = {{1, 2}, {3}};
             int main() { return t[1][0]; }",
        );
        assert!(matches!(
            main_code(&code)[0],
            CodeLine::Return(Some(Operand::Number(3)))
        ));
        // Const entries occupy no global storage.
        assert_eq!(code.global_len, 0);
    }

    #[test]
    fn test_const_array_dynamic_subscript_rejected() {
        compile_err(
            "const int t[2] = {1, 2};
             int main() { int i = 0; return t[i]; }",
        );
    }

    #[test]
    fn test_frame_size_counts_watermark() {
        let code = compile(
            "int main() {
                int a = 1;
                { int b[10]; b[0] = a; }
                { int c = 2; a = c; }
                return a;
            }",
        );
        // Slot 0 for a, slots 1..11 for b; c reuses slot 1.
        assert_eq!(code.funcs[code.main_index].local_slots, 11);
    }

    #[test]
    fn test_redefinition_and_undefined_errors() {
        compile_err("int main() { int x; int x; return 0; }");
        compile_err("int main() { return y; }");
        compile_err("int f() { return 0; } int f() { return 1; } int main() { return 0; }");
        compile_err("int putint() { return 0; } int main() { return 0; }");
        compile_err("int main() { return nope(); }");
    }

    #[test]
    fn test_main_required_and_checked() {
        compile_err("int f() { return 0; }");
        compile_err("void main() {}");
        compile_err("int main(int a) { return a; }");
    }

    #[test]
    fn test_recursion_allowed() {
        let code = compile("int fib(int n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } int main() { return fib(10); }");
        assert!(code.funcs[0]
            .code
            .iter()
            .any(|l| matches!(l, CodeLine::Call { func: FIRST_USER_FUNC, .. })));
    }

    #[test]
    fn test_labels_reset_per_function() {
        let code = compile(
            "int f(int n) { while (n > 0) { n = n - 1; } return n; }
             int g(int n) { while (n > 0) { n = n - 2; } return n; }
             int main() { return f(4) + g(4); }",
        );
        // Both functions allocate their labels from zero.
        assert_eq!(code.funcs[0].label_offsets.len(), 2);
        assert_eq!(code.funcs[1].label_offsets.len(), 2);
    }

    #[test]
    fn test_array_too_large() {
        compile_err("int main() { int a[65536][65536][2]; return 0; }");
    }

    #[test]
    fn test_return_without_value_in_int_function() {
        let code = compile("int main() { return; }");
        assert!(matches!(
            main_code(&code)[0],
            CodeLine::Return(Some(Operand::Number(0)))
        ));
    }
}
