//! Symbol tables: scoped variables, the flat function table, and the slot
//! bump allocators that decide frame layout.

use std::collections::HashMap;

use crate::common::error::{CompileError, CompileResult};

/// Array dimensions plus the derived total element count.
///
/// `dims` is outermost first; scalars have an empty list and length 1. The
/// product is computed in 64 bits and rejected if it does not fit 32.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArraySize {
    dims: Vec<u32>,
    len: u32,
}

impl ArraySize {
    pub fn new(dims: Vec<u32>) -> CompileResult<Self> {
        let mut len: u64 = 1;
        for &d in &dims {
            assert!(d > 0, "dimensions are validated positive before this point");
            len *= d as u64;
            if len > u32::MAX as u64 {
                return Err(CompileError::semantic("array size too large"));
            }
        }
        Ok(Self { dims, len: len as u32 })
    }

    pub fn scalar() -> Self {
        Self { dims: Vec::new(), len: 1 }
    }

    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }
}

/// Where a variable's value lives.
#[derive(Debug, Clone)]
pub enum Storage {
    /// A runtime slot: `index` words into the frame (local) or the global
    /// data blob. `is_pointer` marks a decayed array parameter whose single
    /// slot holds an element address.
    Slot { index: u32, is_global: bool, is_pointer: bool },
    /// A `const` variable: the fully folded contents, no runtime slot.
    Const(Vec<i32>),
}

/// One resolved variable.
#[derive(Debug, Clone)]
pub struct VarEntry {
    pub size: ArraySize,
    pub storage: Storage,
}

impl VarEntry {
    pub fn is_const(&self) -> bool {
        matches!(self.storage, Storage::Const(_))
    }
}

/// The shape a call argument must match: scalar, or a decayed array whose
/// trailing dimensions (everything past the pointer) are `tail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamShape {
    pub is_array: bool,
    pub tail: Vec<u32>,
}

impl ParamShape {
    pub fn scalar() -> Self {
        Self { is_array: false, tail: Vec::new() }
    }

    pub fn array(tail: Vec<u32>) -> Self {
        Self { is_array: true, tail }
    }
}

/// One function signature.
#[derive(Debug, Clone)]
pub struct FuncEntry {
    /// Global function index; 0..7 are the library builtins, user functions
    /// are numbered from 8 in definition order.
    pub index: u32,
    pub is_int: bool,
    pub params: Vec<ParamShape>,
}

/// The flat, unscoped function table.
///
/// The eight library builtins are pre-registered at indices 0..7 before any
/// user function is seen.
#[derive(Debug)]
pub struct FuncTable {
    entries: HashMap<String, FuncEntry>,
}

impl FuncTable {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        for builtin in super::builtins::BUILTINS {
            entries.insert(
                builtin.name.to_string(),
                FuncEntry {
                    index: builtin.index,
                    is_int: builtin.is_int,
                    params: (builtin.params)(),
                },
            );
        }
        Self { entries }
    }

    pub fn add(&mut self, name: &str, entry: FuncEntry) -> CompileResult<()> {
        if self.entries.contains_key(name) {
            return Err(CompileError::Semantic(format!(
                "function \"{}\" is already defined",
                name
            )));
        }
        self.entries.insert(name.to_string(), entry);
        Ok(())
    }

    pub fn find(&self, name: &str) -> CompileResult<&FuncEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| CompileError::Semantic(format!("function \"{}\" is undefined", name)))
    }
}

impl Default for FuncTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Largest compile-time const array we will fold into a content buffer.
pub const MAX_CONST_ARRAY_LEN: u32 = 65536;

/// The scope stack plus the slot allocators.
///
/// The outermost scope holds globals; each nested scope carries its own name
/// map. The local slot counter is *inherited* on scope entry (not reset), so
/// sibling blocks reuse slots; `max_local` records the high-water mark that
/// becomes the function's frame size.
#[derive(Debug)]
pub struct Scopes {
    stack: Vec<HashMap<String, VarEntry>>,
    /// Next free local slot, one entry per scope inside the current function.
    local_next: Vec<u32>,
    max_local: u32,
    global_next: u32,
}

impl Scopes {
    pub fn new() -> Self {
        Self {
            stack: vec![HashMap::new()],
            local_next: Vec::new(),
            max_local: 0,
            global_next: 0,
        }
    }

    pub fn at_global_scope(&self) -> bool {
        self.stack.len() == 1
    }

    pub fn enter_scope(&mut self) {
        self.stack.push(HashMap::new());
        let inherited = self.local_next.last().copied().unwrap_or(0);
        self.local_next.push(inherited);
    }

    pub fn leave_scope(&mut self) {
        assert!(self.stack.len() > 1, "cannot leave the global scope");
        self.stack.pop();
        self.local_next.pop();
    }

    /// Start a fresh function frame: slot counter and high-water mark reset.
    pub fn begin_function(&mut self) {
        assert!(self.at_global_scope(), "nested function definitions are impossible");
        self.stack.push(HashMap::new());
        self.local_next = vec![0];
        self.max_local = 0;
    }

    /// Close the function scope and return its frame size in slots.
    pub fn end_function(&mut self) -> u32 {
        self.leave_scope();
        assert!(self.at_global_scope());
        self.local_next.clear();
        self.max_local
    }

    /// Bump-allocate `len` contiguous local slots.
    pub fn alloc_local(&mut self, len: u32) -> CompileResult<u32> {
        let next = self.local_next.last_mut().expect("allocation outside a function");
        let index = *next;
        *next = next
            .checked_add(len)
            .filter(|&n| n <= i32::MAX as u32 / 4)
            .ok_or_else(|| CompileError::semantic("local variables exceed frame capacity"))?;
        self.max_local = self.max_local.max(*next);
        Ok(index)
    }

    /// Current local slot watermark; pair with `reset_local_mark` to release
    /// statement-scoped temporaries.
    pub fn local_mark(&self) -> u32 {
        *self.local_next.last().expect("mark outside a function")
    }

    pub fn reset_local_mark(&mut self, mark: u32) {
        let next = self.local_next.last_mut().expect("mark outside a function");
        assert!(mark <= *next);
        *next = mark;
    }

    fn alloc_global(&mut self, len: u32) -> CompileResult<u32> {
        let index = self.global_next;
        self.global_next = self
            .global_next
            .checked_add(len)
            .filter(|&n| n <= i32::MAX as u32 / 4)
            .ok_or_else(|| CompileError::semantic("global variables exceed data capacity"))?;
        Ok(index)
    }

    pub fn global_len(&self) -> u32 {
        self.global_next
    }

    /// Declare a runtime variable in the innermost scope and allocate its
    /// storage. Redefinition is an error only within the same scope; outer
    /// shadowing is legal. An array parameter decays: it gets one pointer
    /// slot instead of the full array.
    pub fn add_var(
        &mut self,
        name: &str,
        size: ArraySize,
        is_parameter: bool,
    ) -> CompileResult<&VarEntry> {
        let is_global = self.at_global_scope();
        let is_pointer = is_parameter && size.is_array();
        let slots = if is_pointer { 1 } else { size.len() };
        let index = if is_global { self.alloc_global(slots)? } else { self.alloc_local(slots)? };
        let entry = VarEntry { size, storage: Storage::Slot { index, is_global, is_pointer } };
        self.insert(name, entry)
    }

    /// Declare a `const` variable holding a fully folded content buffer.
    pub fn add_const_var(
        &mut self,
        name: &str,
        size: ArraySize,
        pairs: &[(u32, i32)],
    ) -> CompileResult<&VarEntry> {
        if size.len() > MAX_CONST_ARRAY_LEN {
            return Err(CompileError::semantic("array size too large for constant evaluation"));
        }
        let mut content = vec![0; size.len() as usize];
        for &(offset, value) in pairs {
            assert!(offset < size.len(), "flattener produced an out-of-range offset");
            content[offset as usize] = value;
        }
        let entry = VarEntry { size, storage: Storage::Const(content) };
        self.insert(name, entry)
    }

    fn insert(&mut self, name: &str, entry: VarEntry) -> CompileResult<&VarEntry> {
        let scope = self.stack.last_mut().expect("the global scope always exists");
        if scope.contains_key(name) {
            return Err(CompileError::Semantic(format!(
                "variable \"{}\" is already defined in this scope",
                name
            )));
        }
        Ok(scope.entry(name.to_string()).or_insert(entry))
    }

    /// Innermost-to-outermost name lookup.
    pub fn find_var(&self, name: &str) -> CompileResult<&VarEntry> {
        self.stack
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .ok_or_else(|| CompileError::Semantic(format!("variable \"{}\" is undefined", name)))
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}
