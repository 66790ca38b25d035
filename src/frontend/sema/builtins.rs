//! The eight runtime library functions, pre-registered at fixed indices 0..7
//! before any user function is numbered. Call sites recognize an index below
//! `FIRST_USER_FUNC` as a builtin without a table lookup.

use super::symbols::ParamShape;

/// One library function signature. `symbol` is the name emitted at call
/// sites in assembly (the timing hooks use the `_sysy_` runtime names).
pub struct Builtin {
    pub index: u32,
    pub name: &'static str,
    pub symbol: &'static str,
    pub is_int: bool,
    pub params: fn() -> Vec<ParamShape>,
}

pub const BUILTINS: &[Builtin] = &[
    Builtin {
        index: 0,
        name: "getint",
        symbol: "getint",
        is_int: true,
        params: Vec::new,
    },
    Builtin {
        index: 1,
        name: "getch",
        symbol: "getch",
        is_int: true,
        params: Vec::new,
    },
    Builtin {
        index: 2,
        name: "getarray",
        symbol: "getarray",
        is_int: true,
        params: || vec![ParamShape::array(Vec::new())],
    },
    Builtin {
        index: 3,
        name: "putint",
        symbol: "putint",
        is_int: false,
        params: || vec![ParamShape::scalar()],
    },
    Builtin {
        index: 4,
        name: "putch",
        symbol: "putch",
        is_int: false,
        params: || vec![ParamShape::scalar()],
    },
    Builtin {
        index: 5,
        name: "putarray",
        symbol: "putarray",
        is_int: false,
        params: || vec![ParamShape::scalar(), ParamShape::array(Vec::new())],
    },
    Builtin {
        index: 6,
        name: "starttime",
        symbol: "_sysy_starttime",
        is_int: false,
        params: Vec::new,
    },
    Builtin {
        index: 7,
        name: "stoptime",
        symbol: "_sysy_stoptime",
        is_int: false,
        params: Vec::new,
    },
];

/// Assembly symbol for a builtin call target.
pub fn symbol(index: u32) -> &'static str {
    BUILTINS[index as usize].symbol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_match_positions() {
        for (position, builtin) in BUILTINS.iter().enumerate() {
            assert_eq!(builtin.index as usize, position);
        }
        assert_eq!(BUILTINS.len(), 8);
    }

    #[test]
    fn test_timing_hooks_use_runtime_symbols() {
        assert_eq!(symbol(6), "_sysy_starttime");
        assert_eq!(symbol(7), "_sysy_stoptime");
        assert_eq!(symbol(3), "putint");
    }
}
