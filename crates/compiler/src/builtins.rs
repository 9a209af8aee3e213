//! The fixed set of runtime-provided functions (spec §4.2, §4.3).
//!
//! These are injected into every program's function table before name
//! resolution runs, so calls to them resolve like any user call but never
//! get an LLVM definition emitted — only a `declare`.

use crate::ast::FunDef;
use crate::types::Type;

/// Every function a program may call without declaring it itself.
pub fn builtin_functions() -> Vec<FunDef> {
    vec![
        FunDef::Builtin {
            name: "printInt".to_string(),
            params: vec![Type::Int],
            ret: Type::Void,
        },
        FunDef::Builtin {
            name: "printString".to_string(),
            params: vec![Type::String],
            ret: Type::Void,
        },
        FunDef::Builtin {
            name: "readInt".to_string(),
            params: vec![],
            ret: Type::Int,
        },
        FunDef::Builtin {
            name: "readString".to_string(),
            params: vec![],
            ret: Type::String,
        },
        FunDef::Builtin {
            name: "error".to_string(),
            params: vec![],
            ret: Type::Void,
        },
        // Synthetic: never callable from source, only inserted by the
        // translator for string `+` and string comparisons.
        FunDef::Builtin {
            name: "$addStrings".to_string(),
            params: vec![Type::String, Type::String],
            ret: Type::String,
        },
        FunDef::Builtin {
            name: "$compareStrings".to_string(),
            params: vec![Type::Int, Type::String, Type::String],
            ret: Type::Bool,
        },
    ]
}

/// True for the two synthetic helpers a program can never call directly.
pub fn is_synthetic(name: &str) -> bool {
    name == "$addStrings" || name == "$compareStrings"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn print_int_takes_an_int_and_returns_void() {
        let builtins = builtin_functions();
        let print_int = builtins.iter().find(|f| f.name() == "printInt").unwrap();
        assert_eq!(print_int.param_types(), vec![Type::Int]);
        assert_eq!(*print_int.ret(), Type::Void);
    }

    #[test]
    fn synthetic_helpers_are_flagged() {
        assert!(is_synthetic("$addStrings"));
        assert!(!is_synthetic("printInt"));
    }
}
