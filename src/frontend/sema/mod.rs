pub mod builtins;
pub mod const_eval;
pub mod init;
pub mod symbols;
