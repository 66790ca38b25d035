pub mod interp;
pub mod ir;
pub mod lowering;
pub mod printer;
