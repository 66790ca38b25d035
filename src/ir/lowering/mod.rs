pub mod lowering;

pub use lowering::Lowerer;
