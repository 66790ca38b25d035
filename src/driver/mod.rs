pub mod driver;

pub use driver::{Driver, DriverError, EmitMode};
