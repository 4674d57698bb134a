pub mod primitives;
mod swift_code;

pub use swift_code::*;
