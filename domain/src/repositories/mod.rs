mod cache;
mod swift_code;

pub use cache::*;
pub use swift_code::*;
