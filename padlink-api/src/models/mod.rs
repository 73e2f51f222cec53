pub mod control;
pub mod endpoint;
pub mod registry;

pub use control::*;
pub use endpoint::*;
pub use registry::*;
