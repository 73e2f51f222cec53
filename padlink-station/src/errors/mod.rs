pub mod binding;
pub mod input;
pub mod radio;
pub mod transport;

pub use binding::BindingError;
pub use input::InputError;
pub use radio::RadioError;
pub use transport::{ErrorClass, TransportError};
