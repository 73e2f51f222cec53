pub mod models;
pub mod protocol;
pub mod registry;
pub mod signal;

pub use models::{
    ConnectionState, Control, ControlEvent, ControlKind, ControlValue, Endpoint, EndpointAddress,
    EndpointError, EndpointId, EndpointRecord, TransportKind,
};
pub use protocol::{Codec, CodecError, Command, FrameReassembler, ThrottlePolicy, WireFrame};
pub use registry::{EndpointFilter, EndpointRegistry, HttpRegistry, RegistryError, StaticRegistry};
