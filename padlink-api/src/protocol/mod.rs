//! Line-oriented control protocol: `EV:<ABBR>:<VALUE>\n`.

pub mod codec;
pub mod error;
pub mod frame;
pub mod radio;

pub use codec::{Codec, Command, ThrottlePolicy, WireFrame};
pub use error::CodecError;
pub use frame::{FrameReassembler, split_datagram};

/// Frame terminator.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Pseudo-command the robot synthesizes when the link goes silent.
pub const READ_TIMEOUT: &str = "ReadTimeout";
