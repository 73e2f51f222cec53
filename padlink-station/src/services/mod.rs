pub mod binding;
pub mod link_session;
pub mod orchestrator;

pub use binding::BindingTable;
pub use link_session::{LinkSession, SessionOutcome, SessionReport};
pub use orchestrator::{Orchestrator, StationIdentity};
