pub mod coordinator;
pub mod session;
pub mod signaling;

pub use session::{LiveSnapshot, LiveState, StreamKind};
