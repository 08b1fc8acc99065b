//! Command/event boundary between the workspace shell's terminal widgets and
//! the backend process manager.
//!
//! This crate only establishes contracts: ids, command traits, output stream
//! traits, typed failure classes, and the serde-stable payload shapes that
//! cross the boundary. The streaming/rendering core that consumes them lives
//! in `workbench-terminal`; the backend PTY host is external.

pub mod channel;
pub mod error;
pub mod font;
pub mod geometry;
pub mod ids;
pub mod session;
pub mod start;

pub use channel::{OutputStream, OutputSubscription, TerminalChannel, TerminalStreamSource};
pub use error::{ChannelError, ChannelResult};
pub use font::{FontEvent, FontSpec};
pub use geometry::TermSize;
pub use ids::TerminalId;
pub use session::{CursorStyle, ProgramProfile, TerminalKind, TerminalSessionProfile};
pub use start::AgentStartFailure;
