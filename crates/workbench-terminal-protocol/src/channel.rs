use std::path::Path;

use async_trait::async_trait;

use crate::error::ChannelResult;
use crate::geometry::TermSize;
use crate::ids::TerminalId;

/// Command interface to the backend process manager.
///
/// Every command is asynchronous request/response; callers in the streaming
/// core treat `write`/`resize` as fire-and-forget but still await and log
/// failures. The backend-side PTY outlives any widget attachment.
#[async_trait]
pub trait TerminalChannel: Send + Sync {
    /// Establish a PTY-backed session for `id` rooted at `working_directory`.
    async fn create(&self, id: &TerminalId, working_directory: &Path) -> ChannelResult<()>;

    /// Forward keystrokes or control sequences. The input direction is never
    /// coalesced; bytes are delivered in call order.
    async fn write(&self, id: &TerminalId, data: &[u8]) -> ChannelResult<()>;

    /// Notify the PTY of new terminal geometry.
    async fn resize(&self, id: &TerminalId, size: TermSize) -> ChannelResult<()>;

    /// Fetch the accumulated scrollback snapshot for `id`. Represents history
    /// prior to the caller's output subscription; may fail.
    async fn read_buffer(&self, id: &TerminalId) -> ChannelResult<String>;

    /// Launch the agent program inside an already-created PTY.
    async fn start_agent(&self, id: &TerminalId, size: Option<TermSize>) -> ChannelResult<()>;
}

/// One push-event stream of raw output chunks for a single terminal id.
/// Delivery order is the ordering guarantee the streaming core relies on.
#[async_trait]
pub trait OutputSubscription: Send {
    /// Next output chunk, `None` once the stream has closed. A bounded
    /// subscriber that fell behind reports the gap as a `Process` error.
    async fn next_chunk(&mut self) -> ChannelResult<Option<Vec<u8>>>;
}

pub type OutputStream = Box<dyn OutputSubscription>;

#[async_trait]
pub trait TerminalStreamSource: Send + Sync {
    async fn subscribe(&self, id: &TerminalId) -> ChannelResult<OutputStream>;
}
