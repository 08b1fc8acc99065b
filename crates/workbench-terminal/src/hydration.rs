use std::sync::{Arc, Mutex, MutexGuard};

use workbench_terminal_protocol::{TerminalChannel, TerminalId};

use crate::coalescer::WriteCoalescer;
use crate::surface::SharedSurface;

/// Where a freshly-attached terminal is in reconciling backend history with
/// live output. Transitions are strictly forward and happen once per attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationState {
    /// Output events are queued, not rendered.
    Buffering,
    /// The scrollback snapshot fetch is in flight; output still queues.
    Hydrating,
    /// Output flows through the write coalescer.
    Live,
}

struct HydrationInner {
    state: HydrationState,
    pending: Vec<Vec<u8>>,
}

/// Replays the backend-held scrollback snapshot and the output that arrived
/// during the fetch, in that order, then hands the output path over to the
/// coalescer.
#[derive(Clone)]
pub struct HydrationController {
    id: TerminalId,
    channel: Arc<dyn TerminalChannel>,
    surface: SharedSurface,
    coalescer: WriteCoalescer,
    inner: Arc<Mutex<HydrationInner>>,
}

impl HydrationController {
    pub fn new(
        id: TerminalId,
        channel: Arc<dyn TerminalChannel>,
        surface: SharedSurface,
        coalescer: WriteCoalescer,
    ) -> Self {
        Self {
            id,
            channel,
            surface,
            coalescer,
            inner: Arc::new(Mutex::new(HydrationInner {
                state: HydrationState::Buffering,
                pending: Vec::new(),
            })),
        }
    }

    pub fn state(&self) -> HydrationState {
        self.lock().state
    }

    pub fn pending_chunks(&self) -> usize {
        self.lock().pending.len()
    }

    /// Route one output chunk. Queued in arrival order until hydration
    /// completes, coalesced afterwards. Never drops a chunk.
    pub fn on_output(&self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        {
            let mut inner = self.lock();
            if inner.state != HydrationState::Live {
                inner.pending.push(chunk);
                return;
            }
        }
        self.coalescer.enqueue(&chunk);
    }

    /// Fetch the snapshot and flip to live exactly once. A failed fetch
    /// degrades to replaying only the queued output; the terminal never
    /// stays stuck in buffering.
    pub async fn hydrate(&self) {
        {
            let mut inner = self.lock();
            if inner.state != HydrationState::Buffering {
                return;
            }
            inner.state = HydrationState::Hydrating;
        }

        let snapshot = match self.channel.read_buffer(&self.id).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!(
                    terminal = %self.id,
                    error = %error,
                    "scrollback snapshot fetch failed, hydrating from queued output only"
                );
                String::new()
            }
        };

        // Snapshot first, then the fetch-window queue, written in one pass.
        // Holding the state lock keeps on_output from interleaving.
        let mut inner = self.lock();
        let mut bytes = snapshot.into_bytes();
        for chunk in std::mem::take(&mut inner.pending) {
            bytes.extend_from_slice(&chunk);
        }

        {
            let mut surface = self
                .surface
                .lock()
                .expect("emulation surface lock poisoned");
            let pinned = surface.is_at_bottom();
            if !bytes.is_empty() {
                surface.process(&bytes);
            }
            if pinned {
                surface.scroll_to_bottom();
            }
        }
        inner.state = HydrationState::Live;
    }

    fn lock(&self) -> MutexGuard<'_, HydrationInner> {
        self.inner.lock().expect("hydration state lock poisoned")
    }
}
