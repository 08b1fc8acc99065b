use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::sleep;

use crate::renderer::RendererManager;
use crate::surface::SharedSurface;

/// Coalescing window for the output direction. Bursty agent output arrives
/// as many small chunks; one write per window keeps render cost bounded
/// while staying under a frame of perceived latency.
pub const COALESCE_WINDOW: Duration = Duration::from_millis(4);

/// Retry interval while waiting for the renderer manager to report a working
/// renderer. Polled on a timer, not busy-looped.
pub const RENDERER_WAIT_INTERVAL: Duration = Duration::from_millis(25);

/// Pending-byte bound. A burst that accumulates this much before the window
/// elapses is flushed immediately instead of waiting out the timer, keeping
/// the buffer bounded while the renderer is still coming up.
pub const COALESCE_MAX_BYTES: usize = 64 * 1024;

#[derive(Default)]
struct CoalescerBuffer {
    pending: Vec<u8>,
    flush_scheduled: bool,
}

/// Batches live output chunks and flushes them to the emulation surface as a
/// single write per coalescing window or at [`COALESCE_MAX_BYTES`],
/// whichever comes first, preserving arrival order.
///
/// Flushes defer while the renderer is not ready; a disposed renderer drops
/// the pending buffer instead of waiting forever. Only the output direction
/// is coalesced; keystrokes never pass through here.
#[derive(Clone)]
pub struct WriteCoalescer {
    surface: SharedSurface,
    renderer: RendererManager,
    buffer: Arc<Mutex<CoalescerBuffer>>,
}

impl WriteCoalescer {
    pub fn new(surface: SharedSurface, renderer: RendererManager) -> Self {
        Self {
            surface,
            renderer,
            buffer: Arc::new(Mutex::new(CoalescerBuffer::default())),
        }
    }

    /// Append a chunk and schedule a flush if none is pending. A buffer that
    /// reaches the byte bound flushes right away; the emulation surface keeps
    /// the state even when the renderer is not drawing yet. Must be called
    /// from within a tokio runtime.
    pub fn enqueue(&self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }
        let (schedule, over_limit) = {
            let mut buffer = self.lock();
            buffer.pending.extend_from_slice(chunk);
            let over_limit = buffer.pending.len() >= COALESCE_MAX_BYTES;
            let schedule = if buffer.flush_scheduled {
                false
            } else {
                buffer.flush_scheduled = true;
                true
            };
            (schedule, over_limit)
        };
        if over_limit {
            self.flush();
            return;
        }
        if schedule {
            let coalescer = self.clone();
            tokio::spawn(async move { coalescer.flush_after_window().await });
        }
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    async fn flush_after_window(self) {
        sleep(COALESCE_WINDOW).await;
        while !self.renderer.is_ready() {
            if self.renderer.is_disposed() {
                let mut buffer = self.lock();
                buffer.pending.clear();
                buffer.flush_scheduled = false;
                return;
            }
            sleep(RENDERER_WAIT_INTERVAL).await;
        }
        self.flush();
    }

    /// Concatenate, clear, and write once. Re-pins to the bottom only when
    /// the viewport was already there before the write.
    pub fn flush(&self) {
        let bytes = {
            let mut buffer = self.lock();
            buffer.flush_scheduled = false;
            std::mem::take(&mut buffer.pending)
        };
        if bytes.is_empty() {
            return;
        }

        let mut surface = self
            .surface
            .lock()
            .expect("emulation surface lock poisoned");
        let pinned = surface.is_at_bottom();
        surface.process(&bytes);
        if pinned {
            surface.scroll_to_bottom();
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoalescerBuffer> {
        self.buffer.lock().expect("write coalescer lock poisoned")
    }
}
