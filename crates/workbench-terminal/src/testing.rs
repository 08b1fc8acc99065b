//! Scripted in-process doubles shared by the component tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::sleep;
use workbench_terminal_protocol::{
    ChannelError, ChannelResult, OutputStream, OutputSubscription, TermSize, TerminalChannel,
    TerminalId, TerminalStreamSource,
};

use crate::error::{ViewError, ViewResult};
use crate::renderer::{Renderer, RendererFactory, RendererKind};
use crate::surface::EmulationSurface;

#[derive(Debug, Default)]
pub(crate) struct RecordingState {
    pub writes: Vec<Vec<u8>>,
    pub size: Option<TermSize>,
    pub offset: usize,
    pub max_offset: usize,
}

/// Surface double that records writes verbatim and models the scroll offset
/// as a plain clamped counter.
pub(crate) struct RecordingSurface {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingSurface {
    pub(crate) fn new() -> (Self, Arc<Mutex<RecordingState>>) {
        let state = Arc::new(Mutex::new(RecordingState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl EmulationSurface for RecordingSurface {
    fn process(&mut self, bytes: &[u8]) {
        self.state
            .lock()
            .expect("recording surface lock poisoned")
            .writes
            .push(bytes.to_vec());
    }

    fn set_size(&mut self, size: TermSize) {
        self.state
            .lock()
            .expect("recording surface lock poisoned")
            .size = Some(size);
    }

    fn size(&self) -> TermSize {
        self.state
            .lock()
            .expect("recording surface lock poisoned")
            .size
            .unwrap_or_default()
    }

    fn scroll_offset(&self) -> usize {
        self.state
            .lock()
            .expect("recording surface lock poisoned")
            .offset
    }

    fn set_scroll_offset(&mut self, offset: usize) {
        let mut state = self.state.lock().expect("recording surface lock poisoned");
        state.offset = offset.min(state.max_offset);
    }

    fn contents(&self) -> String {
        let state = self.state.lock().expect("recording surface lock poisoned");
        let mut bytes = Vec::new();
        for write in &state.writes {
            bytes.extend_from_slice(write);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Channel double with scripted snapshot results and call accounting.
pub(crate) struct FakeChannel {
    pub read_buffer_calls: AtomicUsize,
    pub read_buffer_delay: Duration,
    pub snapshot: Mutex<ChannelResult<String>>,
    pub resizes: Mutex<Vec<TermSize>>,
    pub writes: Mutex<Vec<Vec<u8>>>,
    pub start_calls: AtomicUsize,
    pub start_result: Mutex<ChannelResult<()>>,
    pub fail_resizes: AtomicUsize,
}

impl FakeChannel {
    pub(crate) fn new(snapshot: ChannelResult<String>) -> Self {
        Self {
            read_buffer_calls: AtomicUsize::new(0),
            read_buffer_delay: Duration::ZERO,
            snapshot: Mutex::new(snapshot),
            resizes: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            start_calls: AtomicUsize::new(0),
            start_result: Mutex::new(Ok(())),
            fail_resizes: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_fetch_delay(snapshot: ChannelResult<String>, delay: Duration) -> Self {
        let mut channel = Self::new(snapshot);
        channel.read_buffer_delay = delay;
        channel
    }

    pub(crate) fn recorded_resizes(&self) -> Vec<TermSize> {
        self.resizes.lock().expect("resize log lock poisoned").clone()
    }

    pub(crate) fn recorded_writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().expect("write log lock poisoned").clone()
    }
}

#[async_trait]
impl TerminalChannel for FakeChannel {
    async fn create(&self, _id: &TerminalId, _working_directory: &Path) -> ChannelResult<()> {
        Ok(())
    }

    async fn write(&self, _id: &TerminalId, data: &[u8]) -> ChannelResult<()> {
        self.writes
            .lock()
            .expect("write log lock poisoned")
            .push(data.to_vec());
        Ok(())
    }

    async fn resize(&self, _id: &TerminalId, size: TermSize) -> ChannelResult<()> {
        let remaining = self.fail_resizes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_resizes.store(remaining - 1, Ordering::SeqCst);
            return Err(ChannelError::Process("resize rejected".to_owned()));
        }
        self.resizes
            .lock()
            .expect("resize log lock poisoned")
            .push(size);
        Ok(())
    }

    async fn read_buffer(&self, _id: &TerminalId) -> ChannelResult<String> {
        self.read_buffer_calls.fetch_add(1, Ordering::SeqCst);
        if self.read_buffer_delay > Duration::ZERO {
            sleep(self.read_buffer_delay).await;
        }
        self.snapshot
            .lock()
            .expect("snapshot script lock poisoned")
            .clone()
    }

    async fn start_agent(&self, _id: &TerminalId, _size: Option<TermSize>) -> ChannelResult<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        self.start_result
            .lock()
            .expect("start script lock poisoned")
            .clone()
    }
}

pub(crate) struct ChannelStream {
    receiver: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl OutputSubscription for ChannelStream {
    async fn next_chunk(&mut self) -> ChannelResult<Option<Vec<u8>>> {
        Ok(self.receiver.recv().await)
    }
}

/// Stream source double; the test keeps the sender and pushes chunks.
pub(crate) struct FakeStreamSource {
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl FakeStreamSource {
    pub(crate) fn new() -> (Self, mpsc::UnboundedSender<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                receiver: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl TerminalStreamSource for FakeStreamSource {
    async fn subscribe(&self, id: &TerminalId) -> ChannelResult<OutputStream> {
        let receiver = self
            .receiver
            .lock()
            .expect("stream source lock poisoned")
            .take()
            .ok_or_else(|| ChannelError::SessionNotFound(id.as_str().to_owned()))?;
        Ok(Box::new(ChannelStream { receiver }))
    }
}

/// Renderer factory double that never claims hardware support.
#[derive(Default)]
pub(crate) struct SoftwareOnlyFactory;

struct InertRenderer;

impl Renderer for InertRenderer {
    fn kind(&self) -> RendererKind {
        RendererKind::Software
    }

    fn attach(&mut self) -> ViewResult<()> {
        Ok(())
    }

    fn detach(&mut self) {}
}

impl RendererFactory for SoftwareOnlyFactory {
    fn hardware_available(&self) -> bool {
        false
    }

    fn create(&self, kind: RendererKind) -> ViewResult<Box<dyn Renderer>> {
        match kind {
            RendererKind::Software => Ok(Box::new(InertRenderer)),
            RendererKind::Hardware => Err(ViewError::Renderer(
                "hardware renderer unavailable".to_owned(),
            )),
        }
    }
}
