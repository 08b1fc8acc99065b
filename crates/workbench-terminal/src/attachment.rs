use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use workbench_terminal_protocol::{
    AgentStartFailure, FontEvent, FontSpec, TermSize, TerminalChannel, TerminalSessionProfile,
    TerminalStreamSource,
};

use crate::coalescer::{WriteCoalescer, RENDERER_WAIT_INTERVAL};
use crate::error::ViewResult;
use crate::hydration::{HydrationController, HydrationState};
use crate::renderer::{RendererFactory, RendererManager, RendererState};
use crate::resize::{DragState, HostBounds, ResizeCoordinator};
use crate::start_guard::{SessionStartGuard, StartOutcome};
use crate::surface::SharedSurface;

/// One widget's attachment to a backend-owned terminal session.
///
/// Mounting subscribes to the output stream and begins hydration once the
/// renderer is usable; unmounting tears the subscription and renderer down
/// but leaves the backend PTY alive, so the session survives remounts.
pub struct TerminalAttachment {
    profile: TerminalSessionProfile,
    channel: Arc<dyn TerminalChannel>,
    renderer: RendererManager,
    coalescer: WriteCoalescer,
    hydration: HydrationController,
    resize: ResizeCoordinator,
    pump_task: Option<JoinHandle<()>>,
    hydrate_task: Option<JoinHandle<()>>,
}

impl TerminalAttachment {
    #[allow(clippy::too_many_arguments)]
    pub async fn mount(
        profile: TerminalSessionProfile,
        channel: Arc<dyn TerminalChannel>,
        streams: &dyn TerminalStreamSource,
        surface: SharedSurface,
        factory: Arc<dyn RendererFactory>,
        drag: DragState,
        font: FontSpec,
        initial_size: Option<TermSize>,
    ) -> ViewResult<Self> {
        let renderer = RendererManager::new(factory);
        let coalescer = WriteCoalescer::new(Arc::clone(&surface), renderer.clone());
        let hydration = HydrationController::new(
            profile.id.clone(),
            Arc::clone(&channel),
            Arc::clone(&surface),
            coalescer.clone(),
        );
        let resize = ResizeCoordinator::new(
            profile.id.clone(),
            Arc::clone(&channel),
            surface,
            profile.program,
            drag,
            font,
            initial_size,
        );

        let mut stream = streams.subscribe(&profile.id).await?;
        let pump_task = {
            let hydration = hydration.clone();
            let id = profile.id.clone();
            tokio::spawn(async move {
                loop {
                    match stream.next_chunk().await {
                        Ok(Some(chunk)) => hydration.on_output(chunk),
                        Ok(None) => break,
                        Err(error) => {
                            tracing::warn!(terminal = %id, error = %error, "output subscription gap");
                        }
                    }
                }
            })
        };

        // Hydration waits for a working renderer; writing into a surface
        // without one would render nothing.
        let hydrate_task = {
            let hydration = hydration.clone();
            let renderer = renderer.clone();
            tokio::spawn(async move {
                while !renderer.is_ready() {
                    if renderer.is_disposed() {
                        return;
                    }
                    sleep(RENDERER_WAIT_INTERVAL).await;
                }
                hydration.hydrate().await;
            })
        };

        Ok(Self {
            profile,
            channel,
            renderer,
            coalescer,
            hydration,
            resize,
            pump_task: Some(pump_task),
            hydrate_task: Some(hydrate_task),
        })
    }

    pub fn profile(&self) -> &TerminalSessionProfile {
        &self.profile
    }

    pub fn hydration_state(&self) -> HydrationState {
        self.hydration.state()
    }

    pub fn renderer_state(&self) -> RendererState {
        self.renderer.state()
    }

    pub fn hydration(&self) -> &HydrationController {
        &self.hydration
    }

    pub fn coalescer(&self) -> &WriteCoalescer {
        &self.coalescer
    }

    pub fn resize(&self) -> &ResizeCoordinator {
        &self.resize
    }

    /// Size signal from the hosting element, fanned out to renderer
    /// initialization and fit computation.
    pub fn host_resized(&self, bounds: HostBounds) {
        self.renderer.host_resized(bounds);
        self.resize.observe(bounds);
    }

    /// Process-wide font signal.
    pub fn apply_font(&self, event: &FontEvent) {
        self.resize.apply_font(event);
    }

    /// Context-loss signal from the hardware rendering backend.
    pub async fn context_lost(&self) {
        self.renderer.context_lost().await;
    }

    /// Forward keystrokes to the backend. The input direction bypasses the
    /// coalescer: bytes go out in the order typed, exactly once.
    pub async fn send_input(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if let Err(error) = self.channel.write(&self.profile.id, bytes).await {
            tracing::warn!(terminal = %self.profile.id, error = %error, "input write failed");
        }
    }

    /// Issue the agent-start sequence through the process-wide guard, using
    /// the last size the resize coordinator applied.
    pub async fn start_agent(
        &self,
        guard: &SessionStartGuard,
    ) -> Result<StartOutcome, AgentStartFailure> {
        let channel = Arc::clone(&self.channel);
        let id = self.profile.id.clone();
        let size = self.resize.last_applied();
        guard
            .try_start(&self.profile.id, move || async move {
                channel.start_agent(&id, size).await
            })
            .await
    }

    /// Tear down the widget side: stop pumping output, dispose the renderer.
    /// The backend PTY keeps running for a later reattachment.
    pub fn unmount(&mut self) {
        if let Some(task) = self.pump_task.take() {
            task.abort();
        }
        if let Some(task) = self.hydrate_task.take() {
            task.abort();
        }
        self.renderer.dispose();
    }
}

impl Drop for TerminalAttachment {
    fn drop(&mut self) {
        self.unmount();
    }
}
