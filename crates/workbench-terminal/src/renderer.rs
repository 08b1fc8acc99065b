use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::sleep;

use crate::error::{ViewError, ViewResult};
use crate::resize::HostBounds;

pub const CONTEXT_RECOVERY_DELAY: Duration = Duration::from_millis(250);
pub const MAX_CONTEXT_RECOVERY_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    Hardware,
    Software,
}

/// Which renderer currently drives the emulation surface. Owned exclusively
/// by the [`RendererManager`]; this tag is the single source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Software,
    Hardware,
    HardwareLost,
}

/// A rendering backend bound to one emulation surface.
pub trait Renderer: Send {
    fn kind(&self) -> RendererKind;
    /// Bind to the surface. Requires valid cell measurements, which is why
    /// initialization waits for the host to have a non-zero box.
    fn attach(&mut self) -> ViewResult<()>;
    fn detach(&mut self);
}

/// Capability probe and construction seam for rendering backends.
pub trait RendererFactory: Send + Sync {
    /// Feature detection only; must not allocate GPU resources. Low-capability
    /// environments report `false` so initialization goes straight to
    /// software.
    fn hardware_available(&self) -> bool;
    fn create(&self, kind: RendererKind) -> ViewResult<Box<dyn Renderer>>;
}

struct RendererManagerInner {
    state: RendererState,
    renderer: Option<Box<dyn Renderer>>,
    hardware_banned: bool,
    disposed: bool,
}

/// Owns the hardware-vs-software choice for one surface instance.
///
/// `Uninitialized -> {Software, Hardware}` on first probe,
/// `Hardware -> HardwareLost` on a context-loss signal, and from there back
/// to `Hardware` within a bounded number of recovery attempts or permanently
/// to `Software`. Writers gate on [`RendererManager::is_ready`].
#[derive(Clone)]
pub struct RendererManager {
    factory: Arc<dyn RendererFactory>,
    inner: Arc<Mutex<RendererManagerInner>>,
}

impl RendererManager {
    pub fn new(factory: Arc<dyn RendererFactory>) -> Self {
        Self {
            factory,
            inner: Arc::new(Mutex::new(RendererManagerInner {
                state: RendererState::Uninitialized,
                renderer: None,
                hardware_banned: false,
                disposed: false,
            })),
        }
    }

    pub fn state(&self) -> RendererState {
        self.lock().state
    }

    /// True once the surface has a working renderer and no swap is in flight.
    pub fn is_ready(&self) -> bool {
        let inner = self.lock();
        !inner.disposed
            && matches!(
                inner.state,
                RendererState::Software | RendererState::Hardware
            )
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Size signal from the hosting element. The first non-zero box triggers
    /// initialization; zero-area and disconnected boxes are ignored because
    /// the backend cannot take cell measurements from them.
    pub fn host_resized(&self, bounds: HostBounds) {
        if !bounds.is_renderable() {
            return;
        }
        if let Err(error) = self.initialize() {
            tracing::warn!(error = %error, "renderer initialization failed");
        }
    }

    /// Probe and install the initial renderer. A failed hardware attempt
    /// degrades to software; only a failed software attempt is an error, in
    /// which case the state stays `Uninitialized` for a later signal to retry.
    pub fn initialize(&self) -> ViewResult<()> {
        let mut inner = self.lock();
        if inner.disposed {
            return Err(ViewError::Renderer(
                "renderer manager already disposed".to_owned(),
            ));
        }
        if inner.state != RendererState::Uninitialized {
            return Ok(());
        }

        if !inner.hardware_banned && self.factory.hardware_available() {
            match self.create_attached(RendererKind::Hardware) {
                Ok(renderer) => {
                    inner.renderer = Some(renderer);
                    inner.state = RendererState::Hardware;
                    return Ok(());
                }
                Err(error) => {
                    tracing::warn!(error = %error, "hardware renderer unavailable, using software");
                }
            }
        }

        let renderer = self.create_attached(RendererKind::Software)?;
        inner.renderer = Some(renderer);
        inner.state = RendererState::Software;
        Ok(())
    }

    /// Context-loss signal from the hardware backend. Recovery re-probes on a
    /// fixed delay; exhausting the budget falls back to software for the rest
    /// of this surface's lifetime.
    pub async fn context_lost(&self) {
        {
            let mut inner = self.lock();
            if inner.disposed || inner.state != RendererState::Hardware {
                return;
            }
            inner.state = RendererState::HardwareLost;
            if let Some(mut renderer) = inner.renderer.take() {
                renderer.detach();
            }
        }

        for attempt in 1..=MAX_CONTEXT_RECOVERY_ATTEMPTS {
            sleep(CONTEXT_RECOVERY_DELAY).await;
            if self.lock().disposed {
                return;
            }
            if !self.factory.hardware_available() {
                tracing::debug!(attempt, "hardware still unavailable after context loss");
                continue;
            }
            match self.create_attached(RendererKind::Hardware) {
                Ok(renderer) => {
                    let mut inner = self.lock();
                    if inner.disposed {
                        return;
                    }
                    inner.renderer = Some(renderer);
                    inner.state = RendererState::Hardware;
                    tracing::debug!(attempt, "hardware renderer recovered");
                    return;
                }
                Err(error) => {
                    tracing::debug!(attempt, error = %error, "hardware recovery attempt failed");
                }
            }
        }

        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        inner.hardware_banned = true;
        match self.create_attached(RendererKind::Software) {
            Ok(renderer) => {
                inner.renderer = Some(renderer);
                inner.state = RendererState::Software;
                tracing::warn!("hardware recovery exhausted, staying on software renderer");
            }
            Err(error) => {
                tracing::warn!(error = %error, "software fallback failed after context loss");
            }
        }
    }

    /// Synchronously release the renderer. Idempotent; the manager never
    /// becomes ready again afterwards.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        if let Some(mut renderer) = inner.renderer.take() {
            renderer.detach();
        }
    }

    fn create_attached(&self, kind: RendererKind) -> ViewResult<Box<dyn Renderer>> {
        let mut renderer = self.factory.create(kind)?;
        renderer.attach()?;
        Ok(renderer)
    }

    fn lock(&self) -> MutexGuard<'_, RendererManagerInner> {
        self.inner
            .lock()
            .expect("renderer manager lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct ScriptedFactory {
        hardware_available: AtomicBool,
        fail_hardware_creates: AtomicUsize,
        hardware_creates: AtomicUsize,
        software_creates: AtomicUsize,
        detached: Arc<AtomicUsize>,
    }

    impl ScriptedFactory {
        fn with_hardware() -> Self {
            let factory = Self::default();
            factory.hardware_available.store(true, Ordering::SeqCst);
            factory
        }
    }

    struct TestRenderer {
        kind: RendererKind,
        detached: Arc<AtomicUsize>,
    }

    impl Renderer for TestRenderer {
        fn kind(&self) -> RendererKind {
            self.kind
        }

        fn attach(&mut self) -> ViewResult<()> {
            Ok(())
        }

        fn detach(&mut self) {
            self.detached.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl RendererFactory for ScriptedFactory {
        fn hardware_available(&self) -> bool {
            self.hardware_available.load(Ordering::SeqCst)
        }

        fn create(&self, kind: RendererKind) -> ViewResult<Box<dyn Renderer>> {
            match kind {
                RendererKind::Hardware => {
                    self.hardware_creates.fetch_add(1, Ordering::SeqCst);
                    let remaining = self.fail_hardware_creates.load(Ordering::SeqCst);
                    if remaining > 0 {
                        self.fail_hardware_creates
                            .store(remaining - 1, Ordering::SeqCst);
                        return Err(ViewError::Renderer("context unavailable".to_owned()));
                    }
                }
                RendererKind::Software => {
                    self.software_creates.fetch_add(1, Ordering::SeqCst);
                }
            }
            Ok(Box::new(TestRenderer {
                kind,
                detached: Arc::clone(&self.detached),
            }))
        }
    }

    fn manager(factory: ScriptedFactory) -> (RendererManager, Arc<ScriptedFactory>) {
        let factory = Arc::new(factory);
        (RendererManager::new(Arc::clone(&factory) as _), factory)
    }

    #[test]
    fn probe_negative_goes_straight_to_software() {
        let (manager, factory) = manager(ScriptedFactory::default());
        manager.initialize().expect("initialize");

        assert_eq!(manager.state(), RendererState::Software);
        assert_eq!(factory.hardware_creates.load(Ordering::SeqCst), 0);
        assert!(manager.is_ready());
    }

    #[test]
    fn probe_positive_installs_hardware() {
        let (manager, _factory) = manager(ScriptedFactory::with_hardware());
        manager.initialize().expect("initialize");

        assert_eq!(manager.state(), RendererState::Hardware);
        assert!(manager.is_ready());
    }

    #[test]
    fn failed_hardware_create_degrades_to_software() {
        let factory = ScriptedFactory::with_hardware();
        factory.fail_hardware_creates.store(1, Ordering::SeqCst);
        let (manager, factory) = manager(factory);

        manager.initialize().expect("initialize");

        assert_eq!(manager.state(), RendererState::Software);
        assert_eq!(factory.software_creates.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn initialization_waits_for_non_zero_host_box() {
        let (manager, _factory) = manager(ScriptedFactory::default());

        manager.host_resized(HostBounds::detached());
        assert_eq!(manager.state(), RendererState::Uninitialized);

        manager.host_resized(HostBounds::connected(0.0, 300.0));
        assert_eq!(manager.state(), RendererState::Uninitialized);

        manager.host_resized(HostBounds::connected(640.0, 300.0));
        assert_eq!(manager.state(), RendererState::Software);
    }

    #[test]
    fn second_initialize_is_a_no_op() {
        let (manager, factory) = manager(ScriptedFactory::default());
        manager.initialize().expect("initialize");
        manager.initialize().expect("reinitialize");

        assert_eq!(factory.software_creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn context_loss_recovers_within_budget() {
        let (manager, factory) = manager(ScriptedFactory::with_hardware());
        manager.initialize().expect("initialize");
        // First recovery attempt fails, second succeeds.
        factory.fail_hardware_creates.store(1, Ordering::SeqCst);

        let recovery = tokio::spawn({
            let manager = manager.clone();
            async move { manager.context_lost().await }
        });
        tokio::task::yield_now().await;
        assert_eq!(manager.state(), RendererState::HardwareLost);
        assert!(!manager.is_ready());

        recovery.await.expect("recovery task");
        assert_eq!(manager.state(), RendererState::Hardware);
        assert_eq!(factory.hardware_creates.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_recovery_falls_back_to_software_permanently() {
        let (manager, factory) = manager(ScriptedFactory::with_hardware());
        manager.initialize().expect("initialize");
        factory
            .fail_hardware_creates
            .store(MAX_CONTEXT_RECOVERY_ATTEMPTS as usize, Ordering::SeqCst);

        manager.context_lost().await;
        assert_eq!(manager.state(), RendererState::Software);

        // A stray second loss signal must not flap back to hardware.
        manager.context_lost().await;
        assert_eq!(manager.state(), RendererState::Software);
        assert_eq!(
            factory.hardware_creates.load(Ordering::SeqCst),
            1 + MAX_CONTEXT_RECOVERY_ATTEMPTS as usize
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_in_flight_recovery() {
        let (manager, factory) = manager(ScriptedFactory::with_hardware());
        manager.initialize().expect("initialize");
        factory.fail_hardware_creates.store(usize::MAX, Ordering::SeqCst);

        let recovery = tokio::spawn({
            let manager = manager.clone();
            async move { manager.context_lost().await }
        });
        tokio::task::yield_now().await;
        manager.dispose();
        recovery.await.expect("recovery task");

        assert!(!manager.is_ready());
        assert!(manager.is_disposed());
    }

    #[test]
    fn dispose_is_idempotent_and_releases_renderer() {
        let (manager, factory) = manager(ScriptedFactory::default());
        manager.initialize().expect("initialize");

        manager.dispose();
        manager.dispose();

        assert_eq!(factory.detached.load(Ordering::SeqCst), 1);
        assert!(!manager.is_ready());
    }
}
