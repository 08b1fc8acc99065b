use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::{sleep, Instant};
use workbench_terminal_protocol::{
    FontEvent, FontSpec, ProgramProfile, TermSize, TerminalChannel, TerminalId,
};

use crate::surface::SharedSurface;

/// A resize signal arriving within this span of the previously applied
/// resize is debounced; the first signal after a longer quiet period is
/// applied immediately to avoid a visible one-frame overflow.
pub const RESIZE_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Debounce for full-screen interactive agent programs, which repaint on
/// every resize and want fast feedback.
pub const FULLSCREEN_RESIZE_DEBOUNCE: Duration = Duration::from_millis(30);

/// Debounce for line-oriented programs.
pub const DEFAULT_RESIZE_DEBOUNCE: Duration = Duration::from_millis(80);

/// Inner padding of the hosting element, in pixels per side.
pub const CELL_PADDING: f64 = 8.0;

/// Content box of the element hosting the terminal widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostBounds {
    pub width: f64,
    pub height: f64,
    pub connected: bool,
}

impl HostBounds {
    pub fn connected(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            connected: true,
        }
    }

    pub fn detached() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            connected: false,
        }
    }

    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Layout is ready: the element is in the tree and has a measurable box.
    pub fn is_renderable(&self) -> bool {
        self.connected && self.has_area()
    }
}

/// Cell box derived from the current font configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub cell_width: f64,
    pub cell_height: f64,
}

impl FontMetrics {
    /// Monospace advance approximated as 0.6em with a 1.25em line box.
    pub fn from_spec(spec: &FontSpec) -> Self {
        let size = f64::from(spec.terminal_font_size);
        Self {
            cell_width: (size * 0.6).max(1.0),
            cell_height: (size * 1.25).max(1.0),
        }
    }

    /// Map a pixel box to a column/row grid, never below 1x1.
    pub fn fit(&self, bounds: HostBounds) -> TermSize {
        let available_width = (bounds.width - CELL_PADDING * 2.0).max(1.0);
        let available_height = (bounds.height - CELL_PADDING * 2.0).max(1.0);
        let cols = (available_width / self.cell_width).floor().max(1.0) as u16;
        let rows = (available_height / self.cell_height).floor().max(1.0) as u16;
        TermSize { cols, rows }
    }
}

/// Process-wide "split-pane drag in progress" flag shared by every resize
/// coordinator. While set, resizing is suspended entirely.
#[derive(Clone, Default)]
pub struct DragState(Arc<AtomicBool>);

impl DragState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn end(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn active(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct ResizeInner {
    font: FontSpec,
    metrics: FontMetrics,
    last_bounds: Option<HostBounds>,
    last_applied: Option<TermSize>,
    last_applied_at: Option<Instant>,
    pending: Option<TermSize>,
    debounce_scheduled: bool,
}

/// Fits the emulation surface to the hosting element and forwards geometry
/// to the backend, suppressing no-op resizes and debouncing bursts.
#[derive(Clone)]
pub struct ResizeCoordinator {
    id: TerminalId,
    channel: Arc<dyn TerminalChannel>,
    surface: SharedSurface,
    profile: ProgramProfile,
    drag: DragState,
    inner: Arc<Mutex<ResizeInner>>,
}

impl ResizeCoordinator {
    pub fn new(
        id: TerminalId,
        channel: Arc<dyn TerminalChannel>,
        surface: SharedSurface,
        profile: ProgramProfile,
        drag: DragState,
        font: FontSpec,
        initial_size: Option<TermSize>,
    ) -> Self {
        let metrics = FontMetrics::from_spec(&font);
        Self {
            id,
            channel,
            surface,
            profile,
            drag,
            inner: Arc::new(Mutex::new(ResizeInner {
                font,
                metrics,
                last_bounds: None,
                last_applied: initial_size,
                last_applied_at: initial_size.map(|_| Instant::now()),
                pending: None,
                debounce_scheduled: false,
            })),
        }
    }

    /// Last size sent to the backend, if any.
    pub fn last_applied(&self) -> Option<TermSize> {
        self.lock().last_applied
    }

    /// Size signal from the hosting element's content box. Must be called
    /// from within a tokio runtime.
    pub fn observe(&self, bounds: HostBounds) {
        if !bounds.is_renderable() {
            return;
        }
        let mut inner = self.lock();
        inner.last_bounds = Some(bounds);
        let target = inner.metrics.fit(bounds);
        self.consider(inner, target);
    }

    /// Font signal; recomputes the fit from the last observed bounds without
    /// requiring a remount.
    pub fn apply_font(&self, event: &FontEvent) {
        let mut inner = self.lock();
        inner.font.apply(event);
        inner.metrics = FontMetrics::from_spec(&inner.font);
        let Some(bounds) = inner.last_bounds else {
            return;
        };
        let target = inner.metrics.fit(bounds);
        self.consider(inner, target);
    }

    /// The split-pane drag finished; apply any fit it suppressed.
    pub fn drag_ended(&self) {
        self.drag.end();
        let mut inner = self.lock();
        let Some(target) = inner.pending.take() else {
            return;
        };
        if inner.last_applied == Some(target) {
            return;
        }
        self.apply(&mut inner, target);
    }

    fn consider(&self, mut inner: MutexGuard<'_, ResizeInner>, target: TermSize) {
        if inner.last_applied == Some(target) && inner.pending.is_none() {
            return;
        }
        if self.drag.active() {
            inner.pending = Some(target);
            return;
        }

        let quiet = inner
            .last_applied_at
            .map_or(true, |at| at.elapsed() >= RESIZE_QUIET_PERIOD);
        if quiet && !inner.debounce_scheduled {
            inner.pending = None;
            self.apply(&mut inner, target);
            return;
        }

        inner.pending = Some(target);
        if !inner.debounce_scheduled {
            inner.debounce_scheduled = true;
            let coordinator = self.clone();
            tokio::spawn(async move {
                sleep(coordinator.debounce()).await;
                coordinator.apply_pending();
            });
        }
    }

    fn apply_pending(&self) {
        let mut inner = self.lock();
        inner.debounce_scheduled = false;
        let Some(target) = inner.pending.take() else {
            return;
        };
        if inner.last_applied == Some(target) {
            return;
        }
        if self.drag.active() {
            inner.pending = Some(target);
            return;
        }
        self.apply(&mut inner, target);
    }

    fn apply(&self, inner: &mut ResizeInner, target: TermSize) {
        {
            let mut surface = self
                .surface
                .lock()
                .expect("emulation surface lock poisoned");
            let pinned = surface.is_at_bottom();
            let offset = surface.scroll_offset();
            surface.set_size(target);
            if pinned {
                surface.scroll_to_bottom();
            } else {
                // Clamped by the surface to the new scrollback maximum.
                surface.set_scroll_offset(offset);
            }
        }
        inner.last_applied = Some(target);
        inner.last_applied_at = Some(Instant::now());

        let channel = Arc::clone(&self.channel);
        let coordinator = self.clone();
        let id = self.id.clone();
        tokio::spawn(async move {
            if let Err(error) = channel.resize(&id, target).await {
                tracing::warn!(
                    terminal = %id,
                    error = %error,
                    "resize command failed, next layout pass self-corrects"
                );
                // Forget the failed size so an otherwise-identical fit is
                // not suppressed as a no-op on the next pass.
                let mut inner = coordinator.lock();
                if inner.last_applied == Some(target) {
                    inner.last_applied = None;
                }
            }
        });
    }

    fn debounce(&self) -> Duration {
        match self.profile {
            ProgramProfile::InteractiveFullscreen => FULLSCREEN_RESIZE_DEBOUNCE,
            ProgramProfile::LineOriented => DEFAULT_RESIZE_DEBOUNCE,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResizeInner> {
        self.inner.lock().expect("resize coordinator lock poisoned")
    }
}
