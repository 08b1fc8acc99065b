//! Terminal output streaming and rendering core.
//!
//! Widgets attach to backend-owned terminal sessions through a
//! [`attachment::TerminalAttachment`]: mounting hydrates the emulation
//! surface from the backend scrollback snapshot, live output is coalesced
//! into bounded writes, geometry is fitted and debounced toward the PTY, and
//! the renderer lifecycle (hardware probing, context loss, software
//! fallback) is managed per attachment. Unmounting tears down only the
//! widget side; the backend session keeps running.

pub mod attachment;
pub mod coalescer;
pub mod error;
pub mod hydration;
pub mod renderer;
pub mod resize;
pub mod start_guard;
pub mod surface;

#[cfg(test)]
pub(crate) mod testing;

pub use attachment::TerminalAttachment;
pub use coalescer::{WriteCoalescer, COALESCE_MAX_BYTES, COALESCE_WINDOW, RENDERER_WAIT_INTERVAL};
pub use error::{ViewError, ViewResult};
pub use hydration::{HydrationController, HydrationState};
pub use renderer::{
    Renderer, RendererFactory, RendererKind, RendererManager, RendererState,
    CONTEXT_RECOVERY_DELAY, MAX_CONTEXT_RECOVERY_ATTEMPTS,
};
pub use resize::{
    DragState, FontMetrics, HostBounds, ResizeCoordinator, CELL_PADDING, DEFAULT_RESIZE_DEBOUNCE,
    FULLSCREEN_RESIZE_DEBOUNCE, RESIZE_QUIET_PERIOD,
};
pub use start_guard::{SessionStartGuard, StartOutcome};
pub use surface::{shared, EmulationSurface, SharedSurface, Vt100Surface};
