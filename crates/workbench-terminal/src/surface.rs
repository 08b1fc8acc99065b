use std::sync::{Arc, Mutex};

use workbench_terminal_protocol::TermSize;

use crate::error::{ViewError, ViewResult};

/// The supplied terminal-emulation component: character grid, cursor, and
/// scrollback. The streaming core writes to it and manages its viewport but
/// never reimplements emulation.
///
/// Scroll offsets count rows from the bottom: `0` means the viewport is
/// pinned to the newest output.
pub trait EmulationSurface: Send {
    fn process(&mut self, bytes: &[u8]);
    fn set_size(&mut self, size: TermSize);
    fn size(&self) -> TermSize;
    fn scroll_offset(&self) -> usize;
    /// Out-of-range offsets clamp to the current scrollback maximum.
    fn set_scroll_offset(&mut self, offset: usize);
    /// Visible screen text, one string per row. Diagnostic surface only.
    fn contents(&self) -> String;

    fn is_at_bottom(&self) -> bool {
        self.scroll_offset() == 0
    }

    fn scroll_to_bottom(&mut self) {
        self.set_scroll_offset(0);
    }
}

/// Exclusive-write handle shared between the hydration controller, the write
/// coalescer, and the resize coordinator. They never hold it concurrently.
pub type SharedSurface = Arc<Mutex<Box<dyn EmulationSurface>>>;

pub fn shared(surface: impl EmulationSurface + 'static) -> SharedSurface {
    Arc::new(Mutex::new(Box::new(surface)))
}

/// `vt100`-backed emulation surface.
pub struct Vt100Surface {
    parser: vt100::Parser,
}

impl Vt100Surface {
    pub fn new(size: TermSize, scrollback_limit: usize) -> ViewResult<Self> {
        if size.is_zero() {
            return Err(ViewError::Configuration(
                "emulation surface requires non-zero rows and columns".to_owned(),
            ));
        }

        Ok(Self {
            parser: vt100::Parser::new(size.rows, size.cols, scrollback_limit),
        })
    }
}

impl EmulationSurface for Vt100Surface {
    fn process(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.parser.process(bytes);
    }

    fn set_size(&mut self, size: TermSize) {
        if size.is_zero() {
            return;
        }
        self.parser.screen_mut().set_size(size.rows, size.cols);
    }

    fn size(&self) -> TermSize {
        let (rows, cols) = self.parser.screen().size();
        TermSize { cols, rows }
    }

    fn scroll_offset(&self) -> usize {
        self.parser.screen().scrollback()
    }

    fn set_scroll_offset(&mut self, offset: usize) {
        self.parser.screen_mut().set_scrollback(offset);
    }

    fn contents(&self) -> String {
        self.parser.screen().contents()
    }
}
