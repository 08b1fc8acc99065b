use serde::{Deserialize, Serialize};

pub const DEFAULT_TERMINAL_FONT_SIZE: f32 = 13.0;
pub const DEFAULT_UI_FONT_SIZE: f32 = 14.0;

/// Current font configuration consumed by fit computation and the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    pub terminal_font_size: f32,
    pub ui_font_size: f32,
    pub family: Option<String>,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            terminal_font_size: DEFAULT_TERMINAL_FONT_SIZE,
            ui_font_size: DEFAULT_UI_FONT_SIZE,
            family: None,
        }
    }
}

impl FontSpec {
    pub fn apply(&mut self, event: &FontEvent) {
        match event {
            FontEvent::Sizes { terminal, ui } => {
                self.terminal_font_size = *terminal;
                self.ui_font_size = *ui;
            }
            FontEvent::Family(family) => {
                self.family = Some(family.clone());
            }
        }
    }
}

/// Process-wide font/geometry signal. Consumed without requiring a remount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FontEvent {
    Sizes { terminal: f32, ui: f32 },
    Family(String),
}
