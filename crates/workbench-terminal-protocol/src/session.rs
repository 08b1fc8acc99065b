use serde::{Deserialize, Serialize};

use crate::ids::TerminalId;

/// Whether the terminal carries the agent conversation or an auxiliary shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalKind {
    Top,
    Auxiliary,
}

/// How the program running inside the terminal drives its screen.
///
/// This is an explicit session attribute rather than a program-name match:
/// full-screen interactive agents repaint on every resize and want fast
/// feedback, line-oriented shells tolerate a longer debounce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramProfile {
    InteractiveFullscreen,
    LineOriented,
}

/// Cursor rendering hint derived from the program profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorStyle {
    Block,
    Bar,
}

/// Attributes of one backend-owned terminal session.
///
/// Created by the surrounding session manager before any widget mounts and
/// destroyed only with the owning session; widget lifecycle never touches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSessionProfile {
    pub id: TerminalId,
    pub kind: TerminalKind,
    /// Session belongs to a never-visible background context.
    pub background: bool,
    pub program: ProgramProfile,
}

impl TerminalSessionProfile {
    /// Profile with the kind inferred from the id's structural suffix.
    pub fn from_id(id: TerminalId, program: ProgramProfile) -> Self {
        let kind = if id.is_top() {
            TerminalKind::Top
        } else {
            TerminalKind::Auxiliary
        };
        Self {
            id,
            kind,
            background: false,
            program,
        }
    }

    pub fn cursor_style(&self) -> CursorStyle {
        match self.program {
            ProgramProfile::InteractiveFullscreen => CursorStyle::Block,
            ProgramProfile::LineOriented => CursorStyle::Bar,
        }
    }
}
