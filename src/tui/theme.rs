use ratatui::style::{Color, Modifier, Style};

use crate::models::TaskStatus;

// ── Color palette ──────────────────────────────────────────────────

pub const BG: Color = Color::Rgb(0x0a, 0x0a, 0x0f);
pub const NEON_CYAN: Color = Color::Rgb(0x00, 0xff, 0xf5);
pub const NEON_MAGENTA: Color = Color::Rgb(0xff, 0x00, 0xff);
pub const NEON_PINK: Color = Color::Rgb(0xff, 0x2d, 0x6f);
pub const NEON_GREEN: Color = Color::Rgb(0x39, 0xff, 0x14);
pub const NEON_ORANGE: Color = Color::Rgb(0xff, 0x6e, 0x27);
pub const TEXT_DIM: Color = Color::Rgb(0xb0, 0xb0, 0xb0);
pub const TEXT_BRIGHT: Color = Color::Rgb(0xff, 0xff, 0xff);
pub const BORDER_DIM: Color = Color::Rgb(0x00, 0x5f, 0x5f);
pub const BORDER_BRIGHT: Color = Color::Rgb(0x00, 0xff, 0xf5);

// ── Style presets ──────────────────────────────────────────────────

pub fn panel_border(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(BORDER_BRIGHT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(BORDER_DIM)
    }
}

pub fn status_style(status: TaskStatus) -> Style {
    match status {
        TaskStatus::Todo => Style::default().fg(TEXT_DIM),
        TaskStatus::InProgress => Style::default().fg(NEON_CYAN).add_modifier(Modifier::BOLD),
        TaskStatus::Done => Style::default().fg(NEON_GREEN),
    }
}

pub fn status_symbol(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "■",
        TaskStatus::InProgress => "▶",
        TaskStatus::Done => "◉",
    }
}

pub fn checkbox(completed: bool) -> &'static str {
    if completed { "[x]" } else { "[ ]" }
}

/// Card being dragged on the board.
pub fn carried_style() -> Style {
    Style::default()
        .fg(NEON_ORANGE)
        .add_modifier(Modifier::BOLD | Modifier::REVERSED)
}

pub fn notice_style(is_error: bool) -> Style {
    if is_error {
        Style::default().fg(NEON_PINK).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(NEON_GREEN)
    }
}

// ── ASCII art header ───────────────────────────────────────────────

pub const HEADER_ART: &str = "▐██▌ TASKBOARD ▐██▌";

// ── Tests ──────────────────────────────────────────────────────────
