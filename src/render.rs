use std::fmt::Write as _;

use crate::color::Rgb;
use crate::frames::PixelGrid;
use crate::page::{GRID_HEIGHT, GRID_WIDTH};

const RESET: &str = "\x1b[0m";

/// Visible columns of a rendered grid line (two block characters per cell).
pub const GRID_COLUMNS: usize = GRID_WIDTH * 2;

/// Render one grid as truecolor terminal lines, one cell as two full blocks.
/// Colors pass through exactly as stored; `lightness` is a device attribute
/// and is never applied here. Each line ends with a reset so cell colors do
/// not leak into surrounding output.
pub fn render_grid(grid: &PixelGrid) -> String {
    let mut out = String::new();
    for row in grid.rows() {
        let mut current: Option<Rgb> = None;
        for &cell in row {
            if current != Some(cell) {
                let _ = write!(out, "\x1b[38;2;{};{};{}m", cell.r, cell.g, cell.b);
                current = Some(cell);
            }
            out.push_str("██");
        }
        out.push_str(RESET);
        out.push('\n');
    }
    out
}

/// Placeholder lines for a page with no frames to show.
pub fn blank_grid() -> String {
    let mut out = String::new();
    for _ in 0..GRID_HEIGHT {
        out.push_str(&"░░".repeat(GRID_WIDTH));
        out.push('\n');
    }
    out
}

/// Wrap pre-rendered grid lines in a rounded, titled border. Assumes each
/// body line is `GRID_COLUMNS` visible columns wide, which both renderers
/// above guarantee.
pub fn panel(title: &str, body: &str) -> String {
    let mut out = String::new();
    let title_width = title.chars().count();
    let filler = GRID_COLUMNS.saturating_sub(title_width + 3);
    let _ = writeln!(out, "╭─ {title} {}╮", "─".repeat(filler));
    for line in body.lines() {
        let _ = writeln!(out, "│{line}│");
    }
    let _ = writeln!(out, "╰{}╯", "─".repeat(GRID_COLUMNS));
    out
}
