use serde_json::Value;

use crate::color::{Rgb, BLACK};
use crate::document::EXPECTED_PAGE_COUNT;
use crate::error::DocumentError;
use crate::page::{PageView, GRID_CELLS, GRID_WIDTH};

/// Fallback tick interval when a page's `speed_ms` is missing or zero, so a
/// damaged page still previews instead of freezing.
pub const DEFAULT_TICK_MS: u64 = 200;

/// One 5x40 grid of cell colors. Cells are stored row-major, matching the
/// flattened `frame_RGB` layout in the documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    cells: Vec<Rgb>,
}

impl PixelGrid {
    /// Build from one frame entry. Short `frame_RGB` lists are padded with
    /// black and long ones truncated; unparsable colors render black.
    fn from_entry(entry: &Value) -> Self {
        let mut cells = Vec::with_capacity(GRID_CELLS);
        if let Some(colors) = entry.get("frame_RGB").and_then(Value::as_array) {
            for color in colors.iter().take(GRID_CELLS) {
                cells.push(color.as_str().and_then(Rgb::parse).unwrap_or(BLACK));
            }
        }
        cells.resize(GRID_CELLS, BLACK);
        Self { cells }
    }

    pub fn solid(color: Rgb) -> Self {
        Self {
            cells: vec![color; GRID_CELLS],
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Rgb]> {
        self.cells.chunks(GRID_WIDTH)
    }
}

#[cfg(test)]
impl PixelGrid {
    fn get(&self, column: usize, row: usize) -> Rgb {
        self.cells[row * GRID_WIDTH + column]
    }
}

/// A page's animation in renderable form: the ordered grids plus the page's
/// own tick interval. Built fresh per preview and discarded afterwards.
#[derive(Debug, Clone)]
pub struct FrameModel {
    grids: Vec<PixelGrid>,
    tick_interval_ms: u64,
}

impl FrameModel {
    /// A model with nothing to show. Previews render it as the blank grid.
    pub fn empty() -> Self {
        Self {
            grids: Vec::new(),
            tick_interval_ms: DEFAULT_TICK_MS,
        }
    }

    /// Normalize a page. Precedence: a valid `frames` set, then `keyframes`,
    /// then a static `word_page` frame in the page's default color. Keyframe
    /// timing metadata is not honored; the interval is always the page's own
    /// `speed_ms`.
    pub fn build(page: &Value) -> Result<Self, DocumentError> {
        let view = PageView::new(page);

        let page_index = match view.page_index() {
            Some(index) if index < EXPECTED_PAGE_COUNT as u64 => index,
            Some(index) => {
                return Err(DocumentError::malformed_page(
                    index,
                    format!("page_index {index} is outside 0-{}", EXPECTED_PAGE_COUNT - 1),
                ))
            }
            None => {
                return Err(DocumentError::malformed_page(
                    0,
                    "page_index is missing or not an integer",
                ))
            }
        };

        let tick_interval_ms = view.speed_ms().filter(|&ms| ms > 0).unwrap_or(DEFAULT_TICK_MS);

        if view.active_frame_set().is_some() {
            let grids = view
                .frame_entries()
                .iter()
                .map(PixelGrid::from_entry)
                .collect();
            return Ok(Self {
                grids,
                tick_interval_ms,
            });
        }

        if view.has_word_page() {
            return Ok(Self {
                grids: vec![PixelGrid::solid(view.default_color())],
                tick_interval_ms,
            });
        }

        if view.has_content() {
            // an invalid frames object with nothing to fall back to previews
            // as a blank animation
            return Ok(Self {
                grids: Vec::new(),
                tick_interval_ms,
            });
        }

        Err(DocumentError::malformed_page(
            page_index,
            "page has no word_page, frames, or keyframes",
        ))
    }

    pub fn grid(&self, index: usize) -> Option<&PixelGrid> {
        self.grids.get(index)
    }

    pub fn frame_count(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }
}
