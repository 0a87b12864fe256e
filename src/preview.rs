use std::time::{Duration, Instant};

use anyhow::Result;

use crate::document::Document;
use crate::frames::FrameModel;
use crate::playback::Schedule;
use crate::render;
use crate::term::{self, Key, TerminalGuard};

/// One page lined up for preview. A page that cannot be normalized still
/// gets an entry, with an empty model that renders as the blank grid.
#[derive(Debug, Clone)]
pub struct PagePreview {
    pub page_index: usize,
    pub model: FrameModel,
}

/// Build preview entries for the given pages. Normalization failures are
/// reported once here and demoted to blank panels; a bad page never takes
/// the whole preview down.
pub fn plan_pages(document: &Document, pages: &[usize]) -> Vec<PagePreview> {
    pages
        .iter()
        .map(|&page_index| {
            let model = match document.page(page_index) {
                Some(page) => FrameModel::build(page).unwrap_or_else(|error| {
                    eprintln!("[cbmerge] {error}; showing page {page_index} blank");
                    FrameModel::empty()
                }),
                None => {
                    eprintln!("[cbmerge] document has no page {page_index}; showing it blank");
                    FrameModel::empty()
                }
            };
            PagePreview { page_index, model }
        })
        .collect()
}

/// Play the looping preview for one bounded window inside its own terminal
/// session. Returns the key that interrupted it, or `None` when the window
/// ran to completion. The terminal is always restored, interrupt or not.
pub fn run_preview(previews: &[PagePreview], duration_ms: u64) -> Result<Option<Key>> {
    let guard = TerminalGuard::enter()?;
    let result = run_preview_in_session(previews, duration_ms);
    guard.leave()?;
    result
}

/// Preview variant for callers that already hold a terminal session, like
/// the wizard between its menus.
pub fn run_preview_in_session(previews: &[PagePreview], duration_ms: u64) -> Result<Option<Key>> {
    let models = previews
        .iter()
        .map(|preview| preview.model.clone())
        .collect::<Vec<_>>();
    let schedule = Schedule::new(&models, duration_ms);
    if schedule.is_empty() {
        return Ok(None);
    }

    let started = Instant::now();
    let mut interrupt = None;

    'ticks: for tick in schedule.ticks() {
        term::draw_screen(&compose(previews, &tick.frame_indices))?;

        let elapsed_target = (tick.offset_ms + schedule.global_tick_ms()).min(schedule.duration_ms());
        let deadline = started + Duration::from_millis(elapsed_target);
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            if let Some(key) = term::poll_key(deadline - now)? {
                interrupt = Some(key);
                break 'ticks;
            }
        }
    }

    Ok(interrupt)
}

fn compose(previews: &[PagePreview], frame_indices: &[usize]) -> String {
    let mut screen = String::new();
    for (preview, &frame_index) in previews.iter().zip(frame_indices) {
        let body = match preview.model.grid(frame_index) {
            Some(grid) => render::render_grid(grid),
            None => render::blank_grid(),
        };
        let title = if preview.model.is_empty() {
            format!("Page {} (no frames)", preview.page_index)
        } else {
            format!(
                "Page {} ({} frames, {} ms)",
                preview.page_index,
                preview.model.frame_count(),
                preview.model.tick_interval_ms()
            )
        };
        screen.push_str(&render::panel(&title, &body));
    }
    screen.push_str("press any key to skip");
    screen
}
