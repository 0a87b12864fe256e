//! Playback scheduling for multi-page previews.
//!
//! The scheduler is pure: it computes a finite sequence of ticks without
//! sleeping or drawing. The preview loop owns the actual pacing.

use crate::frames::FrameModel;

/// Length of a preview window when the caller does not ask for one.
pub const DEFAULT_PREVIEW_DURATION_MS: u64 = 3000;

/// One scheduling step: an offset from the start of the window and the frame
/// each track shows from that offset on. `frame_indices` is positionally
/// aligned with the models the schedule was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub offset_ms: u64,
    pub frame_indices: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
struct Track {
    interval_ms: u64,
    frame_count: usize,
}

impl Track {
    fn frame_index_at(self, offset_ms: u64) -> usize {
        if self.frame_count <= 1 {
            return 0;
        }
        ((offset_ms / self.interval_ms) % self.frame_count as u64) as usize
    }
}

/// A bounded, deterministic playback plan. The fastest animation sets the
/// global tick so every track's frames each get shown; slower tracks hold a
/// frame across several ticks and shorter tracks wrap around.
#[derive(Debug, Clone)]
pub struct Schedule {
    global_tick_ms: u64,
    duration_ms: u64,
    tracks: Vec<Track>,
}

impl Schedule {
    pub fn new(models: &[FrameModel], duration_ms: u64) -> Self {
        let tracks = models
            .iter()
            .map(|model| Track {
                interval_ms: model.tick_interval_ms().max(1),
                frame_count: model.frame_count(),
            })
            .collect::<Vec<_>>();
        let global_tick_ms = tracks
            .iter()
            .map(|track| track.interval_ms)
            .min()
            .unwrap_or(0);
        Self {
            global_tick_ms,
            duration_ms,
            tracks,
        }
    }

    pub fn global_tick_ms(&self) -> u64 {
        self.global_tick_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn tick_count(&self) -> u64 {
        if self.global_tick_ms == 0 {
            return 0;
        }
        self.duration_ms.div_ceil(self.global_tick_ms)
    }

    pub fn is_empty(&self) -> bool {
        self.tick_count() == 0
    }

    /// Walk the window. Re-calling restarts from offset zero with the same
    /// sequence.
    pub fn ticks(&self) -> Ticks<'_> {
        Ticks {
            schedule: self,
            next_offset_ms: 0,
        }
    }

    fn frame_indices_at(&self, offset_ms: u64) -> Vec<usize> {
        self.tracks
            .iter()
            .map(|track| track.frame_index_at(offset_ms))
            .collect()
    }
}

pub struct Ticks<'a> {
    schedule: &'a Schedule,
    next_offset_ms: u64,
}

impl Iterator for Ticks<'_> {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        if self.schedule.global_tick_ms == 0 || self.next_offset_ms >= self.schedule.duration_ms {
            return None;
        }
        let offset_ms = self.next_offset_ms;
        // the cursor must not wrap when duration_ms is near u64::MAX
        self.next_offset_ms = offset_ms.saturating_add(self.schedule.global_tick_ms);
        Some(Tick {
            offset_ms,
            frame_indices: self.schedule.frame_indices_at(offset_ms),
        })
    }
}
