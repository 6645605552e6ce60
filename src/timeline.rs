use serde::{Deserialize, Serialize};

/// Allowed playback rates. Keyboard stepping moves exactly one entry,
/// clamped at both ends.
pub const RATES: [f32; 8] = [0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 1.75, 2.0];

/// Index of the 1.0x entry in [`RATES`].
pub const DEFAULT_RATE_INDEX: usize = 3;

/// Which looping policy currently governs playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopMode {
    /// No media loaded, or duration not yet known. Nothing loops.
    NoMedia,
    /// Explicit A-B loop engaged. Takes precedence unconditionally.
    AbLoop,
    /// Position is inside a subtitle cue and A-B loop is off.
    SentenceLoop,
    /// Media loaded, no loop policy applies at the current position.
    FreePlay,
}

/// Single source of truth for the playback timeline.
///
/// The external playback engine is the sole writer of `position` (via
/// reported ticks) and the renderer only reads; everything else is mutated
/// through the methods here so the invariants hold in one place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    duration: Option<f64>,
    pub position: f64,
    pub point_a: Option<f64>,
    pub point_b: Option<f64>,
    pub ab_loop_enabled: bool,
    pub current_cue: Option<usize>,
}

impl Timeline {
    /// Fresh, empty timeline for a newly selected media source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the media duration once it becomes known. Honored once per
    /// source; later calls for the same source are ignored.
    pub fn set_duration(&mut self, duration: f64) {
        if self.duration.is_some() {
            log::debug!("duration already set, ignoring {:.3}s", duration);
            return;
        }
        if duration > 0.0 && duration.is_finite() {
            self.duration = Some(duration);
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// True once a usable duration is known.
    pub fn has_media(&self) -> bool {
        matches!(self.duration, Some(d) if d > 0.0)
    }

    /// Reset for a new media source: duration unset, position 0, points
    /// cleared, loop disabled, no cue selected.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_point_a(&mut self, t: f64) {
        self.point_a = Some(self.clamp_seek(t));
    }

    pub fn set_point_b(&mut self, t: f64) {
        self.point_b = Some(self.clamp_seek(t));
    }

    /// Clear both points and disable the loop.
    pub fn clear_points(&mut self) {
        self.point_a = None;
        self.point_b = None;
        self.ab_loop_enabled = false;
    }

    /// Toggle the A-B loop. Enabling requires both points; the attempt is
    /// a no-op otherwise (prevented, not reported). Returns the new state.
    pub fn toggle_ab_loop(&mut self) -> bool {
        if !self.ab_loop_enabled && (self.point_a.is_none() || self.point_b.is_none()) {
            return false;
        }
        self.ab_loop_enabled = !self.ab_loop_enabled;
        self.ab_loop_enabled
    }

    /// The loop interval as `(lo, hi)` when both points are set.
    ///
    /// Points are never order-normalized at set time (dragging A past B
    /// must not swap their roles), so consumers always go through min/max
    /// here.
    pub fn loop_span(&self) -> Option<(f64, f64)> {
        match (self.point_a, self.point_b) {
            (Some(a), Some(b)) => Some((a.min(b), a.max(b))),
            _ => None,
        }
    }

    /// Clamp a seek target into `[0, duration]`. Out-of-range targets are
    /// never passed through to the playback engine unclamped.
    pub fn clamp_seek(&self, t: f64) -> f64 {
        let hi = self.duration.unwrap_or(0.0);
        t.max(0.0).min(hi)
    }

    /// State-machine view of the current looping policy.
    pub fn loop_mode(&self) -> LoopMode {
        if !self.has_media() {
            return LoopMode::NoMedia;
        }
        if self.ab_loop_enabled && self.loop_span().is_some() {
            return LoopMode::AbLoop;
        }
        if self.current_cue.is_some() {
            return LoopMode::SentenceLoop;
        }
        LoopMode::FreePlay
    }
}

/// Step one entry up the rate ladder, clamped at 2.0x.
pub fn rate_step_up(index: usize) -> usize {
    (index + 1).min(RATES.len() - 1)
}

/// Step one entry down the rate ladder, clamped at 0.25x.
pub fn rate_step_down(index: usize) -> usize {
    index.saturating_sub(1)
}
