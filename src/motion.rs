use crate::profile::{
    self,
    SpinKind,
};
use std::time::Duration;

/// Measurements of the strip a tape is scrolled through, in display units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TapeMetrics {
    pub card_width: f64,
    pub gap: f64,
    pub viewport_width: f64,
}

impl TapeMetrics {
    pub fn step(&self) -> f64 {
        self.card_width + self.gap
    }

    /// Offset that puts the centre of card `idx` under the viewport centre.
    pub fn shift_for_index(&self, idx: usize) -> f64 {
        let center = self.viewport_width / 2.0;
        center - (idx as f64 * self.step() + self.card_width / 2.0)
    }
}

/// Scroll plan of one spin. Pure: offsets depend only on elapsed time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinAnimation {
    pub kind: SpinKind,
    pub duration: Duration,
    pub start_offset: f64,
    pub final_offset: f64,
}

impl SpinAnimation {
    pub fn new(
        kind: SpinKind,
        duration: Duration,
        metrics: &TapeMetrics,
        final_index: usize,
        cards_to_pass: f64,
    ) -> Self {
        let start_index = final_index.saturating_sub(cards_to_pass.round() as usize);
        SpinAnimation {
            kind,
            duration,
            start_offset: metrics.shift_for_index(start_index),
            final_offset: metrics.shift_for_index(final_index),
        }
    }

    /// A plan that is already settled: start and end coincide.
    pub fn settled(kind: SpinKind, metrics: &TapeMetrics, final_index: usize) -> Self {
        let offset = metrics.shift_for_index(final_index);
        SpinAnimation {
            kind,
            duration: Duration::ZERO,
            start_offset: offset,
            final_offset: offset,
        }
    }

    pub fn t01(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        profile::clamp01(elapsed.as_secs_f64() / self.duration.as_secs_f64())
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        self.t01(elapsed) >= 1.0
    }

    pub fn offset_at(&self, elapsed: Duration) -> f64 {
        let f = profile::progress_fraction(self.kind, self.t01(elapsed));
        profile::lerp(self.start_offset, self.final_offset, f)
    }
}
