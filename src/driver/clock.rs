use crate::config::TimingConfig;
use crate::sim::FrameTiming;

/// Turns display-callback timestamps into [`FrameTiming`]s.
///
/// Wave functions run on time since the clock first ticked, so they stay
/// continuous across resizes; the startup animation restarts on [`reset`].
///
/// [`reset`]: FrameClock::reset
#[derive(Clone, Debug)]
pub struct FrameClock {
    config: TimingConfig,
    origin_ms: Option<f64>,
    startup_ms: Option<f64>,
    last_step_ms: Option<f64>,
}

impl FrameClock {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            origin_ms: None,
            startup_ms: None,
            last_step_ms: None,
        }
    }

    /// Replays the startup fade-in from the next tick on.
    pub fn reset(&mut self) {
        self.startup_ms = None;
        self.last_step_ms = None;
    }

    /// Returns `None` when less than one frame interval passed since the last
    /// stepped frame; the caller should just wait for the next callback.
    pub fn tick(&mut self, timestamp_ms: f64) -> Option<FrameTiming> {
        if !timestamp_ms.is_finite() {
            return None;
        }

        if let Some(last) = self.last_step_ms {
            let since = timestamp_ms - last;
            if since >= 0.0 && since < self.config.frame_interval_ms {
                return None;
            }
        }

        let origin = *self.origin_ms.get_or_insert(timestamp_ms);
        let startup = *self.startup_ms.get_or_insert(timestamp_ms);

        let delta_ms = self
            .last_step_ms
            .map_or(0.0, |last| (timestamp_ms - last).clamp(0.0, self.config.max_delta_ms));
        self.last_step_ms = Some(timestamp_ms);

        let progress = if self.config.initial_animation_ms > 0.0 {
            ((timestamp_ms - startup) / self.config.initial_animation_ms).clamp(0.0, 1.0)
        } else {
            1.0
        };

        Some(FrameTiming {
            delta: (delta_ms / self.config.frame_unit_ms) as f32,
            elapsed_ms: (timestamp_ms - origin).max(0.0),
            progress: progress as f32,
        })
    }
}
