use eframe::egui::{Vec2, vec2};

use crate::config::RenderConfig;

/// Quadratic Bézier used for a connection's stroke and its pulses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Curve {
    pub start: Vec2,
    pub control: Vec2,
    pub end: Vec2,
}

impl Curve {
    /// Bends the segment `start → end` sideways. The control point sits on the
    /// perpendicular through the midpoint and sways with `elapsed_ms`.
    pub fn swaying(
        start: Vec2,
        end: Vec2,
        phase: f32,
        elapsed_ms: f64,
        config: &RenderConfig,
    ) -> Self {
        let delta = end - start;
        let distance = delta.length().max(0.001);
        let amplitude = (distance * config.wave_amplitude_ratio).min(config.max_wave_amplitude);
        let sway = ((elapsed_ms * config.wave_frequency as f64) as f32 + phase).sin() * amplitude;
        let perpendicular = vec2(-delta.y, delta.x) / distance;

        Self {
            start,
            control: (start + end) * 0.5 + perpendicular * sway,
            end,
        }
    }

    pub fn point_at(&self, t: f32) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        let mt = 1.0 - t;
        self.start * (mt * mt) + self.control * (2.0 * mt * t) + self.end * (t * t)
    }
}
