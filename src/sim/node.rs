use eframe::egui::{Vec2, vec2};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::config::NodeConfig;
use crate::error::GeometryError;
use crate::util::{sample_phase, sample_range};

/// A glowing point mass elastically bound to its anchor.
///
/// `origin_x`/`origin_y`, `base_radius`, `color` and the phase offsets are
/// fixed at creation; everything else is rewritten by the physics step and
/// the graph manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub x: f32,
    pub y: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    pub vx: f32,
    pub vy: f32,
    pub base_radius: f32,
    pub color: Rgb,
    pub glow_intensity: f32,
    pub oscillation_offset: f32,
    pub oscillation_speed: f32,
    pub movement_offset: f32,
    pub glow_wave_offset: f32,
    pub initial_scale: f32,
    pub connection_count: usize,
}

impl Node {
    /// A motionless node anchored at `(x, y)`, fully scaled in.
    #[cfg(test)]
    pub(crate) fn at_rest(x: f32, y: f32, color: Rgb, config: &NodeConfig) -> Self {
        Self {
            x,
            y,
            origin_x: x,
            origin_y: y,
            vx: 0.0,
            vy: 0.0,
            base_radius: config.base_radius[0],
            color,
            glow_intensity: config.min_glow,
            oscillation_offset: 0.0,
            oscillation_speed: config.oscillation_speed[0],
            movement_offset: 0.0,
            glow_wave_offset: 0.0,
            initial_scale: 1.0,
            connection_count: 0,
        }
    }

    pub fn position(&self) -> Vec2 {
        vec2(self.x, self.y)
    }

    pub fn origin(&self) -> Vec2 {
        vec2(self.origin_x, self.origin_y)
    }

    /// Fade-in scale: eases from `initial_scale` to 1 over the startup window.
    pub fn current_scale(&self, progress: f32) -> f32 {
        if progress < 1.0 {
            self.initial_scale + (1.0 - self.initial_scale) * progress.max(0.0)
        } else {
            1.0
        }
    }

    /// Radius actually painted this frame.
    pub fn drawn_radius(&self, elapsed_ms: f64, progress: f32) -> f32 {
        let phase = (elapsed_ms * self.oscillation_speed as f64) as f32 + self.oscillation_offset;
        let modifier = phase.sin() * 0.3 + 1.0;
        self.base_radius * modifier * self.current_scale(progress)
    }
}

pub fn check_geometry(width: f32, height: f32) -> Result<(), GeometryError> {
    if width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite() {
        Ok(())
    } else {
        Err(GeometryError { width, height })
    }
}

const FALLBACK_COLOR: Rgb = Rgb::new(0x67, 0xE8, 0xF9);

/// Seeds a fresh population inside `[0, width) x [0, height)`.
pub fn initialize(
    width: f32,
    height: f32,
    config: &NodeConfig,
    rng: &mut impl Rng,
) -> Result<Vec<Node>, GeometryError> {
    check_geometry(width, height)?;

    let glow_range = config.max_glow - config.min_glow;
    let nodes = (0..config.count)
        .map(|_| {
            let x = rng.gen_range(0.0..width);
            let y = rng.gen_range(0.0..height);
            let color = config
                .palette
                .choose(rng)
                .copied()
                .unwrap_or(FALLBACK_COLOR);

            Node {
                x,
                y,
                origin_x: x,
                origin_y: y,
                vx: (rng.r#gen::<f32>() - 0.5) * config.base_speed,
                vy: (rng.r#gen::<f32>() - 0.5) * config.base_speed,
                base_radius: sample_range(rng, config.base_radius[0], config.base_radius[1]),
                color,
                glow_intensity: config.min_glow + rng.r#gen::<f32>() * glow_range,
                oscillation_offset: sample_phase(rng),
                oscillation_speed: sample_range(
                    rng,
                    config.oscillation_speed[0],
                    config.oscillation_speed[1],
                ),
                movement_offset: sample_phase(rng),
                glow_wave_offset: sample_phase(rng),
                initial_scale: 0.0,
                connection_count: 0,
            }
        })
        .collect();

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use std::f32::consts::TAU;

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn seeds_exact_population_within_bounds() {
        let config = NodeConfig::default();
        let mut rng = SmallRng::seed_from_u64(7);
        let nodes = initialize(640.0, 360.0, &config, &mut rng).unwrap();

        assert_eq!(nodes.len(), config.count);
        for node in &nodes {
            assert!((0.0..640.0).contains(&node.x));
            assert!((0.0..360.0).contains(&node.y));
            assert_eq!(node.position(), node.origin());
            assert!(node.vx.abs() <= config.base_speed * 0.5);
            assert!(node.vy.abs() <= config.base_speed * 0.5);
            assert!(node.base_radius >= config.base_radius[0]);
            assert!(node.base_radius < config.base_radius[1]);
            assert!(config.palette.contains(&node.color));
            for phase in [node.oscillation_offset, node.movement_offset, node.glow_wave_offset] {
                assert!((0.0..TAU).contains(&phase));
            }
            assert!(node.glow_intensity >= config.min_glow);
            assert!(node.glow_intensity <= config.max_glow);
            assert_eq!(node.initial_scale, 0.0);
            assert_eq!(node.connection_count, 0);
        }
    }

    #[test]
    fn same_seed_same_population() {
        let config = NodeConfig::default();
        let a = initialize(800.0, 600.0, &config, &mut SmallRng::seed_from_u64(3)).unwrap();
        let b = initialize(800.0, 600.0, &config, &mut SmallRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_degenerate_surfaces() {
        let config = NodeConfig::default();
        let mut rng = SmallRng::seed_from_u64(1);
        for (w, h) in [(0.0, 100.0), (100.0, -1.0), (f32::NAN, 10.0), (f32::INFINITY, 10.0)] {
            assert!(initialize(w, h, &config, &mut rng).is_err());
        }
    }

    #[test]
    fn scale_reaches_one_after_startup() {
        let node = Node::at_rest(0.0, 0.0, Rgb::new(1, 2, 3), &NodeConfig::default());
        let mut fresh = node.clone();
        fresh.initial_scale = 0.0;
        assert_eq!(fresh.current_scale(0.0), 0.0);
        assert!((fresh.current_scale(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(fresh.current_scale(1.0), 1.0);
    }
}
