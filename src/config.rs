use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::ConfigError;

/// Every tunable of the backdrop. Defaults reproduce the stock animation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub nodes: NodeConfig,
    pub physics: PhysicsConfig,
    pub graph: GraphConfig,
    pub pulses: PulseConfig,
    pub render: RenderConfig,
    pub timing: TimingConfig,
    pub pointer: PointerConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub count: usize,
    pub palette: Vec<Rgb>,
    pub base_radius: [f32; 2],
    pub base_speed: f32,
    pub oscillation_speed: [f32; 2],
    pub min_glow: f32,
    pub max_glow: f32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            count: 20,
            palette: vec![
                Rgb::new(0x67, 0xE8, 0xF9),
                Rgb::new(0x3B, 0x82, 0xF6),
                Rgb::new(0x8B, 0x5C, 0xF6),
                Rgb::new(0xA8, 0x55, 0xF7),
                Rgb::new(0xEC, 0x48, 0x99),
            ],
            base_radius: [1.5, 3.0],
            base_speed: 0.03,
            oscillation_speed: [0.0003, 0.0006],
            min_glow: 0.3,
            max_glow: 1.2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftModel {
    /// Phase-shifted sine/cosine products per node.
    #[default]
    Harmonic,
    /// No drift force; nodes only answer to the spring and the pointer.
    Still,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub drift: DriftModel,
    pub movement_frequency: f32,
    pub base_movement_range: f32,
    pub movement_variation: f32,
    pub drift_scale: f32,
    pub return_force: f32,
    pub max_offset: f32,
    pub velocity_damping: f32,
    pub glow_wave_frequency: f32,
    pub scale_in_rate: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            drift: DriftModel::Harmonic,
            movement_frequency: 0.000_15,
            base_movement_range: 0.8,
            movement_variation: 0.4,
            drift_scale: 0.01,
            return_force: 0.000_08,
            max_offset: 40.0,
            velocity_damping: 0.97,
            glow_wave_frequency: 0.0003,
            scale_in_rate: 0.01,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Frames between two graph-update cycles.
    pub update_interval: u32,
    pub connection_distance: f32,
    pub max_connections_per_node: usize,
    /// Lifetime in graph-update cycles.
    pub lifetime_min: f32,
    pub lifetime_jitter: f32,
    pub line_draw_speed: f32,
    pub initial_draw_progress: f32,
    pub initial_opacity: f32,
    pub opacity_fade_in_rate: f32,
    pub width: [f32; 2],
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            update_interval: 15,
            connection_distance: 250.0,
            max_connections_per_node: 1,
            lifetime_min: 15_000.0,
            lifetime_jitter: 2_000.0,
            line_draw_speed: 0.03,
            initial_draw_progress: 0.4,
            initial_opacity: 0.4,
            opacity_fade_in_rate: 0.012,
            width: [1.0, 2.5],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PulseConfig {
    pub speed: f32,
    pub speed_jitter: f32,
    pub spawn_chance: f32,
    pub fade_speed: f32,
    pub max_per_connection: usize,
    pub min_spacing: f32,
    pub spawn_threshold: f32,
    pub size_min: f32,
    pub size_max: f32,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            speed: 0.01,
            speed_jitter: 0.0,
            spawn_chance: 0.01,
            fade_speed: 0.009,
            max_per_connection: 2,
            min_spacing: 0.6,
            spawn_threshold: 0.1,
            size_min: 0.5,
            size_max: 4.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackdropLayer {
    pub color: Rgb,
    pub opacity: f32,
    pub speed: f32,
    pub scale: f32,
}

impl Default for BackdropLayer {
    fn default() -> Self {
        Self {
            color: Rgb::new(0x3B, 0x82, 0xF6),
            opacity: 0.05,
            speed: 0.000_08,
            scale: 1.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub background: Rgb,
    /// When set, frames are not cleared but veiled with the background color
    /// at this opacity, leaving motion trails.
    pub trail_alpha: Option<f32>,
    pub connection_glow_blur: f32,
    pub node_glow_blur: f32,
    pub wave_frequency: f32,
    pub max_wave_amplitude: f32,
    pub wave_amplitude_ratio: f32,
    /// Gradient radii are snapped to multiples of this before caching.
    pub radius_bucket: f32,
    pub backdrop: Vec<BackdropLayer>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            background: Rgb::new(0x0B, 0x0D, 0x17),
            trail_alpha: None,
            connection_glow_blur: 8.0,
            node_glow_blur: 15.0,
            wave_frequency: 0.0001,
            max_wave_amplitude: 20.0,
            wave_amplitude_ratio: 0.12,
            radius_bucket: 0.5,
            backdrop: vec![
                BackdropLayer {
                    color: Rgb::new(0x3B, 0x82, 0xF6),
                    opacity: 0.05,
                    speed: 0.000_08,
                    scale: 1.2,
                },
                BackdropLayer {
                    color: Rgb::new(0x8B, 0x5C, 0xF6),
                    opacity: 0.05,
                    speed: 0.0001,
                    scale: 1.1,
                },
                BackdropLayer {
                    color: Rgb::new(0xEC, 0x48, 0x99),
                    opacity: 0.05,
                    speed: 0.000_06,
                    scale: 1.3,
                },
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub frame_interval_ms: f64,
    pub max_delta_ms: f64,
    /// Milliseconds per simulation time unit (one 60 Hz frame).
    pub frame_unit_ms: f64,
    pub initial_animation_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 1000.0 / 30.0,
            max_delta_ms: 32.0,
            frame_unit_ms: 16.67,
            initial_animation_ms: 900.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    pub radius: f32,
    /// Positive repels, negative attracts.
    pub force: f32,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            radius: 150.0,
            force: 0.02,
        }
    }
}

impl NetworkConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::NotPositive { field, value })
            }
        }

        fn ordered(field: &'static str, min: f32, max: f32) -> Result<(), ConfigError> {
            if min <= max {
                Ok(())
            } else {
                Err(ConfigError::InvertedRange {
                    field,
                    min: min as f64,
                    max: max as f64,
                })
            }
        }

        if self.nodes.palette.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        positive("nodes.count", self.nodes.count as f64)?;
        ordered("nodes.base_radius", self.nodes.base_radius[0], self.nodes.base_radius[1])?;
        ordered(
            "nodes.oscillation_speed",
            self.nodes.oscillation_speed[0],
            self.nodes.oscillation_speed[1],
        )?;
        ordered("nodes.glow", self.nodes.min_glow, self.nodes.max_glow)?;
        positive("physics.max_offset", self.physics.max_offset as f64)?;
        positive("physics.velocity_damping", self.physics.velocity_damping as f64)?;
        positive("graph.update_interval", self.graph.update_interval as f64)?;
        positive("graph.connection_distance", self.graph.connection_distance as f64)?;
        positive(
            "graph.max_connections_per_node",
            self.graph.max_connections_per_node as f64,
        )?;
        ordered("graph.width", self.graph.width[0], self.graph.width[1])?;
        positive("pulses.speed", self.pulses.speed as f64)?;
        ordered("pulses.size", self.pulses.size_min, self.pulses.size_max)?;
        positive("render.radius_bucket", self.render.radius_bucket as f64)?;
        positive("timing.max_delta_ms", self.timing.max_delta_ms)?;
        positive("timing.frame_unit_ms", self.timing.frame_unit_ms)?;
        positive("timing.initial_animation_ms", self.timing.initial_animation_ms)?;
        Ok(())
    }
}
