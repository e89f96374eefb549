use eframe::egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};

use super::FrameTiming;
use super::node::Node;
use crate::config::{DriftModel, NodeConfig, PhysicsConfig, PointerConfig};
use crate::util::TrigTable;

/// One pointer reading in surface coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
    pub active: bool,
}

#[derive(Clone, Copy)]
pub struct PhysicsParams<'a> {
    pub physics: &'a PhysicsConfig,
    pub nodes: &'a NodeConfig,
    pub pointer: &'a PointerConfig,
}

fn harmonic_drift(trig: &TrigTable, config: &PhysicsConfig, time_offset: f32) -> Vec2 {
    let range = config.base_movement_range;
    let variation = config.movement_variation;

    let dx = trig.sin(time_offset) * trig.cos(time_offset * 0.7) * range
        + trig.sin(time_offset * 0.4) * variation;
    let dy = trig.cos(time_offset * 0.8) * trig.sin(time_offset * 0.5) * range
        + trig.cos(time_offset * 0.6) * variation;
    vec2(dx, dy)
}

/// Spring toward the anchor, stiffer the further the node has strayed.
fn return_force(displacement: f32, config: &PhysicsConfig) -> f32 {
    displacement * config.return_force * (1.0 + displacement.abs() / config.max_offset)
}

/// Falloff in `[0, 1]` of the pointer's influence on `position`.
fn pointer_falloff(pointer: PointerSample, position: Vec2, radius: f32) -> (f32, Vec2) {
    if !pointer.active || radius <= 0.0 {
        return (0.0, Vec2::ZERO);
    }

    let delta = position - vec2(pointer.x, pointer.y);
    let distance_sq = delta.length_sq();
    if distance_sq >= radius * radius {
        return (0.0, Vec2::ZERO);
    }

    let distance = distance_sq.sqrt();
    let direction = if distance > 0.0001 {
        delta / distance
    } else {
        vec2(1.0, 0.0)
    };
    (1.0 - distance / radius, direction)
}

/// Advances every node by one frame.
pub fn advance(
    nodes: &mut [Node],
    timing: FrameTiming,
    params: PhysicsParams<'_>,
    trig: &TrigTable,
    pointer: Option<PointerSample>,
) {
    let config = params.physics;
    let delta = if timing.delta.is_finite() {
        timing.delta.max(0.0)
    } else {
        0.0
    };
    let damping_factor = config.velocity_damping.powf(delta);
    let glow_range = params.nodes.max_glow - params.nodes.min_glow;
    let max_offset = config.max_offset;

    for node in nodes.iter_mut() {
        let drift = match config.drift {
            DriftModel::Harmonic => {
                let time_offset = (timing.elapsed_ms * config.movement_frequency as f64) as f32
                    + node.movement_offset;
                harmonic_drift(trig, config, time_offset)
            }
            DriftModel::Still => Vec2::ZERO,
        };

        let displacement = node.origin() - node.position();
        let spring = vec2(
            return_force(displacement.x, config),
            return_force(displacement.y, config),
        );

        let mut velocity = vec2(node.vx, node.vy);
        velocity += (drift * config.drift_scale + spring) * delta;

        let (falloff, direction) = match pointer {
            Some(sample) => pointer_falloff(sample, node.position(), params.pointer.radius),
            None => (0.0, Vec2::ZERO),
        };
        if falloff > 0.0 {
            velocity += direction * (params.pointer.force * falloff * delta);
        }

        if timing.progress < 1.0 {
            node.initial_scale = (node.initial_scale + delta * config.scale_in_rate).min(1.0);
        }

        node.x += velocity.x * delta;
        node.y += velocity.y * delta;

        let glow_wave = ((timing.elapsed_ms * config.glow_wave_frequency as f64) as f32
            + node.glow_wave_offset)
            .sin()
            * 0.5;
        let glow = params.nodes.min_glow + glow_range * (0.5 + glow_wave * 0.5);
        node.glow_intensity = (glow + (params.nodes.max_glow - glow) * falloff)
            .clamp(params.nodes.min_glow, params.nodes.max_glow);

        velocity *= damping_factor;
        node.vx = velocity.x;
        node.vy = velocity.y;

        node.x = node
            .x
            .clamp(node.origin_x - max_offset, node.origin_x + max_offset);
        node.y = node
            .y
            .clamp(node.origin_y - max_offset, node.origin_y + max_offset);
    }
}
