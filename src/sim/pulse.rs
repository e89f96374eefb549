use std::f32::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::FrameTiming;
use super::graph::Connection;
use crate::config::{GraphConfig, PulseConfig};

/// A marker travelling along one connection's curve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    /// Progress along the curve, `0` at the low endpoint.
    pub position: f32,
    /// Time-based fade, independent of the positional envelope.
    pub opacity: f32,
    pub speed: f32,
}

impl Pulse {
    pub fn new(speed: f32) -> Self {
        Self {
            position: 0.0,
            opacity: 1.0,
            speed,
        }
    }

    /// Rises from 0, peaks mid-way, falls back to 0 at the far end.
    pub fn envelope(&self) -> f32 {
        (self.position.clamp(0.0, 1.0) * PI).sin()
    }

    pub fn size(&self, config: &PulseConfig) -> f32 {
        let grown = config.size_min + self.envelope() * (config.size_max - config.size_min);
        (grown * 1.2).max(config.size_min)
    }

    fn is_spent(&self) -> bool {
        self.position >= 1.0 || self.opacity <= 0.0
    }
}

fn can_spawn(connection: &Connection, config: &PulseConfig) -> bool {
    if connection.draw_progress <= config.spawn_threshold
        || connection.pulses.len() >= config.max_per_connection
    {
        return false;
    }
    connection
        .pulses
        .last()
        .is_none_or(|latest| latest.position > config.min_spacing)
}

/// Per-frame connection animation: opacity fade-in, pulse travel and removal,
/// then at most one stochastic spawn per connection. Returns spawned count.
pub fn advance_pulses(
    connections: &mut [Connection],
    timing: FrameTiming,
    graph: &GraphConfig,
    config: &PulseConfig,
    rng: &mut impl Rng,
) -> usize {
    let delta = if timing.delta.is_finite() {
        timing.delta.max(0.0)
    } else {
        0.0
    };
    let spawn_probability = (config.spawn_chance * timing.progress * delta).clamp(0.0, 1.0);
    let mut spawned = 0;

    for connection in connections.iter_mut() {
        connection.initial_opacity =
            (connection.initial_opacity + delta * graph.opacity_fade_in_rate).min(1.0);

        for pulse in connection.pulses.iter_mut() {
            pulse.position += pulse.speed * delta;
            pulse.opacity = (pulse.opacity - config.fade_speed * delta).max(0.0);
        }
        connection.pulses.retain(|pulse| !pulse.is_spent());

        if spawn_probability > 0.0
            && can_spawn(connection, config)
            && rng.r#gen::<f32>() < spawn_probability
        {
            let jitter = if config.speed_jitter > 0.0 {
                1.0 + config.speed_jitter * (rng.r#gen::<f32>() * 2.0 - 1.0)
            } else {
                1.0
            };
            connection.pulses.push(Pulse::new(config.speed * jitter));
            spawned += 1;
        }
    }

    spawned
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::sim::graph::NodePair;

    fn connection(draw_progress: f32) -> Connection {
        let mut connection = Connection::new(
            NodePair::new(0, 1).unwrap(),
            0.5,
            100.0,
            1.0,
            &GraphConfig::default(),
        );
        connection.draw_progress = draw_progress;
        connection
    }

    fn frame(delta: f32) -> FrameTiming {
        FrameTiming {
            delta,
            elapsed_ms: 0.0,
            progress: 1.0,
        }
    }

    #[test]
    fn constant_speed_pulse_arrives_after_inverse_speed() {
        let config = PulseConfig {
            speed: 0.25,
            fade_speed: 0.0,
            spawn_chance: 0.0,
            ..PulseConfig::default()
        };
        let mut connections = vec![connection(1.0)];
        connections[0].pulses.push(Pulse::new(config.speed));
        let graph = GraphConfig::default();
        let mut rng = SmallRng::seed_from_u64(0);

        for step in 1..4 {
            advance_pulses(&mut connections, frame(1.0), &graph, &config, &mut rng);
            assert_eq!(connections[0].pulses.len(), 1);
            assert_eq!(connections[0].pulses[0].position, 0.25 * step as f32);
            assert_eq!(connections[0].pulses[0].opacity, 1.0);
        }

        advance_pulses(&mut connections, frame(1.0), &graph, &config, &mut rng);
        assert!(connections[0].pulses.is_empty());
    }

    #[test]
    fn faded_pulse_is_removed_before_arrival() {
        let config = PulseConfig {
            speed: 0.01,
            fade_speed: 0.5,
            spawn_chance: 0.0,
            ..PulseConfig::default()
        };
        let mut connections = vec![connection(1.0)];
        connections[0].pulses.push(Pulse::new(config.speed));
        let graph = GraphConfig::default();
        let mut rng = SmallRng::seed_from_u64(0);

        advance_pulses(&mut connections, frame(1.0), &graph, &config, &mut rng);
        assert_eq!(connections[0].pulses.len(), 1);
        advance_pulses(&mut connections, frame(1.0), &graph, &config, &mut rng);
        assert!(connections[0].pulses.is_empty());
    }

    #[test]
    fn spawning_respects_threshold_cap_and_spacing() {
        let config = PulseConfig {
            spawn_chance: 1.0,
            max_per_connection: 2,
            min_spacing: 0.6,
            speed: 0.125,
            fade_speed: 0.0,
            ..PulseConfig::default()
        };
        let graph = GraphConfig::default();
        let mut rng = SmallRng::seed_from_u64(9);

        let mut undrawn = vec![connection(0.05)];
        assert_eq!(advance_pulses(&mut undrawn, frame(1.0), &graph, &config, &mut rng), 0);

        let mut connections = vec![connection(1.0)];
        assert_eq!(advance_pulses(&mut connections, frame(1.0), &graph, &config, &mut rng), 1);

        // The first pulse must clear the spacing before a second one appears.
        for _ in 0..4 {
            assert_eq!(advance_pulses(&mut connections, frame(1.0), &graph, &config, &mut rng), 0);
        }
        assert_eq!(advance_pulses(&mut connections, frame(1.0), &graph, &config, &mut rng), 1);
        assert_eq!(connections[0].pulses.len(), 2);

        for _ in 0..5 {
            advance_pulses(&mut connections, frame(1.0), &graph, &config, &mut rng);
            assert!(connections[0].pulses.len() <= config.max_per_connection);
        }
    }

    #[test]
    fn zero_delta_never_spawns() {
        let config = PulseConfig {
            spawn_chance: 1.0,
            ..PulseConfig::default()
        };
        let graph = GraphConfig::default();
        let mut connections = vec![connection(1.0)];
        let mut rng = SmallRng::seed_from_u64(2);
        let spawned = advance_pulses(&mut connections, frame(0.0), &graph, &config, &mut rng);
        assert_eq!(spawned, 0);
    }

    #[test]
    fn connection_opacity_fades_in() {
        let graph = GraphConfig::default();
        let mut connections = vec![connection(1.0)];
        let mut rng = SmallRng::seed_from_u64(2);
        for _ in 0..200 {
            advance_pulses(&mut connections, frame(1.0), &graph, &PulseConfig::default(), &mut rng);
        }
        assert_eq!(connections[0].initial_opacity, 1.0);
    }

    #[test]
    fn envelope_and_size_peak_mid_way() {
        let config = PulseConfig::default();
        let mut pulse = Pulse::new(0.01);
        assert!((pulse.size(&config) - config.size_min * 1.2).abs() < 1e-6);
        pulse.position = 0.5;
        assert!((pulse.envelope() - 1.0).abs() < 1e-6);
        assert!((pulse.size(&config) - config.size_max * 1.2).abs() < 1e-4);
    }
}
