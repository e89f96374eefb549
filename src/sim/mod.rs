//! Simulation side of the backdrop: the node population, the proximity graph
//! and the pulses riding on it. Everything here is owned by one
//! [`Simulation`] value; no module-level state.

pub mod curve;
pub mod graph;
pub mod node;
pub mod physics;
pub mod pulse;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::config::NetworkConfig;
use crate::error::{GeometryError, ModelError};
use crate::util::TrigTable;
use graph::{Connection, GraphUpdate, NodePair, update_connections};
use node::{Node, initialize};
use physics::{PhysicsParams, PointerSample, advance};
use pulse::advance_pulses;

/// Time inputs for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameTiming {
    /// Elapsed time since the previous frame, in 60 Hz frame units, clamped.
    pub delta: f32,
    /// Milliseconds since the clock started; drives every wave function.
    pub elapsed_ms: f64,
    /// Startup animation progress in `[0, 1]`.
    pub progress: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub graph: Option<GraphUpdate>,
    pub pulses_spawned: usize,
}

/// Borrowed, read-only view of everything the renderer paints.
#[derive(Clone, Copy, Debug)]
pub struct Scene<'a> {
    pub width: f32,
    pub height: f32,
    pub elapsed_ms: f64,
    pub progress: f32,
    pub nodes: &'a [Node],
    pub connections: &'a [Connection],
}

/// Owned copy of a [`Scene`], self-contained so it can cross a thread or a
/// wire boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub width: f32,
    pub height: f32,
    pub elapsed_ms: f64,
    pub progress: f32,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

impl Snapshot {
    pub fn scene(&self) -> Scene<'_> {
        Scene {
            width: self.width,
            height: self.height,
            elapsed_ms: self.elapsed_ms,
            progress: self.progress,
            nodes: &self.nodes,
            connections: &self.connections,
        }
    }

    /// Rejects snapshots whose connections point outside the node list.
    pub fn validate(&self) -> Result<(), ModelError> {
        for connection in &self.connections {
            let pair = connection.pair();
            NodePair::within(pair.low(), pair.high(), self.nodes.len())?;
        }
        Ok(())
    }
}

impl From<Scene<'_>> for Snapshot {
    fn from(scene: Scene<'_>) -> Self {
        Self {
            width: scene.width,
            height: scene.height,
            elapsed_ms: scene.elapsed_ms,
            progress: scene.progress,
            nodes: scene.nodes.to_vec(),
            connections: scene.connections.to_vec(),
        }
    }
}

/// Owns one visualization's state. Several can coexist side by side.
pub struct Simulation {
    config: NetworkConfig,
    width: f32,
    height: f32,
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    rng: SmallRng,
    trig: TrigTable,
    frame_count: u64,
    pointer: Option<PointerSample>,
    last_timing: Option<FrameTiming>,
}

impl Simulation {
    /// An empty simulation; it stays empty until the first successful resize.
    pub fn new(config: NetworkConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        Self {
            config,
            width: 0.0,
            height: 0.0,
            nodes: Vec::new(),
            connections: Vec::new(),
            rng,
            trig: TrigTable::new(),
            frame_count: 0,
            pointer: None,
            last_timing: None,
        }
    }

    pub fn create(
        config: NetworkConfig,
        width: f32,
        height: f32,
        seed: Option<u64>,
    ) -> Result<Self, GeometryError> {
        let mut simulation = Self::new(config, seed);
        simulation.resize(width, height)?;
        Ok(simulation)
    }

    /// Discards every node, connection and pulse and seeds a new population.
    /// On invalid geometry nothing is touched.
    pub fn resize(&mut self, width: f32, height: f32) -> Result<(), GeometryError> {
        let nodes = initialize(width, height, &self.config.nodes, &mut self.rng)?;

        self.nodes = nodes;
        self.connections.clear();
        self.width = width;
        self.height = height;
        self.frame_count = 0;
        self.last_timing = None;
        tracing::debug!(width, height, nodes = self.nodes.len(), "simulation seeded");
        Ok(())
    }

    /// Releases all state; the simulation is empty until resized again.
    pub fn destroy(&mut self) {
        self.nodes = Vec::new();
        self.connections = Vec::new();
        self.width = 0.0;
        self.height = 0.0;
        self.frame_count = 0;
        self.pointer = None;
        self.last_timing = None;
    }

    pub fn is_ready(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn set_pointer(&mut self, pointer: Option<PointerSample>) {
        self.pointer = pointer;
    }

    /// Physics every frame, the graph every `update_interval` frames, then
    /// the pulses.
    pub fn step(&mut self, timing: FrameTiming) -> StepReport {
        if !self.is_ready() {
            return StepReport::default();
        }

        let params = PhysicsParams {
            physics: &self.config.physics,
            nodes: &self.config.nodes,
            pointer: &self.config.pointer,
        };
        advance(&mut self.nodes, timing, params, &self.trig, self.pointer);

        self.frame_count += 1;
        let interval = u64::from(self.config.graph.update_interval.max(1));
        let graph = (self.frame_count % interval == 0).then(|| {
            update_connections(
                &mut self.nodes,
                &mut self.connections,
                &self.config.graph,
                &mut self.rng,
            )
        });

        let pulses_spawned = advance_pulses(
            &mut self.connections,
            timing,
            &self.config.graph,
            &self.config.pulses,
            &mut self.rng,
        );

        self.last_timing = Some(timing);
        StepReport {
            graph,
            pulses_spawned,
        }
    }

    pub fn scene(&self) -> Scene<'_> {
        let timing = self.last_timing.unwrap_or(FrameTiming {
            delta: 0.0,
            elapsed_ms: 0.0,
            progress: 0.0,
        });
        Scene {
            width: self.width,
            height: self.height,
            elapsed_ms: timing.elapsed_ms,
            progress: timing.progress,
            nodes: &self.nodes,
            connections: &self.connections,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.scene().into()
    }
}
