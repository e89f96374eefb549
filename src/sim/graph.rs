use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::node::Node;
use super::pulse::Pulse;
use crate::config::GraphConfig;
use crate::error::ModelError;
use crate::util::sample_range;

/// Unordered pair of distinct node indices, stored as `(low, high)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "(usize, usize)", into = "(usize, usize)")]
pub struct NodePair {
    low: usize,
    high: usize,
}

impl NodePair {
    pub fn new(a: usize, b: usize) -> Result<Self, ModelError> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Ok(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Ok(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => Err(ModelError::SelfLoop(a)),
        }
    }

    /// Like [`NodePair::new`] but also checks both ends against the population.
    pub fn within(a: usize, b: usize, node_count: usize) -> Result<Self, ModelError> {
        let pair = Self::new(a, b)?;
        if pair.high >= node_count {
            return Err(ModelError::EndpointOutOfRange {
                index: pair.high,
                node_count,
            });
        }
        Ok(pair)
    }

    pub fn low(self) -> usize {
        self.low
    }

    pub fn high(self) -> usize {
        self.high
    }

    pub fn endpoints<'a>(self, nodes: &'a [Node]) -> Option<(&'a Node, &'a Node)> {
        Some((nodes.get(self.low)?, nodes.get(self.high)?))
    }
}

impl TryFrom<(usize, usize)> for NodePair {
    type Error = ModelError;

    fn try_from((a, b): (usize, usize)) -> Result<Self, Self::Error> {
        Self::new(a, b)
    }
}

impl From<NodePair> for (usize, usize) {
    fn from(pair: NodePair) -> Self {
        (pair.low, pair.high)
    }
}

/// A transient link between two nodes and the pulses travelling on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pair: NodePair,
    pub strength: f32,
    pub lifetime: f32,
    pub width: f32,
    pub draw_progress: f32,
    pub initial_opacity: f32,
    pub pulses: Vec<Pulse>,
}

impl Connection {
    pub fn new(
        pair: NodePair,
        strength: f32,
        lifetime: f32,
        width: f32,
        config: &GraphConfig,
    ) -> Self {
        Self {
            pair,
            strength: strength.clamp(0.0, 1.0),
            lifetime,
            width,
            draw_progress: config.initial_draw_progress,
            initial_opacity: config.initial_opacity,
            pulses: Vec::new(),
        }
    }

    pub fn pair(&self) -> NodePair {
        self.pair
    }

    /// Line opacity once the startup fade and the per-link fade-in apply.
    pub fn line_opacity(&self, progress: f32) -> f32 {
        (progress * self.initial_opacity * 2.5).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GraphUpdate {
    pub expired: usize,
    pub severed: usize,
    pub created: usize,
}

fn distance_sq(a: &Node, b: &Node) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

/// One graph-update cycle: age, evict, recount, then first-fit creation in
/// ascending pair order.
pub fn update_connections(
    nodes: &mut [Node],
    connections: &mut Vec<Connection>,
    config: &GraphConfig,
    rng: &mut impl Rng,
) -> GraphUpdate {
    let threshold = config.connection_distance;
    let threshold_sq = threshold * threshold;
    let cap = config.max_connections_per_node;
    let mut stats = GraphUpdate::default();

    for connection in connections.iter_mut() {
        connection.lifetime -= 1.0;
        connection.draw_progress = (connection.draw_progress
            + config.line_draw_speed * (1.0 - connection.draw_progress))
            .min(1.0);
    }

    connections.retain(|connection| {
        if connection.lifetime <= 0.0 {
            stats.expired += 1;
            return false;
        }
        match connection.pair.endpoints(&*nodes) {
            Some((a, b)) if distance_sq(a, b) <= threshold_sq => true,
            _ => {
                stats.severed += 1;
                false
            }
        }
    });

    for node in nodes.iter_mut() {
        node.connection_count = 0;
    }
    let mut existing = HashSet::with_capacity(connections.len());
    for connection in connections.iter() {
        nodes[connection.pair.low].connection_count += 1;
        nodes[connection.pair.high].connection_count += 1;
        existing.insert(connection.pair);
    }

    let node_count = nodes.len();
    for i in 0..node_count {
        for j in (i + 1)..node_count {
            if nodes[i].connection_count >= cap {
                break;
            }
            if nodes[j].connection_count >= cap {
                continue;
            }

            let dist_sq = distance_sq(&nodes[i], &nodes[j]);
            if dist_sq > threshold_sq {
                continue;
            }

            let Ok(pair) = NodePair::new(i, j) else {
                continue;
            };
            if existing.contains(&pair) {
                continue;
            }

            let strength = 1.0 - dist_sq.sqrt() / threshold;
            let lifetime =
                config.lifetime_min + sample_range(rng, 0.0, config.lifetime_jitter.max(0.0));
            let width = sample_range(rng, config.width[0], config.width[1]);
            connections.push(Connection::new(pair, strength, lifetime, width, config));
            existing.insert(pair);
            nodes[i].connection_count += 1;
            nodes[j].connection_count += 1;
            stats.created += 1;
        }
    }

    tracing::trace!(
        expired = stats.expired,
        severed = stats.severed,
        created = stats.created,
        live = connections.len(),
        "graph update"
    );

    stats
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::color::Rgb;
    use crate::config::NodeConfig;

    fn node(x: f32, y: f32) -> Node {
        Node::at_rest(x, y, Rgb::new(1, 2, 3), &NodeConfig::default())
    }

    #[test]
    fn pair_is_unordered_and_rejects_self_loops() {
        assert_eq!(NodePair::new(3, 1).unwrap(), NodePair::new(1, 3).unwrap());
        assert_eq!(NodePair::new(2, 2), Err(ModelError::SelfLoop(2)));
        assert_eq!(
            NodePair::within(0, 5, 5),
            Err(ModelError::EndpointOutOfRange {
                index: 5,
                node_count: 5
            })
        );
    }

    #[test]
    fn pair_deserialization_enforces_distinct_endpoints() {
        let pair: NodePair = serde_json::from_str("[4, 1]").unwrap();
        assert_eq!((pair.low(), pair.high()), (1, 4));
        assert!(serde_json::from_str::<NodePair>("[2, 2]").is_err());
    }

    #[test]
    fn degree_cap_yields_perfect_matching_on_square() {
        let mut nodes = vec![
            node(0.0, 0.0),
            node(100.0, 0.0),
            node(0.0, 100.0),
            node(100.0, 100.0),
        ];
        let mut connections = Vec::new();
        let config = GraphConfig {
            max_connections_per_node: 1,
            ..GraphConfig::default()
        };

        let stats = update_connections(
            &mut nodes,
            &mut connections,
            &config,
            &mut SmallRng::seed_from_u64(11),
        );

        assert_eq!(stats.created, 2);
        assert_eq!(connections.len(), 2);
        let pairs: Vec<(usize, usize)> = connections.iter().map(|c| c.pair().into()).collect();
        assert_eq!(pairs, vec![(0, 1), (2, 3)]);
        assert!(nodes.iter().all(|node| node.connection_count == 1));
    }

    #[test]
    fn strength_falls_with_distance() {
        let mut nodes = vec![node(0.0, 0.0), node(125.0, 0.0)];
        let mut connections = Vec::new();
        let config = GraphConfig::default();
        update_connections(&mut nodes, &mut connections, &config, &mut SmallRng::seed_from_u64(1));

        assert_eq!(connections.len(), 1);
        assert!((connections[0].strength - 0.5).abs() < 1e-6);
        assert_eq!(connections[0].draw_progress, config.initial_draw_progress);
        assert!(connections[0].lifetime >= config.lifetime_min);
        assert!(connections[0].lifetime < config.lifetime_min + config.lifetime_jitter);
    }

    #[test]
    fn stretched_connection_is_severed_next_cycle() {
        let mut nodes = vec![node(0.0, 0.0), node(100.0, 0.0)];
        let mut connections = Vec::new();
        let config = GraphConfig::default();
        let mut rng = SmallRng::seed_from_u64(5);
        update_connections(&mut nodes, &mut connections, &config, &mut rng);
        assert_eq!(connections.len(), 1);

        nodes[1].x = config.connection_distance + 1.0;
        let stats = update_connections(&mut nodes, &mut connections, &config, &mut rng);

        assert_eq!(stats.severed, 1);
        assert!(connections.is_empty());
        assert!(nodes.iter().all(|node| node.connection_count == 0));
    }

    #[test]
    fn expired_connection_is_dropped_and_draw_progress_eases() {
        let mut nodes = vec![node(0.0, 0.0), node(10.0, 0.0)];
        let config = GraphConfig {
            lifetime_min: 2.0,
            lifetime_jitter: 0.0,
            ..GraphConfig::default()
        };
        let mut connections = Vec::new();
        let mut rng = SmallRng::seed_from_u64(5);
        update_connections(&mut nodes, &mut connections, &config, &mut rng);
        let before = connections[0].draw_progress;

        update_connections(&mut nodes, &mut connections, &config, &mut rng);
        assert_eq!(connections.len(), 1);
        assert!(connections[0].draw_progress > before);
        assert!(connections[0].draw_progress <= 1.0);

        let stats = update_connections(&mut nodes, &mut connections, &config, &mut rng);
        assert_eq!(stats.expired, 1);
        // The pair is still close, so a replacement is created in the same cycle.
        assert_eq!(stats.created, 1);
        assert_eq!(connections[0].lifetime, 2.0);
    }

    proptest! {
        #[test]
        fn graph_stays_simple_and_capped(
            points in proptest::collection::vec((0.0f32..600.0, 0.0f32..600.0), 2..40),
            cap in 1usize..4,
            moves in proptest::collection::vec(
                (0usize..40, -200.0f32..200.0, -200.0f32..200.0),
                0..30,
            ),
            seed in any::<u64>(),
        ) {
            let mut nodes: Vec<Node> = points.iter().map(|&(x, y)| node(x, y)).collect();
            let config = GraphConfig { max_connections_per_node: cap, ..GraphConfig::default() };
            let mut connections = Vec::new();
            let mut rng = SmallRng::seed_from_u64(seed);

            update_connections(&mut nodes, &mut connections, &config, &mut rng);
            for (index, dx, dy) in moves {
                let count = nodes.len();
                let target = &mut nodes[index % count];
                target.x += dx;
                target.y += dy;
                update_connections(&mut nodes, &mut connections, &config, &mut rng);

                let mut seen = HashSet::new();
                let mut degree = vec![0usize; nodes.len()];
                for connection in &connections {
                    let pair = connection.pair();
                    prop_assert!(pair.low() < pair.high());
                    prop_assert!(pair.high() < nodes.len());
                    prop_assert!(seen.insert(pair));
                    degree[pair.low()] += 1;
                    degree[pair.high()] += 1;
                    let (a, b) = pair.endpoints(&nodes).unwrap();
                    prop_assert!(distance_sq(a, b) <= config.connection_distance.powi(2));
                }
                for (node, degree) in nodes.iter().zip(degree) {
                    prop_assert!(degree <= cap);
                    prop_assert_eq!(node.connection_count, degree);
                }
            }
        }
    }
}
