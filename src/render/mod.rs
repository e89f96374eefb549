//! Painting side of the backdrop. The renderer reads a [`Scene`] and issues
//! calls against any [`Surface`]; it never mutates simulation state.

pub mod backdrop;
pub mod commands;
pub mod gradient_cache;
pub mod surface;

use eframe::egui::vec2;

use crate::color::{Rgb, alpha_byte};
use crate::config::{NetworkConfig, PulseConfig, RenderConfig};
use crate::sim::Scene;
use crate::sim::curve::Curve;
use crate::sim::graph::Connection;
use crate::sim::node::Node;
use backdrop::paint_backdrop;
use gradient_cache::{GradientCache, GradientKey, GradientLayer};
use surface::{LinearGradient, Paint, Path, Point, RadialGradient, Shadow, Surface, stop};

fn halo_gradient(color: Rgb, radius: f32) -> RadialGradient {
    RadialGradient {
        radius,
        stops: vec![
            stop(0.0, color.with_alpha(0x30)),
            stop(0.5, color.with_alpha(0x15)),
            stop(1.0, color.transparent()),
        ],
    }
}

fn core_gradient(color: Rgb, radius: f32) -> RadialGradient {
    RadialGradient {
        radius,
        stops: vec![
            stop(0.0, color.with_alpha(0xff)),
            stop(0.6, color.with_alpha(0xb4)),
            stop(1.0, color.with_alpha(0x64)),
        ],
    }
}

pub struct Renderer {
    config: RenderConfig,
    pulses: PulseConfig,
    cache: GradientCache,
}

impl Renderer {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            config: config.render.clone(),
            pulses: config.pulses.clone(),
            cache: GradientCache::new(config.render.radius_bucket),
        }
    }

    /// Drops every cached gradient. Called whenever the surface changes size.
    pub fn invalidate(&mut self) {
        if !self.cache.is_empty() {
            tracing::debug!(entries = self.cache.len(), "gradient cache cleared");
        }
        self.cache.clear();
    }

    pub fn cache(&self) -> &GradientCache {
        &self.cache
    }

    pub fn render<S: Surface + ?Sized>(&mut self, surface: &mut S, scene: Scene<'_>) {
        let (width, height) = (scene.width, scene.height);
        let background = self.config.background;

        match self.config.trail_alpha {
            Some(alpha) => surface.fill_rect(
                Point::new(0.0, 0.0),
                Point::new(width, height),
                background.with_alpha(alpha_byte(alpha)),
            ),
            None => {
                surface.clear();
                surface.fill_rect(
                    Point::new(0.0, 0.0),
                    Point::new(width, height),
                    background.with_alpha(0xff),
                );
            }
        }

        paint_backdrop(
            surface,
            &self.config.backdrop,
            &mut self.cache,
            width,
            height,
            scene.elapsed_ms,
        );

        for connection in scene.connections {
            self.paint_connection(surface, connection, scene);
        }

        for node in scene.nodes {
            self.paint_node(surface, node, scene);
        }
    }

    fn paint_connection<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        connection: &Connection,
        scene: Scene<'_>,
    ) {
        let Some((a, b)) = connection.pair().endpoints(scene.nodes) else {
            return;
        };

        let line_opacity = connection.line_opacity(scene.progress);
        let alpha =
            alpha_byte(connection.strength * 0.8 * line_opacity * connection.draw_progress);
        let curve = Curve::swaying(
            a.position(),
            b.position(),
            a.oscillation_offset,
            scene.elapsed_ms,
            &self.config,
        );

        let gradient = LinearGradient {
            from: curve.start.into(),
            to: curve.end.into(),
            stops: vec![
                stop(0.0, a.color.with_alpha(alpha)),
                stop(0.5, a.color.with_alpha(alpha)),
                stop(1.0, b.color.with_alpha(alpha)),
            ],
        };
        let path = Path::quadratic(curve.start.into(), curve.control.into(), curve.end.into());

        surface.set_shadow(Some(Shadow {
            blur: self.config.connection_glow_blur,
            color: a.color.with_alpha(0xff),
        }));
        surface.stroke_path(&path, (connection.width * 1.2).max(0.8), Paint::Linear(&gradient));
        surface.set_shadow(None);

        for pulse in &connection.pulses {
            let envelope = pulse.envelope();
            let opacity = (pulse.opacity * envelope * line_opacity * 2.0).clamp(0.0, 1.0);
            let size = pulse.size(&self.pulses);
            let gradient = RadialGradient {
                radius: size,
                stops: vec![
                    stop(0.0, a.color.with_alpha(alpha_byte(opacity))),
                    stop(0.5, a.color.with_alpha(alpha_byte(opacity * 180.0 / 255.0))),
                    stop(1.0, a.color.transparent()),
                ],
            };
            let center = curve.point_at(pulse.position).into();
            surface.fill_circle(center, size, Paint::Radial(&gradient));
        }
    }

    fn paint_node<S: Surface + ?Sized>(&mut self, surface: &mut S, node: &Node, scene: Scene<'_>) {
        let radius = node.drawn_radius(scene.elapsed_ms, scene.progress);
        if radius.is_nan() || radius <= 0.0 {
            return;
        }
        let center = Point::from(vec2(node.x, node.y));
        let scale = node.current_scale(scene.progress);

        let (bucket, halo_radius) = self.cache.bucket(radius * 10.0);
        if halo_radius > 0.0 {
            let key = GradientKey {
                color: node.color,
                radius_bucket: bucket,
                layer: GradientLayer::Halo,
            };
            let halo = self
                .cache
                .get_or_insert_with(key, |radius| halo_gradient(node.color, radius));
            surface.fill_circle(center, halo_radius, Paint::Radial(halo));
        }

        let (bucket, core_radius) = self.cache.bucket(radius * 2.5);
        if core_radius > 0.0 {
            surface.set_shadow(Some(Shadow {
                blur: self.config.node_glow_blur * node.glow_intensity * scale,
                color: node.color.with_alpha(0xff),
            }));
            let key = GradientKey {
                color: node.color,
                radius_bucket: bucket,
                layer: GradientLayer::Core,
            };
            let core = self
                .cache
                .get_or_insert_with(key, |radius| core_gradient(node.color, radius));
            surface.fill_circle(center, core_radius, Paint::Radial(core));
            surface.set_shadow(None);
        }
    }
}
