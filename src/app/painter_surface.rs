use std::f32::consts::TAU;

use eframe::egui::{Color32, Mesh, Painter, Pos2, Rect, Shape, Stroke, Vec2};

use crate::color::Rgba;
use crate::render::surface::{
    BlendMode, Paint, Path, Point, RadialGradient, Shadow, Surface, stop,
};

const RINGS: usize = 10;
const CURVE_STEPS: usize = 16;

fn circle_segments(radius: f32) -> usize {
    (radius * 0.5).clamp(16.0, 64.0) as usize
}

fn shade(paint: Paint<'_>, center: Point, at: Point) -> Rgba {
    match paint {
        Paint::Solid(color) => color,
        Paint::Linear(gradient) => gradient.color_at(at),
        Paint::Radial(gradient) => gradient.color_at((at.x - center.x).hypot(at.y - center.y)),
    }
}

/// [`Surface`] over an egui painter; surface coordinates start at the
/// painter rect's top-left corner.
///
/// Screen blending becomes additive blending, and shadows are faked with a
/// soft halo drawn underneath the shape.
pub struct EguiSurface<'a> {
    painter: &'a Painter,
    origin: Vec2,
    blend: BlendMode,
    shadow: Option<Shadow>,
}

impl<'a> EguiSurface<'a> {
    pub fn new(painter: &'a Painter, rect: Rect) -> Self {
        Self {
            painter,
            origin: rect.min.to_vec2(),
            blend: BlendMode::SourceOver,
            shadow: None,
        }
    }

    fn pos(&self, point: Point) -> Pos2 {
        Pos2::new(point.x, point.y) + self.origin
    }

    fn color(&self, color: Rgba) -> Color32 {
        match self.blend {
            BlendMode::SourceOver => {
                Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
            }
            BlendMode::Screen => {
                let scale = |channel: u8| ((channel as u16 * color.a as u16) / 255) as u8;
                // Zero alpha with premultiplied color blends additively.
                Color32::from_rgba_premultiplied(scale(color.r), scale(color.g), scale(color.b), 0)
            }
        }
    }

    fn disc_mesh(&self, center: Point, radius: f32, paint: Paint<'_>) -> Mesh {
        let segments = circle_segments(radius);
        let mut mesh = Mesh::default();
        mesh.colored_vertex(self.pos(center), self.color(shade(paint, center, center)));

        for ring in 1..=RINGS {
            let ring_radius = radius * ring as f32 / RINGS as f32;
            for segment in 0..segments {
                let angle = TAU * segment as f32 / segments as f32;
                let point = Point::new(
                    center.x + ring_radius * angle.cos(),
                    center.y + ring_radius * angle.sin(),
                );
                mesh.colored_vertex(self.pos(point), self.color(shade(paint, center, point)));
            }
        }

        let index =
            |ring: usize, segment: usize| (1 + (ring - 1) * segments + segment % segments) as u32;
        for segment in 0..segments {
            mesh.add_triangle(0, index(1, segment), index(1, segment + 1));
        }
        for ring in 1..RINGS {
            for segment in 0..segments {
                let (a, b) = (index(ring, segment), index(ring, segment + 1));
                let (c, d) = (index(ring + 1, segment), index(ring + 1, segment + 1));
                mesh.add_triangle(a, c, d);
                mesh.add_triangle(a, d, b);
            }
        }

        mesh
    }

    fn paint_disc(&self, center: Point, radius: f32, paint: Paint<'_>) {
        match paint {
            Paint::Solid(color) => {
                self.painter
                    .circle_filled(self.pos(center), radius, self.color(color));
            }
            _ => {
                self.painter.add(Shape::mesh(self.disc_mesh(center, radius, paint)));
            }
        }
    }
}

impl Surface for EguiSurface<'_> {
    /// Every egui frame starts blank, so there is nothing to wipe.
    fn clear(&mut self) {}

    fn fill_rect(&mut self, min: Point, max: Point, color: Rgba) {
        let rect = Rect::from_min_max(self.pos(min), self.pos(max));
        self.painter.rect_filled(rect, 0.0, self.color(color));
    }

    fn fill_circle(&mut self, center: Point, radius: f32, paint: Paint<'_>) {
        if !(radius.is_finite() && radius > 0.0) {
            return;
        }

        if let Some(shadow) = self.shadow.filter(|shadow| shadow.blur > 0.0) {
            let outer = radius + shadow.blur;
            let glow = RadialGradient {
                radius: outer,
                stops: vec![
                    stop(0.0, shadow.color.scale_alpha(0.4)),
                    stop(radius / outer, shadow.color.scale_alpha(0.25)),
                    stop(1.0, Rgba { a: 0, ..shadow.color }),
                ],
            };
            self.paint_disc(center, outer, Paint::Radial(&glow));
        }

        self.paint_disc(center, radius, paint);
    }

    fn stroke_path(&mut self, path: &Path, width: f32, paint: Paint<'_>) {
        let points = path.flatten(CURVE_STEPS);
        let origin = path.start;

        for pair in points.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let middle = Point::new((from.x + to.x) * 0.5, (from.y + to.y) * 0.5);
            let color = shade(paint, origin, middle);
            let segment = [self.pos(from), self.pos(to)];

            if let Some(shadow) = self.shadow.filter(|shadow| shadow.blur > 0.0) {
                let glow = shadow.color.scale_alpha(color.a as f32 / 255.0 * 0.25);
                let stroke = Stroke::new(width + shadow.blur * 0.5, self.color(glow));
                self.painter.line_segment(segment, stroke);
            }
            self.painter.line_segment(segment, Stroke::new(width, self.color(color)));
        }
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.shadow = shadow;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::render::surface::LinearGradient;

    #[test]
    fn shading_follows_the_paint_kind() {
        let red = Rgb::new(255, 0, 0);
        let radial = RadialGradient {
            radius: 10.0,
            stops: vec![stop(0.0, red.with_alpha(200)), stop(1.0, red.transparent())],
        };
        let center = Point::new(5.0, 5.0);
        assert_eq!(shade(Paint::Radial(&radial), center, center).a, 200);
        assert_eq!(shade(Paint::Radial(&radial), center, Point::new(15.0, 5.0)).a, 0);

        let linear = LinearGradient {
            from: Point::new(0.0, 0.0),
            to: Point::new(10.0, 0.0),
            stops: vec![stop(0.0, red.with_alpha(0)), stop(1.0, red.with_alpha(100))],
        };
        assert_eq!(shade(Paint::Linear(&linear), center, Point::new(10.0, 3.0)).a, 100);
    }

    #[test]
    fn segment_count_scales_with_radius() {
        assert_eq!(circle_segments(1.0), 16);
        assert_eq!(circle_segments(60.0), 30);
        assert_eq!(circle_segments(5000.0), 64);
    }
}
