use eframe::egui::Vec2;
use serde::{Deserialize, Serialize};

use crate::color::Rgba;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Vec2> for Point {
    fn from(value: Vec2) -> Self {
        Self::new(value.x, value.y)
    }
}

impl From<Point> for Vec2 {
    fn from(value: Point) -> Self {
        Vec2::new(value.x, value.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Rgba,
}

pub fn stop(offset: f32, color: Rgba) -> ColorStop {
    ColorStop { offset, color }
}

fn sample_stops(stops: &[ColorStop], t: f32) -> Rgba {
    let Some(first) = stops.first() else {
        return Rgba::TRANSPARENT;
    };
    if t <= first.offset {
        return first.color;
    }

    for pair in stops.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        if t <= to.offset {
            let span = to.offset - from.offset;
            let local = if span > f32::EPSILON {
                (t - from.offset) / span
            } else {
                1.0
            };
            return from.color.lerp(to.color, local);
        }
    }

    stops.last().map_or(Rgba::TRANSPARENT, |last| last.color)
}

/// Gradient along the axis `from → to`, in surface coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearGradient {
    pub from: Point,
    pub to: Point,
    pub stops: Vec<ColorStop>,
}

impl LinearGradient {
    pub fn color_at(&self, point: Point) -> Rgba {
        let axis = Vec2::from(self.to) - Vec2::from(self.from);
        let length_sq = axis.length_sq();
        let t = if length_sq > f32::EPSILON {
            (Vec2::from(point) - Vec2::from(self.from)).dot(axis) / length_sq
        } else {
            0.0
        };
        sample_stops(&self.stops, t.clamp(0.0, 1.0))
    }
}

/// Gradient radiating from the center of whatever shape it fills, so one
/// value can be reused at any position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RadialGradient {
    pub radius: f32,
    pub stops: Vec<ColorStop>,
}

impl RadialGradient {
    /// Color at `distance` from the center; past the radius the last stop holds.
    pub fn color_at(&self, distance: f32) -> Rgba {
        let t = if self.radius > f32::EPSILON {
            distance / self.radius
        } else {
            1.0
        };
        sample_stops(&self.stops, t.clamp(0.0, 1.0))
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Paint<'a> {
    Solid(Rgba),
    Linear(&'a LinearGradient),
    Radial(&'a RadialGradient),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    SourceOver,
    /// Lightening blend used by the ambient backdrop.
    Screen,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub blur: f32,
    pub color: Rgba,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PathSegment {
    LineTo(Point),
    QuadTo { control: Point, to: Point },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub start: Point,
    pub segments: Vec<PathSegment>,
}

impl Path {
    pub fn quadratic(start: Point, control: Point, end: Point) -> Self {
        Self {
            start,
            segments: vec![PathSegment::QuadTo { control, to: end }],
        }
    }

    /// Polyline approximation with `steps` points per curved segment.
    pub fn flatten(&self, steps: usize) -> Vec<Point> {
        let steps = steps.max(1);
        let mut points = vec![self.start];
        let mut cursor = self.start;

        for segment in &self.segments {
            match *segment {
                PathSegment::LineTo(to) => {
                    points.push(to);
                    cursor = to;
                }
                PathSegment::QuadTo { control, to } => {
                    for step in 1..=steps {
                        let t = step as f32 / steps as f32;
                        let mt = 1.0 - t;
                        points.push(Point::new(
                            mt * mt * cursor.x + 2.0 * mt * t * control.x + t * t * to.x,
                            mt * mt * cursor.y + 2.0 * mt * t * control.y + t * t * to.y,
                        ));
                    }
                    cursor = to;
                }
            }
        }

        points
    }
}

/// The 2D immediate-mode canvas the renderer paints onto.
///
/// Blend mode and shadow are sticky state, like on an HTML canvas: they apply
/// to every later draw call until changed.
pub trait Surface {
    fn clear(&mut self);
    fn fill_rect(&mut self, min: Point, max: Point, color: Rgba);
    fn fill_circle(&mut self, center: Point, radius: f32, paint: Paint<'_>);
    fn stroke_path(&mut self, path: &Path, width: f32, paint: Paint<'_>);
    fn set_blend_mode(&mut self, mode: BlendMode);
    fn set_shadow(&mut self, shadow: Option<Shadow>);
}
