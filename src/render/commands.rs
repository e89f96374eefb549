use serde::{Deserialize, Serialize};

use super::surface::{
    BlendMode, LinearGradient, Paint, Path, Point, RadialGradient, Shadow, Surface,
};
use crate::color::Rgba;

/// [`Paint`] with the gradient owned, so a command list is self-contained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OwnedPaint {
    Solid(Rgba),
    Linear(LinearGradient),
    Radial(RadialGradient),
}

impl OwnedPaint {
    pub fn as_paint(&self) -> Paint<'_> {
        match self {
            Self::Solid(color) => Paint::Solid(*color),
            Self::Linear(gradient) => Paint::Linear(gradient),
            Self::Radial(gradient) => Paint::Radial(gradient),
        }
    }
}

impl From<Paint<'_>> for OwnedPaint {
    fn from(paint: Paint<'_>) -> Self {
        match paint {
            Paint::Solid(color) => Self::Solid(color),
            Paint::Linear(gradient) => Self::Linear(gradient.clone()),
            Paint::Radial(gradient) => Self::Radial(gradient.clone()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear,
    FillRect {
        min: Point,
        max: Point,
        color: Rgba,
    },
    FillCircle {
        center: Point,
        radius: f32,
        paint: OwnedPaint,
    },
    StrokePath {
        path: Path,
        width: f32,
        paint: OwnedPaint,
    },
    SetBlendMode {
        mode: BlendMode,
    },
    SetShadow {
        shadow: Option<Shadow>,
    },
}

/// Surface that only remembers what was asked of it.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, min: Point, max: Point, color: Rgba) {
        self.commands.push(DrawCommand::FillRect { min, max, color });
    }

    fn fill_circle(&mut self, center: Point, radius: f32, paint: Paint<'_>) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            paint: paint.into(),
        });
    }

    fn stroke_path(&mut self, path: &Path, width: f32, paint: Paint<'_>) {
        self.commands.push(DrawCommand::StrokePath {
            path: path.clone(),
            width,
            paint: paint.into(),
        });
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.commands.push(DrawCommand::SetBlendMode { mode });
    }

    fn set_shadow(&mut self, shadow: Option<Shadow>) {
        self.commands.push(DrawCommand::SetShadow { shadow });
    }
}

/// Plays recorded commands onto a real surface, in order.
pub fn replay<S: Surface + ?Sized>(commands: &[DrawCommand], surface: &mut S) {
    for command in commands {
        match command {
            DrawCommand::Clear => surface.clear(),
            DrawCommand::FillRect { min, max, color } => surface.fill_rect(*min, *max, *color),
            DrawCommand::FillCircle {
                center,
                radius,
                paint,
            } => surface.fill_circle(*center, *radius, paint.as_paint()),
            DrawCommand::StrokePath { path, width, paint } => {
                surface.stroke_path(path, *width, paint.as_paint())
            }
            DrawCommand::SetBlendMode { mode } => surface.set_blend_mode(*mode),
            DrawCommand::SetShadow { shadow } => surface.set_shadow(*shadow),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgb;
    use crate::render::surface::stop;

    fn sample(surface: &mut impl Surface) {
        let gradient = RadialGradient {
            radius: 4.0,
            stops: vec![stop(0.0, Rgb::new(255, 0, 0).with_alpha(255))],
        };
        surface.clear();
        surface.set_blend_mode(BlendMode::Screen);
        surface.fill_circle(Point::new(1.0, 2.0), 4.0, Paint::Radial(&gradient));
        surface.set_shadow(Some(Shadow {
            blur: 8.0,
            color: Rgb::new(0, 0, 255).with_alpha(255),
        }));
        surface.stroke_path(
            &Path::quadratic(Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 0.0)),
            1.5,
            Paint::Solid(Rgba::TRANSPARENT),
        );
        surface.set_shadow(None);
    }

    #[test]
    fn replay_reproduces_the_recording() {
        let mut first = RecordingSurface::new();
        sample(&mut first);

        let mut second = RecordingSurface::new();
        replay(first.commands(), &mut second);

        assert_eq!(first.commands().len(), 6);
        assert_eq!(first.commands(), second.commands());
    }

    #[test]
    fn commands_survive_json() {
        let mut surface = RecordingSurface::new();
        sample(&mut surface);
        let commands = surface.into_commands();

        let text = serde_json::to_string(&commands).unwrap();
        assert!(text.contains("\"op\":\"fill_circle\""));
        let decoded: Vec<DrawCommand> = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, commands);
    }
}
