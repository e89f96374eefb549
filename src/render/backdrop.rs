use std::f32::consts::TAU;

use super::gradient_cache::{GradientCache, GradientKey, GradientLayer};
use super::surface::{BlendMode, Paint, Point, RadialGradient, Surface, stop};
use crate::color::alpha_byte;
use crate::config::BackdropLayer;

/// Center of layer `index` of `count` at `elapsed_ms`. The layers are spread
/// evenly around one orbit and each wobbles on its own slow Lissajous path.
pub fn layer_center(
    layer: &BackdropLayer,
    index: usize,
    count: usize,
    width: f32,
    height: f32,
    elapsed_ms: f64,
) -> Point {
    let time = (elapsed_ms * layer.speed as f64) as f32;
    let angle = time + TAU * index as f32 / count.max(1) as f32;

    let x = angle.cos() * width * 0.35 + (time * 0.3).sin() * width * 0.1;
    let y = (angle * 0.7).sin() * height * 0.35 + (time * 0.4).cos() * height * 0.1;

    Point::new(width * 0.5 + x, height * 0.5 + y)
}

fn layer_gradient(layer: &BackdropLayer, radius: f32) -> RadialGradient {
    let color = layer.color;
    RadialGradient {
        radius,
        stops: vec![
            stop(0.0, color.with_alpha(alpha_byte(layer.opacity))),
            stop(0.3, color.with_alpha(alpha_byte(layer.opacity * 200.0 / 255.0))),
            stop(0.6, color.with_alpha(alpha_byte(layer.opacity * 127.0 / 255.0))),
            stop(1.0, color.transparent()),
        ],
    }
}

/// Paints the ambient color fields with a screen blend, then restores normal
/// compositing. A layer's radius covers the whole surface, so filling its
/// disc paints the same pixels as filling the surface rectangle.
pub fn paint_backdrop<S: Surface + ?Sized>(
    surface: &mut S,
    layers: &[BackdropLayer],
    cache: &mut GradientCache,
    width: f32,
    height: f32,
    elapsed_ms: f64,
) {
    if layers.is_empty() {
        return;
    }

    surface.set_blend_mode(BlendMode::Screen);
    for (index, layer) in layers.iter().enumerate() {
        let (bucket, radius) = cache.bucket(width.max(height) * layer.scale);
        if radius <= 0.0 || layer.opacity <= 0.0 {
            continue;
        }

        let key = GradientKey {
            color: layer.color,
            radius_bucket: bucket,
            layer: GradientLayer::Backdrop(index),
        };
        let gradient = cache.get_or_insert_with(key, |radius| layer_gradient(layer, radius));
        let center = layer_center(layer, index, layers.len(), width, height, elapsed_ms);
        surface.fill_circle(center, radius, Paint::Radial(gradient));
    }
    surface.set_blend_mode(BlendMode::SourceOver);
}
