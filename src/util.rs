use std::f32::consts::TAU;

use rand::Rng;

const TRIG_TABLE_SIZE: usize = 1000;

/// Precomputed sine/cosine over one turn. Angles are wrapped, so any finite
/// input (negative included) maps onto the table.
pub struct TrigTable {
    sin: Box<[f32]>,
    cos: Box<[f32]>,
}

impl TrigTable {
    pub fn new() -> Self {
        let sample = |f: fn(f32) -> f32| {
            (0..TRIG_TABLE_SIZE)
                .map(|i| f((i as f32 / TRIG_TABLE_SIZE as f32) * TAU))
                .collect::<Box<[f32]>>()
        };

        Self {
            sin: sample(f32::sin),
            cos: sample(f32::cos),
        }
    }

    fn index(angle: f32) -> usize {
        if !angle.is_finite() {
            return 0;
        }
        let turn = angle.rem_euclid(TAU) / TAU;
        ((turn * TRIG_TABLE_SIZE as f32) as usize).min(TRIG_TABLE_SIZE - 1)
    }

    pub fn sin(&self, angle: f32) -> f32 {
        self.sin[Self::index(angle)]
    }

    pub fn cos(&self, angle: f32) -> f32 {
        self.cos[Self::index(angle)]
    }
}

impl Default for TrigTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform sample in `[min, max)`, tolerating an empty range.
pub fn sample_range(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

pub fn sample_phase(rng: &mut impl Rng) -> f32 {
    rng.gen_range(0.0..TAU)
}
