use std::collections::HashMap;

use super::surface::RadialGradient;
use crate::color::Rgb;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GradientLayer {
    Backdrop(usize),
    Halo,
    Core,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GradientKey {
    pub color: Rgb,
    pub radius_bucket: u32,
    pub layer: GradientLayer,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Radial gradients keyed by color, snapped radius and layer. Owned by the
/// rendering side and wiped whenever the surface changes.
pub struct GradientCache {
    bucket: f32,
    entries: HashMap<GradientKey, RadialGradient>,
    stats: CacheStats,
}

impl GradientCache {
    pub fn new(bucket: f32) -> Self {
        Self {
            bucket: if bucket > 0.0 { bucket } else { 1.0 },
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Snaps `radius` to the bucket grid; returns the bucket index and the
    /// radius it stands for. Radii below half a bucket collapse to zero.
    pub fn bucket(&self, radius: f32) -> (u32, f32) {
        if !radius.is_finite() || radius <= 0.0 {
            return (0, 0.0);
        }
        let index = (radius / self.bucket).round().min(u32::MAX as f32) as u32;
        (index, index as f32 * self.bucket)
    }

    pub fn get_or_insert_with(
        &mut self,
        key: GradientKey,
        build: impl FnOnce(f32) -> RadialGradient,
    ) -> &RadialGradient {
        let bucket = self.bucket;
        let stats = &mut self.stats;
        self.entries
            .entry(key)
            .and_modify(|_| stats.hits += 1)
            .or_insert_with(|| {
                stats.misses += 1;
                build(key.radius_bucket as f32 * bucket)
            })
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::stop;

    fn gradient(radius: f32) -> RadialGradient {
        RadialGradient {
            radius,
            stops: vec![stop(0.0, Rgb::new(1, 2, 3).with_alpha(255))],
        }
    }

    #[test]
    fn buckets_snap_to_grid() {
        let cache = GradientCache::new(0.5);
        assert_eq!(cache.bucket(10.2), (20, 10.0));
        assert_eq!(cache.bucket(10.3), (21, 10.5));
        assert_eq!(cache.bucket(0.1), (0, 0.0));
        assert_eq!(cache.bucket(-4.0), (0, 0.0));
        assert_eq!(cache.bucket(f32::NAN), (0, 0.0));
    }

    #[test]
    fn reuses_entries_per_key() {
        let mut cache = GradientCache::new(0.5);
        let key = GradientKey {
            color: Rgb::new(1, 2, 3),
            radius_bucket: 8,
            layer: GradientLayer::Halo,
        };

        assert_eq!(cache.get_or_insert_with(key, gradient).radius, 4.0);
        cache.get_or_insert_with(key, |_| panic!("should be cached"));
        cache.get_or_insert_with(
            GradientKey {
                layer: GradientLayer::Core,
                ..key
            },
            gradient,
        );

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 2 });

        cache.clear();
        assert!(cache.is_empty());
    }
}
