use std::collections::VecDeque;

const FPS_SAMPLE_WINDOW: usize = 180;

#[derive(Debug, Default)]
pub(crate) struct FpsCounter {
    current: f32,
    samples: VecDeque<f32>,
}

impl FpsCounter {
    pub(crate) fn record(&mut self, dt: f32) {
        if dt <= f32::EPSILON {
            return;
        }

        self.current = (1.0 / dt).clamp(0.0, 1000.0);
        self.samples.push_back(self.current);
        while self.samples.len() > FPS_SAMPLE_WINDOW {
            self.samples.pop_front();
        }
    }

    pub(crate) fn display_text(&self) -> Option<String> {
        if self.samples.is_empty() {
            return None;
        }

        let mut parts = vec![format!("FPS {:.0}", self.current)];
        let avg = self.samples.iter().sum::<f32>() / self.samples.len() as f32;
        parts.push(format!("avg {:.1}", avg));
        if self.current > f32::EPSILON {
            parts.push(format!("{:.1} ms", 1000.0 / self.current));
        }

        Some(parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_a_bounded_window() {
        let mut fps = FpsCounter::default();
        assert_eq!(fps.display_text(), None);

        fps.record(0.0);
        assert_eq!(fps.display_text(), None);

        for _ in 0..500 {
            fps.record(0.02);
        }
        assert_eq!(fps.samples.len(), FPS_SAMPLE_WINDOW);
        assert_eq!(fps.display_text().as_deref(), Some("FPS 50 | avg 50.0 | 20.0 ms"));
    }
}
