// src/indicator/smoothing.rs
use super::Series;

/// Applies `f` to the defined samples of every trailing window of `window`
/// points (fewer at the head of the series). Windows with no defined sample
/// yield `None` without calling `f`.
pub(crate) fn rolling_apply<F>(values: &[Option<f64>], window: usize, mut f: F) -> Series
where
    F: FnMut(&[f64]) -> Option<f64>,
{
    let window = window.max(1);
    let mut buf = Vec::with_capacity(window);
    let mut out = Vec::with_capacity(values.len());
    for end in 0..values.len() {
        let start = (end + 1).saturating_sub(window);
        buf.clear();
        buf.extend(values[start..=end].iter().flatten().copied());
        out.push(if buf.is_empty() { None } else { f(&buf) });
    }
    out
}

/// Trailing arithmetic mean with a minimum of one defined sample.
#[derive(Debug, Clone, Copy)]
pub struct RollingMean {
    pub window: usize,
}

pub type InputSmoother = RollingMean;
pub type OutputSmoother = RollingMean;

impl RollingMean {
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1) }
    }

    pub fn smooth(&self, values: &[Option<f64>]) -> Series {
        rolling_apply(values, self.window, |xs| Some(xs.iter().sum::<f64>() / xs.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_sequence_is_fixed_point() {
        let xs = vec![Some(7.25); 40];
        for w in [1, 3, 10, 100] {
            let out = RollingMean::new(w).smooth(&xs);
            assert_eq!(out.len(), xs.len());
            assert!(out.iter().all(|v| *v == Some(7.25)), "window {w}");
        }
    }

    #[test]
    fn head_uses_available_samples() {
        let xs = [Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let out = RollingMean::new(3).smooth(&xs);
        assert_eq!(out, vec![Some(1.0), Some(1.5), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn undefined_samples_are_excluded() {
        let xs = [None, Some(2.0), None, Some(4.0), None, None];
        let out = RollingMean::new(2).smooth(&xs);
        assert_eq!(out, vec![None, Some(2.0), Some(2.0), Some(4.0), Some(4.0), None]);
    }

    #[test]
    fn empty_input() {
        assert!(RollingMean::new(5).smooth(&[]).is_empty());
    }
}
