// src/indicator/dampening.rs
use super::Series;

/// Rate-limited tracker in log space: each step moves the held value by at
/// most `k * stdev_t` in log terms.
#[derive(Debug, Clone, Copy)]
pub struct DampeningFilter {
    pub k: f64,
    value: Option<f64>,
}

impl DampeningFilter {
    pub fn new(k: f64) -> Self {
        Self { k, value: None }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Feed one smoothed regression value and the matching return stdev.
    pub fn step(&mut self, target: Option<f64>, stdev: Option<f64>) -> Option<f64> {
        let prev = match self.value {
            None => {
                self.value = target;
                return self.value;
            }
            Some(prev) => prev,
        };
        let dev = if prev != 0.0 {
            target.map(|s| (s / prev).ln()).filter(|d| !d.is_nan())
        } else {
            Some(0.0)
        };
        let threshold = stdev.map(|sd| self.k * sd);
        if let (Some(d), Some(theta)) = (dev, threshold) {
            let adjusted = if d.abs() > theta { d.signum() * theta } else { d };
            self.value = Some(prev * adjusted.exp());
        }
        self.value
    }

    /// Ordered fold over the whole series; element `t` is the held value
    /// after step `t`.
    pub fn run(k: f64, targets: &[Option<f64>], stdevs: &[Option<f64>]) -> Series {
        targets
            .iter()
            .zip(stdevs)
            .scan(Self::new(k), |filter, (s, sd)| Some(filter.step(*s, *sd)))
            .collect()
    }
}
