pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    /// Exponential smoothing toward `observed`; `alpha` of 1 keeps only the observation.
    pub fn smooth(previous: f64, observed: f64, alpha: f64) -> f64 {
        let alpha = alpha.clamp(0.0, 1.0);
        alpha * observed + (1.0 - alpha) * previous
    }
}
