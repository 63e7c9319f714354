// ============================================================
// Layer 4 — Coulomb-Counting Baseline
// ============================================================
// The physics estimator the learned model is compared against
// and, in residual mode, corrects.
//
//   SOC₀     = 1.0
//   SOCₖ     = clip( SOCₖ₋₁ − Iₖ·Δt / (C·3600), 0, 1 )
//
// with I in amps (positive = discharge), Δt in seconds and C the
// nominal capacity in amp-hours. Clipping after every step keeps
// the output in [0, 1] for noisy, negative or oversized currents.
//
// Reference: Plett (2015) Battery Management Systems, Vol. I §1.4

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Integrates a current trace into an SOC estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoulombCounter {
    /// Seconds between consecutive samples
    pub time_step: f64,
    /// Amp-hours
    pub capacity: f64,
}

impl CoulombCounter {
    pub fn new(time_step: f64, capacity: f64) -> Self {
        Self { time_step, capacity }
    }

    /// SOC after each sample; same length as `current`.
    pub fn estimate(&self, current: &[f64]) -> Vec<f64> {
        let denom = self.capacity * SECONDS_PER_HOUR;
        let mut soc = 1.0f64;
        current
            .iter()
            .map(|&i| {
                let step = i * self.time_step / denom;
                // A NaN step leaves the state unchanged rather than poisoning it
                if step.is_finite() {
                    soc = (soc - step).clamp(0.0, 1.0);
                } else if step.is_infinite() {
                    soc = if step > 0.0 { 0.0 } else { 1.0 };
                }
                soc
            })
            .collect()
    }
}
