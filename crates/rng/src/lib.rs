use sha3::{digest::{ExtendableOutput, Update, XofReader}, Shake256};

/// Deterministic counter-mode stream generator over SHAKE256.
///
/// Every draw is tagged with a context label so independent consumers
/// (tensor initialisation, noise, ...) never alias each other's values.
#[derive(Clone)]
pub struct ONDRng {
    state: [u8; 32],
    step: u64,
}

impl ONDRng {
    pub fn new(seed: &[u8]) -> Self {
        let mut state = [0u8; 32];
        shake(&[seed, b"OND_INIT"], &mut state);
        Self { state, step: 0 }
    }

    /// Stream keyed by a human-readable label, e.g. `"seed-j-3-state-1"`.
    pub fn from_label(label: &str) -> Self {
        Self::new(label.as_bytes())
    }

    /// Uniform in `[0, 1]`.
    pub fn next_f64(&mut self, ctx: &[u8]) -> f64 {
        self.advance();

        let mut out = [0u8; 8];
        shake(&[&self.state, ctx], &mut out);

        (u64::from_be_bytes(out) as f64) / (u64::MAX as f64)
    }

    /// Standard normal draw (Box-Muller, one value per call).
    pub fn next_gaussian(&mut self, ctx: &[u8]) -> f64 {
        let mut u1 = self.next_f64(ctx);
        while u1 <= f64::MIN_POSITIVE {
            u1 = self.next_f64(ctx);
        }
        let u2 = self.next_f64(ctx);
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn advance(&mut self) {
        self.step += 1;

        let state = self.state;
        let step_bytes = self.step.to_be_bytes();
        let mut next_state = self.state;
        shake(&[&state, &step_bytes, b"QSIM"], &mut next_state);
        self.state = next_state;

        if self.state[0] < 16 {
            let state = self.state;
            let mut next_state = self.state;
            shake(&[&state, b"SKIP"], &mut next_state);
            self.state = next_state;
        }
    }
}

fn shake(parts: &[&[u8]], out: &mut [u8]) {
    let mut h = Shake256::default();
    for p in parts {
        h.update(p);
    }
    let mut r = h.finalize_xof();
    r.read(out);
}

#[cfg(test)]
mod tests {
    use super::ONDRng;

    #[test]
    fn same_label_same_stream() {
        let mut a = ONDRng::from_label("seed-j-0-state-1");
        let mut b = ONDRng::from_label("seed-j-0-state-1");
        for _ in 0..16 {
            assert_eq!(a.next_f64(b"T").to_bits(), b.next_f64(b"T").to_bits());
        }
    }

    #[test]
    fn different_labels_diverge() {
        let mut a = ONDRng::from_label("seed-state-0");
        let mut b = ONDRng::from_label("seed-state-1");
        let same = (0..8).filter(|_| a.next_f64(b"T") == b.next_f64(b"T")).count();
        assert!(same < 8);
    }

    #[test]
    fn draws_stay_in_range() {
        let mut rng = ONDRng::new(b"range");
        for _ in 0..1000 {
            let u = rng.next_f64(b"U");
            assert!((0.0..=1.0).contains(&u), "u = {}", u);
            assert!(rng.next_gaussian(b"G").is_finite());
        }
    }

    #[test]
    fn gaussian_draws_have_unit_variance() {
        let mut rng = ONDRng::from_label("moments");
        let n = 20_000;
        let xs: Vec<f64> = (0..n).map(|_| rng.next_gaussian(b"G")).collect();
        let mean = xs.iter().sum::<f64>() / n as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean = {}", mean);
        assert!((var - 1.0).abs() < 0.05, "var = {}", var);
    }
}
