// Minimal PRNG (no external crates).
//
// This is NOT cryptographically secure.
// Every draw of the task (durations, targets, coherences, input noise) comes from
// one owned instance so that seeded episodes are reproducible.

#[derive(Debug, Clone)]
pub struct Prng {
    state: u64,
    // Second Box-Muller output, consumed by the next `next_gaussian` call.
    spare_gaussian: Option<f64>,
}

impl Prng {
    pub const DEFAULT_SEED: u64 = 0x9E3779B97F4A7C15;

    pub fn new(seed: u64) -> Self {
        // Avoid a zero state.
        let seed = if seed == 0 { Self::DEFAULT_SEED } else { seed };
        Self {
            state: seed,
            spare_gaussian: None,
        }
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform in `[0, 1)` with 53 bits of precision.
    #[inline]
    pub fn next_f64_01(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    #[inline]
    pub fn gen_range_usize(&mut self, low: usize, high: usize) -> usize {
        if high <= low {
            return low;
        }
        let span = (high - low) as u64;
        let v = self.next_u64() % span;
        low + v as usize
    }

    /// Uniformly pick one element of `items`.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.gen_range_usize(0, items.len()))
    }

    /// Standard normal draw (Box-Muller).
    pub fn next_gaussian(&mut self) -> f64 {
        if let Some(z) = self.spare_gaussian.take() {
            return z;
        }
        // u1 in (0, 1] so ln(u1) stays finite.
        let u1 = 1.0 - self.next_f64_01();
        let u2 = self.next_f64_01();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = std::f64::consts::TAU * u2;
        self.spare_gaussian = Some(r * theta.sin());
        r * theta.cos()
    }

    /// Exponential draw with the given mean.
    pub fn next_exp(&mut self, mean: f64) -> f64 {
        let u = 1.0 - self.next_f64_01();
        -mean * u.ln()
    }

    /// Exponential draw with the given mean restricted to `[min, max)`.
    ///
    /// Sampled through the inverse CDF of the truncated distribution, which is
    /// equivalent to redrawing until the value lands inside the bounds but always
    /// takes a single draw. Returns `max` when the bounds are empty.
    pub fn trunc_exp(&mut self, mean: f64, min: f64, max: f64) -> f64 {
        if min >= max {
            return max;
        }
        if mean <= 0.0 {
            return min;
        }
        if !max.is_finite() {
            return min + self.next_exp(mean);
        }
        let u = self.next_f64_01();
        let mass = 1.0 - (-(max - min) / mean).exp();
        let x = min - mean * (1.0 - u * mass).ln();
        x.clamp(min, max)
    }
}

impl Default for Prng {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = Prng::new(7);
        let mut b = Prng::new(7);
        for _ in 0..64 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
        assert_eq!(a.next_gaussian().to_bits(), b.next_gaussian().to_bits());
    }

    #[test]
    fn zero_seed_is_not_stuck() {
        let mut rng = Prng::new(0);
        let x = rng.next_u32();
        let y = rng.next_u32();
        assert_ne!(x, y);
    }

    #[test]
    fn trunc_exp_stays_in_bounds() {
        let mut rng = Prng::new(42);
        for _ in 0..2_000 {
            let x = rng.trunc_exp(330.0, 100.0, 1500.0);
            assert!((100.0..=1500.0).contains(&x), "x={x}");
        }
        assert_eq!(rng.trunc_exp(330.0, 200.0, 200.0), 200.0);
        assert_eq!(rng.trunc_exp(330.0, 300.0, 200.0), 200.0);
    }

    #[test]
    fn trunc_exp_mean_is_below_untruncated_mean() {
        // Truncating above pulls the mean down; the lower bound pushes it up by `min`.
        let mut rng = Prng::new(3);
        let n = 20_000;
        let sum: f64 = (0..n).map(|_| rng.trunc_exp(330.0, 0.0, 1500.0)).sum();
        let mean = sum / n as f64;
        assert!(mean > 250.0 && mean < 330.0, "mean={mean}");
    }

    #[test]
    fn unbounded_trunc_exp_is_a_shifted_exponential() {
        let mut rng = Prng::new(9);
        let n = 20_000;
        let xs: Vec<f64> = (0..n)
            .map(|_| rng.trunc_exp(330.0, 80.0, f64::INFINITY))
            .collect();
        assert!(xs.iter().all(|&x| x >= 80.0 && x.is_finite()));
        let mean = xs.iter().sum::<f64>() / n as f64;
        assert!((mean - 410.0).abs() < 15.0, "mean={mean}");
    }

    #[test]
    fn next_exp_mean_matches() {
        let mut rng = Prng::new(13);
        let n = 20_000;
        let mean = (0..n).map(|_| rng.next_exp(2.0)).sum::<f64>() / n as f64;
        assert!((mean - 2.0).abs() < 0.1, "mean={mean}");
    }

    #[test]
    fn gaussian_moments_are_plausible() {
        let mut rng = Prng::new(11);
        let n = 20_000;
        let xs: Vec<f64> = (0..n).map(|_| rng.next_gaussian()).collect();
        let mean = xs.iter().sum::<f64>() / n as f64;
        let var = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean={mean}");
        assert!((var - 1.0).abs() < 0.05, "var={var}");
    }

    #[test]
    fn choose_covers_all_items() {
        let mut rng = Prng::new(5);
        let items = [1usize, 2, 3];
        let mut seen = [false; 3];
        for _ in 0..200 {
            let v = *rng.choose(&items).unwrap();
            seen[v - 1] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert!(rng.choose::<usize>(&[]).is_none());
    }
}
