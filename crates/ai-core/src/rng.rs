//! Deterministic RNG helpers.
//!
//! Small and dependency-free. It is **not** cryptographic.

pub trait DeterministicRng {
    fn next_u64(&mut self) -> u64;

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_f32_unit(&mut self) -> f32 {
        // 24 bits of mantissa -> [0, 1)
        let x = self.next_u32() >> 8;
        (x as f32) / ((1u32 << 24) as f32)
    }

    fn next_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }

    /// Uniform integer in `[0, bound)`. Returns 0 when `bound == 0`.
    ///
    /// Uses Lemire's multiply-shift reduction; the bias is at most `bound / 2^64`.
    fn next_below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        ((self.next_u64() as u128 * bound as u128) >> 64) as u64
    }
}

/// SplitMix64: good seeding RNG and small deterministic generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn state(&self) -> u64 {
        self.state
    }
}

impl DeterministicRng for SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        mix64(self.state)
    }
}

pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

pub fn derive_seed(global_seed: u64, agent_id: u64, stream: u64) -> u64 {
    let x = global_seed ^ mix64(agent_id.wrapping_add(0x9E3779B97F4A7C15)) ^ mix64(stream);
    mix64(x)
}

/// Weighted draw over `weights`, returning the chosen index.
///
/// Zero-weight entries only take part when every weight is zero; in that case the draw is uniform
/// over all entries. Returns `None` for an empty slice.
pub fn pick_weighted<R: DeterministicRng + ?Sized>(rng: &mut R, weights: &[u32]) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }

    let total: u64 = weights.iter().map(|&w| w as u64).sum();
    if total == 0 {
        return Some(rng.next_below(weights.len() as u64) as usize);
    }

    let mut roll = rng.next_below(total);
    for (i, &w) in weights.iter().enumerate() {
        let w = w as u64;
        if roll < w {
            return Some(i);
        }
        roll -= w;
    }

    // Unreachable for a consistent `total`; fall back to the last positive entry.
    weights.iter().rposition(|&w| w > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SplitMix64::new(7);
        let mut b = SplitMix64::new(7);
        for _ in 0..16 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn next_below_stays_in_range() {
        let mut rng = SplitMix64::new(99);
        for bound in [1u64, 2, 3, 10, 1000] {
            for _ in 0..200 {
                assert!(rng.next_below(bound) < bound);
            }
        }
        assert_eq!(rng.next_below(0), 0);
    }

    #[test]
    fn pick_weighted_skips_zero_weights() {
        let mut rng = SplitMix64::new(3);
        for _ in 0..1000 {
            assert_eq!(pick_weighted(&mut rng, &[0, 5, 0]), Some(1));
        }
    }

    #[test]
    fn pick_weighted_all_zero_is_uniform_over_entries() {
        let mut rng = SplitMix64::new(11);
        let mut seen = [0u32; 3];
        for _ in 0..3000 {
            seen[pick_weighted(&mut rng, &[0, 0, 0]).unwrap()] += 1;
        }
        assert!(seen.iter().all(|&n| n > 800), "{seen:?}");
        assert_eq!(pick_weighted(&mut rng, &[]), None);
    }
}
