//! PCG32 pseudo-random number generation: small state, good statistical
//! quality, and cheap enough for per-sample use. Deterministic given a
//! sequence index, which the Monte-Carlo tests rely on.

use crate::core::glint::Float;

pub const FLOAT_ONE_MINUS_EPSILON: Float = 0.99999994;
pub const PCG32_DEFAULT_STATE: u64 = 0x853c_49e6_748f_ea9b;
pub const PCG32_DEFAULT_STREAM: u64 = 0xda3e_39cb_94b9_5bdb;
pub const PCG32_MULT: u64 = 0x5851_f42d_4c95_7f2d;

#[derive(Debug, Copy, Clone)]
pub struct Rng {
    state: u64,
    inc: u64,
}

impl Default for Rng {
    fn default() -> Self {
        Rng {
            state: PCG32_DEFAULT_STATE,
            inc: PCG32_DEFAULT_STREAM,
        }
    }
}

impl Rng {
    pub fn new() -> Self {
        Rng::default()
    }
    pub fn set_sequence(&mut self, initseq: u64) {
        self.state = 0;
        self.inc = initseq.wrapping_shl(1) | 1;
        self.uniform_uint32();
        self.state = self.state.wrapping_add(PCG32_DEFAULT_STATE);
        self.uniform_uint32();
    }
    pub fn uniform_uint32(&mut self) -> u32 {
        let oldstate: u64 = self.state;
        self.state = oldstate.wrapping_mul(PCG32_MULT).wrapping_add(self.inc);
        let xorshifted: u32 = (((oldstate >> 18) ^ oldstate) >> 27) as u32;
        let rot: u32 = (oldstate >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
    pub fn uniform_uint32_bounded(&mut self, b: u32) -> u32 {
        let threshold = b.wrapping_neg() % b;
        loop {
            let r = self.uniform_uint32();
            if r >= threshold {
                return r % b;
            }
        }
    }
    pub fn uniform_float(&mut self) -> Float {
        (self.uniform_uint32() as Float * 2.328_306_4e-10).min(FLOAT_ONE_MINUS_EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_deterministic_and_distinct() {
        let mut a = Rng::new();
        let mut b = Rng::new();
        a.set_sequence(7);
        b.set_sequence(7);
        for _ in 0..16 {
            assert_eq!(a.uniform_uint32(), b.uniform_uint32());
        }
        let mut c = Rng::new();
        c.set_sequence(8);
        assert_ne!(a.uniform_uint32(), c.uniform_uint32());
    }

    #[test]
    fn floats_stay_in_unit_interval() {
        let mut rng = Rng::new();
        rng.set_sequence(1);
        let mut sum = 0.0f64;
        for _ in 0..10_000 {
            let u = rng.uniform_float();
            assert!((0.0..1.0).contains(&u));
            sum += u as f64;
        }
        // mean of U[0,1) within a loose bound
        assert!((sum / 10_000.0 - 0.5).abs() < 0.02);
    }
}
