use std::num::NonZeroU32;

use rand::RngCore;
use thiserror::Error;

/// Second state word used when expanding a 32-bit seed.
const XOROSHIRO_CONST: u64 = 0x82A2_B175_229D_6A5B;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("bounded draw requested with a zero bound")]
pub struct InvalidBound;

/// Xoroshiro128+ seeded the way the raid engine seeds it: the seed becomes
/// the first state word and the second word is a fixed constant.
#[derive(Debug, Clone)]
pub struct Xoroshiro128Plus {
    s0: u64,
    s1: u64,
}

impl Xoroshiro128Plus {
    pub fn new(seed: u32) -> Self {
        Self::from_state(u64::from(seed), XOROSHIRO_CONST)
    }

    pub fn from_state(s0: u64, s1: u64) -> Self {
        Self { s0, s1 }
    }

    pub fn state(&self) -> (u64, u64) {
        (self.s0, self.s1)
    }

    pub fn next(&mut self) -> u64 {
        let s0 = self.s0;
        let mut s1 = self.s1;
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.s0 = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.s1 = s1.rotate_left(37);

        result
    }

    /// Draw a value in `[0, bound)`.
    ///
    /// Raw outputs are masked down to the smallest all-ones mask covering
    /// `bound - 1` and redrawn until they fall under `bound`, so one call may
    /// consume several outputs.
    pub fn next_bounded(&mut self, bound: u32) -> Result<u32, InvalidBound> {
        let bound = NonZeroU32::new(bound).ok_or(InvalidBound)?;
        Ok(self.next_below(bound))
    }

    pub fn next_below(&mut self, bound: NonZeroU32) -> u32 {
        let bound = u64::from(bound.get());
        let mask = bitmask(bound);
        loop {
            let value = self.next() & mask;
            if value < bound {
                // value < bound <= u32::MAX
                return value as u32;
            }
        }
    }
}

fn bitmask(bound: u64) -> u64 {
    let mut x = bound - 1;
    x |= x >> 1;
    x |= x >> 2;
    x |= x >> 4;
    x |= x >> 8;
    x |= x >> 16;
    x |= x >> 32;
    x
}

impl RngCore for Xoroshiro128Plus {
    fn next_u32(&mut self) -> u32 {
        self.next() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
