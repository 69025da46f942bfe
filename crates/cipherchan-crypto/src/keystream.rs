//! Seed-reproducible keystream for the XOR stage.
//!
//! The generator is MT19937 (32-bit Mersenne Twister) seeded with the
//! `init_by_array` routine of the 2002 reference code, the key being the
//! absolute seed split into little-endian 32-bit words. A draw in
//! `[DRAW_MIN, DRAW_MAX]` takes the top `bit_length(9000)` bits of successive
//! outputs and rejects anything out of range.
//!
//! Every secret key ever issued depends on this exact sequence. Do not touch
//! the constants or the draw procedure.

/// Seed for channel `id` is `SEED_BASE + id`.
pub const SEED_BASE: i64 = 12345;
pub const DRAW_MIN: i64 = 1000;
pub const DRAW_MAX: i64 = 9999;

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_b0df;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7fff_ffff;

/// Plain MT19937. Callers normally go through [`Keystream`].
pub struct Mt19937 {
    state: [u32; N],
    index: usize,
}

impl Mt19937 {
    pub fn new(seed: u64) -> Self {
        let key: Vec<u32> = if seed >> 32 == 0 {
            vec![seed as u32]
        } else {
            vec![seed as u32, (seed >> 32) as u32]
        };

        Self {
            state: init_by_array(&key),
            index: N,
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        if self.index >= N {
            self.twist();
        }

        let mut y = self.state[self.index];
        self.index += 1;

        y ^= y >> 11;
        y ^= (y << 7) & 0x9d2c_5680;
        y ^= (y << 15) & 0xefc6_0000;
        y ^= y >> 18;
        y
    }

    /// Uniform integer in `[0, n)` by rejection sampling on the top bits.
    fn below(&mut self, n: u32) -> u32 {
        let bits = u32::BITS - n.leading_zeros();
        loop {
            let r = self.next_u32() >> (32 - bits);
            if r < n {
                return r;
            }
        }
    }

    fn twist(&mut self) {
        for kk in 0..N {
            let y = (self.state[kk] & UPPER_MASK) | (self.state[(kk + 1) % N] & LOWER_MASK);
            let mut next = self.state[(kk + M) % N] ^ (y >> 1);
            if y & 1 != 0 {
                next ^= MATRIX_A;
            }
            self.state[kk] = next;
        }
        self.index = 0;
    }
}

fn init_genrand(seed: u32) -> [u32; N] {
    let mut mt = [0u32; N];
    mt[0] = seed;
    for i in 1..N {
        mt[i] = 1_812_433_253u32
            .wrapping_mul(mt[i - 1] ^ (mt[i - 1] >> 30))
            .wrapping_add(i as u32);
    }
    mt
}

fn init_by_array(key: &[u32]) -> [u32; N] {
    let mut mt = init_genrand(19_650_218);
    let mut i = 1;
    let mut j = 0;

    for _ in 0..N.max(key.len()) {
        let prev = mt[i - 1] ^ (mt[i - 1] >> 30);
        mt[i] = (mt[i] ^ prev.wrapping_mul(1_664_525))
            .wrapping_add(key[j])
            .wrapping_add(j as u32);
        i += 1;
        j += 1;
        if i >= N {
            mt[0] = mt[N - 1];
            i = 1;
        }
        if j >= key.len() {
            j = 0;
        }
    }

    for _ in 0..N - 1 {
        let prev = mt[i - 1] ^ (mt[i - 1] >> 30);
        mt[i] = (mt[i] ^ prev.wrapping_mul(1_566_083_941)).wrapping_sub(i as u32);
        i += 1;
        if i >= N {
            mt[0] = mt[N - 1];
            i = 1;
        }
    }

    mt[0] = 0x8000_0000;
    mt
}

/// Absolute value of `SEED_BASE + channel_id`, computed without overflow.
pub fn seed_for_channel(channel_id: i64) -> u64 {
    // |i64| + 12345 always fits in 64 bits
    (i128::from(SEED_BASE) + i128::from(channel_id)).unsigned_abs() as u64
}

/// Endless stream of draws in `[DRAW_MIN, DRAW_MAX]` for one channel.
///
/// Each encode or decode call builds a fresh stream; the i-th element of a
/// sequence is always combined with the i-th draw.
pub struct Keystream {
    rng: Mt19937,
}

impl Keystream {
    pub fn for_channel(channel_id: i64) -> Self {
        Self {
            rng: Mt19937::new(seed_for_channel(channel_id)),
        }
    }

    pub fn next_draw(&mut self) -> i64 {
        let span = (DRAW_MAX - DRAW_MIN + 1) as u32;
        DRAW_MIN + i64::from(self.rng.below(span))
    }
}

impl Iterator for Keystream {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        Some(self.next_draw())
    }
}
