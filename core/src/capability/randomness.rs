use std::fmt::Write as _;

/// A source of random bits.
///
/// The core never draws randomness on its own. Anything that needs fresh
/// identifiers takes an implementation of this trait.
pub trait Randomness {
    fn next_u64(&mut self) -> u64;

    fn fill_bytes(&mut self, out: &mut [u8]) {
        for chunk in out.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

/// Deterministic splitmix64 sequence for tests and replays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRandomness {
    state: u64,
}

impl SeededRandomness {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Derive an independent stream, e.g. one per producer in a run.
    #[must_use]
    pub fn fork(&self, stream: u64) -> Self {
        let mut mixer = Self::new(self.state ^ stream.rotate_left(32));
        Self::new(mixer.next_u64())
    }
}

impl Randomness for SeededRandomness {
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

/// Mints prefixed identifiers such as `proposal-3f09c1d2a4b5e6f7`.
#[derive(Debug, Clone)]
pub struct IdMinter<R> {
    randomness: R,
}

impl<R: Randomness> IdMinter<R> {
    pub fn new(randomness: R) -> Self {
        Self { randomness }
    }

    /// `prefix` followed by a dash and 16 hex characters.
    pub fn mint(&mut self, prefix: &str) -> String {
        let mut id = String::with_capacity(prefix.len() + 17);
        id.push_str(prefix);
        id.push('-');
        let _ = write!(id, "{:016x}", self.randomness.next_u64());
        id
    }
}
