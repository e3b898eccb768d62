use converge_types::ContentHash;

/// Content fingerprinting.
///
/// Implementations must be deterministic: the same bytes always produce the
/// same hash. Collision resistance is the implementation's concern; the core
/// only compares hashes for equality.
pub trait Fingerprint: Send + Sync {
    fn fingerprint(&self, bytes: &[u8]) -> ContentHash;
}

const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const LANE_OFFSETS: [u64; 4] = [
    0xcbf2_9ce4_8422_2325,
    0x9e37_79b9_7f4a_7c15,
    0xc2b2_ae3d_27d4_eb4f,
    0x1656_67b1_9e37_79f9,
];

/// Four independently seeded FNV-1a lanes.
///
/// Stable across platforms and releases, but not collision resistant. Use it
/// for tests and replays; production deployments supply a cryptographic
/// digest.
#[derive(Debug, Clone, Copy, Default)]
pub struct StableFingerprint;

impl Fingerprint for StableFingerprint {
    fn fingerprint(&self, bytes: &[u8]) -> ContentHash {
        let mut out = [0u8; ContentHash::LEN];
        for (lane, (offset, chunk)) in LANE_OFFSETS
            .iter()
            .zip(out.chunks_exact_mut(8))
            .enumerate()
        {
            let mut hash = *offset ^ (lane as u64);
            for byte in bytes {
                hash ^= u64::from(*byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
            hash ^= bytes.len() as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
            chunk.copy_from_slice(&hash.to_le_bytes());
        }
        ContentHash::from_bytes(out)
    }
}
