//! Self-verifying values: `len: u64 LE || payload || sha256(payload)`.
//!
//! A reader can tell a whole value from one that was truncated, spliced from two writes
//! or read while being rewritten, without knowing which write it came from.

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};
use sha2::{Digest, Sha256};

const LEN_BYTES: usize = size_of::<u64>();
const DIGEST_BYTES: usize = 32;

/// Builds a sealed value of `len` payload bytes derived from `seed`.
pub(crate) fn seal(seed: u64, len: usize) -> Vec<u8> {
    let mut value = Vec::with_capacity(LEN_BYTES + len + DIGEST_BYTES);
    value.extend_from_slice(&(len as u64).to_le_bytes());

    let mut payload = vec![0u8; len];
    SmallRng::seed_from_u64(seed).fill_bytes(&mut payload);
    value.extend_from_slice(&payload);

    let digest = Sha256::digest(&value[LEN_BYTES..]);
    value.extend_from_slice(&digest);
    value
}

/// Whether `value` is exactly one sealed value, whole.
pub(crate) fn verify(value: &[u8]) -> bool {
    let Some((len, rest)) = value.split_first_chunk::<LEN_BYTES>() else {
        return false;
    };
    let Ok(len) = usize::try_from(u64::from_le_bytes(*len)) else {
        return false;
    };
    if len.checked_add(DIGEST_BYTES) != Some(rest.len()) {
        return false;
    }

    let (payload, digest) = rest.split_at(len);
    Sha256::digest(payload).as_slice() == digest
}
