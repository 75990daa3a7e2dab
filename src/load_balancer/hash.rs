//! Stable client-key hashing.
//!
//! 32-bit FNV-1a over the key's UTF-8 bytes. The value is identical across
//! processes, restarts and platforms, so a client maps to the same index for an
//! unchanged pool ordering.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash of `bytes`.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Map a hash onto `0..len`.
///
/// The hash stays unsigned, so there is no magnitude step that could overflow.
/// Returns `None` when `len` is zero.
pub fn index_for_hash(hash: u32, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    // u32 always fits in u64, and the result is < len.
    Some((u64::from(hash) % len as u64) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_client_address_hash() {
        // High bit set: negative if read as i32.
        let hash = fnv1a_32(b"10.0.0.5");
        assert_eq!(hash, 0xdabe_b841);
        assert!((hash as i32) < 0);
        assert_eq!(index_for_hash(hash, 3), Some(0));
    }

    #[test]
    fn test_min_signed_bit_pattern() {
        let hash = i32::MIN as u32;
        assert_eq!(hash, 0x8000_0000);
        assert_eq!(index_for_hash(hash, 3), Some(2));
        assert_eq!(index_for_hash(hash, 7), Some(2));
        assert_eq!(index_for_hash(hash, 1), Some(0));
    }

    #[test]
    fn test_extremes_stay_in_range() {
        for len in 1..64 {
            for hash in [0, 1, u32::MAX, u32::MAX - 1, 0x8000_0000, 0x7fff_ffff] {
                let index = index_for_hash(hash, len).unwrap();
                assert!(index < len);
            }
        }
    }

    #[test]
    fn test_zero_len() {
        assert_eq!(index_for_hash(12345, 0), None);
    }
}
