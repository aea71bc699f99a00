use std::hash::Hasher;

use md5::{Digest, Md5};
use siphasher::sip::SipHasher;

/// Deterministic fixed-length digest over an arbitrary byte string.
///
/// The ring slices the digest output into non-overlapping 4-byte windows to
/// derive 32-bit positions, so implementations must produce at least 4 bytes;
/// shorter digests are rejected at ring construction. Digest computation must
/// be pure: same input, same output, no side effects, safe to run from
/// concurrent readers without synchronization.
pub trait RingDigest {
    /// Number of bytes every [`digest`](RingDigest::digest) call produces.
    fn output_len(&self) -> usize;

    /// Digest `input` into exactly [`output_len`](RingDigest::output_len) bytes.
    fn digest(&self, input: &[u8]) -> Vec<u8>;
}

/// 128-bit MD5 digest, the default. Four positions per digest call.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Md5Digest;

impl RingDigest for Md5Digest {
    fn output_len(&self) -> usize {
        16
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        Md5::digest(input).to_vec()
    }
}

/// 32-bit CRC checksum. One position per digest call: cheaper than [`Md5Digest`]
/// at the expense of collision rate.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Crc32Digest;

impl RingDigest for Crc32Digest {
    fn output_len(&self) -> usize {
        4
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        crc32fast::hash(input).to_le_bytes().to_vec()
    }
}

/// 64-bit SipHash-2-4 digest. Two positions per digest call.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct SipDigest;

impl RingDigest for SipDigest {
    fn output_len(&self) -> usize {
        8
    }

    fn digest(&self, input: &[u8]) -> Vec<u8> {
        let mut hasher = SipHasher::new();
        hasher.write(input);
        hasher.finish().to_le_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::{Crc32Digest, Md5Digest, RingDigest, SipDigest};

    #[test]
    fn md5_digest_is_16_bytes() {
        let digest = Md5Digest;
        assert_eq!(digest.output_len(), 16);
        assert_eq!(digest.digest(b"").len(), 16);
    }

    #[test]
    fn md5_digest_matches_reference() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        let expected = [
            0xd4, 0x1d, 0x8c, 0xd9, 0x8f, 0x00, 0xb2, 0x04, 0xe9, 0x80, 0x09, 0x98, 0xec, 0xf8,
            0x42, 0x7e,
        ];
        assert_eq!(Md5Digest.digest(b""), expected);
    }

    #[test]
    fn crc32_digest_matches_reference() {
        let digest = Crc32Digest;
        assert_eq!(digest.output_len(), 4);

        // standard CRC-32 check value: crc32("123456789") = 0xCBF43926
        assert_eq!(digest.digest(b"123456789"), 0xCBF43926u32.to_le_bytes());
        assert_eq!(digest.digest(b""), [0, 0, 0, 0]);
    }

    #[test]
    fn sip_digest_is_deterministic() {
        let digest = SipDigest;
        assert_eq!(digest.output_len(), 8);
        assert_eq!(digest.digest(b"some key"), digest.digest(b"some key"));
        assert_ne!(digest.digest(b"some key"), digest.digest(b"other key"));
    }
}
