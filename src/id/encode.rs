//! Digest-to-suffix encoding.
//!
//! Turns raw hash bytes into a fixed-length suffix. The number of digest
//! bytes consumed grows with the requested length so that longer suffixes
//! actually carry more of the digest's entropy instead of restyling the
//! same slice.

/// Supported suffix lengths.
pub const MIN_SUFFIX_LENGTH: usize = 3;
pub const MAX_SUFFIX_LENGTH: usize = 8;

const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const HEX_ALPHABET: &[u8; 16] = b"0123456789abcdef";

/// Suffix encoding mode.
///
/// `Hex` exists for databases minted before the base36 switch; new
/// databases always use `Base36`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Base36,
    Hex,
}

impl Encoding {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base36 => "base36",
            Self::Hex => "hex",
        }
    }

    /// Parse from a config value; unknown values fall back to base36.
    #[must_use]
    pub fn from_config(value: &str) -> Self {
        match value {
            "hex" => Self::Hex,
            _ => Self::Base36,
        }
    }
}

/// Digest bytes consumed for a base36 suffix of each length 3..=8.
///
/// Chosen so the byte count supplies at least `length * log2(36)` bits
/// (5.17 bits per character).
const BASE36_BYTES: [usize; 6] = [2, 3, 4, 4, 5, 6];

/// Encode `digest` as a suffix of exactly `length` characters.
///
/// Deterministic: identical digest and length always produce the same
/// string. Out-of-range lengths are clamped to `[3, 8]`.
#[must_use]
pub fn encode_suffix(digest: &[u8; 32], length: usize, encoding: Encoding) -> String {
    let length = length.clamp(MIN_SUFFIX_LENGTH, MAX_SUFFIX_LENGTH);
    match encoding {
        Encoding::Base36 => encode_base36(digest, length),
        Encoding::Hex => encode_hex(digest, length),
    }
}

/// Base36: consume the leading `BASE36_BYTES[length-3]` digest bytes as a
/// big-endian integer, keep the least-significant `length` base36 digits,
/// left-padding with `0`.
fn encode_base36(digest: &[u8; 32], length: usize) -> String {
    let nbytes = BASE36_BYTES[length - MIN_SUFFIX_LENGTH];
    let mut value: u64 = 0;
    for &byte in &digest[..nbytes] {
        value = (value << 8) | u64::from(byte);
    }

    let mut out = vec![b'0'; length];
    for slot in out.iter_mut().rev() {
        *slot = BASE36_ALPHABET[(value % 36) as usize];
        value /= 36;
    }
    String::from_utf8(out).unwrap_or_default()
}

/// Hex: encode the leading `ceil(length / 2)` digest bytes, truncated to
/// `length` characters. Matches the historical on-disk format.
fn encode_hex(digest: &[u8; 32], length: usize) -> String {
    let nbytes = length.div_ceil(2);
    let mut out = String::with_capacity(nbytes * 2);
    for &byte in &digest[..nbytes] {
        out.push(HEX_ALPHABET[(byte >> 4) as usize] as char);
        out.push(HEX_ALPHABET[(byte & 0x0f) as usize] as char);
    }
    out.truncate(length);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(fill: u8) -> [u8; 32] {
        [fill; 32]
    }

    #[test]
    fn base36_exact_length_and_alphabet() {
        let digest = crate::id::hash::candidate_digest("test input");
        for length in MIN_SUFFIX_LENGTH..=MAX_SUFFIX_LENGTH {
            let s = encode_suffix(&digest, length, Encoding::Base36);
            assert_eq!(s.len(), length);
            assert!(
                s.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()),
                "bad char in {s}"
            );
        }
    }

    #[test]
    fn hex_exact_length_and_alphabet() {
        let digest = crate::id::hash::candidate_digest("test input");
        for length in MIN_SUFFIX_LENGTH..=MAX_SUFFIX_LENGTH {
            let s = encode_suffix(&digest, length, Encoding::Hex);
            assert_eq!(s.len(), length);
            assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn zero_digest_pads_with_zero_symbol() {
        let s = encode_suffix(&digest_of(0), 6, Encoding::Base36);
        assert_eq!(s, "000000");
    }

    #[test]
    fn longer_suffix_consumes_more_entropy() {
        // Two digests that agree on the first 3 bytes but differ later
        // must encode identically at length 4 and differently at length 8.
        let mut a = digest_of(0xab);
        let mut b = digest_of(0xab);
        a[5] = 0x01;
        b[5] = 0x02;
        assert_eq!(
            encode_suffix(&a, 4, Encoding::Base36),
            encode_suffix(&b, 4, Encoding::Base36)
        );
        assert_ne!(
            encode_suffix(&a, 8, Encoding::Base36),
            encode_suffix(&b, 8, Encoding::Base36)
        );
    }

    #[test]
    fn deterministic_for_same_input() {
        let digest = crate::id::hash::candidate_digest("stable");
        assert_eq!(
            encode_suffix(&digest, 6, Encoding::Base36),
            encode_suffix(&digest, 6, Encoding::Base36)
        );
    }

    #[test]
    fn out_of_range_lengths_clamp() {
        let digest = digest_of(0x5a);
        assert_eq!(encode_suffix(&digest, 1, Encoding::Base36).len(), 3);
        assert_eq!(encode_suffix(&digest, 99, Encoding::Base36).len(), 8);
    }

    #[test]
    fn hex_matches_leading_bytes() {
        let mut digest = digest_of(0);
        digest[0] = 0xa3;
        digest[1] = 0xf8;
        digest[2] = 0xe9;
        assert_eq!(encode_suffix(&digest, 6, Encoding::Hex), "a3f8e9");
        assert_eq!(encode_suffix(&digest, 5, Encoding::Hex), "a3f8e");
    }
}
