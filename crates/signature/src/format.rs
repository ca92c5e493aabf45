//! crates/signature/src/format.rs
//!
//! Signature format tags and their wire magics.

use checksums::StrongAlgorithm;

/// Magic for MD4-family signatures (`"rds1"`).
const MD4_SIG_MAGIC: u32 = 0x7264_7331;

/// Magic for MD5-family signatures (`"rds2"`).
const MD5_SIG_MAGIC: u32 = 0x7264_7332;

/// Selects the checksum algorithm family embedded in a signature.
///
/// The format is fixed when the signature is generated and travels in the
/// signature header, so the delta side never has to guess.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum SignatureFormat {
    /// MD4 strong sums.
    Md4,
    /// MD5 strong sums.
    #[default]
    Md5,
}

impl SignatureFormat {
    /// Returns the 32-bit magic identifying this format on the wire.
    #[must_use]
    pub const fn magic(self) -> u32 {
        match self {
            Self::Md4 => MD4_SIG_MAGIC,
            Self::Md5 => MD5_SIG_MAGIC,
        }
    }

    /// Resolves a wire magic back into a format tag.
    #[must_use]
    pub const fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            MD4_SIG_MAGIC => Some(Self::Md4),
            MD5_SIG_MAGIC => Some(Self::Md5),
            _ => None,
        }
    }

    /// Returns the strong checksum algorithm behind this format.
    #[must_use]
    pub const fn algorithm(self) -> StrongAlgorithm {
        match self {
            Self::Md4 => StrongAlgorithm::Md4,
            Self::Md5 => StrongAlgorithm::Md5,
        }
    }

    /// Returns the full digest width of the format's strong sum.
    #[must_use]
    pub const fn digest_len(self) -> usize {
        self.algorithm().digest_len()
    }
}

impl std::fmt::Display for SignatureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md4 => f.write_str("md4"),
            Self::Md5 => f.write_str("md5"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_round_trips() {
        for format in [SignatureFormat::Md4, SignatureFormat::Md5] {
            assert_eq!(SignatureFormat::from_magic(format.magic()), Some(format));
        }
    }

    #[test]
    fn unknown_magic_is_rejected() {
        assert_eq!(SignatureFormat::from_magic(0xdead_beef), None);
    }

    #[test]
    fn default_format_is_md5() {
        assert_eq!(SignatureFormat::default(), SignatureFormat::Md5);
    }
}
