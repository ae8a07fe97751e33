//! Error types for cipher seed operations.

use core::fmt;

/// Which authentication layer rejected a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The CRC-32C over the enciphered bytes did not match, usually a mistyped
    /// or swapped word.
    Checksum,
    /// The AEZ authenticator did not verify. Either the passphrase is wrong or
    /// the words are corrupted in a way the checksum did not catch.
    Passphrase,
}

/// Errors that can occur while creating, encoding or decoding a cipher seed.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// The phrase did not contain exactly 24 words.
    InvalidWordCount(usize),
    /// A token is not a word of the list and not a unique prefix of one.
    UnknownWord {
        /// Zero-based position of the token in the phrase.
        position: usize,
        /// The token as typed.
        word: String,
    },
    /// A token is a prefix of several words.
    AmbiguousWord {
        /// Zero-based position of the token in the phrase.
        position: usize,
        /// The token as typed.
        prefix: String,
        /// Words that match the prefix.
        candidates: Vec<String>,
    },
    /// The encoding version byte is not one this library understands.
    UnsupportedVersion(u8),
    /// The mnemonic failed authentication.
    Authentication(AuthFailure),
    /// scrypt rejected its parameters or output length.
    KeyDerivation,
    /// The operating system random source failed.
    Entropy(rand_core::Error),
}

impl Error {
    /// Whether the input was malformed, as opposed to well formed but
    /// failing authentication.
    #[must_use]
    pub const fn is_format(&self) -> bool {
        matches!(
            self,
            Self::InvalidWordCount(_)
                | Self::UnknownWord { .. }
                | Self::AmbiguousWord { .. }
                | Self::UnsupportedVersion(_)
        )
    }

    /// Whether the input was rejected by the checksum or the authenticator.
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidWordCount(n) => write!(f, "invalid word count {n}, must be 24"),
            Self::UnknownWord { position, word } => {
                write!(f, "word {} \"{word}\" is not in the word list", position + 1)
            }
            Self::AmbiguousWord {
                position,
                prefix,
                candidates,
            } => write!(
                f,
                "word {} \"{prefix}\" is ambiguous, matches: {}",
                position + 1,
                candidates.join(", ")
            ),
            Self::UnsupportedVersion(v) => write!(f, "unsupported cipher seed version {v}"),
            Self::Authentication(AuthFailure::Checksum) => {
                write!(f, "checksum mismatch, check the words for typos")
            }
            Self::Authentication(AuthFailure::Passphrase) => {
                write!(f, "invalid passphrase or corrupted mnemonic")
            }
            Self::KeyDerivation => write!(f, "scrypt key derivation failed"),
            Self::Entropy(e) => write!(f, "random source failed: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Entropy(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rand_core::Error> for Error {
    fn from(err: rand_core::Error) -> Self {
        Self::Entropy(err)
    }
}
