//! Error types for key derivation, address rendering and search.

use std::fmt;

use crate::types::Coordinate;

/// Errors that can occur during Bitcoin key and address operations.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// BIP32 derivation failed, optionally at a known coordinate.
    Derivation {
        /// Where the failure happened, if it was tied to one coordinate.
        coordinate: Option<Coordinate>,
        /// Underlying BIP32 error.
        source: bitcoin::bip32::Error,
    },
    /// A path component does not fit below the hardened offset.
    InvalidIndex(u32),
    /// A derived key could not be rendered as an address.
    Encoding {
        /// Coordinate of the key.
        coordinate: Coordinate,
        /// Why rendering failed.
        reason: String,
    },
    /// The search target is not a valid address for the tree's network.
    InvalidAddress {
        /// The string as given.
        input: String,
        /// Parser message.
        reason: String,
    },
    /// A search was cancelled through its [`CancelToken`](crate::CancelToken).
    Cancelled,
}

impl Error {
    pub(crate) fn derivation_at(coordinate: Coordinate, source: bitcoin::bip32::Error) -> Self {
        Self::Derivation {
            coordinate: Some(coordinate),
            source,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Derivation {
                coordinate: Some(c),
                source,
            } => write!(f, "BIP32 derivation error at {c}: {source}"),
            Self::Derivation {
                coordinate: None,
                source,
            } => write!(f, "BIP32 derivation error: {source}"),
            Self::InvalidIndex(i) => write!(f, "index {i} must be below 2^31"),
            Self::Encoding { coordinate, reason } => {
                write!(f, "cannot render address at {coordinate}: {reason}")
            }
            Self::InvalidAddress { input, reason } => {
                write!(f, "invalid address \"{input}\": {reason}")
            }
            Self::Cancelled => write!(f, "search cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Derivation { source, .. } => Some(source),
            Self::InvalidIndex(_)
            | Self::Encoding { .. }
            | Self::InvalidAddress { .. }
            | Self::Cancelled => None,
        }
    }
}

impl From<bitcoin::bip32::Error> for Error {
    fn from(err: bitcoin::bip32::Error) -> Self {
        Self::Derivation {
            coordinate: None,
            source: err,
        }
    }
}
