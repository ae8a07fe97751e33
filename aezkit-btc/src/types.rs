//! Derivation branches and coordinates.

use core::fmt;
use core::str::FromStr;

use bitcoin::bip32::{ChildNumber, DerivationPath};

use crate::Error;

/// The four derivation branches, each tied to exactly one address encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Purpose {
    /// BIP44, Pay to Public Key Hash (Legacy) - starts with 1 or m/n
    Legacy,
    /// BIP49, P2SH wrapping P2WPKH (`SegWit` compatible) - starts with 3 or 2
    NestedSegwit,
    /// BIP84, Pay to Witness Public Key Hash (Native `SegWit`) - starts with bc1q or tb1q
    #[default]
    NativeSegwit,
    /// BIP86, Pay to Taproot key path - starts with bc1p or tb1p
    Taproot,
}

impl Purpose {
    /// All purposes in canonical search order.
    pub const ALL: [Self; 4] = [
        Self::Legacy,
        Self::NestedSegwit,
        Self::NativeSegwit,
        Self::Taproot,
    ];

    /// Get the BIP purpose number.
    #[inline]
    #[must_use]
    pub const fn number(self) -> u32 {
        match self {
            Self::Legacy => 44,
            Self::NestedSegwit => 49,
            Self::NativeSegwit => 84,
            Self::Taproot => 86,
        }
    }

    /// Look up a purpose by its BIP number.
    #[must_use]
    pub const fn from_number(number: u32) -> Option<Self> {
        match number {
            44 => Some(Self::Legacy),
            49 => Some(Self::NestedSegwit),
            84 => Some(Self::NativeSegwit),
            86 => Some(Self::Taproot),
            _ => None,
        }
    }

    /// Get address type name.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Legacy => "P2PKH (Legacy)",
            Self::NestedSegwit => "P2SH-P2WPKH (SegWit)",
            Self::NativeSegwit => "P2WPKH (Native SegWit)",
            Self::Taproot => "P2TR (Taproot)",
        }
    }

    /// Short lowercase label for tables and logs.
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::NestedSegwit => "nested-segwit",
            Self::NativeSegwit => "native-segwit",
            Self::Taproot => "taproot",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Error returned when parsing an invalid purpose string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsePurposeError;

impl fmt::Display for ParsePurposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid purpose, expected: 44/legacy, 49/segwit, 84/native-segwit, or 86/taproot"
        )
    }
}

impl std::error::Error for ParsePurposeError {}

impl FromStr for Purpose {
    type Err = ParsePurposeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "44" | "p2pkh" | "legacy" => Ok(Self::Legacy),
            "49" | "p2sh" | "p2sh-p2wpkh" | "segwit" | "nested-segwit" => Ok(Self::NestedSegwit),
            "84" | "p2wpkh" | "native-segwit" | "bech32" => Ok(Self::NativeSegwit),
            "86" | "p2tr" | "taproot" | "bech32m" => Ok(Self::Taproot),
            _ => Err(ParsePurposeError),
        }
    }
}

/// External (receiving) or internal (change) branch of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Chain {
    /// Receiving addresses, chain 0.
    #[default]
    External,
    /// Change addresses, chain 1.
    Internal,
}

impl Chain {
    /// Both chains in canonical search order.
    pub const ALL: [Self; 2] = [Self::External, Self::Internal];

    /// The non-hardened path component.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::External => 0,
            Self::Internal => 1,
        }
    }

    /// Chain for a `change` flag.
    #[inline]
    #[must_use]
    pub const fn from_change(change: bool) -> Self {
        if change { Self::Internal } else { Self::External }
    }

    /// Lowercase label.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A full derivation coordinate `m/purpose'/coin_type'/account'/chain/index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    /// Derivation branch, and with it the address encoding.
    pub purpose: Purpose,
    /// BIP44 coin type, 0 on mainnet and 1 on test networks.
    pub coin_type: u32,
    /// Account number.
    pub account: u32,
    /// Receiving or change chain.
    pub chain: Chain,
    /// Address index within the chain.
    pub index: u32,
}

impl Coordinate {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(purpose: Purpose, coin_type: u32, account: u32, chain: Chain, index: u32) -> Self {
        Self {
            purpose,
            coin_type,
            account,
            chain,
            index,
        }
    }

    /// The three hardened steps `purpose'/coin_type'/account'`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if the coin type or account is not
    /// below 2^31.
    pub fn account_path(&self) -> Result<[ChildNumber; 3], Error> {
        Ok([
            hardened(self.purpose.number())?,
            hardened(self.coin_type)?,
            hardened(self.account)?,
        ])
    }

    /// The two non-hardened steps `chain/index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if the index is not below 2^31.
    pub fn chain_path(&self) -> Result<[ChildNumber; 2], Error> {
        Ok([normal(self.chain.index())?, normal(self.index)?])
    }

    /// The complete five step path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] if any component is out of range.
    pub fn path(&self) -> Result<DerivationPath, Error> {
        let mut steps = self.account_path()?.to_vec();
        steps.extend_from_slice(&self.chain_path()?);
        Ok(DerivationPath::from(steps))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m/{}'/{}'/{}'/{}/{}",
            self.purpose.number(),
            self.coin_type,
            self.account,
            self.chain.index(),
            self.index
        )
    }
}

pub(crate) fn hardened(index: u32) -> Result<ChildNumber, Error> {
    ChildNumber::from_hardened_idx(index).map_err(|_| Error::InvalidIndex(index))
}

pub(crate) fn normal(index: u32) -> Result<ChildNumber, Error> {
    ChildNumber::from_normal_idx(index).map_err(|_| Error::InvalidIndex(index))
}
