//! The 24-word rendering of an enciphered cipher seed.
//!
//! The 33 enciphered bytes are read as a 264-bit big-endian string and cut
//! into 24 groups of 11 bits, each group indexing the BIP-39 English word
//! list. Unlike BIP-39 there is no checksum hidden in the last word; integrity
//! comes from the CRC-32C and the AEZ authenticator inside the enciphered
//! bytes.
//!
//! # Prefix Expansion
//!
//! Every word of the English list is uniquely identified by its first four
//! characters, so parsing accepts any prefix of four or more characters that
//! matches exactly one word.
//!
//! # Example
//!
//! ```no_run
//! use aezkit_seed::Mnemonic;
//!
//! # let phrase = "";
//! let mnemonic: Mnemonic = phrase.parse()?;
//! let seed = mnemonic.to_cipher_seed(Some("passphrase"))?;
//! println!("born on {}", seed.birthday_time().date_naive());
//! # Ok::<(), aezkit_seed::Error>(())
//! ```

use core::fmt;
use core::str::FromStr;

use bip39::Language;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::cipher_seed::{CipherSeed, ENCIPHERED_SIZE, SCRYPT_LOG_N};
use crate::error::Error;

/// Number of words in a cipher seed mnemonic.
pub const NUM_WORDS: usize = 24;

const BITS_PER_WORD: u32 = 11;
const WORD_MASK: u32 = (1 << BITS_PER_WORD) - 1;

/// Minimum prefix length required for unambiguous word expansion.
const MIN_PREFIX_LEN: usize = 4;

/// A 24-word cipher seed mnemonic.
///
/// Holding a `Mnemonic` says nothing about whether it decrypts; that is only
/// known once [`Mnemonic::to_cipher_seed`] succeeds.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic {
    indices: [u16; NUM_WORDS],
}

impl Mnemonic {
    /// Parse a whitespace separated phrase.
    ///
    /// Matching is case-insensitive and accepts unique prefixes of at least
    /// four characters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWordCount`] unless there are exactly 24 tokens,
    /// and [`Error::UnknownWord`] or [`Error::AmbiguousWord`] for a token that
    /// does not resolve to a single word.
    pub fn parse(phrase: &str) -> Result<Self, Error> {
        let tokens: Vec<&str> = phrase.split_whitespace().collect();
        Self::from_words(&tokens)
    }

    /// Build a mnemonic from individual words, for example one per input
    /// field.
    ///
    /// # Errors
    ///
    /// Same as [`Mnemonic::parse`].
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Result<Self, Error> {
        if words.len() != NUM_WORDS {
            return Err(Error::InvalidWordCount(words.len()));
        }

        let word_list = Language::English.word_list();
        let mut indices = [0u16; NUM_WORDS];
        for (position, word) in words.iter().enumerate() {
            indices[position] = resolve_token(word_list, position, word.as_ref())?;
        }
        Ok(Self { indices })
    }

    /// The words of the mnemonic in order.
    pub fn words(&self) -> impl Iterator<Item = &'static str> + '_ {
        let word_list = Language::English.word_list();
        self.indices.iter().map(move |&i| word_list[usize::from(i)])
    }

    /// Decrypt the mnemonic back into the seed it encodes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedVersion`] for an unknown encoding version,
    /// and [`Error::Authentication`] when the checksum or the passphrase is
    /// wrong.
    pub fn to_cipher_seed(&self, passphrase: Option<&str>) -> Result<CipherSeed, Error> {
        CipherSeed::decipher(&self.to_enciphered(), passphrase)
    }

    /// Re-encrypt under a new passphrase.
    ///
    /// The entropy, birthday, internal version and salt are all kept, so the
    /// wallet derived from the result is the same one.
    ///
    /// # Errors
    ///
    /// Any error from decrypting with `old` or from re-enciphering.
    pub fn change_passphrase(&self, old: Option<&str>, new: Option<&str>) -> Result<Self, Error> {
        self.change_passphrase_with_cost(old, new, SCRYPT_LOG_N)
    }

    pub(crate) fn change_passphrase_with_cost(
        &self,
        old: Option<&str>,
        new: Option<&str>,
        log_n: u8,
    ) -> Result<Self, Error> {
        let seed = CipherSeed::decipher_with_cost(&self.to_enciphered(), old, log_n)?;
        let enciphered = seed.encipher_with_cost(new, log_n)?;
        Ok(Self::from_enciphered(&enciphered))
    }

    pub(crate) fn from_enciphered(bytes: &[u8; ENCIPHERED_SIZE]) -> Self {
        let mut indices = [0u16; NUM_WORDS];
        let mut acc: u32 = 0;
        let mut bits = 0;
        let mut next = 0;
        for &byte in bytes {
            acc = (acc << 8) | u32::from(byte);
            bits += 8;
            if bits >= BITS_PER_WORD {
                bits -= BITS_PER_WORD;
                indices[next] = ((acc >> bits) & WORD_MASK) as u16;
                next += 1;
            }
        }
        debug_assert_eq!(next, NUM_WORDS);
        acc.zeroize();
        Self { indices }
    }

    pub(crate) fn to_enciphered(&self) -> [u8; ENCIPHERED_SIZE] {
        let mut out = [0u8; ENCIPHERED_SIZE];
        let mut acc: u32 = 0;
        let mut bits = 0;
        let mut next = 0;
        for &index in &self.indices {
            acc = (acc << BITS_PER_WORD) | (u32::from(index) & WORD_MASK);
            bits += BITS_PER_WORD;
            while bits >= 8 {
                bits -= 8;
                out[next] = (acc >> bits) as u8;
                next += 1;
            }
        }
        debug_assert_eq!(next, ENCIPHERED_SIZE);
        acc.zeroize();
        out
    }
}

impl FromStr for Mnemonic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.words().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(word)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mnemonic(<redacted>)")
    }
}

/// Resolve a single token against the word list.
fn resolve_token(word_list: &[&str; 2048], position: usize, token: &str) -> Result<u16, Error> {
    let token = token.to_lowercase();

    // Exact match via binary search (the list is sorted).
    if let Ok(i) = word_list.binary_search(&token.as_str()) {
        return Ok(i as u16);
    }

    if token.chars().count() < MIN_PREFIX_LEN {
        return Err(Error::UnknownWord {
            position,
            word: token,
        });
    }

    let matches: Vec<usize> = word_list
        .iter()
        .enumerate()
        .filter(|(_, word)| word.starts_with(token.as_str()))
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [] => Err(Error::UnknownWord {
            position,
            word: token,
        }),
        [i] => Ok(*i as u16),
        _ => Err(Error::AmbiguousWord {
            position,
            prefix: token,
            candidates: matches.iter().map(|&i| word_list[i].to_owned()).collect(),
        }),
    }
}
