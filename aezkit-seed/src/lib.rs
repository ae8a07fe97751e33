//! # aezkit-seed - Enciphered 24-word Wallet Seeds
//!
//! Encodes 16 bytes of wallet entropy, a creation birthday and a format
//! version into a passphrase-protected, integrity-checked 24-word mnemonic,
//! and decodes such mnemonics back.
//!
//! ## Features
//!
//! - **Authenticated**: AEZ with a four byte expansion detects a wrong
//!   passphrase instead of silently producing a different wallet
//! - **Typo detection**: a CRC-32C rejects mistyped words before any key
//!   stretching happens
//! - **Versioned**: the leading byte identifies the encoding
//! - **Birthday**: the creation day bounds how far back a rescan must go
//!
//! # Usage
//!
//! ```
//! use aezkit_seed::{CipherSeed, Mnemonic};
//!
//! let seed = CipherSeed::from_parts(0, 5000, [7u8; 16], *b"salty");
//! let mnemonic = seed.to_mnemonic(Some("passphrase")).unwrap();
//!
//! let parsed: Mnemonic = mnemonic.to_string().parse().unwrap();
//! let recovered = parsed.to_cipher_seed(Some("passphrase")).unwrap();
//! assert_eq!(recovered.entropy(), seed.entropy());
//! ```

#![warn(
    missing_docs,
    rust_2018_idioms,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::doc_markdown,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_lossless,
    clippy::similar_names,
    clippy::many_single_char_names,
    clippy::unreadable_literal
)]
#![forbid(unsafe_code)]

pub mod aez;
mod cipher_seed;
mod error;
mod mnemonic;

pub use cipher_seed::{
    CIPHER_SEED_VERSION, CIPHERTEXT_EXPANSION, CipherSeed, DECIPHERED_SIZE, DEFAULT_PASSPHRASE,
    ENCIPHERED_SIZE, ENTROPY_SIZE, GENESIS_TIMESTAMP, SALT_SIZE, birthday_from,
};
pub use error::{AuthFailure, Error};
pub use mnemonic::{Mnemonic, NUM_WORDS};

/// A convenient Result type alias for cipher seed operations.
pub type Result<T> = core::result::Result<T, Error>;
