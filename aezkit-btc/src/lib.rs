//! Bitcoin key derivation and address search for cipher seeds.
//!
//! Turns the entropy of an [`aezkit_seed::CipherSeed`] into BIP44/49/84/86
//! keys and addresses, and maps an address back to the coordinate that
//! produced it.
//!
//! # Usage
//!
//! ```
//! use aezkit_btc::{AddressFactory, Chain, KeyTree, Locator, Network, Purpose};
//!
//! let tree = KeyTree::new(&[0x42; 16], Network::Mainnet).unwrap();
//!
//! let factory = AddressFactory::new(&tree);
//! let coordinate = tree.coordinate(Purpose::Taproot, Chain::Internal, 3);
//! let record = factory.record(&coordinate).unwrap();
//!
//! let outcome = Locator::new(&tree)
//!     .with_limit(5)
//!     .locate(&record.address.to_string())
//!     .unwrap();
//! assert_eq!(outcome.found.unwrap().coordinate, coordinate);
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod address;
mod error;
mod key_tree;
mod locator;
mod network;
mod types;

pub use address::{AddressFactory, AddressRecord, DEFAULT_PAGE_SIZE, render};
pub use error::Error;
pub use key_tree::KeyTree;
pub use locator::{CancelToken, DEFAULT_SEARCH_LIMIT, LocateOutcome, Locator, Match, SearchSpace};
pub use network::{Network, ParseNetworkError};
pub use types::{Chain, Coordinate, ParsePurposeError, Purpose};

/// A convenient Result type alias for aezkit-btc operations.
pub type Result<T> = core::result::Result<T, Error>;
