//! Hierarchical key derivation from cipher seed entropy.

use core::fmt;

use aezkit_seed::CipherSeed;
use bitcoin::bip32::{Fingerprint, Xpriv, Xpub};
use bitcoin::secp256k1::{All, Secp256k1};

use crate::types::{hardened, normal};
use crate::{Chain, Coordinate, Error, Network, Purpose};

/// The session object: a BIP32 master key and the network it renders for.
///
/// The master key is computed once from the seed entropy; every derivation
/// is a pure function of it and the requested coordinate.
pub struct KeyTree {
    /// Master extended private key.
    master: Xpriv,
    /// Network.
    network: Network,
    secp: Secp256k1<All>,
}

impl KeyTree {
    /// Build the tree from raw BIP32 seed bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the master key derivation fails.
    pub fn new(entropy: &[u8], network: Network) -> Result<Self, Error> {
        let secp = Secp256k1::new();
        let master = Xpriv::new_master(network.to_bitcoin_network(), entropy)?;
        tracing::debug!(%network, fingerprint = %master.fingerprint(&secp), "key tree ready");

        Ok(Self {
            master,
            network,
            secp,
        })
    }

    /// Build the tree from a decoded cipher seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the master key derivation fails.
    pub fn from_cipher_seed(seed: &CipherSeed, network: Network) -> Result<Self, Error> {
        Self::new(seed.entropy(), network)
    }

    /// Get the network.
    #[must_use]
    pub const fn network(&self) -> Network {
        self.network
    }

    /// BIP44 coin type of the tree's network.
    #[must_use]
    pub const fn coin_type(&self) -> u32 {
        self.network.coin_type()
    }

    /// The secp256k1 context shared by every derivation on this tree.
    #[must_use]
    pub const fn secp(&self) -> &Secp256k1<All> {
        &self.secp
    }

    /// First four bytes of HASH160 of the master public key.
    #[must_use]
    pub fn master_fingerprint(&self) -> Fingerprint {
        self.master.fingerprint(&self.secp)
    }

    /// Coordinate on this tree's coin type for the first account.
    #[must_use]
    pub const fn coordinate(&self, purpose: Purpose, chain: Chain, index: u32) -> Coordinate {
        Coordinate::new(purpose, self.coin_type(), 0, chain, index)
    }

    /// Derive the private key at a coordinate.
    ///
    /// Walks `purpose'`, `coin_type'`, `account'`, `chain`, `index` in that
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIndex`] for out of range components and
    /// [`Error::Derivation`] if BIP32 derivation fails.
    pub fn derive_key(&self, coordinate: &Coordinate) -> Result<Xpriv, Error> {
        let path = coordinate.path()?;
        self.master
            .derive_priv(&self.secp, &path)
            .map_err(|e| Error::derivation_at(*coordinate, e))
    }

    /// Derive the account node `m/purpose'/coin_type'/account'`.
    ///
    /// # Errors
    ///
    /// Returns an error if any component is out of range or derivation fails.
    pub fn account_key(&self, purpose: Purpose, coin_type: u32, account: u32) -> Result<Xpriv, Error> {
        let path = [
            hardened(purpose.number())?,
            hardened(coin_type)?,
            hardened(account)?,
        ];
        Ok(self.master.derive_priv(&self.secp, &path)?)
    }

    /// The neutered account node, serialized with the network's `xpub` or
    /// `tpub` version bytes by its `Display` impl.
    ///
    /// # Errors
    ///
    /// Returns an error if any component is out of range or derivation fails.
    pub fn account_xpub(&self, purpose: Purpose, coin_type: u32, account: u32) -> Result<Xpub, Error> {
        let account_key = self.account_key(purpose, coin_type, account)?;
        Ok(Xpub::from_priv(&self.secp, &account_key))
    }

    /// Public node at `m/purpose'/coin_type'/account'/chain` on this tree's
    /// coin type.
    ///
    /// Indices below it can be derived without private material and yield
    /// the same keys as [`KeyTree::derive_key`].
    ///
    /// # Errors
    ///
    /// Returns an error if any component is out of range or derivation fails.
    pub fn chain_xpub(&self, purpose: Purpose, account: u32, chain: Chain) -> Result<Xpub, Error> {
        let account_key = self.account_key(purpose, self.coin_type(), account)?;
        let chain_key = account_key.derive_priv(&self.secp, &[normal(chain.index())?])?;
        Ok(Xpub::from_priv(&self.secp, &chain_key))
    }
}

impl fmt::Debug for KeyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyTree")
            .field("network", &self.network)
            .field("fingerprint", &self.master_fingerprint())
            .finish_non_exhaustive()
    }
}
