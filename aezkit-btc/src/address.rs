//! Bitcoin address creation utilities.
//!
//! [`render`] is the single place where a public key becomes an address; the
//! factory and the locator both go through it so that what is displayed and
//! what is searched can never disagree.

use bitcoin::bip32::Xpub;
use bitcoin::secp256k1::{Secp256k1, Verification};
use bitcoin::{Address, PrivateKey, PublicKey, key::CompressedPublicKey};

use crate::types::normal;
use crate::{Chain, Coordinate, Error, KeyTree, Network, Purpose};

/// Number of addresses on one page of a batch.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Create a Bitcoin address from a compressed public key.
///
/// Handles all four encodings (P2PKH, P2SH-P2WPKH, P2WPKH, and BIP86 P2TR).
#[must_use]
pub fn render<C: Verification>(
    secp: &Secp256k1<C>,
    public_key: &CompressedPublicKey,
    purpose: Purpose,
    network: Network,
) -> Address {
    let btc_network = network.to_bitcoin_network();

    match purpose {
        Purpose::Legacy => Address::p2pkh(PublicKey::from(*public_key), btc_network),
        Purpose::NestedSegwit => Address::p2shwpkh(public_key, btc_network),
        Purpose::NativeSegwit => Address::p2wpkh(public_key, btc_network),
        Purpose::Taproot => {
            let internal_key = public_key.0.x_only_public_key().0;
            Address::p2tr(secp, internal_key, None, btc_network)
        }
    }
}

/// Render the address at `coordinate` from the public node of its chain.
pub(crate) fn render_from_chain<C: Verification>(
    secp: &Secp256k1<C>,
    chain_xpub: &Xpub,
    coordinate: &Coordinate,
    network: Network,
) -> Result<Address, Error> {
    let child = chain_xpub
        .ckd_pub(secp, normal(coordinate.index)?)
        .map_err(|e| Error::derivation_at(*coordinate, e))?;
    Ok(render(secp, &child.to_pub(), coordinate.purpose, network))
}

/// A derived address and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    /// Derivation coordinate.
    pub coordinate: Coordinate,
    /// Rendered address.
    pub address: Address,
}

impl AddressRecord {
    /// The encoding, implied by the coordinate's purpose.
    #[must_use]
    pub const fn encoding(&self) -> Purpose {
        self.coordinate.purpose
    }
}

/// Renders addresses for coordinates of one [`KeyTree`].
#[derive(Debug, Clone, Copy)]
pub struct AddressFactory<'a> {
    tree: &'a KeyTree,
}

impl<'a> AddressFactory<'a> {
    /// Create a factory over a key tree.
    #[must_use]
    pub const fn new(tree: &'a KeyTree) -> Self {
        Self { tree }
    }

    /// Derive and render the address at one coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Derivation`] or [`Error::InvalidIndex`] if the key
    /// cannot be derived and [`Error::Encoding`] if it cannot be rendered.
    pub fn record(&self, coordinate: &Coordinate) -> Result<AddressRecord, Error> {
        let network = self.tree.network();
        let secp = self.tree.secp();
        let derived = self.tree.derive_key(coordinate)?;

        let private_key = PrivateKey::new(derived.private_key, network.to_bitcoin_network());
        let public_key = CompressedPublicKey::from_private_key(secp, &private_key).map_err(|e| {
            Error::Encoding {
                coordinate: *coordinate,
                reason: e.to_string(),
            }
        })?;

        Ok(AddressRecord {
            coordinate: *coordinate,
            address: render(secp, &public_key, coordinate.purpose, network),
        })
    }

    /// Render `count` consecutive addresses of one purpose and chain.
    ///
    /// Each slot carries its own result, so one failing index does not lose
    /// the rest of the page.
    pub fn batch(
        &self,
        purpose: Purpose,
        chain: Chain,
        start: u32,
        count: u32,
    ) -> Vec<Result<AddressRecord, Error>> {
        (0..count)
            .map(|offset| {
                let index = start.checked_add(offset).ok_or(Error::InvalidIndex(u32::MAX))?;
                self.record(&self.tree.coordinate(purpose, chain, index))
            })
            .collect()
    }

    /// All four encodings for one index, in [`Purpose::ALL`] order.
    pub fn row(&self, chain: Chain, index: u32) -> [Result<AddressRecord, Error>; 4] {
        Purpose::ALL.map(|purpose| self.record(&self.tree.coordinate(purpose, chain, index)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    /// BIP39 seed of "abandon abandon ... about" with an empty passphrase.
    const ABANDON_SEED: &str = "5eb00bbddcf069084889a8ab9155568165f5c453ccb85e70811aaed6f6da5fc19a5ac40b389cd370d086206dec8aa6c43daea6690f20ad3d8d48b2d2ce9e38e4";

    fn test_tree(network: Network) -> KeyTree {
        KeyTree::new(&hex::decode(ABANDON_SEED).unwrap(), network).unwrap()
    }

    fn first_address(tree: &KeyTree, purpose: Purpose) -> String {
        let factory = AddressFactory::new(tree);
        let coordinate = tree.coordinate(purpose, Chain::External, 0);
        factory.record(&coordinate).unwrap().address.to_string()
    }

    #[test]
    fn test_bip44_reference_address() {
        let tree = test_tree(Network::Mainnet);
        assert_eq!(
            first_address(&tree, Purpose::Legacy),
            "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA"
        );
    }

    #[test]
    fn test_bip49_reference_address() {
        let tree = test_tree(Network::Mainnet);
        assert_eq!(
            first_address(&tree, Purpose::NestedSegwit),
            "37VucYSaXLCAsxYyAPfbSi9eh4iEcbShgf"
        );
    }

    #[test]
    fn test_bip84_reference_address() {
        let tree = test_tree(Network::Mainnet);
        assert_eq!(
            first_address(&tree, Purpose::NativeSegwit),
            "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
        );
    }

    #[test]
    fn test_bip86_reference_address() {
        let tree = test_tree(Network::Mainnet);
        assert_eq!(
            first_address(&tree, Purpose::Taproot),
            "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr"
        );
    }

    #[test]
    fn test_testnet_prefixes() {
        let tree = test_tree(Network::Testnet);
        assert!(first_address(&tree, Purpose::NativeSegwit).starts_with("tb1q"));
        assert!(first_address(&tree, Purpose::Taproot).starts_with("tb1p"));
        assert!(first_address(&tree, Purpose::NestedSegwit).starts_with('2'));
        let legacy = first_address(&tree, Purpose::Legacy);
        assert!(legacy.starts_with('m') || legacy.starts_with('n'));
    }

    #[test]
    fn test_regtest_hrp() {
        let tree = test_tree(Network::Regtest);
        assert!(first_address(&tree, Purpose::NativeSegwit).starts_with("bcrt1q"));
    }

    #[test]
    fn test_row_encodings_pairwise_distinct() {
        let tree = test_tree(Network::Mainnet);
        let factory = AddressFactory::new(&tree);
        let row = factory.row(Chain::External, 3);

        let addresses: HashSet<String> = row
            .iter()
            .map(|r| r.as_ref().unwrap().address.to_string())
            .collect();
        assert_eq!(addresses.len(), 4);
        for (record, purpose) in row.iter().zip(Purpose::ALL) {
            assert_eq!(record.as_ref().unwrap().encoding(), purpose);
        }
    }

    #[test]
    fn test_same_key_renders_four_distinct_encodings() {
        let tree = test_tree(Network::Mainnet);
        let key = tree
            .derive_key(&tree.coordinate(Purpose::NativeSegwit, Chain::External, 0))
            .unwrap();
        let public_key = Xpub::from_priv(tree.secp(), &key).to_pub();

        let rendered: HashSet<String> = Purpose::ALL
            .iter()
            .map(|p| render(tree.secp(), &public_key, *p, Network::Mainnet).to_string())
            .collect();
        assert_eq!(rendered.len(), 4);
    }

    #[test]
    fn test_batch_is_ordered_and_unique() {
        let tree = test_tree(Network::Mainnet);
        let factory = AddressFactory::new(&tree);
        let page = factory.batch(Purpose::NativeSegwit, Chain::Internal, 10, 5);

        assert_eq!(page.len(), 5);
        let mut seen = HashSet::new();
        for (offset, record) in page.into_iter().enumerate() {
            let record = record.unwrap();
            assert_eq!(record.coordinate.index, 10 + offset as u32);
            assert_eq!(record.coordinate.chain, Chain::Internal);
            assert!(seen.insert(record.address.to_string()));
        }
    }

    #[test]
    fn test_batch_isolates_failing_slots() {
        let tree = test_tree(Network::Mainnet);
        let factory = AddressFactory::new(&tree);
        let start = (1 << 31) - 2;
        let page = factory.batch(Purpose::Legacy, Chain::External, start, 4);

        assert_eq!(page.len(), 4);
        assert!(page[0].is_ok());
        assert!(page[1].is_ok());
        assert!(matches!(page[2], Err(Error::InvalidIndex(_))));
        assert!(matches!(page[3], Err(Error::InvalidIndex(_))));
    }

    #[test]
    fn test_public_rendering_matches_private() {
        let tree = test_tree(Network::Mainnet);
        let factory = AddressFactory::new(&tree);
        for purpose in Purpose::ALL {
            let chain_xpub = tree.chain_xpub(purpose, 0, Chain::External).unwrap();
            let coordinate = tree.coordinate(purpose, Chain::External, 4);
            let public = render_from_chain(tree.secp(), &chain_xpub, &coordinate, tree.network()).unwrap();
            assert_eq!(public, factory.record(&coordinate).unwrap().address);
        }
    }
}
