//! Reverse search from an address string to the coordinate that produced it.
//!
//! The search space is every index below a bound on both chains of all four
//! purposes, visited purpose first, then chain, then ascending index. The
//! first match in that order wins, in both the sequential and the parallel
//! search.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bitcoin::Address;
use bitcoin::address::NetworkUnchecked;
use bitcoin::bip32::Xpub;
use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::address::render_from_chain;
use crate::{Chain, Coordinate, Error, KeyTree, Purpose};

/// Default number of indices searched per (purpose, chain).
pub const DEFAULT_SEARCH_LIMIT: u32 = 20_000;

/// Shared flag for stopping a running search.
///
/// Workers check it between derivations, never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The ordered set of candidate coordinates.
///
/// Iterating yields coordinates lazily in canonical order; [`Clone`] restarts
/// from the current position and [`SearchSpace::coordinate_at`] gives random
/// access for sharding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpace {
    coin_type: u32,
    account: u32,
    limit: u32,
    next: usize,
}

impl SearchSpace {
    /// A space of `limit` indices per (purpose, chain).
    #[must_use]
    pub const fn new(coin_type: u32, account: u32, limit: u32) -> Self {
        Self {
            coin_type,
            account,
            limit,
            next: 0,
        }
    }

    /// Indices per (purpose, chain).
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Total number of coordinates, independent of iteration progress.
    #[must_use]
    pub const fn total(&self) -> usize {
        Purpose::ALL.len() * Chain::ALL.len() * self.limit as usize
    }

    /// The coordinate at a position in canonical order.
    #[must_use]
    pub fn coordinate_at(&self, ordinal: usize) -> Option<Coordinate> {
        if ordinal >= self.total() {
            return None;
        }
        let limit = self.limit as usize;
        let segment = ordinal / limit;
        let purpose = Purpose::ALL[segment / Chain::ALL.len()];
        let chain = Chain::ALL[segment % Chain::ALL.len()];
        let index = (ordinal % limit) as u32;
        Some(Coordinate::new(
            purpose,
            self.coin_type,
            self.account,
            chain,
            index,
        ))
    }

    /// Which (purpose, chain) block an ordinal falls in.
    fn segment_of(&self, ordinal: usize) -> usize {
        ordinal / self.limit as usize
    }
}

impl Iterator for SearchSpace {
    type Item = Coordinate;

    fn next(&mut self) -> Option<Self::Item> {
        let coordinate = self.coordinate_at(self.next)?;
        self.next += 1;
        Some(coordinate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SearchSpace {}

/// A located address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Where the address was derived.
    pub coordinate: Coordinate,
    /// The address in canonical form.
    pub address: Address,
}

impl Match {
    /// The encoding of the matched address.
    #[must_use]
    pub const fn encoding(&self) -> Purpose {
        self.coordinate.purpose
    }
}

/// Result of a completed search.
///
/// `found == None` is the ordinary not-found answer.
#[derive(Debug)]
pub struct LocateOutcome {
    /// The first match in canonical order, if any.
    pub found: Option<Match>,
    /// Coordinates covered: the match's position plus one, or the whole space.
    pub searched: usize,
    /// Per-coordinate failures met along the way, in canonical order.
    pub errors: Vec<Error>,
}

/// Searches one key tree for the origin of an address.
#[derive(Debug, Clone)]
pub struct Locator<'a> {
    tree: &'a KeyTree,
    limit: u32,
    account: u32,
    cancel: CancelToken,
}

impl<'a> Locator<'a> {
    /// Create a locator with the default bound.
    #[must_use]
    pub fn new(tree: &'a KeyTree) -> Self {
        Self {
            tree,
            limit: DEFAULT_SEARCH_LIMIT,
            account: 0,
            cancel: CancelToken::new(),
        }
    }

    /// Set the number of indices searched per (purpose, chain).
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Use a caller held cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The search space this locator walks.
    #[must_use]
    pub const fn space(&self) -> SearchSpace {
        SearchSpace::new(self.tree.coin_type(), self.account, self.limit)
    }

    /// Search sequentially.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] before searching if the target does
    /// not parse for the tree's network, and [`Error::Cancelled`] if the
    /// token fires before a match.
    pub fn locate(&self, target: &str) -> Result<LocateOutcome, Error> {
        let target = self.parse_target(target)?;
        let space = self.space();
        info!(%target, limit = self.limit, "locating address");

        let (chains, mut errors) = self.prepare_chains(&space);
        let mut found = None;
        for (ordinal, coordinate) in space.clone().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            match self.check(&space, &chains, &target, ordinal, &coordinate) {
                Ok(Some(address)) => {
                    found = Some((ordinal, Match { coordinate, address }));
                    break;
                }
                Ok(None) => {}
                Err(e) => errors.push((ordinal, e)),
            }
        }

        Ok(Self::finish(&space, found, errors))
    }

    /// Search with the ordinal range sharded across the rayon pool.
    ///
    /// Returns the same outcome as [`Locator::locate`].
    ///
    /// # Errors
    ///
    /// Same as [`Locator::locate`]. A cancelled parallel search always
    /// reports [`Error::Cancelled`], since skipped shards could hide an
    /// earlier match.
    pub fn locate_parallel(&self, target: &str) -> Result<LocateOutcome, Error> {
        let target = self.parse_target(target)?;
        let space = self.space();
        info!(%target, limit = self.limit, threads = rayon::current_num_threads(), "locating address in parallel");

        let (chains, errors) = self.prepare_chains(&space);
        let errors = Mutex::new(errors);

        let found = (0..space.total()).into_par_iter().find_map_first(|ordinal| {
            if self.cancel.is_cancelled() {
                return None;
            }
            let coordinate = space.coordinate_at(ordinal)?;
            match self.check(&space, &chains, &target, ordinal, &coordinate) {
                Ok(Some(address)) => Some((ordinal, Match { coordinate, address })),
                Ok(None) => None,
                Err(e) => {
                    errors.lock().push((ordinal, e));
                    None
                }
            }
        });

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(Self::finish(&space, found, errors.into_inner()))
    }

    fn parse_target(&self, target: &str) -> Result<Address, Error> {
        let input = target.trim();
        let invalid = |reason: String| Error::InvalidAddress {
            input: input.to_owned(),
            reason,
        };

        Address::<NetworkUnchecked>::from_str(input)
            .map_err(|e| invalid(e.to_string()))?
            .require_network(self.tree.network().to_bitcoin_network())
            .map_err(|e| invalid(e.to_string()))
    }

    /// Public chain nodes for each (purpose, chain) block. A block whose node
    /// cannot be derived is reported once, at its first ordinal.
    fn prepare_chains(&self, space: &SearchSpace) -> (Vec<Option<Xpub>>, Vec<(usize, Error)>) {
        let mut chains = Vec::with_capacity(Purpose::ALL.len() * Chain::ALL.len());
        let mut errors = Vec::new();
        for purpose in Purpose::ALL {
            for chain in Chain::ALL {
                match self.tree.chain_xpub(purpose, self.account, chain) {
                    Ok(xpub) => chains.push(Some(xpub)),
                    Err(e) => {
                        errors.push((chains.len() * space.limit() as usize, e));
                        chains.push(None);
                    }
                }
            }
        }
        (chains, errors)
    }

    fn check(
        &self,
        space: &SearchSpace,
        chains: &[Option<Xpub>],
        target: &Address,
        ordinal: usize,
        coordinate: &Coordinate,
    ) -> Result<Option<Address>, Error> {
        let Some(chain_xpub) = &chains[space.segment_of(ordinal)] else {
            return Ok(None);
        };
        let address = render_from_chain(
            self.tree.secp(),
            chain_xpub,
            coordinate,
            self.tree.network(),
        )?;
        Ok((address == *target).then_some(address))
    }

    fn finish(
        space: &SearchSpace,
        found: Option<(usize, Match)>,
        mut errors: Vec<(usize, Error)>,
    ) -> LocateOutcome {
        let searched = found
            .as_ref()
            .map_or(space.total(), |(ordinal, _)| ordinal + 1);
        errors.retain(|(ordinal, _)| *ordinal < searched);
        errors.sort_by_key(|(ordinal, _)| *ordinal);

        match &found {
            Some((_, m)) => info!(coordinate = %m.coordinate, searched, "address located"),
            None => debug!(searched, errors = errors.len(), "address not found"),
        }

        LocateOutcome {
            found: found.map(|(_, m)| m),
            searched,
            errors: errors.into_iter().map(|(_, e)| e).collect(),
        }
    }
}
