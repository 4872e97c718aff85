//! Client-side reconstruction of the pool's commitment tree.
//!
//! The pool contract only stores recent roots. Every spend therefore replays
//! all `Purchased` events since the pool was deployed, orders them by the
//! leaf index the contract assigned, and rebuilds the tree locally. Nothing
//! is cached between calls.

use std::time::Instant;

use alloy_primitives::Address;
use privacy_crypto::field::fr_to_hex;
use privacy_crypto::{Fr, MimcSponge};
use state_merkle::{CommitmentTree, MerklePath};
use tracing::{debug, info};

use crate::chain::{purchased_topic, ChainClient, PurchasedEvent};
use crate::error::ProverError;

/// Tree state rebuilt from one event scan.
#[derive(Clone, Debug)]
pub struct AnonymitySet<'h> {
    tree: CommitmentTree<&'h MimcSponge>,
    last_block: Option<u64>,
}

impl<'h> AnonymitySet<'h> {
    /// Events must cover leaf indices `0..n` exactly once each; any order.
    pub fn from_events(
        hasher: &'h MimcSponge,
        mut events: Vec<PurchasedEvent>,
    ) -> Result<Self, ProverError> {
        events.sort_by_key(|event| event.leaf_index);
        let mut tree = CommitmentTree::anonymity_set(hasher)?;
        for (expected, event) in events.iter().enumerate() {
            let index = event.leaf_index as usize;
            if index < expected {
                return Err(ProverError::InconsistentAnonymitySet(format!(
                    "leaf index {index} appears more than once"
                )));
            }
            if index > expected {
                return Err(ProverError::InconsistentAnonymitySet(format!(
                    "leaf index {expected} is missing"
                )));
            }
            tree.append(event.commitment)?;
        }
        let last_block = events.iter().map(|event| event.block_number).max();
        Ok(Self { tree, last_block })
    }

    /// Scans `pool` from `from_block` and rebuilds the tree.
    pub async fn fetch(
        chain: &dyn ChainClient,
        pool: Address,
        from_block: u64,
        hasher: &'h MimcSponge,
    ) -> Result<Self, ProverError> {
        let start = Instant::now();
        let logs = chain.logs(pool, purchased_topic(), from_block).await?;
        let mut events = Vec::with_capacity(logs.len());
        for log in &logs {
            match PurchasedEvent::decode(log)? {
                Some(event) => events.push(event),
                None => debug!(block = log.block_number, "skipping non-deposit log"),
            }
        }
        let set = Self::from_events(hasher, events)?;
        info!(
            %pool,
            leaves = set.len(),
            root = %fr_to_hex(&set.root()),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "anonymity set rebuilt"
        );
        Ok(set)
    }

    pub fn root(&self) -> Fr {
        self.tree.root()
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Highest block among the replayed events.
    pub fn last_block(&self) -> Option<u64> {
        self.last_block
    }

    pub fn position(&self, commitment: &Fr) -> Option<usize> {
        self.tree.position(commitment)
    }

    pub fn path(&self, leaf_index: usize) -> Result<MerklePath, ProverError> {
        Ok(self.tree.authentication_path(leaf_index)?)
    }

    pub fn tree(&self) -> &CommitmentTree<&'h MimcSponge> {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn event(index: u32, commitment: u64) -> PurchasedEvent {
        PurchasedEvent {
            commitment: Fr::from(commitment),
            leaf_index: index,
            timestamp: U256::ZERO,
            block_number: 100 + index as u64,
        }
    }

    #[test]
    fn order_follows_leaf_index_not_arrival() {
        let sponge = MimcSponge::new();
        let shuffled = vec![event(2, 30), event(0, 10), event(1, 20)];
        let set = AnonymitySet::from_events(&sponge, shuffled).unwrap();
        assert_eq!(set.position(&Fr::from(30u64)), Some(2));
        assert_eq!(set.last_block(), Some(102));

        let mut tree = CommitmentTree::anonymity_set(&sponge).unwrap();
        tree.extend([10u64, 20, 30].map(Fr::from)).unwrap();
        assert_eq!(set.root(), tree.root());
    }

    #[test]
    fn gaps_and_duplicates_are_inconsistent() {
        let sponge = MimcSponge::new();
        assert!(matches!(
            AnonymitySet::from_events(&sponge, vec![event(0, 1), event(2, 3)]),
            Err(ProverError::InconsistentAnonymitySet(_))
        ));
        assert!(matches!(
            AnonymitySet::from_events(&sponge, vec![event(0, 1), event(0, 1)]),
            Err(ProverError::InconsistentAnonymitySet(_))
        ));
    }

    #[test]
    fn empty_pool_has_the_zero_root() {
        let sponge = MimcSponge::new();
        let set = AnonymitySet::from_events(&sponge, Vec::new()).unwrap();
        assert!(set.is_empty());
        assert_eq!(Some(set.root()), set.tree().zero_node(state_merkle::TREE_DEPTH));
        assert!(set.path(0).is_err());
    }
}
