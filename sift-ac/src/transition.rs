// Transition function
//
// Two realizations of goto(state, byte), both total over every state and
// byte value:
//
// - Dense: a precomputed row of ALPHABET_SIZE targets per state. One
//   lookup per input byte, 256 * 4 bytes of memory per state.
// - Lazy: follow trie edges, chasing failure links on a miss. No extra
//   memory, amortized O(1) per byte over a scan.

use crate::trie::{NodeId, TrieNode};
use crate::{AcError, AcResult, ALPHABET_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the automaton resolves transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionStrategy {
    /// Full table computed at build time
    #[default]
    Dense,

    /// Failure-link chasing at scan time
    Lazy,
}

impl fmt::Display for TransitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionStrategy::Dense => write!(f, "dense"),
            TransitionStrategy::Lazy => write!(f, "lazy"),
        }
    }
}

/// Transition storage owned by an automaton
#[derive(Clone)]
pub(crate) enum Transitions {
    Dense(Vec<NodeId>),
    Lazy,
}

impl Transitions {
    pub(crate) fn strategy(&self) -> TransitionStrategy {
        match self {
            Transitions::Dense(_) => TransitionStrategy::Dense,
            Transitions::Lazy => TransitionStrategy::Lazy,
        }
    }

    pub(crate) fn memory_usage(&self) -> usize {
        match self {
            Transitions::Dense(table) => table.len() * std::mem::size_of::<NodeId>(),
            Transitions::Lazy => 0,
        }
    }
}

/// Resolve one transition by walking failure links
#[inline]
pub(crate) fn lazy_goto(nodes: &[TrieNode], mut state: NodeId, byte: u8) -> NodeId {
    loop {
        let node = &nodes[state.as_usize()];
        if let Some(next) = node.child(byte) {
            return next;
        }
        if state.is_root() {
            return NodeId::ROOT;
        }
        state = node.failure;
    }
}

/// Build the dense table.
///
/// `order` must list every node in breadth-first order, root first, and
/// failure links must already be final. Each row starts as a copy of the
/// failure state's row, which is complete because failure links point to
/// strictly shallower nodes.
pub(crate) fn build_dense(nodes: &[TrieNode], order: &[NodeId]) -> AcResult<Vec<NodeId>> {
    let cells = nodes
        .len()
        .checked_mul(ALPHABET_SIZE)
        .ok_or(AcError::StateLimitExceeded {
            states: nodes.len(),
            max: usize::MAX / ALPHABET_SIZE,
        })?;
    let mut table = vec![NodeId::ROOT; cells];

    for &id in order {
        let node = &nodes[id.as_usize()];
        let row = id.as_usize() * ALPHABET_SIZE;

        if !id.is_root() {
            let fail_row = node.failure.as_usize() * ALPHABET_SIZE;
            table.copy_within(fail_row..fail_row + ALPHABET_SIZE, row);
        }
        for (byte, child) in node.children() {
            table[row + byte as usize] = child;
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_display() {
        assert_eq!(TransitionStrategy::Dense.to_string(), "dense");
        assert_eq!(TransitionStrategy::Lazy.to_string(), "lazy");
        assert_eq!(TransitionStrategy::default(), TransitionStrategy::Dense);
    }

    #[test]
    fn test_strategy_serde() {
        let strategy: TransitionStrategy = serde_json::from_str("\"lazy\"").unwrap();
        assert_eq!(strategy, TransitionStrategy::Lazy);
        assert_eq!(serde_json::to_string(&TransitionStrategy::Dense).unwrap(), "\"dense\"");
    }

    #[test]
    fn test_memory_usage() {
        assert_eq!(Transitions::Lazy.memory_usage(), 0);
        let dense = Transitions::Dense(vec![NodeId::ROOT; ALPHABET_SIZE]);
        assert_eq!(dense.memory_usage(), ALPHABET_SIZE * 4);
        assert_eq!(dense.strategy(), TransitionStrategy::Dense);
    }
}
