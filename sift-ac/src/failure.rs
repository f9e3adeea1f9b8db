// Failure-link resolution
//
// Turns a Trie into an Automaton: a breadth-first pass sets every node's
// failure link and closes output sets under it, then the transition
// function is materialized according to the configured strategy.

use crate::automaton::Automaton;
use crate::transition::{build_dense, lazy_goto, TransitionStrategy, Transitions};
use crate::trie::{NodeId, Trie, TrieNode};
use crate::{AcConfig, AcError, AcResult, ALPHABET_SIZE};
use std::collections::VecDeque;

/// Compute failure links and output sets, producing an immutable automaton.
///
/// Nodes are visited in breadth-first order, so when a node is reached its
/// failure target (always shallower) already carries its final output set.
pub fn resolve_failures(trie: Trie, config: &AcConfig) -> AcResult<Automaton> {
    let Trie {
        mut nodes,
        patterns,
        case_insensitive,
    } = trie;

    let order = link_failures(&mut nodes);
    let outputs = propagate_outputs(&mut nodes, &order)?;

    let mut strategy = config.transitions;
    if strategy == TransitionStrategy::Dense && nodes.len() > config.dense_state_limit {
        tracing::warn!(
            nodes = nodes.len(),
            limit = config.dense_state_limit,
            "Trie too large for a dense table, using lazy transitions"
        );
        strategy = TransitionStrategy::Lazy;
    }

    let transitions = match strategy {
        TransitionStrategy::Dense => Transitions::Dense(build_dense(&nodes, &order)?),
        TransitionStrategy::Lazy => Transitions::Lazy,
    };

    let automaton = Automaton {
        nodes,
        outputs,
        transitions,
        patterns,
        case_insensitive,
    };

    if config.verify_invariants {
        if let Err(err) = verify(&automaton) {
            tracing::error!(error = %err, "Automaton construction produced an invalid automaton");
            return Err(err);
        }
    }

    tracing::info!(
        patterns = automaton.pattern_count(),
        nodes = automaton.node_count(),
        strategy = %automaton.strategy(),
        memory = automaton.memory_usage(),
        "Automaton built"
    );

    Ok(automaton)
}

/// Set failure links for every node; returns the breadth-first order
fn link_failures(nodes: &mut [TrieNode]) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(nodes.len());
    let mut queue = VecDeque::new();

    nodes[0].failure = NodeId::ROOT;
    queue.push_back(NodeId::ROOT);

    while let Some(parent) = queue.pop_front() {
        order.push(parent);

        for idx in 0..nodes[parent.as_usize()].children.len() {
            let (byte, child) = nodes[parent.as_usize()].children[idx];

            let failure = if parent.is_root() {
                NodeId::ROOT
            } else {
                let parent_failure = nodes[parent.as_usize()].failure;
                lazy_goto(nodes, parent_failure, byte)
            };

            nodes[child.as_usize()].failure = failure;
            queue.push_back(child);
        }
    }

    order
}

/// Fill each node's output range in a shared pool.
///
/// A node without terminal patterns shares its failure target's range
/// instead of copying it. Each range is sorted by pattern insertion index.
fn propagate_outputs(nodes: &mut [TrieNode], order: &[NodeId]) -> AcResult<Vec<u32>> {
    let mut pool: Vec<u32> = Vec::new();

    for &id in order {
        if id.is_root() {
            continue;
        }

        let failure = nodes[id.as_usize()].failure;
        let inherited_start = nodes[failure.as_usize()].output_start;
        let inherited_len = nodes[failure.as_usize()].output_len;

        if nodes[id.as_usize()].terminal.is_empty() {
            let node = &mut nodes[id.as_usize()];
            node.output_start = inherited_start;
            node.output_len = inherited_len;
            continue;
        }

        let inherited =
            &pool[inherited_start as usize..(inherited_start + inherited_len) as usize];
        let merged = merge_sorted(&nodes[id.as_usize()].terminal, inherited);

        let start = pool.len();
        if start + merged.len() > u32::MAX as usize {
            return Err(AcError::StateLimitExceeded {
                states: start + merged.len(),
                max: u32::MAX as usize,
            });
        }
        pool.extend_from_slice(&merged);

        let node = &mut nodes[id.as_usize()];
        node.output_start = start as u32;
        node.output_len = merged.len() as u32;
    }

    pool.shrink_to_fit();
    Ok(pool)
}

/// Merge two ascending, disjoint index lists
fn merge_sorted(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            merged.push(a[i]);
            i += 1;
        } else {
            merged.push(b[j]);
            j += 1;
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

/// Check the structural invariants of a finished automaton
pub(crate) fn verify(automaton: &Automaton) -> AcResult<()> {
    let nodes = &automaton.nodes;
    let violation = |node: usize, message: String| AcError::InternalInvariantViolation { node, message };

    let root = &nodes[0];
    if root.depth != 0 || root.failure != NodeId::ROOT {
        return Err(violation(0, "root must have depth 0 and fail to itself".to_string()));
    }

    for (idx, node) in nodes.iter().enumerate() {
        if node.failure.as_usize() >= nodes.len() {
            return Err(violation(idx, format!("failure link {} out of range", node.failure)));
        }
        let failure = &nodes[node.failure.as_usize()];

        if idx != 0 && failure.depth >= node.depth {
            return Err(violation(
                idx,
                format!("failure depth {} not below node depth {}", failure.depth, node.depth),
            ));
        }

        if node.children.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(violation(idx, "duplicate or unsorted child edges".to_string()));
        }
        if let Some(&(byte, child)) = node
            .children
            .iter()
            .find(|&&(_, c)| c.as_usize() >= nodes.len() || nodes[c.as_usize()].depth != node.depth + 1)
        {
            return Err(violation(idx, format!("bad child {child} on byte {byte:#04x}")));
        }

        let output = automaton.output_indices(node);
        if output.windows(2).any(|w| w[0] >= w[1]) {
            return Err(violation(idx, "output set not in insertion order".to_string()));
        }
        let closed = node
            .terminal
            .iter()
            .chain(automaton.output_indices(failure))
            .all(|p| output.binary_search(p).is_ok());
        if !closed {
            return Err(violation(idx, "output set not closed under failure link".to_string()));
        }
    }

    if let Transitions::Dense(table) = &automaton.transitions {
        if table.len() != nodes.len() * ALPHABET_SIZE {
            return Err(violation(0, format!("dense table has {} cells", table.len())));
        }
        if let Some(cell) = table.iter().position(|t| t.as_usize() >= nodes.len()) {
            return Err(violation(cell / ALPHABET_SIZE, "dense transition out of range".to_string()));
        }
    }

    Ok(())
}
