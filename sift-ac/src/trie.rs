// Trie construction
//
// All patterns are inserted into one prefix tree stored in an arena.
// Nodes refer to each other only through NodeId indices; the arena owns
// every node. Failure links and output ranges are left at their root/empty
// defaults here and filled in by the failure resolver.

use crate::pattern::PatternSet;
use crate::{AcConfig, AcError, AcResult};
use smallvec::SmallVec;
use std::fmt;

/// Index of a node in the automaton arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The root node, always at index 0
    pub const ROOT: NodeId = NodeId(0);

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Largest arena a NodeId can address
const MAX_NODES: usize = u32::MAX as usize;

/// A node of the trie
#[derive(Debug, Clone)]
pub struct TrieNode {
    /// Distance from the root
    pub(crate) depth: u32,

    /// Outgoing edges sorted by symbol, at most one per symbol
    pub(crate) children: SmallVec<[(u8, NodeId); 4]>,

    /// Insertion indices of patterns ending exactly here
    pub(crate) terminal: SmallVec<[u32; 1]>,

    /// Longest proper suffix that is also a trie path
    pub(crate) failure: NodeId,

    /// Start of this node's slice in the shared output pool
    pub(crate) output_start: u32,

    /// Length of this node's slice in the shared output pool
    pub(crate) output_len: u32,
}

impl TrieNode {
    fn new(depth: u32) -> Self {
        Self {
            depth,
            children: SmallVec::new(),
            terminal: SmallVec::new(),
            failure: NodeId::ROOT,
            output_start: 0,
            output_len: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth as usize
    }

    /// Child reached on `byte`, if the trie has that edge
    #[inline]
    pub fn child(&self, byte: u8) -> Option<NodeId> {
        self.children
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|idx| self.children[idx].1)
    }

    /// Outgoing edges in symbol order
    pub fn children(&self) -> impl Iterator<Item = (u8, NodeId)> + '_ {
        self.children.iter().copied()
    }

    pub fn is_terminal(&self) -> bool {
        !self.terminal.is_empty()
    }
}

/// Prefix tree over a pattern set, before failure links exist
#[derive(Debug, Clone)]
pub struct Trie {
    pub(crate) nodes: Vec<TrieNode>,
    pub(crate) patterns: PatternSet,
    pub(crate) case_insensitive: bool,
}

impl Trie {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&TrieNode> {
        self.nodes.get(id.as_usize())
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Walk the trie along `bytes` from the root
    pub fn find_path(&self, bytes: &[u8]) -> Option<NodeId> {
        bytes.iter().try_fold(NodeId::ROOT, |node, &byte| {
            self.nodes[node.as_usize()].child(fold(byte, self.case_insensitive))
        })
    }

    /// Return the child of `parent` on `byte`, allocating it if needed
    fn child_or_insert(&mut self, parent: NodeId, byte: u8) -> AcResult<NodeId> {
        let depth = self.nodes[parent.as_usize()].depth + 1;
        let slot = match self.nodes[parent.as_usize()]
            .children
            .binary_search_by_key(&byte, |&(b, _)| b)
        {
            Ok(idx) => return Ok(self.nodes[parent.as_usize()].children[idx].1),
            Err(slot) => slot,
        };

        if self.nodes.len() >= MAX_NODES {
            return Err(AcError::StateLimitExceeded {
                states: self.nodes.len() + 1,
                max: MAX_NODES,
            });
        }

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TrieNode::new(depth));
        self.nodes[parent.as_usize()].children.insert(slot, (byte, id));
        Ok(id)
    }
}

/// Map a byte to its canonical form for matching
#[inline]
pub(crate) fn fold(byte: u8, case_insensitive: bool) -> u8 {
    if case_insensitive {
        byte.to_ascii_lowercase()
    } else {
        byte
    }
}

/// Insert every pattern of `patterns` into a fresh trie.
///
/// Shared prefixes reuse existing nodes, so the arena holds one node per
/// distinct prefix plus the root.
pub fn build_trie(patterns: PatternSet, config: &AcConfig) -> AcResult<Trie> {
    if patterns.is_empty() {
        return Err(AcError::NoPatterns);
    }

    if config.max_patterns > 0 && patterns.len() > config.max_patterns {
        return Err(AcError::TooManyPatterns {
            count: patterns.len(),
            max: config.max_patterns,
        });
    }

    for pattern in patterns.iter() {
        pattern.validate(config.max_pattern_length)?;
    }

    let mut trie = Trie {
        nodes: Vec::with_capacity(patterns.total_bytes() + 1),
        patterns: PatternSet::new(),
        case_insensitive: config.ascii_case_insensitive,
    };
    trie.nodes.push(TrieNode::new(0));

    for (index, pattern) in patterns.iter().enumerate() {
        let mut node = NodeId::ROOT;
        for &byte in &pattern.bytes {
            node = trie.child_or_insert(node, fold(byte, trie.case_insensitive))?;
        }
        trie.nodes[node.as_usize()].terminal.push(index as u32);
    }

    trie.nodes.shrink_to_fit();
    trie.patterns = patterns;

    tracing::debug!(
        patterns = trie.patterns.len(),
        nodes = trie.nodes.len(),
        "Trie built"
    );

    Ok(trie)
}
