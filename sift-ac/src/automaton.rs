// Automaton - the immutable product of construction
//
// Holds the node arena, the shared output pool, the transition storage and
// the pattern set. Nothing here mutates after construction, so one
// automaton can be shared by any number of concurrent scans.

use crate::failure::resolve_failures;
use crate::pattern::{Pattern, PatternId, PatternSet};
use crate::transition::{lazy_goto, TransitionStrategy, Transitions};
use crate::trie::{build_trie, fold, NodeId, TrieNode};
use crate::{AcConfig, AcResult, ALPHABET_SIZE};
use std::fmt;

/// Aho-Corasick automaton over bytes
#[derive(Clone)]
pub struct Automaton {
    pub(crate) nodes: Vec<TrieNode>,
    pub(crate) outputs: Vec<u32>,
    pub(crate) transitions: Transitions,
    pub(crate) patterns: PatternSet,
    pub(crate) case_insensitive: bool,
}

impl Automaton {
    /// Build an automaton with the default configuration
    pub fn new(patterns: PatternSet) -> AcResult<Self> {
        Self::with_config(patterns, AcConfig::default())
    }

    /// Build an automaton: trie, then failure links and transitions
    pub fn with_config(patterns: PatternSet, config: AcConfig) -> AcResult<Self> {
        let trie = build_trie(patterns, &config)?;
        resolve_failures(trie, &config)
    }

    /// Create a builder for constructing an automaton
    pub fn builder() -> AutomatonBuilder {
        AutomatonBuilder::default()
    }

    /// The initial state of every scan
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Next state after reading `byte` in `state`.
    ///
    /// Total over every state of this automaton and every byte value.
    #[inline]
    pub fn goto(&self, state: NodeId, byte: u8) -> NodeId {
        let byte = fold(byte, self.case_insensitive);
        match &self.transitions {
            Transitions::Dense(table) => table[state.as_usize() * ALPHABET_SIZE + byte as usize],
            Transitions::Lazy => lazy_goto(&self.nodes, state, byte),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn alphabet_size(&self) -> usize {
        ALPHABET_SIZE
    }

    pub fn strategy(&self) -> TransitionStrategy {
        self.transitions.strategy()
    }

    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Look up a pattern by id
    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(id)
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Read-only view of a node
    pub fn node(&self, id: NodeId) -> Option<NodeView<'_>> {
        self.nodes.get(id.as_usize()).map(|node| NodeView {
            automaton: self,
            id,
            node,
        })
    }

    /// Follow trie edges (not failure links) from the root along `bytes`
    pub fn find_path(&self, bytes: &[u8]) -> Option<NodeId> {
        bytes.iter().try_fold(NodeId::ROOT, |node, &byte| {
            self.nodes[node.as_usize()].child(fold(byte, self.case_insensitive))
        })
    }

    /// Estimated heap memory in bytes
    pub fn memory_usage(&self) -> usize {
        let spilled: usize = self
            .nodes
            .iter()
            .map(|n| {
                let children = if n.children.spilled() {
                    n.children.capacity() * std::mem::size_of::<(u8, NodeId)>()
                } else {
                    0
                };
                let terminal = if n.terminal.spilled() {
                    n.terminal.capacity() * std::mem::size_of::<u32>()
                } else {
                    0
                };
                children + terminal
            })
            .sum();

        self.nodes.len() * std::mem::size_of::<TrieNode>()
            + spilled
            + self.outputs.len() * std::mem::size_of::<u32>()
            + self.transitions.memory_usage()
            + self.patterns.total_bytes()
    }

    /// Pattern insertion indices reported at `node`, in insertion order
    #[inline]
    pub(crate) fn output_indices(&self, node: &TrieNode) -> &[u32] {
        let start = node.output_start as usize;
        &self.outputs[start..start + node.output_len as usize]
    }

    #[inline]
    pub(crate) fn output_at(&self, state: NodeId) -> &[u32] {
        self.output_indices(&self.nodes[state.as_usize()])
    }
}

impl fmt::Debug for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Automaton")
            .field("pattern_count", &self.patterns.len())
            .field("node_count", &self.nodes.len())
            .field("strategy", &self.strategy())
            .field("case_insensitive", &self.case_insensitive)
            .field("memory_usage", &self.memory_usage())
            .finish()
    }
}

/// Borrowed view of one automaton node
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    automaton: &'a Automaton,
    id: NodeId,
    node: &'a TrieNode,
}

impl<'a> NodeView<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.node.depth()
    }

    pub fn failure(&self) -> NodeId {
        self.node.failure
    }

    pub fn children(&self) -> impl Iterator<Item = (u8, NodeId)> + 'a {
        let node = self.node;
        node.children.iter().copied()
    }

    /// Patterns ending exactly at this node
    pub fn terminal_patterns(&self) -> impl Iterator<Item = PatternId> + 'a {
        let patterns = &self.automaton.patterns;
        let node = self.node;
        node.terminal
            .iter()
            .map(move |&idx| patterns.by_index(idx as usize).id)
    }

    /// Patterns recognized on entering this node, including inherited ones
    pub fn output(&self) -> impl Iterator<Item = PatternId> + 'a {
        let automaton = self.automaton;
        let patterns = &automaton.patterns;
        automaton
            .output_indices(self.node)
            .iter()
            .map(move |&idx| patterns.by_index(idx as usize).id)
    }
}

impl fmt::Debug for NodeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeView")
            .field("id", &self.id)
            .field("depth", &self.node.depth)
            .field("failure", &self.node.failure)
            .field("output_len", &self.node.output_len)
            .finish()
    }
}

/// Builder for constructing an Automaton
#[derive(Debug, Default)]
pub struct AutomatonBuilder {
    patterns: Vec<(PatternId, Vec<u8>)>,
    config: AcConfig,
}

impl AutomatonBuilder {
    /// Add a pattern to the automaton
    pub fn add_pattern(mut self, id: impl Into<PatternId>, bytes: impl Into<Vec<u8>>) -> Self {
        self.patterns.push((id.into(), bytes.into()));
        self
    }

    /// Add multiple patterns
    pub fn add_patterns<I, K, B>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = (K, B)>,
        K: Into<PatternId>,
        B: Into<Vec<u8>>,
    {
        self.patterns
            .extend(patterns.into_iter().map(|(id, bytes)| (id.into(), bytes.into())));
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: AcConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the patterns and build the automaton
    pub fn build(self) -> AcResult<Automaton> {
        let set = PatternSet::try_from_iter(self.patterns)?;
        Automaton::with_config(set, self.config)
    }

    /// Get the number of patterns added so far
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}
