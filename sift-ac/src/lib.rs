// Sift AC - Aho-Corasick Multi-Pattern Automaton
//!
// This crate provides streaming multi-pattern byte-string matching using
// the Aho-Corasick algorithm: one pass over the input reports every
// occurrence of every pattern, independent of dictionary size.
//
// ## Architecture
//
// ```text
// ┌─────────────────────────────────────────────────┐
// │           PatternSet                            │
// │  (validated (id, bytes) pairs, insertion order) │
// └──────────────┬──────────────────────────────────┘
//                │ build_trie
//                v
// ┌─────────────────────────────────────────────────┐
// │           Trie (arena of nodes)                 │
// └──────────────┬──────────────────────────────────┘
//                │ resolve_failures
//                v
// ┌─────────────────────────────────────────────────┐
// │      Automaton (immutable, Send + Sync)         │
// │  - failure links + closed output sets           │
// │  - dense goto table or lazy failure chasing     │
// └──────────────┬──────────────────────────────────┘
//                │ scan / find_iter / stream_reader
//                v
// ┌─────────────────────────────────────────────────┐
// │   ScanState (one per stream) -> Match iterator  │
// └─────────────────────────────────────────────────┘
// ```

mod automaton;
mod failure;
mod pattern;
mod scanner;
mod transition;
mod trie;

#[cfg(test)]
mod perf;

pub use automaton::{Automaton, AutomatonBuilder, NodeView};
pub use failure::resolve_failures;
pub use pattern::{Pattern, PatternId, PatternSet};
pub use scanner::{FindIter, Match, Matches, ScanState, StreamMatches, DEFAULT_BUFFER_SIZE};
pub use transition::TransitionStrategy;
pub use trie::{build_trie, NodeId, Trie, TrieNode};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of the input alphabet (one symbol per byte value)
pub const ALPHABET_SIZE: usize = 256;

/// Errors that can occur while building an automaton
#[derive(Debug, Error)]
pub enum AcError {
    #[error("Invalid pattern {id}: {reason}")]
    InvalidPattern { id: PatternId, reason: String },

    #[error("Duplicate pattern id {id} with differing content")]
    DuplicateId { id: PatternId },

    #[error("No patterns provided")]
    NoPatterns,

    #[error("Pattern too long: {length} bytes (max: {max})")]
    PatternTooLong { length: usize, max: usize },

    #[error("Too many patterns: {count} (max: {max})")]
    TooManyPatterns { count: usize, max: usize },

    #[error("State limit exceeded: {states} states (max: {max})")]
    StateLimitExceeded { states: usize, max: usize },

    #[error("Internal invariant violated at node {node}: {message}")]
    InternalInvariantViolation { node: usize, message: String },
}

/// Result type for automaton operations
pub type AcResult<T> = Result<T, AcError>;

/// Configuration for automaton construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcConfig {
    /// Maximum number of patterns (0 = unlimited)
    pub max_patterns: usize,

    /// Maximum pattern length in bytes (0 = unlimited)
    pub max_pattern_length: usize,

    /// Fold ASCII letters when building and scanning
    pub ascii_case_insensitive: bool,

    /// How the transition function is realized
    pub transitions: TransitionStrategy,

    /// Above this many trie nodes a dense table request falls back to lazy
    pub dense_state_limit: usize,

    /// Check every structural invariant after construction
    pub verify_invariants: bool,
}

impl Default for AcConfig {
    fn default() -> Self {
        Self {
            max_patterns: 10_000,
            max_pattern_length: 4096,
            ascii_case_insensitive: false,
            transitions: TransitionStrategy::Dense,
            dense_state_limit: 50_000,
            verify_invariants: cfg!(debug_assertions),
        }
    }
}
