// Pattern types for the automaton
//
// A PatternSet is the validated dictionary handed to construction:
// non-empty byte strings keyed by caller-chosen ids, kept in insertion
// order. Insertion order decides how simultaneous matches are reported.

use crate::{AcError, AcResult};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-assigned identifier of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(pub u32);

impl From<u32> for PatternId {
    fn from(id: u32) -> Self {
        PatternId(id)
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single dictionary entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    /// Identifier reported in matches
    pub id: PatternId,

    /// The bytes to search for (never empty)
    pub bytes: Vec<u8>,
}

impl Pattern {
    /// Create a pattern, rejecting empty byte strings
    pub fn new(id: PatternId, bytes: impl Into<Vec<u8>>) -> AcResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(AcError::InvalidPattern {
                id,
                reason: "Pattern cannot be empty".to_string(),
            });
        }

        Ok(Self { id, bytes })
    }

    /// Length of the pattern in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; empty patterns are rejected on creation
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Validate this pattern against a length limit (0 = unlimited)
    pub fn validate(&self, max_length: usize) -> AcResult<()> {
        if max_length > 0 && self.bytes.len() > max_length {
            return Err(AcError::PatternTooLong {
                length: self.bytes.len(),
                max: max_length,
            });
        }
        Ok(())
    }
}

/// Validated, insertion-ordered collection of patterns
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
    index: AHashMap<PatternId, usize>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern.
    ///
    /// Returns `Ok(false)` when the same id was already inserted with
    /// identical content, `DuplicateId` when the content differs.
    pub fn insert(&mut self, id: impl Into<PatternId>, bytes: impl Into<Vec<u8>>) -> AcResult<bool> {
        let pattern = Pattern::new(id.into(), bytes)?;
        self.push(pattern)
    }

    /// Add an already constructed pattern, with the same rules as `insert`
    pub fn push(&mut self, pattern: Pattern) -> AcResult<bool> {
        if let Some(&existing) = self.index.get(&pattern.id) {
            if self.patterns[existing].bytes == pattern.bytes {
                return Ok(false);
            }
            return Err(AcError::DuplicateId { id: pattern.id });
        }

        self.index.insert(pattern.id, self.patterns.len());
        self.patterns.push(pattern);
        Ok(true)
    }

    /// Build a set from `(id, bytes)` pairs, failing on the first bad entry
    pub fn try_from_iter<I, K, B>(iter: I) -> AcResult<Self>
    where
        I: IntoIterator<Item = (K, B)>,
        K: Into<PatternId>,
        B: Into<Vec<u8>>,
    {
        let mut set = Self::new();
        for (id, bytes) in iter {
            set.insert(id, bytes)?;
        }
        Ok(set)
    }

    /// Look up a pattern by id
    pub fn get(&self, id: PatternId) -> Option<&Pattern> {
        self.index.get(&id).map(|&idx| &self.patterns[idx])
    }

    /// Pattern at a given insertion index
    pub(crate) fn by_index(&self, index: usize) -> &Pattern {
        &self.patterns[index]
    }

    /// Iterate patterns in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Total number of pattern bytes
    pub fn total_bytes(&self) -> usize {
        self.patterns.iter().map(Pattern::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_creation() {
        let pattern = Pattern::new(PatternId(1), "bash").unwrap();
        assert_eq!(pattern.bytes, b"bash");
        assert_eq!(pattern.len(), 4);
    }

    #[test]
    fn test_pattern_empty() {
        let result = Pattern::new(PatternId(1), "");
        assert!(matches!(result, Err(AcError::InvalidPattern { id: PatternId(1), .. })));
    }

    #[test]
    fn test_pattern_validation() {
        let pattern = Pattern::new(PatternId(1), "bash").unwrap();
        assert!(pattern.validate(10).is_ok());
        assert!(pattern.validate(0).is_ok());
        assert!(matches!(
            pattern.validate(2),
            Err(AcError::PatternTooLong { length: 4, max: 2 })
        ));
    }

    #[test]
    fn test_set_preserves_insertion_order() {
        let set = PatternSet::try_from_iter([(3u32, "c"), (1, "a"), (2, "b")]).unwrap();
        let ids: Vec<u32> = set.iter().map(|p| p.id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(set.total_bytes(), 3);
    }

    #[test]
    fn test_duplicate_id_identical_content_is_idempotent() {
        let mut set = PatternSet::new();
        assert!(set.insert(1u32, "he").unwrap());
        assert!(!set.insert(1u32, "he").unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_duplicate_id_differing_content() {
        let mut set = PatternSet::new();
        set.insert(1u32, "he").unwrap();
        let err = set.insert(1u32, "she").unwrap_err();
        assert!(matches!(err, AcError::DuplicateId { id: PatternId(1) }));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_same_content_different_ids() {
        let set = PatternSet::try_from_iter([(1u32, "he"), (2, "he")]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(PatternId(2)).unwrap().bytes, b"he");
        assert!(set.get(PatternId(9)).is_none());
    }
}
