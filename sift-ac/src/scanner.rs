// Streaming scanner
//
// A scan owns one ScanState and pulls matches out of the automaton one at
// a time. The state carries everything needed to resume: feeding input in
// chunks through the same state yields exactly the matches of the whole
// input, and an iterator dropped before it is drained leaves the undelivered
// matches of the last consumed byte to be reported by the next scan call.

use crate::automaton::Automaton;
use crate::pattern::PatternId;
use crate::trie::NodeId;
use serde::Serialize;
use std::io::{self, Read};
use std::ops::Range;

/// Read buffer size used by `Automaton::stream_reader`
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// A pattern occurrence in the scanned stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Match {
    /// The pattern that matched
    pub pattern_id: PatternId,

    /// Stream offset of the first matched byte
    pub start: usize,

    /// Stream offset just past the last matched byte
    pub end: usize,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Per-stream scan position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanState {
    current: NodeId,
    position: usize,
    /// Outputs of `current` already delivered
    emitted: u32,
}

impl ScanState {
    /// A fresh state at the root, stream offset 0
    pub fn new() -> Self {
        Self {
            current: NodeId::ROOT,
            position: 0,
            emitted: 0,
        }
    }

    /// Automaton state after the last consumed byte
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.position
    }
}

impl Default for ScanState {
    fn default() -> Self {
        Self::new()
    }
}

impl Automaton {
    /// Scan `input` as the continuation of the stream tracked by `state`
    pub fn scan<'a, 's, 'i>(&'a self, state: &'s mut ScanState, input: &'i [u8]) -> Matches<'a, 's, 'i> {
        Matches {
            automaton: self,
            state,
            input,
            cursor: 0,
        }
    }

    /// Scan a complete haystack from a fresh state
    pub fn find_iter<'a, 'i>(&'a self, input: &'i [u8]) -> FindIter<'a, 'i> {
        FindIter {
            automaton: self,
            state: ScanState::new(),
            input,
            cursor: 0,
        }
    }

    /// Collect every match in `input`
    pub fn find_all(&self, input: &[u8]) -> Vec<Match> {
        self.find_iter(input).collect()
    }

    /// Whether any pattern occurs in `input`; stops at the first occurrence
    pub fn is_match(&self, input: &[u8]) -> bool {
        let mut state = NodeId::ROOT;
        for &byte in input {
            state = self.goto(state, byte);
            if !self.output_at(state).is_empty() {
                return true;
            }
        }
        false
    }

    /// Scan everything `reader` produces, through a bounded buffer
    pub fn stream_reader<R: Read>(&self, reader: R) -> StreamMatches<'_, R> {
        self.stream_reader_with_capacity(reader, DEFAULT_BUFFER_SIZE)
    }

    pub fn stream_reader_with_capacity<R: Read>(&self, reader: R, capacity: usize) -> StreamMatches<'_, R> {
        StreamMatches {
            automaton: self,
            reader,
            state: ScanState::new(),
            buf: vec![0; capacity.max(1)],
            len: 0,
            cursor: 0,
            done: false,
        }
    }

    /// Produce the next match, consuming input from `input[*cursor..]` as
    /// needed. Returns None once the input is exhausted and every match of
    /// the last consumed byte has been delivered.
    #[inline]
    fn next_match(&self, state: &mut ScanState, input: &[u8], cursor: &mut usize) -> Option<Match> {
        loop {
            let output = self.output_at(state.current);
            if let Some(&index) = output.get(state.emitted as usize) {
                let pattern = self.patterns.by_index(index as usize);
                state.emitted += 1;
                return Some(Match {
                    pattern_id: pattern.id,
                    start: state.position - pattern.len(),
                    end: state.position,
                });
            }

            let &byte = input.get(*cursor)?;
            *cursor += 1;
            state.current = self.goto(state.current, byte);
            state.position += 1;
            state.emitted = 0;
        }
    }
}

/// Matches of one chunk, advancing a caller-owned ScanState
#[derive(Debug)]
pub struct Matches<'a, 's, 'i> {
    automaton: &'a Automaton,
    state: &'s mut ScanState,
    input: &'i [u8],
    cursor: usize,
}

impl Matches<'_, '_, '_> {
    /// Bytes of the chunk not consumed yet
    pub fn remaining(&self) -> usize {
        self.input.len() - self.cursor
    }
}

impl Iterator for Matches<'_, '_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        self.automaton.next_match(self.state, self.input, &mut self.cursor)
    }
}

/// Matches of a complete haystack
#[derive(Debug)]
pub struct FindIter<'a, 'i> {
    automaton: &'a Automaton,
    state: ScanState,
    input: &'i [u8],
    cursor: usize,
}

impl Iterator for FindIter<'_, '_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        self.automaton.next_match(&mut self.state, self.input, &mut self.cursor)
    }
}

/// Matches of a byte stream read from `R`
#[derive(Debug)]
pub struct StreamMatches<'a, R> {
    automaton: &'a Automaton,
    reader: R,
    state: ScanState,
    buf: Vec<u8>,
    len: usize,
    cursor: usize,
    done: bool,
}

impl<R> StreamMatches<'_, R> {
    /// Bytes consumed from the reader so far
    pub fn position(&self) -> usize {
        self.state.position()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Iterator for StreamMatches<'_, R> {
    type Item = io::Result<Match>;

    fn next(&mut self) -> Option<io::Result<Match>> {
        loop {
            if let Some(m) =
                self.automaton
                    .next_match(&mut self.state, &self.buf[..self.len], &mut self.cursor)
            {
                return Some(Ok(m));
            }
            if self.done {
                return None;
            }

            match self.reader.read(&mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(n) => {
                    self.len = n;
                    self.cursor = 0;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::TransitionStrategy;
    use crate::AcConfig;

    fn classic() -> Automaton {
        Automaton::builder()
            .add_patterns([(1u32, "he"), (2, "she"), (3, "his"), (4, "hers")])
            .build()
            .unwrap()
    }

    fn m(id: u32, start: usize, end: usize) -> Match {
        Match {
            pattern_id: PatternId(id),
            start,
            end,
        }
    }

    /// Reader handing out at most `step` bytes per call
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_ushers() {
        for strategy in [TransitionStrategy::Dense, TransitionStrategy::Lazy] {
            let ac = Automaton::builder()
                .add_patterns([(1u32, "he"), (2, "she"), (3, "his"), (4, "hers")])
                .config(AcConfig {
                    transitions: strategy,
                    ..AcConfig::default()
                })
                .build()
                .unwrap();

            let matches = ac.find_all(b"ushers");
            assert_eq!(matches, vec![m(1, 2, 4), m(2, 1, 4), m(4, 2, 6)]);
        }
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let ac = Automaton::builder()
            .add_patterns([(9u32, "abc"), (5, "c"), (7, "bc")])
            .build()
            .unwrap();
        let ids: Vec<u32> = ac.find_iter(b"abc").map(|m| m.pattern_id.0).collect();
        assert_eq!(ids, vec![9, 5, 7]);
    }

    #[test]
    fn test_boundaries() {
        let ac = classic();
        assert!(ac.find_all(b"").is_empty());
        assert!(ac.find_all(b"h").is_empty());
        assert_eq!(ac.find_all(b"his"), vec![m(3, 0, 3)]);

        let single = Automaton::builder().add_pattern(1u32, "a").build().unwrap();
        assert_eq!(single.find_all(b"aba"), vec![m(1, 0, 1), m(1, 2, 3)]);
    }

    #[test]
    fn test_overlapping_occurrences() {
        let ac = Automaton::builder().add_pattern(1u32, "aa").build().unwrap();
        assert_eq!(ac.find_all(b"aaaa"), vec![m(1, 0, 2), m(1, 1, 3), m(1, 2, 4)]);
    }

    #[test]
    fn test_identical_content_reports_each_id() {
        let ac = Automaton::builder()
            .add_patterns([(1u32, "he"), (2, "he")])
            .build()
            .unwrap();
        assert_eq!(ac.find_all(b"the"), vec![m(1, 1, 3), m(2, 1, 3)]);
    }

    #[test]
    fn test_chunked_scan_matches_whole_scan() {
        let ac = classic();
        let text = b"ushers his hershey she";
        let whole = ac.find_all(text);

        for split in 0..=text.len() {
            let mut state = ScanState::new();
            let (a, b) = text.split_at(split);
            let mut chunked: Vec<Match> = ac.scan(&mut state, a).collect();
            chunked.extend(ac.scan(&mut state, b));
            assert_eq!(chunked, whole, "split at {split}");
            assert_eq!(state.position(), text.len());
        }
    }

    #[test]
    fn test_partially_drained_scan_resumes() {
        let ac = classic();
        let mut state = ScanState::new();

        let mut first = ac.scan(&mut state, b"ushe");
        assert_eq!(first.next(), Some(m(1, 2, 4)));
        assert_eq!(first.remaining(), 0);
        drop(first);

        // "she" at the same end offset is still owed
        let rest: Vec<Match> = ac.scan(&mut state, b"rs").collect();
        assert_eq!(rest, vec![m(2, 1, 4), m(4, 2, 6)]);
    }

    #[test]
    fn test_state_tracks_position() {
        let ac = classic();
        let mut state = ScanState::new();
        assert_eq!(state.current(), ac.root());

        let _ = ac.scan(&mut state, b"xsh").count();
        assert_eq!(state.position(), 3);
        assert_eq!(Some(state.current()), ac.find_path(b"sh"));
    }

    #[test]
    fn test_is_match() {
        let ac = classic();
        assert!(ac.is_match(b"a shell"));
        assert!(!ac.is_match(b"nothing at all"));
        assert!(ac.is_match(b"nothing he"));
        assert!(!ac.is_match(b""));
    }

    #[test]
    fn test_case_insensitive_scan() {
        let ac = Automaton::builder()
            .add_patterns([(1u32, "He"), (2, "SHE")])
            .config(AcConfig {
                ascii_case_insensitive: true,
                ..AcConfig::default()
            })
            .build()
            .unwrap();
        assert_eq!(ac.find_all(b"uShE"), vec![m(1, 2, 4), m(2, 1, 4)]);
        assert!(classic().find_all(b"SHE").is_empty());
    }

    #[test]
    fn test_stream_reader_matches_find_all() {
        let ac = classic();
        let text = b"she sells hers; his hershey ushers";
        let expected = ac.find_all(text);

        for step in [1, 2, 3, 7, 64] {
            let reader = Trickle { data: text, step };
            let got: Vec<Match> = ac
                .stream_reader_with_capacity(reader, 4)
                .collect::<io::Result<_>>()
                .unwrap();
            assert_eq!(got, expected, "step {step}");
        }
    }

    #[test]
    fn test_stream_reader_surfaces_io_error() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk gone"))
            }
        }

        let ac = classic();
        let mut stream = ac.stream_reader(Broken);
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_match_helpers() {
        let found = m(4, 2, 6);
        assert_eq!(found.len(), 4);
        assert_eq!(found.range(), 2..6);
        assert!(!found.is_empty());
        assert_eq!(
            serde_json::to_string(&found).unwrap(),
            r#"{"pattern_id":4,"start":2,"end":6}"#
        );
    }
}
