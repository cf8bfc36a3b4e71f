/*!
Glob patterns compiled to minimized DFAs over Unicode scalar values.

The pattern language is small (see [`PatternChar`]), but compiling it
through a real NFA → DFA pipeline keeps the door open to richer patterns
later, and gives pattern/trie intersection a clean contract: drive the DFA
one scalar at a time with [`Dfa::advance`], or across a sorted batch of
candidate scalars with [`Dfa::advance_multi`].

Every DFA state carries an ordered list of concrete transitions plus a
single "otherwise" transition taken when no concrete label applies; a
missing "otherwise" means the state rejects everything else.
*/

use std::fmt;

mod build;

/// One element of a compiled pattern.
///
/// - `Exact(c)` matches only `c` itself.
/// - `Loose(c)` (`c` is lowercase ASCII) also matches the uppercase sibling
///   and the fixed table of lookalike scalars from `zg_unicode`.
/// - `MatchOne` matches any single scalar (`?` in glob syntax).
/// - `MatchN` matches any scalar sequence, including the empty one (`*`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatternChar {
    Exact(char),
    Loose(char),
    MatchOne,
    MatchN,
}

impl PatternChar {
    /// `Loose` when asked for and possible, `Exact` otherwise.
    pub fn literal(ch: char, loose: bool) -> PatternChar {
        if loose && ch.is_ascii_lowercase() {
            PatternChar::Loose(ch)
        } else {
            PatternChar::Exact(ch)
        }
    }
}

/// Index of a DFA state inside its owning [`Dfa`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateId(pub(crate) u32);

#[derive(Debug)]
pub(crate) struct DfaNode {
    pub(crate) accepting: bool,
    /// Sorted by label. Labels are Unicode scalar values.
    pub(crate) transitions: Vec<(u32, u32)>,
    pub(crate) otherwise: Option<u32>,
}

/// A compiled, minimized pattern automaton.
pub struct Dfa {
    nodes: Vec<DfaNode>,
    start: u32,
    description: String,
}

impl Dfa {
    /// Compiles `pattern` via the linear NFA, the subset construction, and a
    /// hash-consing minimization pass. `description` is the human-readable
    /// source form, kept for diagnostics.
    pub fn compile(pattern: &[PatternChar], description: impl Into<String>) -> Dfa {
        let (nodes, start) = build::convert(pattern);
        Dfa {
            nodes,
            start,
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start(&self) -> StateId {
        StateId(self.start)
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.nodes[state.0 as usize].accepting
    }

    /// One step. Linear scan of the concrete transitions (they are short in
    /// practice), falling back to the "otherwise" edge.
    pub fn advance_scalar(&self, state: StateId, key: u32) -> Option<StateId> {
        let node = &self.nodes[state.0 as usize];
        for &(label, target) in &node.transitions {
            if label == key {
                return Some(StateId(target));
            }
        }
        node.otherwise.map(StateId)
    }

    pub fn advance(&self, state: StateId, key: char) -> Option<StateId> {
        self.advance_scalar(state, key as u32)
    }

    /// Composes per-scalar advances, short-circuiting on rejection.
    pub fn advance_over(
        &self,
        state: StateId,
        keys: impl IntoIterator<Item = char>,
    ) -> Option<StateId> {
        let mut current = state;
        for ch in keys {
            current = self.advance(current, ch)?;
        }
        Some(current)
    }

    /// Batch form of [`advance_scalar`](Dfa::advance_scalar): one result per
    /// key, walking the transition list and the key list in parallel.
    ///
    /// `keys` must be sorted ascending; the trie guarantees this for its
    /// transition keys.
    pub fn advance_multi(&self, state: StateId, keys: &[u32], out: &mut Vec<Option<StateId>>) {
        debug_assert!(keys.windows(2).all(|w| w[0] < w[1]), "keys must be sorted");
        out.clear();
        let node = &self.nodes[state.0 as usize];
        let transitions = &node.transitions;
        let mut tp = 0;
        for &key in keys {
            while tp < transitions.len() && transitions[tp].0 < key {
                tp += 1;
            }
            if tp < transitions.len() && transitions[tp].0 == key {
                out.push(Some(StateId(transitions[tp].1)));
            } else {
                // No concrete transition on this key.
                out.push(node.otherwise.map(StateId));
            }
        }
    }

    /// True iff the start state accepts every string: accepting, no concrete
    /// transitions, and an "otherwise" edge looping to itself.
    pub fn accepts_everything(&self) -> bool {
        let node = &self.nodes[self.start as usize];
        node.accepting && node.transitions.is_empty() && node.otherwise == Some(self.start)
    }

    /// Whole-string acceptance; mostly useful in tests.
    pub fn accepts(&self, text: &str) -> bool {
        self.advance_over(self.start(), text.chars())
            .is_some_and(|s| self.is_accepting(s))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl fmt::Debug for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dfa({:?}, {} nodes)",
            self.description,
            self.nodes.len()
        )
    }
}
