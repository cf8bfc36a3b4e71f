//! NFA construction, subset construction, and hash-consing minimization.
//!
//! All three graphs are index arenas: nodes live in `Vec`s and refer to each
//! other by position. The minimization step treats self-references as a
//! distinguished sentinel so two states that each loop on themselves compare
//! equal.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use zg_unicode::fuzzy_equivalents;

use super::{DfaNode, PatternChar};

#[derive(Default)]
struct NfaNode {
    accepting: bool,
    /// Sorted, unique labels.
    transitions: Vec<(u32, usize)>,
    /// Taken when no concrete label applies.
    otherwise: Option<usize>,
    /// Epsilon edge; consumed nothing.
    empty: Option<usize>,
}

/// Builds the linear NFA right-to-left: node `i` handles `pattern[i]`, node
/// `pattern.len()` accepts.
fn build_nfa(pattern: &[PatternChar]) -> Vec<NfaNode> {
    let mut nodes: Vec<NfaNode> = (0..=pattern.len()).map(|_| NfaNode::default()).collect();
    nodes[pattern.len()].accepting = true;

    for (i, pc) in pattern.iter().enumerate().rev() {
        let next = i + 1;
        match *pc {
            PatternChar::Exact(ch) => {
                nodes[i].transitions = vec![(ch as u32, next)];
            }
            PatternChar::Loose(ch) => {
                let mut transitions = vec![
                    (ch as u32, next),
                    (ch.to_ascii_uppercase() as u32, next),
                ];
                transitions.extend(fuzzy_equivalents(ch).chars().map(|e| (e as u32, next)));
                transitions.sort_unstable();
                transitions.dedup();
                nodes[i].transitions = transitions;
            }
            PatternChar::MatchOne => {
                nodes[i].otherwise = Some(next);
            }
            PatternChar::MatchN => {
                // Self-loop on every scalar, with an epsilon step forward.
                nodes[i].otherwise = Some(i);
                nodes[i].empty = Some(next);
            }
        }
    }
    nodes
}

const SELF_SENTINEL: u64 = u64::MAX;

/// Value identity of an intermediate node: accepting flag, ordered
/// transitions, and the "otherwise" edge, with self-references canonicalized.
type NodeKey = (bool, Vec<(u32, u64)>, Option<u64>);

#[derive(Default)]
struct INode {
    accepting: bool,
    is_start: bool,
    /// Ordered by label; built in ascending order.
    transitions: Vec<(u32, usize)>,
    otherwise: Option<usize>,
    /// Reverse edges, used to forward references when this node is folded
    /// into an equivalent one: (source node, index into its transition list).
    incoming: Vec<(usize, usize)>,
    incoming_otherwise: Vec<usize>,
    /// The key under which this node currently sits in the unique set.
    unique_key: Option<NodeKey>,
    dead: bool,
}

struct Converter<'n> {
    nfa: &'n [NfaNode],
    inodes: Vec<INode>,
    /// Each intermediate node's NFA member subset, parallel to `inodes`.
    subsets: Vec<Vec<usize>>,
    interned: HashMap<Vec<usize>, usize>,
    populate_work: Vec<usize>,
    key_scratch: Vec<usize>,
}

impl<'n> Converter<'n> {
    fn new(nfa: &'n [NfaNode]) -> Converter<'n> {
        let mut c = Converter {
            nfa,
            inodes: Vec::new(),
            subsets: Vec::new(),
            interned: HashMap::new(),
            populate_work: Vec::new(),
            key_scratch: Vec::new(),
        };
        c.key_scratch.clear();
        c.add_with_closure(0);
        let start = c.lookup_or_create();
        c.inodes[start].is_start = true;
        while let Some(id) = c.populate_work.pop() {
            c.populate(id);
        }
        c
    }

    /// Adds `node` and everything reachable over epsilon edges to the
    /// in-progress subset key.
    fn add_with_closure(&mut self, mut node: usize) {
        loop {
            self.key_scratch.push(node);
            match self.nfa[node].empty {
                Some(next) => node = next,
                None => break,
            }
        }
    }

    /// Interns the scratch subset, creating (and scheduling) a fresh
    /// intermediate node for it if it is new. Clears the scratch.
    fn lookup_or_create(&mut self) -> usize {
        self.key_scratch.sort_unstable();
        self.key_scratch.dedup();
        let key = std::mem::take(&mut self.key_scratch);
        match self.interned.entry(key) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let id = self.inodes.len();
                self.subsets.push(e.key().clone());
                self.inodes.push(INode::default());
                e.insert(id);
                self.populate_work.push(id);
                id
            }
        }
    }

    /// Fills in one intermediate node from its NFA members: merge the
    /// members' concrete transitions label by label, then derive the
    /// accepting flag and the combined "otherwise" subset.
    fn populate(&mut self, id: usize) {
        let members = self.subsets[id].clone();
        let mut cursors = vec![0usize; members.len()];

        loop {
            let mut min: Option<u32> = None;
            for (j, &m) in members.iter().enumerate() {
                if let Some(&(label, _)) = self.nfa[m].transitions.get(cursors[j]) {
                    min = Some(min.map_or(label, |v| v.min(label)));
                }
            }
            let Some(min) = min else { break };

            self.key_scratch.clear();
            for (j, &m) in members.iter().enumerate() {
                if let Some(&(label, target)) = self.nfa[m].transitions.get(cursors[j]) {
                    if label == min {
                        self.add_with_closure(target);
                        cursors[j] += 1;
                        continue;
                    }
                }
                // This member is exhausted or lacks an edge on `min`; its
                // "otherwise" applies instead.
                if let Some(o) = self.nfa[m].otherwise {
                    self.add_with_closure(o);
                }
            }
            let target = self.lookup_or_create();
            self.add_transition(id, min, target);
        }

        let mut accepting = false;
        self.key_scratch.clear();
        for &m in &members {
            accepting |= self.nfa[m].accepting;
            if let Some(o) = self.nfa[m].otherwise {
                self.add_with_closure(o);
            }
        }
        self.inodes[id].accepting = accepting;
        if !self.key_scratch.is_empty() {
            let target = self.lookup_or_create();
            self.add_otherwise(id, target);
        }
    }

    fn add_transition(&mut self, from: usize, label: u32, to: usize) {
        let index = self.inodes[from].transitions.len();
        if let Some(&(last, _)) = self.inodes[from].transitions.last() {
            assert!(last < label, "transition labels added out of order");
        }
        self.inodes[from].transitions.push((label, to));
        if to != from {
            self.inodes[to].incoming.push((from, index));
        }
    }

    fn add_otherwise(&mut self, from: usize, to: usize) {
        assert!(self.inodes[from].otherwise.is_none());
        self.inodes[from].otherwise = Some(to);
        if to != from {
            self.inodes[to].incoming_otherwise.push(from);
        }
    }

    fn canonicalize(&self, target: usize, this: usize) -> u64 {
        if target == this {
            SELF_SENTINEL
        } else {
            target as u64
        }
    }

    fn node_key(&self, id: usize) -> NodeKey {
        let node = &self.inodes[id];
        (
            node.accepting,
            node.transitions
                .iter()
                .map(|&(label, target)| (label, self.canonicalize(target, id)))
                .collect(),
            node.otherwise.map(|o| self.canonicalize(o, id)),
        )
    }

    /// Folds value-equal nodes together, iterating to a fixed point: when a
    /// node turns out to be a duplicate, every reference to it is forwarded
    /// to the survivor, and each node modified by that forwarding is ejected
    /// from the unique set and re-evaluated.
    fn squish(&mut self) -> HashMap<NodeKey, usize> {
        let mut unique: HashMap<NodeKey, usize> = HashMap::new();
        let mut work: Vec<usize> = (0..self.inodes.len()).collect();

        while let Some(id) = work.pop() {
            if self.inodes[id].dead {
                continue;
            }
            let key = self.node_key(id);
            let survivor = match unique.entry(key) {
                Entry::Vacant(e) => {
                    self.inodes[id].unique_key = Some(e.key().clone());
                    e.insert(id);
                    continue;
                }
                Entry::Occupied(e) => *e.get(),
            };
            if survivor != id {
                self.forward_references(id, survivor, &mut unique, &mut work);
            }
        }
        unique
    }

    fn forward_references(
        &mut self,
        from: usize,
        to: usize,
        unique: &mut HashMap<NodeKey, usize>,
        work: &mut Vec<usize>,
    ) {
        if self.inodes[from].is_start {
            self.inodes[to].is_start = true;
        }
        let incoming = std::mem::take(&mut self.inodes[from].incoming);
        for (source, index) in incoming {
            self.evict(source, unique, work);
            self.inodes[source].transitions[index].1 = to;
            self.inodes[to].incoming.push((source, index));
        }
        let incoming_otherwise = std::mem::take(&mut self.inodes[from].incoming_otherwise);
        for source in incoming_otherwise {
            self.evict(source, unique, work);
            self.inodes[source].otherwise = Some(to);
            self.inodes[to].incoming_otherwise.push(source);
        }
        self.inodes[from].dead = true;
    }

    fn evict(&mut self, id: usize, unique: &mut HashMap<NodeKey, usize>, work: &mut Vec<usize>) {
        if let Some(key) = self.inodes[id].unique_key.take() {
            let removed = unique.remove(&key);
            debug_assert_eq!(removed, Some(id));
            work.push(id);
        }
    }

    /// Renumbers the surviving nodes into the final DFA arena.
    fn finish(self, unique: HashMap<NodeKey, usize>) -> (Vec<DfaNode>, u32) {
        let mut survivors: Vec<usize> = unique.into_values().collect();
        survivors.sort_unstable();
        let mut dfa_index = vec![u32::MAX; self.inodes.len()];
        for (dfa_id, &inode_id) in survivors.iter().enumerate() {
            dfa_index[inode_id] = dfa_id as u32;
        }

        let mut nodes = Vec::with_capacity(survivors.len());
        let mut start = None;
        for &inode_id in &survivors {
            let inode = &self.inodes[inode_id];
            nodes.push(DfaNode {
                accepting: inode.accepting,
                transitions: inode
                    .transitions
                    .iter()
                    .map(|&(label, target)| (label, dfa_index[target]))
                    .collect(),
                otherwise: inode.otherwise.map(|o| dfa_index[o]),
            });
            if inode.is_start {
                assert!(start.is_none(), "multiple start states");
                start = Some(dfa_index[inode_id]);
            }
        }
        (nodes, start.expect("no start state"))
    }
}

pub(super) fn convert(pattern: &[PatternChar]) -> (Vec<DfaNode>, u32) {
    let nfa = build_nfa(pattern);
    let mut converter = Converter::new(&nfa);
    let unique = converter.squish();
    converter.finish(unique)
}
