//! The frozen trie variant: variable-size nodes inside the blob.
//!
//! A node is a fixed header immediately followed by four inline arrays:
//!
//! 1. the incoming prefix scalars (`u32` each),
//! 2. the word-offset list,
//! 3. the sorted transition-key scalars,
//! 4. after padding to 8-byte alignment, one relative child pointer per
//!    transition key.

use crate::automaton::{Dfa, StateId};
use crate::frozen::blob::BlobBuilder;
use crate::frozen::RelPtr;
use crate::types::WordOff;

use super::dynamic::Node;

#[repr(C)]
pub struct FrozenNode {
    prefix_len: u32,
    num_words: u32,
    num_transitions: u32,
    // Inline arrays follow; see module docs.
}

impl FrozenNode {
    pub fn find<'a>(&'a self, probe: &[char]) -> Option<&'a [WordOff]> {
        FrozenNodeView::new(self).find(probe)
    }

    pub fn find_matching(&self, dfa: &Dfa, callback: &mut dyn FnMut(&[WordOff])) {
        FrozenNodeView::new(self).find_matching(dfa, dfa.start(), callback);
    }
}

/// Decoded field positions of one node. Cheap to construct; made fresh at
/// every visit.
struct FrozenNodeView<'a> {
    prefix: &'a [u32],
    words: &'a [WordOff],
    keys: &'a [u32],
    children: &'a [RelPtr<FrozenNode>],
}

impl<'a> FrozenNodeView<'a> {
    fn new(node: &'a FrozenNode) -> FrozenNodeView<'a> {
        let prefix_len = node.prefix_len as usize;
        let num_words = node.num_words as usize;
        let num_transitions = node.num_transitions as usize;
        // Safety: the builder laid the arrays out exactly like this, with the
        // node 8-aligned so the padded child-pointer array is too.
        unsafe {
            let prefix_ptr = (node as *const FrozenNode).add(1) as *const u32;
            let words_ptr = prefix_ptr.add(prefix_len) as *const WordOff;
            let keys_ptr = words_ptr.add(num_words) as *const u32;
            let keys_end = keys_ptr.add(num_transitions) as usize;
            let children_ptr = keys_end.next_multiple_of(8) as *const RelPtr<FrozenNode>;
            FrozenNodeView {
                prefix: std::slice::from_raw_parts(prefix_ptr, prefix_len),
                words: std::slice::from_raw_parts(words_ptr, num_words),
                keys: std::slice::from_raw_parts(keys_ptr, num_transitions),
                children: std::slice::from_raw_parts(children_ptr, num_transitions),
            }
        }
    }

    fn child(&self, index: usize) -> &'a FrozenNode {
        // Safety: builder invariant; a non-null child pointer per key.
        unsafe { self.children[index].deref() }.expect("null child in frozen trie")
    }

    fn find(&self, probe: &[char]) -> Option<&'a [WordOff]> {
        if probe.len() < self.prefix.len()
            || !probe[..self.prefix.len()]
                .iter()
                .zip(self.prefix)
                .all(|(&c, &s)| c as u32 == s)
        {
            return None;
        }
        let residual = &probe[self.prefix.len()..];
        match residual.split_first() {
            None => {
                if self.words.is_empty() {
                    None
                } else {
                    Some(self.words)
                }
            }
            Some((&ch, rest)) => {
                let index = self.keys.binary_search(&(ch as u32)).ok()?;
                FrozenNodeView::new(self.child(index)).find(rest)
            }
        }
    }

    fn find_matching(&self, dfa: &Dfa, state: StateId, callback: &mut dyn FnMut(&[WordOff])) {
        let mut state = state;
        for &scalar in self.prefix {
            match dfa.advance_scalar(state, scalar) {
                Some(next) => state = next,
                None => return,
            }
        }

        if !self.words.is_empty() && dfa.is_accepting(state) {
            callback(self.words);
        }
        if self.keys.is_empty() {
            return;
        }

        let mut child_states = Vec::new();
        dfa.advance_multi(state, self.keys, &mut child_states);
        for (index, child_state) in child_states.iter().enumerate() {
            if let Some(child_state) = child_state {
                FrozenNodeView::new(self.child(index)).find_matching(dfa, *child_state, callback);
            }
        }
    }
}

/// Serializes a dynamic trie rooted at `node`, children first, and returns
/// the root node's blob position.
pub(crate) fn freeze_node(node: &Node, b: &mut BlobBuilder) -> usize {
    let child_positions: Vec<usize> = node
        .transitions
        .values()
        .map(|child| freeze_node(child, b))
        .collect();

    b.align_to(8);
    let pos = b.pos();
    b.write_slice(&[
        node.prefix.len() as u32,
        node.words.len() as u32,
        node.transitions.len() as u32,
    ]);
    let prefix: Vec<u32> = node.prefix.iter().map(|&c| c as u32).collect();
    b.write_slice(&prefix);
    b.write_slice(&node.words);
    let keys: Vec<u32> = node.transitions.keys().map(|&c| c as u32).collect();
    b.write_slice(&keys);
    b.align_to(8);
    for child_pos in child_positions {
        let slot = b.reserve(8, 8);
        b.set_rel_ptr(slot, child_pos);
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frozen::blob::AlignedBytes;
    use crate::syntax::words::translate_to_pattern_chars;
    use crate::trie::DynamicTrie;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn freeze(trie: &DynamicTrie) -> (AlignedBytes, usize) {
        let mut b = BlobBuilder::new();
        let root_pos = freeze_node(trie.root(), &mut b);
        (AlignedBytes::copy_from(&b.finish()), root_pos)
    }

    fn root_at(blob: &AlignedBytes, pos: usize) -> &FrozenNode {
        unsafe { &*(blob.as_bytes().as_ptr().add(pos) as *const FrozenNode) }
    }

    #[test]
    fn round_trip_matches_dynamic() {
        let corpus = [
            ("cat", 1u32),
            ("cart", 2),
            ("cattle", 3),
            ("dog", 4),
            ("cat", 5),
            ("Cιηηαвση", 6),
            ("zam", 7),
            ("zamboni", 8),
        ];
        let mut trie = DynamicTrie::new();
        for &(word, off) in &corpus {
            trie.insert(&chars(word), &[WordOff::new(off)]);
        }
        let (blob, root_pos) = freeze(&trie);
        let frozen = root_at(&blob, root_pos);

        // Exact lookups agree.
        for probe in ["cat", "cart", "cattle", "dog", "zam", "zamboni", "ca", "cats"] {
            let d = trie.find(&chars(probe)).map(<[WordOff]>::to_vec);
            let f = frozen.find(&chars(probe)).map(<[WordOff]>::to_vec);
            assert_eq!(d, f, "probe {probe:?}");
        }

        // Pattern lookups agree.
        for pattern in ["ca*", "*a*", "cinnabon", "?og", "*", "q*"] {
            let dfa = Dfa::compile(&translate_to_pattern_chars(&chars(pattern)), pattern);
            let mut dynamic_hits = Vec::new();
            trie.find_matching(&dfa, &mut |r| dynamic_hits.extend_from_slice(r));
            let mut frozen_hits = Vec::new();
            frozen.find_matching(&dfa, &mut |r| frozen_hits.extend_from_slice(r));
            dynamic_hits.sort();
            frozen_hits.sort();
            assert_eq!(dynamic_hits, frozen_hits, "pattern {pattern:?}");
        }
    }

    #[test]
    fn empty_trie_freezes() {
        let trie = DynamicTrie::new();
        let (blob, root_pos) = freeze(&trie);
        let frozen = root_at(&blob, root_pos);
        assert_eq!(frozen.find(&chars("anything")), None);
        let dfa = Dfa::compile(&translate_to_pattern_chars(&chars("*")), "*");
        let mut hits = 0;
        frozen.find_matching(&dfa, &mut |_| hits += 1);
        assert_eq!(hits, 0);
    }
}
