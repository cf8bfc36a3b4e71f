//! The mutable trie variant.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::automaton::{Dfa, StateId};
use crate::types::WordOff;

/// A radix trie keyed by Unicode scalar sequences. Word lists preserve
/// insertion order and keep duplicates; duplicates are how multiple
/// occurrences of the same word in one field are represented.
#[derive(Default)]
pub struct DynamicTrie {
    root: Node,
}

impl DynamicTrie {
    pub fn new() -> DynamicTrie {
        DynamicTrie::default()
    }

    /// Exact lookup. `None` when the word was never inserted.
    pub fn find(&self, probe: &[char]) -> Option<&[WordOff]> {
        self.root.find(probe)
    }

    /// Appends `words` to the list for `probe`, splitting nodes as needed.
    pub fn insert(&mut self, probe: &[char], words: &[WordOff]) {
        self.root.insert(probe, words);
    }

    /// Invokes `callback` once per trie word accepted by `dfa`, with that
    /// word's occurrence list.
    pub fn find_matching(&self, dfa: &Dfa, callback: &mut dyn FnMut(&[WordOff])) {
        self.root.find_matching(dfa, dfa.start(), callback);
    }

    pub(crate) fn root(&self) -> &Node {
        &self.root
    }
}

#[derive(Default)]
pub(crate) struct Node {
    /// Incoming prefix, consumed when entering this node from its parent.
    pub(crate) prefix: Vec<char>,
    /// Words terminating exactly here.
    pub(crate) words: Vec<WordOff>,
    /// Keyed by the first scalar after the prefix.
    pub(crate) transitions: BTreeMap<char, Node>,
}

impl Node {
    fn is_placeholder(&self) -> bool {
        self.prefix.is_empty() && self.words.is_empty() && self.transitions.is_empty()
    }

    fn find(&self, probe: &[char]) -> Option<&[WordOff]> {
        if probe.len() < self.prefix.len() || probe[..self.prefix.len()] != self.prefix[..] {
            return None;
        }
        let residual = &probe[self.prefix.len()..];
        match residual.split_first() {
            None => {
                if self.words.is_empty() {
                    None
                } else {
                    Some(&self.words)
                }
            }
            Some((&ch, rest)) => self.transitions.get(&ch)?.find(rest),
        }
    }

    fn insert(&mut self, probe: &[char], words: &[WordOff]) {
        if words.is_empty() {
            // Empty word lists are not worth a node.
            return;
        }
        if self.is_placeholder() {
            self.prefix = probe.to_vec();
            self.words = words.to_vec();
            return;
        }

        let diff_index = self
            .prefix
            .iter()
            .zip(probe)
            .take_while(|(a, b)| a == b)
            .count();

        if diff_index == self.prefix.len() {
            return self.insert_past_prefix(&probe[diff_index..], words);
        }

        // The mismatch falls inside our prefix: split. The clone keeps the
        // prefix tail and all existing state; we shrink to the common prefix
        // and keep a single transition to the clone.
        let clone_transition = self.prefix[diff_index];
        let clone = Node {
            prefix: self.prefix[diff_index + 1..].to_vec(),
            words: std::mem::take(&mut self.words),
            transitions: std::mem::take(&mut self.transitions),
        };
        self.prefix.truncate(diff_index);
        self.transitions.insert(clone_transition, clone);

        self.insert_past_prefix(&probe[diff_index..], words);
    }

    /// The probe's first `prefix.len()` scalars are already consumed.
    fn insert_past_prefix(&mut self, probe: &[char], words: &[WordOff]) {
        match probe.split_first() {
            None => self.words.extend_from_slice(words),
            Some((&ch, rest)) => match self.transitions.entry(ch) {
                Entry::Occupied(e) => e.into_mut().insert(rest, words),
                Entry::Vacant(e) => {
                    e.insert(Node {
                        prefix: rest.to_vec(),
                        words: words.to_vec(),
                        transitions: BTreeMap::new(),
                    });
                }
            },
        }
    }

    fn find_matching(&self, dfa: &Dfa, state: StateId, callback: &mut dyn FnMut(&[WordOff])) {
        let Some(state) = dfa.advance_over(state, self.prefix.iter().copied()) else {
            return;
        };

        if !self.words.is_empty() && dfa.is_accepting(state) {
            callback(&self.words);
        }
        if self.transitions.is_empty() {
            return;
        }

        let keys: Vec<u32> = self.transitions.keys().map(|&c| c as u32).collect();
        let mut child_states = Vec::new();
        dfa.advance_multi(state, &keys, &mut child_states);
        for (child, child_state) in self.transitions.values().zip(&child_states) {
            if let Some(child_state) = child_state {
                child.find_matching(dfa, *child_state, callback);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::words::translate_to_pattern_chars;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn offs(raws: &[u32]) -> Vec<WordOff> {
        raws.iter().map(|&r| WordOff::new(r)).collect()
    }

    fn pattern_dfa(pattern: &str) -> Dfa {
        let pcs = translate_to_pattern_chars(&chars(pattern));
        Dfa::compile(&pcs, pattern)
    }

    #[test]
    fn insert_and_find() {
        let mut trie = DynamicTrie::new();
        trie.insert(&chars("hello"), &offs(&[3]));
        trie.insert(&chars("help"), &offs(&[5]));
        trie.insert(&chars("hello"), &offs(&[9]));

        assert_eq!(trie.find(&chars("hello")), Some(&offs(&[3, 9])[..]));
        assert_eq!(trie.find(&chars("help")), Some(&offs(&[5])[..]));
        assert_eq!(trie.find(&chars("hel")), None);
        assert_eq!(trie.find(&chars("helpless")), None);
        assert_eq!(trie.find(&chars("zamboni")), None);
    }

    #[test]
    fn duplicates_keep_multiplicity() {
        let mut trie = DynamicTrie::new();
        for i in 0..4 {
            trie.insert(&chars("pie"), &offs(&[i]));
        }
        assert_eq!(trie.find(&chars("pie")).unwrap().len(), 4);
    }

    #[test]
    fn split_preserves_existing_words() {
        let mut trie = DynamicTrie::new();
        trie.insert(&chars("transport"), &offs(&[1]));
        // Splits "transport" at "trans".
        trie.insert(&chars("transit"), &offs(&[2]));
        // Splits "trans" at "tra".
        trie.insert(&chars("tray"), &offs(&[3]));
        // Lands exactly on an interior node.
        trie.insert(&chars("trans"), &offs(&[4]));

        assert_eq!(trie.find(&chars("transport")), Some(&offs(&[1])[..]));
        assert_eq!(trie.find(&chars("transit")), Some(&offs(&[2])[..]));
        assert_eq!(trie.find(&chars("tray")), Some(&offs(&[3])[..]));
        assert_eq!(trie.find(&chars("trans")), Some(&offs(&[4])[..]));
        assert_eq!(trie.find(&chars("tra")), None);
    }

    #[test]
    fn probe_shorter_than_prefix_splits() {
        let mut trie = DynamicTrie::new();
        trie.insert(&chars("zamboni"), &offs(&[1]));
        trie.insert(&chars("zam"), &offs(&[2]));
        assert_eq!(trie.find(&chars("zamboni")), Some(&offs(&[1])[..]));
        assert_eq!(trie.find(&chars("zam")), Some(&offs(&[2])[..]));
    }

    #[test]
    fn find_matching_visits_each_word_once() {
        let mut trie = DynamicTrie::new();
        trie.insert(&chars("cat"), &offs(&[1]));
        trie.insert(&chars("cart"), &offs(&[2]));
        trie.insert(&chars("dog"), &offs(&[3]));
        trie.insert(&chars("cattle"), &offs(&[4, 5]));

        let dfa = pattern_dfa("ca*");
        let mut hits: Vec<Vec<WordOff>> = Vec::new();
        trie.find_matching(&dfa, &mut |range| hits.push(range.to_vec()));
        hits.sort();
        assert_eq!(hits, vec![offs(&[1]), offs(&[2]), offs(&[4, 5])]);
    }

    #[test]
    fn find_matching_loose_unicode() {
        let mut trie = DynamicTrie::new();
        trie.insert(&chars("Cιηηαвση"), &offs(&[7]));
        let dfa = pattern_dfa("cinnabon");
        let mut hits = Vec::new();
        trie.find_matching(&dfa, &mut |range| hits.extend_from_slice(range));
        assert_eq!(hits, offs(&[7]));
    }
}
