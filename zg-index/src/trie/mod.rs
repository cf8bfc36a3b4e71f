/*!
The reverse-index trie: Unicode word → sorted list of word occurrences.

Two variants share one traversal contract:

- [`DynamicTrie`]: mutable, node-per-allocation, used by the dynamic index
  segment.
- [`FrozenNode`](frozen::FrozenNode): a variable-size record inside the
  frozen blob, navigated through relative pointers.

Both support exact lookup and DFA-driven pattern lookup. Pattern lookup
drives the DFA over each node's incoming prefix, reports the node's word
list at accepting states, and descends into children by advancing the DFA
over the sorted transition keys in one [`advance_multi`](crate::automaton::
Dfa::advance_multi) batch.
*/

mod dynamic;
pub mod frozen;

pub use dynamic::DynamicTrie;
