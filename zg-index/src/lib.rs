/*!
A search engine core for streams of short messages ("zgrams").

A zgram has four fields (`sender`, `signature`, `instance`, `body`). The
engine maintains a hybrid reverse index over a zgram stream (a large
read-only *frozen* segment mapped from disk plus a small mutable *dynamic*
segment) and executes glob-style queries against it, streaming matching
message identifiers in forward or reverse chronological order.

The pieces, bottom up:

- [`automaton`]: compiles a glob pattern (`?`, `*`, loose/exact literals)
  into a minimized DFA over Unicode scalar values.
- [`trie`]: a radix trie keyed by scalar sequences mapping each indexed word
  to its occurrence list; one mutable variant, one frozen (relative-pointer,
  mmap-friendly) variant with the same traversal contract.
- [`index`]: per-message and per-word tables, the metadata store (reactions,
  revisions, cross-references, zmojis, `name++` score vectors), and the
  [`ConsolidatedIndex`](index::ConsolidatedIndex) façade that merges the two
  segments.
- [`iters`]: the iterator algebra: primitive word/zgram iterators and the
  compound `and`/`or`/`not`/`near` forms, all pull-driven and direction
  agnostic.
- [`syntax`]: the word splitter and the query parser that lowers surface
  syntax into an iterator tree, applying algebraic rewrites as it goes.

## Example

```
use zg_index::index::ConsolidatedIndex;
use zg_index::iters::IteratorContext;
use zg_index::records::{ZgramCore, Zephyrgram};
use zg_index::syntax::parse_query;
use zg_index::types::{LogLocation, ZgramId};

let mut ci = ConsolidatedIndex::new_empty();
let zgram = Zephyrgram {
    zgram_id: ZgramId::new(0),
    timesecs: 1000,
    sender: "kosak".to_owned(),
    signature: "Corey Kosak".to_owned(),
    is_logged: true,
    core: ZgramCore::plain("help.cheese", "where can i find good cheese"),
};
ci.add_zgrams(&[(zgram, LogLocation::new(0, 64))]).unwrap();

let query = parse_query().call("body:cheese").unwrap();
let ctx = IteratorContext::new(&ci, true);
let mut state = query.create_state(&ctx);
let mut out = [Default::default(); 16];
let n = query.get_more(&ctx, &mut *state, Default::default(), &mut out);
assert_eq!(n, 1);
```
*/

pub mod automaton;
pub mod error;
pub mod fields;
pub mod frozen;
pub mod index;
pub mod iters;
pub mod records;
pub mod syntax;
pub mod trie;
pub mod types;

pub use error::{Error, Result};
