/*!
The surface layer: word splitting and query parsing.

[`words`] turns field text into indexable words and query utterances into
pattern characters. [`query`] parses the search grammar into an iterator
tree, applying the factory-time algebraic rewrites along the way.
*/

pub mod query;
pub mod words;

pub use query::{parse_query, DEFAULT_NEAR_MARGIN};
