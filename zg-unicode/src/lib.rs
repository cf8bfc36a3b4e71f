/*!
Unicode equivalence data for loose word matching.

A loose lowercase ASCII letter in a search pattern matches itself, its
uppercase sibling, and a fixed set of Unicode scalars that visually resemble
it (circled and fullwidth forms, mathematical alphanumerics, lookalikes from
other scripts, and so on). This crate hosts that table.

```
use zg_unicode::fuzzy_equivalents;

assert!(fuzzy_equivalents('c').contains('\u{24d2}')); // 'c' in a circle
assert!(fuzzy_equivalents('%').is_empty());
```
*/
pub mod fuzzy;

pub use fuzzy::fuzzy_equivalents;
