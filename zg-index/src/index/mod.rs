/*!
The two-tier index: a frozen (mmap-friendly, immutable) segment, a dynamic
(mutable) segment, and the [`ConsolidatedIndex`] façade that merges them.

Reads traverse both sides and combine by per-table rules (dynamic dominates
for reactions and refers-to; dynamic appends for revisions; dynamic first
with frozen fallback for zmojis; rank sums for the `++`/`--` vectors).
Writes only touch the dynamic side; a checkpoint performed outside the core
replaces the frozen segment and resets the dynamic one.
*/

mod consolidated;
mod dynamic;
mod freeze;
mod frozen;
mod plusplus;

pub use consolidated::{ConsolidatedIndex, PpDeltaMap, ZgramResolver};
pub use dynamic::{DynamicIndex, DynamicMetadata};
pub use frozen::{FrozenBlob, FrozenIndex, FrozenMetadata, FrozenRevision};
