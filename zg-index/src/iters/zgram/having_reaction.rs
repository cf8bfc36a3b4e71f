//! Metadata predicate: zgrams whose net count for a reaction is nonzero.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use itertools::{merge_join_by, EitherOrBoth};

use crate::iters::{state_as, IterState, IteratorContext, ZgramCursor, ZgramIterator};
use crate::types::{ZgramId, ZgramRel};

pub struct HavingReaction {
    reaction: String,
}

impl HavingReaction {
    pub fn create(reaction: impl Into<String>) -> Box<dyn ZgramIterator> {
        Box::new(HavingReaction {
            reaction: reaction.into(),
        })
    }
}

#[derive(Default)]
struct State {
    cursor: ZgramCursor,
}

impl ZgramIterator for HavingReaction {
    fn create_state(&self, _ctx: &IteratorContext<'_>) -> Box<dyn IterState> {
        Box::new(State::default())
    }

    /// Drives the frozen (absolute counts) and dynamic (deltas) maps in
    /// tandem from the current position, in either direction, and emits
    /// every zgram whose summed net count is nonzero.
    fn get_more(
        &self,
        ctx: &IteratorContext<'_>,
        state: &mut dyn IterState,
        lower_bound: ZgramRel,
        out: &mut [ZgramRel],
    ) -> usize {
        let st = state_as::<State>(state);
        if !st.cursor.update(ctx, lower_bound, out.len()) {
            return 0;
        }
        let ci = ctx.ci();
        let forward = ctx.forward();

        let pool = ci.frozen().string_pool();
        let frozen_entries = ci
            .frozen()
            .metadata()
            .reaction_counts()
            .get_with(|k| pool.cmp_ref(*k, &self.reaction))
            .map_or(&[][..], |inner| inner.entries());
        let empty = BTreeMap::new();
        let dynamic_map = ci
            .dynamic()
            .metadata()
            .reaction_counts()
            .get(&self.reaction)
            .unwrap_or(&empty);

        let start_id = ci
            .get_zgram_info(ctx.zgram_rel_to_off(st.cursor.next_start()))
            .zgram_id();

        // Both sides become plain (id, count) iterators pointed the right
        // way; a direction-aware comparator lets one merge loop serve both
        // directions.
        let frozen_iter: Box<dyn Iterator<Item = (ZgramId, i64)>> = if forward {
            let from = frozen_entries.partition_point(|e| e.key < start_id);
            Box::new(frozen_entries[from..].iter().map(|e| (e.key, e.value)))
        } else {
            let to = frozen_entries.partition_point(|e| e.key <= start_id);
            Box::new(frozen_entries[..to].iter().rev().map(|e| (e.key, e.value)))
        };
        let dynamic_iter: Box<dyn Iterator<Item = (ZgramId, i64)>> = if forward {
            Box::new(
                dynamic_map
                    .range((Bound::Included(start_id), Bound::Unbounded))
                    .map(|(&id, &count)| (id, count)),
            )
        } else {
            Box::new(
                dynamic_map
                    .range((Bound::Unbounded, Bound::Included(start_id)))
                    .rev()
                    .map(|(&id, &count)| (id, count)),
            )
        };

        let merged = merge_join_by(frozen_iter, dynamic_iter, |f, d| {
            if forward {
                f.0.cmp(&d.0)
            } else {
                d.0.cmp(&f.0)
            }
        });

        let mut count = 0;
        for item in merged {
            let (id, total) = match item {
                EitherOrBoth::Both((id, f), (_, d)) => (id, f + d),
                EitherOrBoth::Left((id, f)) => (id, f),
                EitherOrBoth::Right((id, d)) => (id, d),
            };
            if total == 0 {
                continue;
            }
            let Some(off) = ci.find(id) else {
                continue;
            };
            out[count] = ctx.zgram_off_to_rel(off);
            count += 1;
            if count == out.len() {
                break;
            }
        }

        if count == 0 {
            st.cursor.set(ctx.index_zgram_bounds_rel().1);
        } else {
            st.cursor.set(out[count - 1].add(1));
        }
        count
    }
}

impl fmt::Display for HavingReaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HavingReaction({})", self.reaction)
    }
}
