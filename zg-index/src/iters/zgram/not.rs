//! Complement of a zgram stream: every zgram the child does not emit.

use std::fmt;

use crate::fields::FieldMask;
use crate::iters::{
    state_as, IterState, IteratorContext, ZgramCursor, ZgramIterator, ZgramStreamer,
};
use crate::types::ZgramRel;

use super::PopOrNot;

pub struct Not {
    child: Box<dyn ZgramIterator>,
}

impl Not {
    /// `Not(Not(x))` collapses to `x` via `try_negate`.
    pub fn create(mut child: Box<dyn ZgramIterator>) -> Box<dyn ZgramIterator> {
        if let Some(negated) = child.try_negate() {
            return negated;
        }
        Box::new(Not { child })
    }
}

struct State {
    cursor: ZgramCursor,
    streamer: ZgramStreamer,
    last_child_hit: Option<ZgramRel>,
}

impl ZgramIterator for Not {
    fn create_state(&self, ctx: &IteratorContext<'_>) -> Box<dyn IterState> {
        Box::new(State {
            cursor: ZgramCursor::default(),
            streamer: ZgramStreamer::new(&*self.child, ctx),
            last_child_hit: None,
        })
    }

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
        // A pending child hit below the (possibly raised) cursor is useless;
        // drop it so the child is consulted again from the new position.
        if st
            .last_child_hit
            .is_some_and(|hit| hit < st.cursor.next_start())
        {
            st.last_child_hit = None;
        }
        let (_, end) = ctx.index_zgram_bounds_rel();

        let mut count = 0;
        loop {
            if st.last_child_hit.is_none() {
                st.last_child_hit =
                    st.streamer
                        .try_get_or_advance(&*self.child, ctx, st.cursor.next_start());
            }
            loop {
                if count == out.len() || st.cursor.next_start() == end {
                    return count;
                }
                let current = st.cursor.next_start();
                if st.last_child_hit == Some(current) {
                    st.cursor.set(current.add(1));
                    st.last_child_hit = None;
                    break;
                }
                out[count] = current;
                count += 1;
                st.cursor.set(current.add(1));
            }
        }
    }

    fn try_negate(&mut self) -> Option<Box<dyn ZgramIterator>> {
        // Surrender the child, leaving a husk that is never executed.
        let husk = PopOrNot::create(FieldMask::empty(), FieldMask::empty());
        Some(std::mem::replace(&mut self.child, husk))
    }
}

impl fmt::Display for Not {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Not({})", self.child)
    }
}
