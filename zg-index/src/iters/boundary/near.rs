//! Ordered same-field adjacency with a word-distance bound.
//!
//! `Near(margin, children)` matches a zgram when all children hit words in
//! the same zgram and the same field, in child order, with each consecutive
//! pair at most `margin` word positions apart.

use std::fmt;

use crate::fields::FieldMask;
use crate::iters::zgram::PopOrNot;
use crate::iters::{
    state_as, IterState, IteratorContext, WordIterator, WordStreamer, ZgramCursor, ZgramIterator,
};
use crate::types::{WordRel, ZgramRel};

use super::WordAdaptor;

pub struct Near {
    margin: usize,
    children: Vec<Box<dyn WordIterator>>,
}

impl Near {
    /// An empty adjacency matches every zgram; a singleton is just its word
    /// stream lifted to zgrams.
    pub fn create(
        margin: usize,
        mut children: Vec<Box<dyn WordIterator>>,
    ) -> Box<dyn ZgramIterator> {
        if children.is_empty() {
            return PopOrNot::create(FieldMask::all(), FieldMask::all());
        }
        if children.len() == 1 {
            return WordAdaptor::create(children.pop().unwrap());
        }
        Box::new(Near { margin, children })
    }
}

struct State {
    cursor: ZgramCursor,
    /// Indices into `children`, reversed for backward execution so the
    /// forward-looking algorithm still sees left-to-right field order.
    order: Vec<usize>,
    streamers: Vec<WordStreamer>,
    positions: Vec<WordRel>,
}

enum Enforce {
    Exhausted,
    Retry,
    Valid,
}

impl State {
    /// Advances every streamer to at least `lower_bound`, each strictly past
    /// its left neighbor. `None` when any child exhausts.
    fn ensure_monotonic(
        &mut self,
        near: &Near,
        ctx: &IteratorContext<'_>,
        mut lower_bound: WordRel,
    ) -> Option<()> {
        for k in 0..self.streamers.len() {
            let child = &*near.children[self.order[k]];
            let value = self.streamers[k].try_get_or_advance(child, ctx, lower_bound)?;
            self.positions[k] = value;
            lower_bound = value.add(1);
        }
        Some(())
    }

    fn all_same_word_info(&self, ctx: &IteratorContext<'_>) -> bool {
        let ci = ctx.ci();
        let first = ci.get_word_info(ctx.word_rel_to_off(self.positions[0]));
        self.positions[1..]
            .iter()
            .all(|&p| ci.get_word_info(ctx.word_rel_to_off(p)) == first)
    }

    /// Right to left, drags each child to within `margin` of its right
    /// neighbor. Tightening a pair cannot break pairs to its right.
    fn enforce_maximum_distance(&mut self, near: &Near, ctx: &IteratorContext<'_>) -> Enforce {
        for right in (1..self.streamers.len()).rev() {
            let left = right - 1;
            let right_pos = self.positions[right];
            let distance = right_pos.raw() - self.positions[left].raw();
            if distance as usize <= near.margin {
                continue;
            }
            let target = right_pos.sub(near.margin as u32);
            let child = &*near.children[self.order[left]];
            let Some(new_rel) = self.streamers[left].try_get_or_advance(child, ctx, target) else {
                return Enforce::Exhausted;
            };
            if new_rel >= right_pos {
                return Enforce::Retry;
            }
            self.positions[left] = new_rel;
        }
        Enforce::Valid
    }

    fn get_next(
        &mut self,
        near: &Near,
        ctx: &IteratorContext<'_>,
        word_lower_bound: WordRel,
    ) -> Option<ZgramRel> {
        let ci = ctx.ci();
        loop {
            // 1. Establish lower bounds and monotonicity.
            self.ensure_monotonic(near, ctx, word_lower_bound)?;

            // 2./3. Jump back to the start of the rightmost child's field
            // and re-establish monotonicity from there.
            {
                let right_wi =
                    ci.get_word_info(ctx.word_rel_to_off(self.positions[self.positions.len() - 1]));
                let right_info = ci.get_zgram_info(right_wi.zgram_off());
                let (field_start, _) = ctx.field_bounds_rel(right_info, right_wi.field_tag());
                self.ensure_monotonic(near, ctx, field_start)?;
            }

            // 4. Everyone in the same zgram and field?
            if !self.all_same_word_info(ctx) {
                continue;
            }

            // 5. Distance constraints.
            match self.enforce_maximum_distance(near, ctx) {
                Enforce::Exhausted => return None,
                Enforce::Retry => continue,
                Enforce::Valid => {}
            }

            // 6. A complete example.
            let wi =
                ci.get_word_info(ctx.word_rel_to_off(self.positions[self.positions.len() - 1]));
            return Some(ctx.zgram_off_to_rel(wi.zgram_off()));
        }
    }
}

impl ZgramIterator for Near {
    fn create_state(&self, ctx: &IteratorContext<'_>) -> Box<dyn IterState> {
        let n = self.children.len();
        let mut order: Vec<usize> = (0..n).collect();
        if !ctx.forward() {
            // Reversed children under reversed coordinates reproduce the
            // forward field order, so the same algorithm serves both
            // directions; anchors need no adjustment because they compare
            // absolute positions.
            order.reverse();
        }
        let streamers = order
            .iter()
            .map(|&i| WordStreamer::new(&*self.children[i], ctx))
            .collect();
        Box::new(State {
            cursor: ZgramCursor::default(),
            order,
            streamers,
            positions: vec![WordRel::default(); n],
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
        let (_, end) = ctx.index_zgram_bounds_rel();

        for i in 0..out.len() {
            if st.cursor.next_start() == end {
                return i;
            }
            let info = ctx
                .ci()
                .get_zgram_info(ctx.zgram_rel_to_off(st.cursor.next_start()));
            let (word_lower_bound, _) = ctx.word_bounds_rel(info);
            match st.get_next(self, ctx, word_lower_bound) {
                Some(zgram_rel) => {
                    out[i] = zgram_rel;
                    st.cursor.set(zgram_rel.add(1));
                }
                None => return i,
            }
        }
        out.len()
    }
}

impl fmt::Display for Near {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Near({}, [", self.margin)?;
        let mut sep = "";
        for child in &self.children {
            write!(f, "{sep}{child}")?;
            sep = ", ";
        }
        write!(f, "])")
    }
}
