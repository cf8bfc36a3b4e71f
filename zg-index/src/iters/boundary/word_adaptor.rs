//! Lifts a word stream to the zgrams owning those words.

use std::fmt;

use crate::fields::FieldMask;
use crate::iters::zgram::PopOrNot;
use crate::iters::{
    state_as, IterState, IteratorContext, WordIterator, ZgramCursor, ZgramIterator,
};
use crate::types::ZgramRel;

pub struct WordAdaptor {
    child: Box<dyn WordIterator>,
}

impl WordAdaptor {
    /// A child that matches any word in some fields only asks "is the field
    /// populated", which [`PopOrNot`] answers without touching words.
    pub fn create(child: Box<dyn WordIterator>) -> Box<dyn ZgramIterator> {
        if let Some(field_mask) = child.matches_any_word() {
            return PopOrNot::create(field_mask, FieldMask::empty());
        }
        Box::new(WordAdaptor { child })
    }
}

struct State {
    cursor: ZgramCursor,
    child_state: Box<dyn IterState>,
    /// Sized to the largest request seen, so a whole child batch can be
    /// handed back without tracking residue.
    source: Vec<crate::types::WordRel>,
}

impl ZgramIterator for WordAdaptor {
    fn create_state(&self, ctx: &IteratorContext<'_>) -> Box<dyn IterState> {
        Box::new(State {
            cursor: ZgramCursor::default(),
            child_state: self.child.create_state(ctx),
            source: Vec::new(),
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
        if st.source.len() < out.len() {
            st.source.resize(out.len(), Default::default());
        }
        let ci = ctx.ci();

        // Restart the child from the first word of the zgram at the cursor.
        let info = ci.get_zgram_info(ctx.zgram_rel_to_off(st.cursor.next_start()));
        let (word_lower_bound, _) = ctx.word_bounds_rel(info);
        let child_size = self.child.get_more(
            ctx,
            &mut *st.child_state,
            word_lower_bound,
            &mut st.source[..out.len()],
        );
        if child_size == 0 {
            return 0;
        }

        // Map each word to its owning zgram, suppressing duplicates. The
        // word stream ascends, so owners ascend too.
        let mut count = 0;
        for &word_rel in &st.source[..child_size] {
            let zgram_off = ci.get_word_info(ctx.word_rel_to_off(word_rel)).zgram_off();
            let zgram_rel = ctx.zgram_off_to_rel(zgram_off);
            if count == 0 || zgram_rel > out[count - 1] {
                out[count] = zgram_rel;
                count += 1;
            }
        }
        assert!(count != 0, "child produced words but no zgrams");
        st.cursor.set(out[count - 1].add(1));
        count
    }
}

impl fmt::Display for WordAdaptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Adapt({})", self.child)
    }
}
