//! Every word whose field is in the mask.

use std::fmt;

use crate::fields::FieldMask;
use crate::iters::{state_as, IterState, IteratorContext, WordCursor, WordIterator};
use crate::types::WordRel;

pub struct AnyWord {
    field_mask: FieldMask,
}

impl AnyWord {
    pub fn create(field_mask: FieldMask) -> Box<dyn WordIterator> {
        Box::new(AnyWord { field_mask })
    }
}

#[derive(Default)]
struct State {
    cursor: WordCursor,
}

impl WordIterator for AnyWord {
    fn create_state(&self, _ctx: &IteratorContext<'_>) -> Box<dyn IterState> {
        Box::new(State::default())
    }

    fn get_more(
        &self,
        ctx: &IteratorContext<'_>,
        state: &mut dyn IterState,
        lower_bound: WordRel,
        out: &mut [WordRel],
    ) -> usize {
        if self.field_mask.is_empty() {
            return 0;
        }
        let st = state_as::<State>(state);
        if !st.cursor.update(ctx, lower_bound, out.len()) {
            return 0;
        }
        let (_, end) = ctx.index_word_bounds_rel();
        let ci = ctx.ci();

        let mut count = 0;
        while st.cursor.next_start() != end {
            let current = st.cursor.next_start();
            st.cursor.set(current.add(1));
            let info = ci.get_word_info(ctx.word_rel_to_off(current));
            if self.field_mask.contains_tag(info.field_tag()) {
                out[count] = current;
                count += 1;
                if count == out.len() {
                    break;
                }
            }
        }
        count
    }

    fn matches_any_word(&self) -> Option<FieldMask> {
        Some(self.field_mask)
    }
}

impl fmt::Display for AnyWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyWord({})", self.field_mask)
    }
}
