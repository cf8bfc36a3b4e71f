//! Field-population predicate, and the algebra's canonical "everything"
//! (`all, all`) and "nothing" (`none, none`) elements.

use std::fmt;

use crate::fields::{FieldMask, FieldTag};
use crate::iters::{state_as, IterState, IteratorContext, ZgramCursor, ZgramIterator};
use crate::types::{ZgramInfo, ZgramRel};

/// Emits a zgram iff some field selected by `include_populated` is nonempty,
/// or some field selected by `include_unpopulated` is empty.
pub struct PopOrNot {
    include_populated: FieldMask,
    include_unpopulated: FieldMask,
}

impl PopOrNot {
    pub fn create(
        include_populated: FieldMask,
        include_unpopulated: FieldMask,
    ) -> Box<dyn ZgramIterator> {
        Box::new(PopOrNot {
            include_populated,
            include_unpopulated,
        })
    }
}

fn characterize(info: &ZgramInfo) -> FieldMask {
    let mut populated = FieldMask::empty();
    for tag in FieldTag::ALL {
        if info.field_word_length(tag) != 0 {
            populated |= FieldMask::of(tag);
        }
    }
    populated
}

#[derive(Default)]
struct State {
    cursor: ZgramCursor,
}

impl ZgramIterator for PopOrNot {
    fn create_state(&self, _ctx: &IteratorContext<'_>) -> Box<dyn IterState> {
        Box::new(State::default())
    }

    fn get_more(
        &self,
        ctx: &IteratorContext<'_>,
        state: &mut dyn IterState,
        lower_bound: ZgramRel,
        out: &mut [ZgramRel],
    ) -> usize {
        if self.matches_nothing() {
            return 0;
        }
        let st = state_as::<State>(state);
        if !st.cursor.update(ctx, lower_bound, out.len()) {
            return 0;
        }
        let (_, end) = ctx.index_zgram_bounds_rel();
        let everything = self.matches_everything();

        let mut count = 0;
        while count < out.len() {
            let current = st.cursor.next_start();
            if current == end {
                break;
            }
            st.cursor.set(current.add(1));
            if !everything {
                let info = ctx.ci().get_zgram_info(ctx.zgram_rel_to_off(current));
                let populated = characterize(info);
                let unpopulated = populated ^ FieldMask::all();
                if (self.include_populated & populated).is_empty()
                    && (self.include_unpopulated & unpopulated).is_empty()
                {
                    continue;
                }
            }
            out[count] = current;
            count += 1;
        }
        count
    }

    fn matches_everything(&self) -> bool {
        self.include_populated == FieldMask::all() && self.include_unpopulated == FieldMask::all()
    }

    fn matches_nothing(&self) -> bool {
        self.include_populated.is_empty() && self.include_unpopulated.is_empty()
    }
}

impl fmt::Display for PopOrNot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PopOrNot(pop={}, unpop={})",
            self.include_populated, self.include_unpopulated
        )
    }
}
