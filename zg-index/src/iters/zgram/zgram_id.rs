//! Singleton stream: the one zgram with a given id, if present.

use std::fmt;

use crate::iters::{state_as, IterState, IteratorContext, ZgramCursor, ZgramIterator};
use crate::types::{ZgramId, ZgramRel};

pub struct ZgramIdIterator {
    zgram_id: ZgramId,
}

impl ZgramIdIterator {
    pub fn create(zgram_id: ZgramId) -> Box<dyn ZgramIterator> {
        Box::new(ZgramIdIterator { zgram_id })
    }
}

struct State {
    cursor: ZgramCursor,
    /// Resolved once per execution; `None` when the id is not indexed.
    id_rel: Option<ZgramRel>,
}

impl ZgramIterator for ZgramIdIterator {
    fn create_state(&self, ctx: &IteratorContext<'_>) -> Box<dyn IterState> {
        Box::new(State {
            cursor: ZgramCursor::default(),
            id_rel: ctx
                .ci()
                .find(self.zgram_id)
                .map(|off| ctx.zgram_off_to_rel(off)),
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
        let Some(id_rel) = st.id_rel else {
            return 0;
        };
        if id_rel < st.cursor.next_start() {
            return 0;
        }
        out[0] = id_rel;
        st.cursor.set(id_rel.add(1));
        1
    }
}

impl fmt::Display for ZgramIdIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZgramId({})", self.zgram_id)
    }
}
