//! Union of zgram streams.

use std::fmt;

use crate::fields::FieldMask;
use crate::iters::{
    state_as, IterState, IteratorContext, ZgramCursor, ZgramIterator, ZgramStreamer,
};
use crate::types::ZgramRel;

use super::PopOrNot;

pub struct Or {
    children: Vec<Box<dyn ZgramIterator>>,
}

impl Or {
    /// Simplifications: "nothing" children drop out, an "everything" child
    /// dominates, nested `or`s flatten, and lists of size 0/1 collapse.
    pub fn create(children: Vec<Box<dyn ZgramIterator>>) -> Box<dyn ZgramIterator> {
        let mut result: Vec<Box<dyn ZgramIterator>> = Vec::new();
        for mut child in children {
            if child.matches_nothing() {
                continue;
            }
            if child.matches_everything() {
                return child;
            }
            match child.try_release_or_children() {
                Some(grandchildren) => result.extend(grandchildren),
                None => result.push(child),
            }
        }
        if result.is_empty() {
            return PopOrNot::create(FieldMask::empty(), FieldMask::empty());
        }
        if result.len() == 1 {
            return result.into_iter().next().unwrap();
        }
        Box::new(Or { children: result })
    }
}

struct State {
    cursor: ZgramCursor,
    streamers: Vec<ZgramStreamer>,
}

impl State {
    /// Emits the minimum over the non-exhausted children.
    fn get_next(
        &mut self,
        children: &[Box<dyn ZgramIterator>],
        ctx: &IteratorContext<'_>,
    ) -> Option<ZgramRel> {
        let mut min_value: Option<ZgramRel> = None;
        for (streamer, child) in self.streamers.iter_mut().zip(children) {
            let Some(value) = streamer.try_get_or_advance(&**child, ctx, self.cursor.next_start())
            else {
                continue;
            };
            min_value = Some(min_value.map_or(value, |m| m.min(value)));
        }
        let value = min_value?;
        self.cursor.set(value.add(1));
        Some(value)
    }
}

impl ZgramIterator for Or {
    fn create_state(&self, ctx: &IteratorContext<'_>) -> Box<dyn IterState> {
        Box::new(State {
            cursor: ZgramCursor::default(),
            streamers: self
                .children
                .iter()
                .map(|c| ZgramStreamer::new(&**c, ctx))
                .collect(),
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
        for i in 0..out.len() {
            match st.get_next(&self.children, ctx) {
                Some(v) => out[i] = v,
                None => return i,
            }
        }
        out.len()
    }

    fn try_release_or_children(&mut self) -> Option<Vec<Box<dyn ZgramIterator>>> {
        Some(std::mem::take(&mut self.children))
    }
}

impl fmt::Display for Or {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Or([")?;
        let mut sep = "";
        for child in &self.children {
            write!(f, "{sep}{child}")?;
            sep = ", ";
        }
        write!(f, "])")
    }
}
