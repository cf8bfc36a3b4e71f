//! Intersection of zgram streams.

use std::fmt;

use crate::fields::FieldMask;
use crate::iters::{
    state_as, IterState, IteratorContext, ZgramCursor, ZgramIterator, ZgramStreamer,
};
use crate::types::ZgramRel;

use super::PopOrNot;

pub struct And {
    children: Vec<Box<dyn ZgramIterator>>,
}

impl And {
    /// Simplifications: "everything" children drop out, a "nothing" child
    /// dominates, nested `and`s flatten, and lists of size 0/1 collapse.
    pub fn create(children: Vec<Box<dyn ZgramIterator>>) -> Box<dyn ZgramIterator> {
        let mut result: Vec<Box<dyn ZgramIterator>> = Vec::new();
        for mut child in children {
            if child.matches_everything() {
                continue;
            }
            if child.matches_nothing() {
                return child;
            }
            match child.try_release_and_children() {
                Some(grandchildren) => result.extend(grandchildren),
                None => result.push(child),
            }
        }
        if result.is_empty() {
            return PopOrNot::create(FieldMask::all(), FieldMask::all());
        }
        if result.len() == 1 {
            return result.into_iter().next().unwrap();
        }
        Box::new(And { children: result })
    }
}

struct State {
    cursor: ZgramCursor,
    streamers: Vec<ZgramStreamer>,
}

impl State {
    /// Round-robin over the children: ask each for its first value at or
    /// past the cursor; a bigger answer restarts the agreement count, and
    /// full agreement emits.
    fn get_next(&mut self, children: &[Box<dyn ZgramIterator>], ctx: &IteratorContext<'_>) -> Option<ZgramRel> {
        let n = self.streamers.len();
        let mut index = 0;
        let mut in_agreement = 0;
        loop {
            let value = self.streamers[index].try_get_or_advance(
                &*children[index],
                ctx,
                self.cursor.next_start(),
            )?;
            if value == self.cursor.next_start() {
                in_agreement += 1;
                if in_agreement == n {
                    self.cursor.set(value.add(1));
                    return Some(value);
                }
            } else {
                self.cursor.set(value);
                in_agreement = 1;
            }
            index = (index + 1) % n;
        }
    }
}

impl ZgramIterator for And {
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

    fn try_release_and_children(&mut self) -> Option<Vec<Box<dyn ZgramIterator>>> {
        Some(std::mem::take(&mut self.children))
    }
}

impl fmt::Display for And {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "And([")?;
        let mut sep = "";
        for child in &self.children {
            write!(f, "{sep}{child}")?;
            sep = ", ";
        }
        write!(f, "])")
    }
}
