//! Words matching a compiled pattern, restricted to a field mask.

use std::fmt;

use crate::automaton::Dfa;
use crate::fields::FieldMask;
use crate::iters::{state_as, IterState, IteratorContext, WordCursor, WordIterator};
use crate::types::{WordOff, WordRel};

use super::AnyWord;

pub struct Pattern {
    dfa: Dfa,
    field_mask: FieldMask,
}

impl Pattern {
    /// A pattern that accepts everything degenerates into [`AnyWord`].
    pub fn create(dfa: Dfa, field_mask: FieldMask) -> Box<dyn WordIterator> {
        if dfa.accepts_everything() {
            return AnyWord::create(field_mask);
        }
        Box::new(Pattern { dfa, field_mask })
    }
}

#[derive(Default)]
struct State {
    cursor: WordCursor,
}

/// Collects trie hits into the caller's buffer. The pattern may match many
/// words, each contributing a sorted occurrence range, so results arrive
/// out of order and in unbounded quantity: append until the buffer fills,
/// then keep the `capacity` smallest seen so far in a max-heap, and sort
/// before returning.
struct Sink<'a, 'c> {
    ctx: &'a IteratorContext<'c>,
    field_mask: FieldMask,
    next_start_off: WordOff,
    buf: &'a mut [WordRel],
    size: usize,
    /// Needed when the mask filters out every hit: the cursor still has to
    /// advance past everything the trie produced.
    max_rel_seen: WordRel,
}

impl Sink<'_, '_> {
    fn accept(&mut self, words: &[WordOff]) {
        if words.is_empty() {
            return;
        }
        let last = if self.ctx.forward() {
            words[words.len() - 1]
        } else {
            words[0]
        };
        self.max_rel_seen = self.max_rel_seen.max(self.ctx.word_off_to_rel(last));

        // Normalize to the part of the range at or past the cursor, walking
        // in ascending rel order.
        if self.ctx.forward() {
            let from = words.partition_point(|&w| w < self.next_start_off);
            self.push_range(words[from..].iter().copied());
        } else {
            let to = words.partition_point(|&w| w <= self.next_start_off);
            self.push_range(words[..to].iter().rev().copied());
        }
    }

    fn push_range(&mut self, range: impl Iterator<Item = WordOff>) {
        let ci = self.ctx.ci();
        let mut heaped = self.size == self.buf.len();
        for word_off in range {
            let tag = ci.get_word_info(word_off).field_tag();
            if !self.field_mask.contains_tag(tag) {
                continue;
            }
            let word_rel = self.ctx.word_off_to_rel(word_off);
            if !heaped {
                self.buf[self.size] = word_rel;
                self.size += 1;
                if self.size == self.buf.len() {
                    make_heap(self.buf);
                    heaped = true;
                }
            } else {
                if word_rel > self.buf[0] {
                    // Everything later in this range is even larger.
                    return;
                }
                self.buf[0] = word_rel;
                sift_down(self.buf, 0);
            }
        }
    }

    /// Sorts what was kept and computes the next cursor position.
    fn finish(self) -> (usize, WordRel) {
        self.buf[..self.size].sort_unstable();
        let next = if self.size > 0 {
            self.buf[self.size - 1]
        } else {
            self.max_rel_seen
        };
        (self.size, next.add(1))
    }
}

fn make_heap(buf: &mut [WordRel]) {
    for i in (0..buf.len() / 2).rev() {
        sift_down(buf, i);
    }
}

fn sift_down(buf: &mut [WordRel], mut i: usize) {
    loop {
        let left = 2 * i + 1;
        if left >= buf.len() {
            return;
        }
        let mut largest = if buf[left] > buf[i] { left } else { i };
        let right = left + 1;
        if right < buf.len() && buf[right] > buf[largest] {
            largest = right;
        }
        if largest == i {
            return;
        }
        buf.swap(i, largest);
        i = largest;
    }
}

impl WordIterator for Pattern {
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

        let mut sink = Sink {
            ctx,
            field_mask: self.field_mask,
            next_start_off: ctx.word_rel_to_off(st.cursor.next_start()),
            buf: out,
            size: 0,
            max_rel_seen: WordRel::default(),
        };
        ctx.ci()
            .find_matching(&self.dfa, &mut |words| sink.accept(words));
        let (size, next_start) = sink.finish();
        st.cursor.set(next_start);
        size
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({}, {})", self.field_mask, self.dfa.description())
    }
}
