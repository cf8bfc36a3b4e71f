/*!
The iterator algebra: composable, pull-driven streams of match positions.

Execution is direction agnostic. An [`IteratorContext`] carries the index
and a `forward` flag; all iterators operate on *relative* coordinates
([`ZgramRel`]/[`WordRel`](crate::types::WordRel)) that equal the underlying
offsets going forward and their flip (`u32::MAX - 1 - off`) going backward,
so every iterator produces a strictly increasing stream either way and only
the leaves that touch the underlying arrays convert coordinates.

Iterators are stateless and shareable; per-execution state lives in opaque
objects created by `create_state` and owned by the caller. `get_more` fills
a caller buffer with up to `out.len()` values `>= lower_bound`, returning 0
on exhaustion. Cancellation is simply "stop calling", and backpressure is
the caller's choice of buffer size and pacing.

Factory functions (`create`) perform the algebraic rewrites: identity and
absorbing elements fold away, nested `and`/`or` flatten, double negation
cancels, anchors merge, and degenerate forms collapse into cheaper
iterators.
*/

use std::any::Any;
use std::fmt;

use crate::fields::{FieldMask, FieldTag};
use crate::index::ConsolidatedIndex;
use crate::types::{WordOff, WordRel, ZgramInfo, ZgramOff, ZgramRel};

pub mod boundary;
pub mod word;
pub mod zgram;

pub(crate) const BUFFER_CAPACITY: usize = 128;

/// Everything a query execution needs: the index and the direction.
pub struct IteratorContext<'a> {
    ci: &'a ConsolidatedIndex,
    forward: bool,
}

impl<'a> IteratorContext<'a> {
    pub fn new(ci: &'a ConsolidatedIndex, forward: bool) -> IteratorContext<'a> {
        IteratorContext { ci, forward }
    }

    pub fn ci(&self) -> &'a ConsolidatedIndex {
        self.ci
    }

    pub fn forward(&self) -> bool {
        self.forward
    }

    fn maybe_flip(&self, raw: u32) -> u32 {
        if self.forward {
            raw
        } else {
            u32::MAX - 1 - raw
        }
    }

    /// Flips a half-open `[begin, end)` range into the current direction's
    /// coordinates, keeping it half-open.
    fn maybe_flip_range(&self, begin: u32, end: u32) -> (u32, u32) {
        if self.forward {
            (begin, end)
        } else {
            (self.maybe_flip(end) + 1, self.maybe_flip(begin) + 1)
        }
    }

    pub fn zgram_off_to_rel(&self, off: ZgramOff) -> ZgramRel {
        ZgramRel::new(self.maybe_flip(off.raw()))
    }

    pub fn zgram_rel_to_off(&self, rel: ZgramRel) -> ZgramOff {
        ZgramOff::new(self.maybe_flip(rel.raw()))
    }

    pub fn word_off_to_rel(&self, off: WordOff) -> WordRel {
        WordRel::new(self.maybe_flip(off.raw()))
    }

    pub fn word_rel_to_off(&self, rel: WordRel) -> WordOff {
        WordOff::new(self.maybe_flip(rel.raw()))
    }

    /// The whole zgram universe, in rel coordinates.
    pub fn index_zgram_bounds_rel(&self) -> (ZgramRel, ZgramRel) {
        let (b, e) = self.maybe_flip_range(0, self.ci.zgram_info_size() as u32);
        (ZgramRel::new(b), ZgramRel::new(e))
    }

    /// The whole word universe, in rel coordinates.
    pub fn index_word_bounds_rel(&self) -> (WordRel, WordRel) {
        let (b, e) = self.maybe_flip_range(0, self.ci.word_info_size() as u32);
        (WordRel::new(b), WordRel::new(e))
    }

    /// The word range of one zgram, in rel coordinates.
    pub fn word_bounds_rel(&self, info: &ZgramInfo) -> (WordRel, WordRel) {
        let begin = info.starting_word_off().raw();
        let (b, e) = self.maybe_flip_range(begin, begin + info.total_word_length());
        (WordRel::new(b), WordRel::new(e))
    }

    /// The word range of one field of one zgram, in rel coordinates.
    pub fn field_bounds_rel(&self, info: &ZgramInfo, tag: FieldTag) -> (WordRel, WordRel) {
        let mut begin = info.starting_word_off().raw();
        for earlier in FieldTag::ALL {
            if earlier == tag {
                break;
            }
            begin += info.field_word_length(earlier);
        }
        let end = begin + info.field_word_length(tag);
        let (b, e) = self.maybe_flip_range(begin, end);
        (WordRel::new(b), WordRel::new(e))
    }
}

/// Monotone cursor shared by zgram-iterator states.
#[derive(Default)]
pub struct ZgramCursor {
    next_start: ZgramRel,
}

impl ZgramCursor {
    pub fn next_start(&self) -> ZgramRel {
        self.next_start
    }

    pub fn set(&mut self, v: ZgramRel) {
        self.next_start = v;
    }

    /// Raises the cursor to `lower_bound`, clamps it into the universe, and
    /// reports whether there is anything left to produce.
    pub fn update(
        &mut self,
        ctx: &IteratorContext<'_>,
        lower_bound: ZgramRel,
        capacity: usize,
    ) -> bool {
        self.next_start = self.next_start.max(lower_bound);
        if capacity == 0 {
            return false;
        }
        let (begin, end) = ctx.index_zgram_bounds_rel();
        self.next_start = self.next_start.max(begin);
        self.next_start < end
    }
}

/// Monotone cursor shared by word-iterator states.
#[derive(Default)]
pub struct WordCursor {
    next_start: WordRel,
}

impl WordCursor {
    pub fn next_start(&self) -> WordRel {
        self.next_start
    }

    pub fn set(&mut self, v: WordRel) {
        self.next_start = v;
    }

    pub fn update(
        &mut self,
        ctx: &IteratorContext<'_>,
        lower_bound: WordRel,
        capacity: usize,
    ) -> bool {
        self.next_start = self.next_start.max(lower_bound);
        if capacity == 0 {
            return false;
        }
        self.next_start < ctx.index_word_bounds_rel().1
    }
}

/// Type-erased per-execution state. Concrete states are downcast back by
/// their owning iterator; a mismatch is an internal invariant failure.
pub trait IterState: 'static {
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> IterState for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) fn state_as<T: 'static>(state: &mut dyn IterState) -> &mut T {
    state
        .as_any_mut()
        .downcast_mut::<T>()
        .expect("iterator state of unexpected type")
}

/// A stream of zgram positions.
pub trait ZgramIterator: fmt::Display {
    fn create_state(&self, ctx: &IteratorContext<'_>) -> Box<dyn IterState>;

    /// Fills `out` with strictly increasing rel values `>= lower_bound`
    /// (and `>=` everything produced before). Returns the count; 0 means
    /// exhausted.
    fn get_more(
        &self,
        ctx: &IteratorContext<'_>,
        state: &mut dyn IterState,
        lower_bound: ZgramRel,
        out: &mut [ZgramRel],
    ) -> usize;

    // Probes used by the factory-time rewrites.

    fn matches_everything(&self) -> bool {
        false
    }

    fn matches_nothing(&self) -> bool {
        false
    }

    /// Surrenders this iterator's children if it is an `and`.
    fn try_release_and_children(&mut self) -> Option<Vec<Box<dyn ZgramIterator>>> {
        None
    }

    /// Surrenders this iterator's children if it is an `or`.
    fn try_release_or_children(&mut self) -> Option<Vec<Box<dyn ZgramIterator>>> {
        None
    }

    /// Surrenders this iterator's negation if it has a cheap one.
    fn try_negate(&mut self) -> Option<Box<dyn ZgramIterator>> {
        None
    }
}

/// A stream of word positions.
pub trait WordIterator: fmt::Display {
    fn create_state(&self, ctx: &IteratorContext<'_>) -> Box<dyn IterState>;

    fn get_more(
        &self,
        ctx: &IteratorContext<'_>,
        state: &mut dyn IterState,
        lower_bound: WordRel,
        out: &mut [WordRel],
    ) -> usize;

    /// `Some(mask)` when this iterator matches every word in `mask`.
    fn matches_any_word(&self) -> Option<FieldMask> {
        None
    }

    /// Surrenders `(child, left, right)` if this is an anchor wrapper.
    fn try_get_anchor_child(&mut self) -> Option<(Box<dyn WordIterator>, bool, bool)> {
        None
    }
}

const LINEAR_PROBE_LIMIT: usize = 5;

/// Lower bound biased toward nearby hits: probe linearly for a few slots
/// (lower bounds are usually close), check the far end, then bisect.
fn lower_bound_from<R: Copy + Ord>(data: &[R], mut from: usize, key: R) -> usize {
    for _ in 0..LINEAR_PROBE_LIMIT {
        if from == data.len() || data[from] >= key {
            return from;
        }
        from += 1;
    }
    if data[data.len() - 1] < key {
        return data.len();
    }
    from + data[from..].partition_point(|&v| v < key)
}

/// A fixed-size buffer in front of a child zgram iterator, supporting
/// "give me the first value `>= lower_bound`" without re-asking the child
/// for values it already produced.
pub(crate) struct ZgramStreamer {
    state: Box<dyn IterState>,
    buf: Box<[ZgramRel]>,
    pos: usize,
    len: usize,
}

impl ZgramStreamer {
    pub fn new(child: &dyn ZgramIterator, ctx: &IteratorContext<'_>) -> ZgramStreamer {
        ZgramStreamer {
            state: child.create_state(ctx),
            buf: vec![ZgramRel::default(); BUFFER_CAPACITY].into_boxed_slice(),
            pos: 0,
            len: 0,
        }
    }

    /// `child` must be the same iterator this streamer was created from.
    pub fn try_get_or_advance(
        &mut self,
        child: &dyn ZgramIterator,
        ctx: &IteratorContext<'_>,
        lower_bound: ZgramRel,
    ) -> Option<ZgramRel> {
        loop {
            if self.pos == self.len {
                self.len = child.get_more(ctx, &mut *self.state, lower_bound, &mut self.buf);
                self.pos = 0;
                if self.len == 0 {
                    return None;
                }
            }
            self.pos = lower_bound_from(&self.buf[..self.len], self.pos, lower_bound);
            if self.pos != self.len {
                return Some(self.buf[self.pos]);
            }
        }
    }
}

/// Word-side twin of [`ZgramStreamer`].
pub(crate) struct WordStreamer {
    state: Box<dyn IterState>,
    buf: Box<[WordRel]>,
    pos: usize,
    len: usize,
}

impl WordStreamer {
    pub fn new(child: &dyn WordIterator, ctx: &IteratorContext<'_>) -> WordStreamer {
        WordStreamer {
            state: child.create_state(ctx),
            buf: vec![WordRel::default(); BUFFER_CAPACITY].into_boxed_slice(),
            pos: 0,
            len: 0,
        }
    }

    pub fn try_get_or_advance(
        &mut self,
        child: &dyn WordIterator,
        ctx: &IteratorContext<'_>,
        lower_bound: WordRel,
    ) -> Option<WordRel> {
        loop {
            if self.pos == self.len {
                self.len = child.get_more(ctx, &mut *self.state, lower_bound, &mut self.buf);
                self.pos = 0;
                if self.len == 0 {
                    return None;
                }
            }
            self.pos = lower_bound_from(&self.buf[..self.len], self.pos, lower_bound);
            if self.pos != self.len {
                return Some(self.buf[self.pos]);
            }
        }
    }
}
