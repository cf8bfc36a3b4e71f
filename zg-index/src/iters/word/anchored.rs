//! Filters word hits to those that begin (`^`) or end (`$`) their field.

use std::fmt;

use crate::fields::FieldMask;
use crate::iters::{IterState, IteratorContext, WordIterator};
use crate::types::WordRel;

use super::AnyWord;

pub struct Anchored {
    child: Box<dyn WordIterator>,
    anchored_left: bool,
    anchored_right: bool,
}

impl Anchored {
    /// No anchors is a no-op; nested anchors merge into one wrapper.
    pub fn create(
        mut child: Box<dyn WordIterator>,
        anchored_left: bool,
        anchored_right: bool,
    ) -> Box<dyn WordIterator> {
        if !anchored_left && !anchored_right {
            return child;
        }
        if let Some((grandchild, child_left, child_right)) = child.try_get_anchor_child() {
            return Box::new(Anchored {
                child: grandchild,
                anchored_left: anchored_left || child_left,
                anchored_right: anchored_right || child_right,
            });
        }
        Box::new(Anchored {
            child,
            anchored_left,
            anchored_right,
        })
    }

    /// Keeps the hits sitting at the anchored ends of their own field.
    /// `src` and the result share the buffer.
    fn apply_filter(&self, ctx: &IteratorContext<'_>, out: &mut [WordRel], size: usize) -> usize {
        let ci = ctx.ci();
        let mut kept = 0;
        for i in 0..size {
            let word_off = ctx.word_rel_to_off(out[i]);
            let zgram_off = ci.get_word_info(word_off).zgram_off();
            let info = ci.get_zgram_info(zgram_off);

            // The fields partition the zgram's word range, so an anchor
            // equality can only hold for the word's own field.
            let mut field_begin = info.starting_word_off();
            let mut hit = false;
            for tag in crate::fields::FieldTag::ALL {
                let width = info.field_word_length(tag);
                if width != 0 {
                    let left = field_begin;
                    let right = field_begin.add(width - 1);
                    if (!self.anchored_left || word_off == left)
                        && (!self.anchored_right || word_off == right)
                    {
                        hit = true;
                        break;
                    }
                }
                field_begin = field_begin.add(width);
            }
            if hit {
                out[kept] = out[i];
                kept += 1;
            }
        }
        kept
    }
}

impl WordIterator for Anchored {
    /// No state of its own; the child's state is used directly.
    fn create_state(&self, ctx: &IteratorContext<'_>) -> Box<dyn IterState> {
        self.child.create_state(ctx)
    }

    fn get_more(
        &self,
        ctx: &IteratorContext<'_>,
        state: &mut dyn IterState,
        lower_bound: WordRel,
        out: &mut [WordRel],
    ) -> usize {
        loop {
            let child_size = self.child.get_more(ctx, state, lower_bound, out);
            if child_size == 0 {
                return 0;
            }
            let kept = self.apply_filter(ctx, out, child_size);
            if kept != 0 {
                return kept;
            }
        }
    }

    fn try_get_anchor_child(&mut self) -> Option<(Box<dyn WordIterator>, bool, bool)> {
        let husk = AnyWord::create(FieldMask::empty());
        Some((
            std::mem::replace(&mut self.child, husk),
            self.anchored_left,
            self.anchored_right,
        ))
    }
}

impl fmt::Display for Anchored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Anchor({}{}{})",
            if self.anchored_left { "left, " } else { "" },
            if self.anchored_right { "right, " } else { "" },
            self.child
        )
    }
}
