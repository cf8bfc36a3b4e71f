//! Iterators producing word positions.

mod anchored;
mod any_word;
mod pattern;

pub use anchored::Anchored;
pub use any_word::AnyWord;
pub use pattern::Pattern;
