//! Iterators that cross from the word domain into the zgram domain.

mod near;
mod word_adaptor;

pub use near::Near;
pub use word_adaptor::WordAdaptor;
