//! Iterators producing zgram positions.

mod and;
mod having_reaction;
mod not;
mod or;
mod pop_or_not;
mod zgram_id;

pub use and::And;
pub use having_reaction::HavingReaction;
pub use not::Not;
pub use or::Or;
pub use pop_or_not::PopOrNot;
pub use zgram_id::ZgramIdIterator;
