//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;

pub(crate) use circular::StackGuard;
pub(crate) use dispose_bag::{aggregate, dispose_reverse, same_manager, DisposeBag, Tracked};
