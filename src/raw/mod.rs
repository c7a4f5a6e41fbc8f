mod arena;
mod handle;
mod node;
mod raw_ranked_tree;

pub(crate) use node::{Values, ValuesIntoIter};
pub(crate) use raw_ranked_tree::{InOrder, RawRankedTree};
