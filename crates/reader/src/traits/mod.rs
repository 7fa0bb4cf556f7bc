mod iterator;
mod sink;
mod source;

pub use iterator::BlockIterator;
pub use sink::StateSink;
pub use source::{block_at_checked, ChainSource};

#[cfg(any(test, feature = "test-utils"))]
pub use iterator::MockBlockIterator;
#[cfg(any(test, feature = "test-utils"))]
pub use sink::MockStateSink;
#[cfg(any(test, feature = "test-utils"))]
pub use source::MockChainSource;
