//! In-memory collaborators for embedding the reader and for tests.

mod sink;
mod source;

pub use sink::MemoryStateSink;
pub use source::MemoryChainSource;
