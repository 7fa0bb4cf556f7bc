//! Data types shared by the platform sync crates.

mod block;
pub mod errors;
pub mod hash;
mod position;

pub use block::{Block, StateTransition};
pub use hash::BlockHash;
pub use position::SyncPosition;
