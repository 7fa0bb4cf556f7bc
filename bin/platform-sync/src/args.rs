//! CLI arguments.

use std::path::PathBuf;

use argh::FromArgs;

#[derive(Clone, Debug, FromArgs)]
#[argh(description = "Platform sync reader running against a simulated chain")]
pub(crate) struct Args {
    #[argh(option, short = 'c', description = "path to configuration")]
    pub(crate) config: Option<PathBuf>,

    #[argh(
        option,
        default = "20",
        description = "blocks to mine before shutting down"
    )]
    pub(crate) blocks: u64,

    #[argh(
        option,
        default = "500",
        description = "milliseconds between mined blocks"
    )]
    pub(crate) block_interval_ms: u64,

    /// Replaces the top `reorg_depth` blocks every `reorg_every` blocks.
    #[argh(option, description = "mine a competing branch every N blocks")]
    pub(crate) reorg_every: Option<u64>,

    #[argh(
        option,
        default = "2",
        description = "depth of simulated reorgs"
    )]
    pub(crate) reorg_depth: u64,
}
