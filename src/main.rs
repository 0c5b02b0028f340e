//! Topograph CLI entry point.

use topograph_lib::cli::{self, Cli};
use topograph_lib::core::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli::execute(cli).await
}
