//! CLI entry point for the exposure timing decoder

use clap::Parser;
use exposure_timing::io::cli::{Cli, FileProcessor, init_tracing};

fn main() -> exposure_timing::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());
    let processor = FileProcessor::new(cli);
    processor.process()
}
