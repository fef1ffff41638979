use clap::Parser;

use comic_search::build::cli::{run, Args};

fn main() -> comic_search::core::error::Result<()> {
    let args = Args::parse();
    run(args)
}
