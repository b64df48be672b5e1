use clap::Parser;
use regimescore::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
