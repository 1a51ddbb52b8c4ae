use clap::Parser;
use stocksift::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
