use clap::Parser;
use signalforge::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
