use lispy::repl::{ReplConfig, init_tracing, run_repl};
use std::process;

fn main() {
    init_tracing();

    if let Err(err) = run_repl(ReplConfig::from_env()) {
        eprintln!("The REPL encountered an unexpected error and must exit.");
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
