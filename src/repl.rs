//! Interactive read-eval-print loop.
//!
//! The session environment persists across lines. Results are printed with the
//! [`Display`](std::fmt::Display) form of [`Value`]; `define` and `set!` print nothing.
//! Errors are reported as `Error: <message>` and the loop continues. The session ends on
//! end-of-input (Ctrl-D) or interrupt (Ctrl-C).
//!
//! Evaluation recurses on the host stack, so the loop runs on a dedicated thread whose
//! stack size comes from [`ReplConfig`].

use crate::Error;
use crate::ast::{Procedure, Value};
use crate::eval_str;
use crate::evaluator::{Environment, create_global_env};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use std::sync::Once;
use std::thread;

/// Environment variable naming the history file
pub const HISTORY_VAR: &str = "LISPY_HISTORY";
/// Environment variable giving the interpreter stack size in MiB
pub const STACK_MB_VAR: &str = "LISPY_STACK_MB";

const DEFAULT_STACK_MB: usize = 64;
const MIB: usize = 1024 * 1024;

/// Settings for an interactive session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplConfig {
    pub prompt: String,
    /// Where line history is loaded from and saved to, if anywhere
    pub history_file: Option<PathBuf>,
    /// Stack size in bytes of the interpreter thread
    pub stack_size: usize,
}

impl Default for ReplConfig {
    fn default() -> Self {
        ReplConfig {
            prompt: "lispy> ".to_owned(),
            history_file: None,
            stack_size: DEFAULT_STACK_MB * MIB,
        }
    }
}

impl ReplConfig {
    /// Build a configuration from a variable lookup, falling back to the defaults for
    /// anything missing or invalid
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ReplConfig::default();

        if let Some(path) = lookup(HISTORY_VAR)
            && !path.trim().is_empty()
        {
            config.history_file = Some(PathBuf::from(path.trim()));
        }

        if let Some(raw) = lookup(STACK_MB_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(mb) if mb > 0 && mb.checked_mul(MIB).is_some() => {
                    config.stack_size = mb * MIB;
                }
                _ => tracing::warn!(
                    value = %raw,
                    default_mb = DEFAULT_STACK_MB,
                    "ignoring invalid {STACK_MB_VAR}"
                ),
            }
        }

        config
    }

    /// Build a configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Errors that end a session early
#[derive(Debug, thiserror::Error)]
pub enum ReplError {
    #[error("could not initialize line editor: {0}")]
    Editor(#[from] ReadlineError),
    #[error("could not start interpreter thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("interpreter panicked: {0}")]
    Panicked(String),
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Does nothing unless `RUST_LOG` is set, e.g. `RUST_LOG=lispy=trace` to follow every
/// binding and procedure application.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Render an evaluation outcome the way the loop prints it; `None` prints nothing
pub fn format_result(result: &Result<Value, Error>) -> Option<String> {
    match result {
        Ok(Value::Unspecified) => None,
        Ok(value) => Some(value.to_string()),
        Err(e) => Some(format!("Error: {e}")),
    }
}

/// Parse and evaluate one input line in the session environment
pub fn eval_line(line: &str, env: &Environment) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    format_result(&eval_str(line, env))
}

/// Run an interactive session until end-of-input or interrupt
pub fn run_repl(config: ReplConfig) -> Result<(), ReplError> {
    tracing::debug!(stack_size = config.stack_size, "starting interpreter thread");

    let handle = thread::Builder::new()
        .name("lispy-repl".to_owned())
        .stack_size(config.stack_size)
        .spawn(move || repl_loop(&config))?;

    match handle.join() {
        Ok(result) => result,
        Err(panic_info) => {
            let message = if let Some(msg) = panic_info.downcast_ref::<&str>() {
                (*msg).to_owned()
            } else if let Some(msg) = panic_info.downcast_ref::<String>() {
                msg.clone()
            } else {
                "unknown panic occurred".to_owned()
            };
            Err(ReplError::Panicked(message))
        }
    }
}

fn repl_loop(config: &ReplConfig) -> Result<(), ReplError> {
    println!("Lispy Scheme Interpreter");
    println!("Enter S-expressions like: (+ 1 2)");
    println!("Type :help for more commands, or Ctrl+D to exit.");
    println!();

    let mut rl = DefaultEditor::new()?;
    if let Some(path) = &config.history_file
        && let Err(err) = rl.load_history(path)
    {
        // A missing file on the first run is expected
        tracing::debug!(path = %path.display(), %err, "no history loaded");
    }

    let env = create_global_env();

    loop {
        match rl.readline(&config.prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => print_help(),
                    ":env" => print_environment(&env),
                    _ => {
                        if let Some(output) = eval_line(line, &env) {
                            println!("{output}");
                        }
                    }
                }
            }
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }

    if let Some(path) = &config.history_file
        && let Err(err) = rl.save_history(path)
    {
        tracing::warn!(path = %path.display(), %err, "could not save history");
    }

    Ok(())
}

fn print_help() {
    println!("Lispy Scheme Interpreter:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  Ctrl+D     - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Special forms:");
    println!("  (quote x)  (if test then else)  (define name expr)");
    println!("  (set! name expr)  (lambda (params...) body)");
    println!();
    println!("Only #f is false. Use (begin e1 e2 ...) to sequence expressions.");
    println!();
    println!("Examples:");
    println!("  (define square (lambda (x) (* x x)))");
    println!("  (square 12)");
    println!("  (map square (list 1 2 3))");
    println!("  (if (> (sqrt 2) 1) (quote yes) (quote no))");
    println!();
}

/// Split bindings into names the global environment starts with and everything the
/// session added or redefined
fn partition_bindings(env: &Environment) -> (Vec<String>, Vec<(String, Value)>) {
    let defaults = create_global_env();
    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in env.get_all_bindings() {
        // Compare renderings so NaN constants still match themselves
        let is_default = defaults
            .get(&name)
            .is_ok_and(|default| default.to_string() == value.to_string());
        if is_default {
            builtins.push(name);
        } else {
            user_defined.push((name, value));
        }
    }

    (builtins, user_defined)
}

fn print_environment(env: &Environment) {
    let (builtins, user_defined) = partition_bindings(env);

    println!(
        "Environment bindings ({} total):",
        builtins.len() + user_defined.len()
    );
    println!();

    // Print built-ins
    if !builtins.is_empty() {
        println!("Built-in bindings ({}):", builtins.len());
        // Print in columns for readability
        let mut col = 0;
        for name in builtins {
            print!("  {name:<15}");
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    // Print user-defined values
    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            match value {
                Value::Procedure(Procedure::Closure(closure)) => {
                    println!("  {name} = (lambda ({}) {})", closure.params.join(" "), closure.body);
                }
                _ => println!("  {name} = {value}"),
            }
        }
    }
}
