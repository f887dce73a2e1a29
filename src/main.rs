use clap::{Parser, ValueEnum};
use rustyline::{error::ReadlineError, DefaultEditor};
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use std::{
    fs::read_to_string,
    io,
    path::{Path, PathBuf},
};

use mlang::{rep, Env, ErrorKind, Evaluator, MappingPolicy};

#[derive(Clone, Copy, ValueEnum)]
enum Mapping {
    Comma,
    Triples,
}

impl From<Mapping> for MappingPolicy {
    fn from(source: Mapping) -> Self {
        match source {
            Mapping::Comma => MappingPolicy::CommaAdjacent,
            Mapping::Triples => MappingPolicy::Triples,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Recover {
    Syntax,
    All,
}

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// File to run line by line. Starts the prompt when absent.
    path: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Mapping::Comma)]
    mapping: Mapping,
    /// Error kinds a batch run continues after.
    #[arg(long, value_enum, default_value_t = Recover::All)]
    recover: Recover,
    #[arg(long, default_value = "m_lang> ")]
    prompt: String,
}

#[derive(Debug, Error)]
enum DriverError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Readline(#[from] ReadlineError),
    #[error("line {line}: {kind} error: {source}")]
    Aborted {
        line: usize,
        kind: ErrorKind,
        source: mlang::Error,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let evaluator = Evaluator::new(cli.mapping.into());
    let env = Env::root();

    let result = match &cli.path {
        Some(path) => run_file(path.as_path(), cli.recover, &evaluator, &env),
        None => repl(&cli.prompt, &evaluator, &env),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_file(
    path: &Path,
    recover: Recover,
    evaluator: &Evaluator,
    env: &Env,
) -> Result<(), DriverError> {
    info!(path = %path.display(), "running file");
    let source = read_to_string(path)?;

    for (number, line) in source.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let line = line.trim_end();
        println!("Line from executed file:  {}", line);

        match rep(line, evaluator, env) {
            Ok(Some(val)) => println!("Execution result:         {}", val),
            Ok(None) => (),
            Err(e) if recover == Recover::All || e.kind() == ErrorKind::Syntax => {
                println!("{} error: {}", e.kind(), e)
            }
            Err(e) => {
                return Err(DriverError::Aborted {
                    line: number + 1,
                    kind: e.kind(),
                    source: e,
                })
            }
        }
    }
    Ok(())
}

fn repl(prompt: &str, evaluator: &Evaluator, env: &Env) -> Result<(), DriverError> {
    let mut rl = DefaultEditor::new()?;

    loop {
        let line = match rl.readline(prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        rl.add_history_entry(line.as_str())?;

        match rep(&line, evaluator, env) {
            Ok(Some(val)) => println!("{}", val),
            Ok(None) => (),
            Err(e) => {
                debug!(kind = %e.kind(), "recovered");
                eprintln!("{} error: {}", e.kind(), e)
            }
        }
    }
    Ok(())
}
