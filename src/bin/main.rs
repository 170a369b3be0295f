use std::{
    fmt::Write as _,
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mila::{ir::interp, lexer, parser, util::fmt::tree};

/// Compiles Mila programs into a basic-block IR.
#[derive(Parser)]
#[command(name = "milac", version, about, long_about = None)]
struct Args {
    /// Source file to compile; stdin when absent or `-`
    file: Option<PathBuf>,

    /// Stage whose output is printed
    #[arg(long, value_enum, default_value_t = Emit::Ir)]
    emit: Emit,

    /// Write the output to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Integers consumed by `readln` when running
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    input: Vec<i32>,

    /// Instructions the interpreter may execute
    #[arg(long, default_value_t = interp::Config::default().step_limit)]
    step_limit: u64,
}

#[derive(Copy, Clone, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    Ir,
    Run,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let src = read_source(args.file.as_deref())?;

    let dump = match args.emit {
        Emit::Tokens => lexer::lex(&src)
            .iter()
            .map(|token| format!("{token:?}\n"))
            .collect(),
        Emit::Ast => tree::print_program_string(&parser::parse_program(&src)?),
        Emit::Ir => mila::compile(&src)?.to_string(),
        Emit::Run => {
            let module = mila::compile(&src)?;
            let config = interp::Config {
                step_limit: args.step_limit,
                ..interp::Config::default()
            };
            let outcome = interp::run(&module, args.input.iter().copied(), &config)?;
            let mut dump = String::new();
            for value in outcome.output {
                writeln!(dump, "{value}")?;
            }
            writeln!(dump, "exit {}", outcome.exit_code)?;
            dump
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, dump).with_context(|| format!("writing {}", path.display()))
        }
        None => io::stdout()
            .write_all(dump.as_bytes())
            .context("writing to stdout"),
    }
}

fn read_source(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("reading stdin")?;
            Ok(buffer)
        }
    }
}
