use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use quill::ast::Stmt;
use quill::error::QuillError;
use quill::interpreter::Interpreter;
use quill::parser::Parser;
use quill::scanner::{self, Scanner};

#[derive(ClapParser, Debug)]
#[command(version, about = "Quill language interpreter", long_about = None)]
pub struct Cli {
    /// Script to run
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Enable logging to quill.log
    #[arg(long)]
    log: bool,

    /// Print an intermediate form instead of running the script
    #[arg(long, value_enum)]
    emit: Option<Emit>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Emit {
    /// One token per line
    Tokens,

    /// The syntax tree as JSON
    Ast,
}

/// Maps the script read-only.  Empty files cannot be mapped, so they come
/// back as an empty buffer.
fn read_file(filename: &Path) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let length: u64 = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    if length == 0 {
        return Ok(Vec::new());
    }

    // SAFETY: the map is read-only and copied out before anything else runs.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Read {} bytes from {:?}", map.len(), filename);

    Ok(map.to_vec())
}

fn init_logger() -> Result<()> {
    let log_file = File::create("quill.log").context("Failed to create quill.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("quill::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to quill.log");
    Ok(())
}

/// Report a front-end or runtime failure and exit with the matching status.
fn fail(error: QuillError) -> ! {
    debug!("Failing with: {:?}", error);
    eprintln!("{}", error);

    process::exit(if error.is_static() { 65 } else { 70 })
}

fn emit_tokens(source: &str) {
    let mut tokenized: bool = true;

    for token in Scanner::new(source) {
        match token {
            Ok(token) => println!("{}", token),
            Err(e) => {
                tokenized = false;
                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");
        process::exit(65);
    }
}

fn parse(source: &str) -> Vec<Stmt> {
    let tokens = scanner::tokenize(source).unwrap_or_else(|e| fail(e));

    Parser::new(&tokens).parse().unwrap_or_else(|e| fail(e))
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let Some(filename) = args.file else {
        eprintln!("No input file was provided (use --file <PATH>)");
        process::exit(1);
    };

    let buf: Vec<u8> = match read_file(&filename) {
        Ok(buf) => buf,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    let source: &str = match std::str::from_utf8(&buf) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{:?} is not valid UTF-8: {}", filename, e);
            process::exit(1);
        }
    };

    match args.emit {
        Some(Emit::Tokens) => emit_tokens(source),

        Some(Emit::Ast) => {
            let statements: Vec<Stmt> = parse(source);
            let json: String =
                serde_json::to_string_pretty(&statements).context("Failed to serialize AST")?;
            println!("{}", json);
        }

        None => {
            let statements: Vec<Stmt> = parse(source);

            info!("Parsed {} statements", statements.len());

            let mut interpreter: Interpreter = Interpreter::new();

            if let Err(e) = interpreter.interpret(&statements) {
                fail(e);
            }

            info!("Program executed successfully");
        }
    }

    Ok(())
}
