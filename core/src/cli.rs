use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::codegen::generate_cpp;
use crate::config::Config;
use crate::interpreter::{ClosedContext, ExpressionParser, Output, Program, Val, VmState, VM};
use crate::validation::validate_program;

#[derive(Parser)]
#[command(name = "progflow")]
#[command(about = "ProgFlow - run, check and translate flowchart programs", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a saved program on the console
    Run {
        /// Program file (JSON node record)
        file: PathBuf,

        /// Procedure to start from
        #[arg(short = 'e', long = "entry", default_value = "main")]
        entry: String,

        /// Positional arguments for the entry procedure
        #[arg(short = 'a', long = "arg", allow_negative_numbers = true)]
        args: Vec<f64>,
    },

    /// Translate a saved program to C++
    Gen {
        /// Program file (JSON node record)
        file: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Report static problems in a saved program
    Check {
        /// Program file (JSON node record)
        file: PathBuf,
    },

    /// Evaluate a single expression
    Eval {
        /// Expression text
        expr: String,

        /// Reject boolean operators
        #[arg(long)]
        no_boolean: bool,

        /// Allow assignment
        #[arg(long)]
        assign: bool,

        /// Variable binding, e.g. `-D x=3` or `-D flag=true`
        #[arg(short = 'D', long = "define", value_parser = parse_binding)]
        define: Vec<(String, Val)>,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load config first so errors show before any command output
    let config = Config::builder()
        .config_path(cli.config.map(PathBuf::from))
        .build()
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Run { file, entry, args } => {
            let program = load_program(&file)?;
            let args = args.into_iter().map(Val::Num).collect();
            let mut vm = VM::with_entry(&program, &entry, args, config.limits())?;

            let stdin = BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            match drive(&mut vm, stdin, &mut stdout).await? {
                VmState::Finished(Some(value)) => tracing::info!(%value, "program finished"),
                VmState::Finished(None) => tracing::info!("program finished"),
                VmState::Failed(_) => bail!("program stopped with an error"),
                other => bail!("program stopped in state {:?}", other),
            }
        }

        Commands::Gen { file, output } => {
            let program = load_program(&file)?;
            let source = generate_cpp(&program, &config.cpp_options());
            match output {
                Some(path) => std::fs::write(&path, source)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => print!("{}", source),
            }
        }

        Commands::Check { file } => {
            let program = load_program(&file)?;
            let diagnostics = validate_program(&program);
            for diagnostic in &diagnostics {
                println!("{}", diagnostic);
            }

            let errors = diagnostics.iter().filter(|d| d.is_error()).count();
            if errors > 0 {
                bail!("{} error(s) in {}", errors, file.display());
            }
            if diagnostics.is_empty() {
                println!("No problems found");
            }
        }

        Commands::Eval {
            expr,
            no_boolean,
            assign,
            define,
        } => {
            let mut ctx = ClosedContext::default();
            ctx.vars.extend(define);
            println!("{}", eval_text(&expr, !no_boolean, assign, &mut ctx)?);
        }

        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

/// Read and compile a saved program
pub fn load_program(path: &Path) -> Result<Program> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Program::from_json(&json).with_context(|| format!("Failed to load {}", path.display()))
}

/// Parse and evaluate one expression against a closed set of variables
pub fn eval_text(text: &str, allow_boolean: bool, allow_assignment: bool, ctx: &mut ClosedContext) -> Result<Val> {
    let expr = ExpressionParser::new(allow_boolean, allow_assignment)
        .parse_expr(text)
        .with_context(|| format!("Failed to parse '{}'", text))?;
    Ok(expr.evaluate(ctx)?)
}

fn parse_binding(text: &str) -> Result<(String, Val), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", text))?;
    let value = match value.trim() {
        "true" => Val::Bool(true),
        "false" => Val::Bool(false),
        number => Val::Num(
            number
                .parse()
                .map_err(|_| format!("'{}' is not a number or boolean", number))?,
        ),
    };
    Ok((name.trim().to_string(), value))
}

/* ===================== Console Host ===================== */

/// Drive a VM to completion on a console.
///
/// Program text goes to `out`; warnings and errors go to stderr. Every
/// newline tick yields to the runtime, and input lines are read only when the
/// program is waiting for them. Returns the terminal state.
pub async fn drive<R, W>(vm: &mut VM<'_>, input: R, out: &mut W) -> Result<VmState>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    vm.run();

    loop {
        for item in vm.drain_output() {
            match item {
                Output::Text(text) => write!(out, "{}", text)?,
                Output::EndLine => writeln!(out)?,
                Output::Warning(message) => eprintln!("warning: {}", message),
                Output::Error(message) => eprintln!("error: {}", message),
            }
        }

        match vm.state().clone() {
            VmState::Running => {
                vm.run();
            }
            VmState::AwaitingTick => {
                out.flush()?;
                tokio::task::yield_now().await;
                vm.resume();
            }
            VmState::AwaitingInput => {
                out.flush()?;
                match lines.next_line().await.context("Failed to read input")? {
                    Some(line) => {
                        vm.provide_line(&line);
                    }
                    None => bail!("input ended while the program was waiting for a value"),
                }
            }
            state @ (VmState::Finished(_) | VmState::Failed(_)) => {
                out.flush()?;
                return Ok(state);
            }
        }
    }
}
