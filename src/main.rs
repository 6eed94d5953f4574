// ABOUTME: CLI entry point: script execution and the interactive REPL

mod ast;
mod ast_printer;
mod builtins;
mod config;
mod env;
mod error;
mod eval;
mod highlighter;
mod parser;
mod scanner;
mod token;
mod value;

use clap::Parser;
use config::{InterpreterOptions, HISTORY_FILE, PROMPT, WELCOME_FOOTER, WELCOME_MESSAGE, WELCOME_SUBTITLE};
use error::ErrorReporter;
use eval::Evaluator;
use highlighter::BoopHelper;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::path::PathBuf;
use std::process::exit;

/// Tree-walking interpreter for the Boop scripting language
#[derive(Parser, Debug)]
#[command(name = "boop")]
#[command(version = config::VERSION)]
#[command(about = "A tree-walking interpreter for the Boop scripting language")]
struct CliArgs {
    /// Script file to execute (optional - if not provided, starts REPL)
    #[arg(value_name = "FILE")]
    script: Option<PathBuf>,

    /// Treat reading an uninitialized (nil-valued) variable as an error
    #[arg(long = "strict-uninitialized")]
    strict_uninitialized: bool,

    /// Print the parsed program instead of executing it
    #[arg(long = "dump-ast")]
    dump_ast: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let options = InterpreterOptions {
        strict_uninitialized: args.strict_uninitialized,
    };

    match &args.script {
        Some(path) => {
            run_script(path, &options, args.dump_ast);
            Ok(())
        }
        None => run_repl(&options),
    }
}

/// Execute a Boop script file. Exit codes: 65 for scan/parse errors, 70 for
/// runtime failure, 0 on success.
fn run_script(path: &PathBuf, options: &InterpreterOptions, dump_ast: bool) {
    let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Cannot read script file {}: {e}", path.display());
        exit(65);
    });

    let mut reporter = ErrorReporter::new();
    let tokens = scanner::scan(&source, &mut reporter);
    let program = parser::parse(tokens, &mut reporter);
    if reporter.had_error() {
        reporter.report();
        exit(65);
    }

    if dump_ast {
        println!("{}", ast_printer::print_program(&program));
        return;
    }

    let mut evaluator = Evaluator::new(options);
    evaluator.interpret(&program, &mut reporter);
    reporter.report();
    if reporter.had_error() {
        exit(65);
    }
    if reporter.had_runtime_error() {
        exit(70);
    }
}

/// Interactive loop with history and syntax highlighting. The evaluator
/// persists across lines, so definitions accumulate.
fn run_repl(options: &InterpreterOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<BoopHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(BoopHelper::new()));
    let _ = rl.load_history(HISTORY_FILE);

    println!("{WELCOME_MESSAGE}");
    println!("{WELCOME_SUBTITLE}");
    println!("{WELCOME_FOOTER}");

    let mut evaluator = Evaluator::new(options);
    let mut reporter = ErrorReporter::new();
    loop {
        match rl.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                // One bad line must not poison the next one.
                reporter.clear();
                let tokens = scanner::scan(&line, &mut reporter);
                let program = parser::parse(tokens, &mut reporter);
                if reporter.had_error() {
                    reporter.report();
                    continue;
                }

                // Echo the value of a lone expression statement; run
                // anything else as a program.
                if let [ast::Stmt::Expr { expr }] = program.as_slice() {
                    match evaluator.eval_expr(expr) {
                        Ok(value) => println!("=> {value}"),
                        Err(error) => reporter.runtime_error(&error),
                    }
                } else {
                    evaluator.interpret(&program, &mut reporter);
                }
                reporter.report();
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error: {err}");
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    Ok(())
}
