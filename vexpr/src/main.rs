//! vexpr CLI

use clap::{Parser, Subcommand};
use vexpr::error::report_error;
use vexpr::library::Calculator;
use vexpr::repl::Repl;

#[derive(Parser)]
#[command(name = "vexpr", version, about = "Vector expression calculator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate an expression and print the result
    Eval {
        /// Expression, statements separated by ';'
        expr: String,
        /// Evaluate without constant folding
        #[arg(long)]
        no_optimize: bool,
    },
    /// Parse and dump the syntax tree as JSON (debug)
    Parse {
        expr: String,
        /// Fold operator subtrees over literals before dumping
        #[arg(long)]
        optimize: bool,
    },
    /// Tokenize and dump tokens (debug)
    Tokens { expr: String },
    /// Start the interactive calculator
    Repl {
        /// Evaluate without constant folding
        #[arg(long)]
        no_optimize: bool,
    },
}

const SOURCE_NAME: &str = "<expr>";

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Eval { expr, no_optimize } => eval_expr(&expr, !no_optimize),
        Command::Parse { expr, optimize } => parse_expr(&expr, optimize),
        Command::Tokens { expr } => tokenize_expr(&expr),
        Command::Repl { no_optimize } => start_repl(!no_optimize),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Unwrap an engine result, reporting failures against the source and exiting
fn or_report<T>(source: &str, result: vexpr::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            report_error(SOURCE_NAME, source, &err);
            std::process::exit(1);
        }
    }
}

fn eval_expr(expr: &str, optimize: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut calculator = Calculator::new();
    calculator.set_optimize(optimize);

    // error spans index into the trimmed text the calculator parses
    let expr = expr.trim();
    let value = or_report(expr, calculator.evaluate(expr));
    let text = Calculator::render(&value);
    if !text.is_empty() {
        println!("{text}");
    }
    Ok(())
}

fn parse_expr(expr: &str, optimize: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut nodes = or_report(expr, vexpr::parser::parse(expr));
    if optimize {
        nodes = or_report(expr, vexpr::optimize::optimize_all(&nodes, None));
    }

    println!("{}", serde_json::to_string_pretty(&nodes)?);
    Ok(())
}

fn tokenize_expr(expr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let tokens = or_report(expr, vexpr::lexer::tokenize(expr));
    for (tok, span) in &tokens {
        println!("{:?} @ {}..{}", tok, span.start, span.end);
    }
    Ok(())
}

fn start_repl(optimize: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut calculator = Calculator::new();
    calculator.set_optimize(optimize);

    let mut repl = Repl::with_calculator(calculator)?;
    repl.run()?;
    Ok(())
}
