//! Interactive calculator prompt

use crate::library::Calculator;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const PROMPT: &str = ">> ";
const HISTORY_FILE: &str = ".vexpr_history";

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    calculator: Calculator,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new() -> RlResult<Self> {
        Self::with_calculator(Calculator::new())
    }

    pub fn with_calculator(calculator: Calculator) -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = dirs_home().map(|h| h.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            calculator,
            history_path,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    pub fn run(&mut self) -> RlResult<()> {
        println!("vexpr {}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    self.eval_input(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    /// Handle a `:` command. Returns true when the REPL should exit.
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => true,
            ":help" | ":h" | ":?" => {
                print_help();
                false
            }
            ":vars" => {
                for (name, value) in self.calculator.variables() {
                    println!("  {name} = {}", Calculator::render(&value));
                }
                false
            }
            ":reset" => {
                self.calculator.reset();
                false
            }
            ":optimize" => {
                let on = !self.calculator.optimizes();
                self.calculator.set_optimize(on);
                println!("constant folding {}", if on { "on" } else { "off" });
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn eval_input(&mut self, input: &str) {
        match self.calculator.evaluate(input) {
            Ok(value) => {
                let text = Calculator::render(&value);
                if !text.is_empty() {
                    println!("{text}");
                }
            }
            Err(err) => eprintln!("Error: {err}"),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  :help, :h, :?   Show this help");
    println!("  :quit, :q       Exit");
    println!("  :vars           List variables");
    println!("  :reset          Remove all variables");
    println!("  :optimize       Toggle constant folding");
    println!("  :clear          Clear the screen");
    println!();
    println!("Examples:");
    println!("  x = linspace(0, 1, 11)");
    println!("  y = sin(2 * pi * x) + 0.1 * x");
    println!("  LowPass(y, 2, 10)");
    println!("  x > 0.5 ? x : 0");
    println!("  ans[0]");
}

fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
