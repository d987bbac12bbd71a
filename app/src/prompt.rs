//! `Prompt` on a terminal: notices go to stdout, confirmations read a y/N line.

use std::io::{self, BufRead, Write};

use todo_client_core::views::{Notice, Prompt};

pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &str) -> bool {
        print!("{question} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }

    fn notify(&self, notice: Notice) {
        println!("{notice}");
    }
}
