use std::io::{BufRead, IsTerminal, Write};

use clap::Parser;

use crate::cli::commands::ShellLine;
use crate::cli::handlers::{CmdResult, Session};
use crate::io::gateway::TaskGateway;
use crate::io::slot_store::SlotStore;

/// Read commands from stdin until EOF or `exit`, against one long-lived session.
/// A failing command prints its error and the loop carries on.
pub fn run<G: TaskGateway, S: SlotStore + Clone>(session: &mut Session<G, S>) -> CmdResult {
    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();

    if let Err(e) = session.ensure_loaded() {
        eprintln!("error: {}", e);
    }

    let mut input = stdin.lock();
    loop {
        if interactive {
            print!("td> ");
            std::io::stdout().flush()?;
        }
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let words = match split_words(&line) {
            Ok(words) => words,
            Err(e) => {
                eprintln!("error: {}", e);
                continue;
            }
        };
        match words.first().map(String::as_str) {
            None => continue,
            Some("exit") | Some("quit") => break,
            Some(_) => {}
        }

        match ShellLine::try_parse_from(&words) {
            Ok(parsed) => {
                if let Err(e) = session.run(parsed.command) {
                    eprintln!("error: {}", e);
                }
            }
            Err(e) => {
                let _ = e.print();
            }
        }
    }
    Ok(())
}

/// Split a command line on whitespace, honoring single and double quotes
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if let Some(q) = quote {
        return Err(format!("unterminated {} quote", q));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
