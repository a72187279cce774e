//! Interactive chat loop.

use std::io::Write;

use groqterm::{ChatOptions, ChatSession, GroqClient};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::style::{self, Palette};
use crate::{print_tools, sink_for};

enum Command<'a> {
    Exit,
    Clear,
    Skip,
    Ask(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "exit" | "quit" | "bye" => Command::Exit,
        "clear" => Command::Clear,
        "" => Command::Skip,
        _ => Command::Ask(trimmed),
    }
}

fn prompt() {
    let Palette { user, reset, .. } = style::out();
    print!("{user}You:{reset} ");
    let _ = std::io::stdout().flush();
}

/// Run the interactive session until the user exits, stdin closes or Ctrl-C
/// is pressed. Errors from a single turn are reported and the loop continues.
pub async fn run(client: GroqClient, options: ChatOptions) {
    let Palette {
        dim,
        yellow,
        green,
        assistant,
        reset,
        ..
    } = style::out();
    let Palette {
        red,
        reset: err_reset,
        ..
    } = style::err();

    println!("{green}Welcome to Groq Interactive Chat!{reset}");
    println!(
        "{dim}Model: {} | Temperature: {}{reset}",
        options.model, options.temperature
    );
    if let Some(system) = &options.system_prompt {
        println!("{dim}System: {system}{reset}");
    }
    println!("{dim}Type 'exit', 'quit', or 'bye' to end the session{reset}");
    println!("{dim}Type 'clear' to clear conversation history{reset}\n");

    let mode = options.render_mode;
    let mut session = ChatSession::new(client, options);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                println!("\n{yellow}Chat interrupted. Goodbye!{reset}");
                return;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                println!();
                return;
            }
            Err(e) => {
                eprintln!("{red}Error reading input: {e}{err_reset}");
                return;
            }
        };

        let query = match parse_command(&line) {
            Command::Exit => {
                println!("{yellow}Goodbye!{reset}");
                return;
            }
            Command::Clear => {
                session.clear();
                println!("{yellow}Conversation history cleared.{reset}\n");
                continue;
            }
            Command::Skip => continue,
            Command::Ask(query) => query,
        };

        print!("{assistant}Assistant:{reset} ");
        let _ = std::io::stdout().flush();

        let mut sink = sink_for(mode);
        // Dropping the in-flight request on Ctrl-C stops the stream and leaves
        // the history as it was before this turn.
        let outcome = tokio::select! {
            result = session.send(query, &mut sink) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };

        match outcome {
            Some(Ok(reply)) => {
                println!();
                print_tools(session.options(), &reply.tools_used);
                println!();
            }
            // The renderer has already shown the diagnostic.
            Some(Err(_)) => println!("{yellow}Let's continue...{reset}\n"),
            None => {
                println!("\n{yellow}Chat interrupted. Goodbye!{reset}");
                return;
            }
        }
    }
}
