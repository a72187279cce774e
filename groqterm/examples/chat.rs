//! Stream a chat reply to the terminal.
//!
//! Usage: GROQ_API_KEY=... cargo run --example chat -- "Explain ownership in Rust"

use groqterm::{ChatOptions, GroqClient, TerminalSink};

#[tokio::main]
async fn main() -> groqterm::Result<()> {
    let query = std::env::args()
        .nth(1)
        .expect("usage: chat <query>");

    let client = GroqClient::new(groqterm::resolve_api_key(None)?);
    let options = ChatOptions::new().model("llama-3.3-70b-versatile");

    let mut sink = TerminalSink::stdout();
    let reply = groqterm::complete_once(&client, &options, &query, &mut sink).await?;

    println!("\n\n({} characters)", reply.text.len());

    Ok(())
}
