//! One chat completion against the `/v1/chat/completions` endpoint.
//!
//! Run with: `ABACUS_API_KEY=... cargo run --example completions`

use mcplite::chat::completions::{ChatCompletionRequest, CompletionsConfig, Message};
use mcplite::CompletionsClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = CompletionsConfig::from_env();
    if config.api_key.is_empty() {
        eprintln!("ABACUS_API_KEY environment variable is required");
        std::process::exit(1);
    }

    let client = match CompletionsClient::new(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create client: {e}");
            std::process::exit(1);
        }
    };

    let req = ChatCompletionRequest::new(
        "gpt-4o",
        vec![
            Message::system("You are a helpful assistant."),
            Message::user("What is the capital of France?"),
        ],
    );

    let resp = match client.create_chat_completion(&req).await {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to create chat completion: {e}");
            std::process::exit(1);
        }
    };

    println!("Model: {}", resp.model);
    println!("Response: {}", resp.first_content().unwrap_or("(no choices)"));
    println!(
        "Usage: {} prompt tokens, {} completion tokens, {} total tokens",
        resp.usage.prompt_tokens, resp.usage.completion_tokens, resp.usage.total_tokens
    );
}
