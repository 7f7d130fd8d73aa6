//! Walkthrough of the deployment-scoped chat API.
//!
//! Requires `ABACUS_API_KEY`, `ABACUS_DEPLOYMENT_TOKEN` and
//! `ABACUS_DEPLOYMENT_ID`. Run with: `cargo run --example deployment_chat`

use mcplite::chat::deployment::{ChatMessage, ChatOption, ChatResponse, DeploymentConfig};
use mcplite::DeploymentClient;

fn print_assistant(resp: &ChatResponse) {
    for text in resp.assistant_texts() {
        println!("Assistant: {text}");
    }
}

async fn simple_chat(client: &DeploymentClient) {
    println!("User: What is 2+2?");
    match client
        .get_chat_response(vec![ChatMessage::user("What is 2+2?")], [])
        .await
    {
        Ok(resp) => {
            print_assistant(&resp);
            println!("(Conversation ID: {})", resp.deployment_conversation_id);
        }
        Err(e) => tracing::error!(error = %e, "simple chat failed"),
    }
}

async fn chat_with_options(client: &DeploymentClient) {
    println!("User: Explain machine learning in one sentence.");
    println!("Using: GPT-4, Temperature: 0.3, Max tokens: 50");

    let resp = client
        .get_chat_response(
            vec![ChatMessage::user("Explain machine learning in one sentence.")],
            [
                ChatOption::LlmName("gpt-4".into()),
                ChatOption::Temperature(0.3),
                ChatOption::NumCompletionTokens(50),
                ChatOption::SystemMessage("You are a concise technical expert.".into()),
            ],
        )
        .await;

    match resp {
        Ok(resp) => print_assistant(&resp),
        Err(e) => tracing::error!(error = %e, "chat with options failed"),
    }
}

async fn multi_turn_chat(client: &DeploymentClient) {
    let mut messages = vec![ChatMessage::user("I'm learning Rust programming.")];
    println!("User: I'm learning Rust programming.");

    let first = match client.get_chat_response(messages.clone(), []).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(error = %e, "first turn failed");
            return;
        }
    };
    print_assistant(&first);

    if let Some(reply) = first.assistant_texts().last() {
        messages.push(ChatMessage::assistant(reply));
    }
    messages.push(ChatMessage::user("What should I learn first?"));
    println!("User: What should I learn first?");

    match client.get_chat_response(messages, []).await {
        Ok(resp) => print_assistant(&resp),
        Err(e) => tracing::error!(error = %e, "second turn failed"),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Deployment Chat Demo ===");

    let client = match DeploymentClient::new(DeploymentConfig::from_env()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "Failed to create client: {e}\nRequired environment variables:\n  \
                 ABACUS_API_KEY\n  ABACUS_DEPLOYMENT_TOKEN\n  ABACUS_DEPLOYMENT_ID"
            );
            std::process::exit(1);
        }
    };
    println!("Client created for deployment {}", client.deployment_id());

    println!("--- Example 1: Simple Chat ---");
    simple_chat(&client).await;

    println!("\n--- Example 2: Chat with Options ---");
    chat_with_options(&client).await;

    println!("\n--- Example 3: Multi-turn Conversation ---");
    multi_turn_chat(&client).await;

    println!("\n=== Demo Complete ===");
}
