use anyhow::Result;
use parley::client::ConversationClient;
use parley::config::WidgetConfig;
use parley::messages::normalizer::quick_reply_query;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Minimal console collaborator: types go to the backend, normalized
/// replies and their quick replies print back.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_host =
        std::env::var("PARLEY_API_HOST").unwrap_or_else(|_| "http://localhost:8080".into());
    let config = WidgetConfig::with_api_host(api_host);
    config.validate().map_err(anyhow::Error::msg)?;

    info!("Starting Parley console client against {}", config.api_host);

    let client = Arc::new(ConversationClient::new(&config));
    let mut updates = client.store().subscribe();

    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let Some(message) = updates.borrow_and_update().clone() else {
                continue;
            };
            if message.displayable {
                println!("[{}] {}", message.render_role(), message.content);
            }
            if !message.quick_replies.is_empty() {
                println!("    options: {}", message.quick_replies.join(" | "));
            }
        }
    });

    client.warm_up().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        // the retry chip re-primes the session rather than echoing its label
        client.converse_text(quick_reply_query(line)).await;
    }

    Ok(())
}
