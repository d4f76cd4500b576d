use std::sync::Arc;

use signal_inbox::config::InboxConfig;
use signal_inbox::error::{InboxError, Result};
use signal_inbox::inbox::InboxProcessor;
use signal_inbox::relay::{HttpRelay, Relay};

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = InboxConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!(
            "  export SIGNAL_INBOX_DIR=~/inbox SIGNAL_API_HOST=http://localhost:8080 \
             SIGNAL_ACCOUNT=+1..."
        );
        std::process::exit(1);
    });

    // Initialize tracing
    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    run(config).await?;
    Ok(())
}

/// Receive one batch, process it and print the run summary.
async fn run(config: InboxConfig) -> Result<()> {
    tokio::fs::create_dir_all(&config.inbox_dir)
        .await
        .map_err(|source| InboxError::Write {
            path: config.inbox_dir.clone(),
            source,
        })?;

    tracing::info!(
        inbox = %config.inbox_dir.display(),
        relay = %config.relay_host,
        "Receiving messages"
    );

    let relay = Arc::new(HttpRelay::new(&config.relay_host, &config.account));
    let account = config.account.clone();
    let processor = InboxProcessor::new(config, relay.clone());

    // A failed receive is an empty run, not a failed one.
    let batch = match relay.receive().await {
        Ok(batch) => batch,
        Err(e) => {
            processor
                .error_log()
                .record(format!("fetching /v1/receive/{account}\n{e}"))
                .await;
            serde_json::Value::Null
        }
    };

    let summary = processor.process_value(batch).await;
    processor.wait_for_backup().await;

    let json = serde_json::to_string_pretty(&summary).map_err(InboxError::from)?;
    println!("{json}");
    Ok(())
}
