//! snapchef - photo-to-recipe backend.

use anyhow::Context;
use snapchef::{config::ServerConfig, context::AppContext, jobs, server};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snapchef=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env().context("loading configuration")?;

    // Create application context
    let ctx = Arc::new(
        AppContext::new(config)
            .await
            .context("assembling application context")?,
    );

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
                            _           __
  ___ _ __   __ _ _ __  ___| |__   ___ / _|
 / __| '_ \ / _` | '_ \/ __| '_ \ / _ \ |_
 \__ \ | | | (_| | |_) \__ \ | | |  __/  _|
 |___/_| |_|\__,_| .__/|___/_| |_|\___|_|
                 |_|
        photo-to-recipe backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
