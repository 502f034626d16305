//! paywatch server
//!
//! Payment webhook alerting and checkout service.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use paywatch::app::{router, AppContext};

/// paywatch server
#[derive(Parser, Debug)]
#[command(name = "paywatch")]
#[command(version)]
#[command(about = "Payment webhook alerting and checkout service")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    port: u16,

    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log alerts instead of sending them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let ctx = Arc::new(AppContext::from_env(args.dry_run).context("startup failed")?);
    let app = router(Arc::clone(&ctx));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", args.host, args.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, dry_run = args.dry_run, "paywatch listening");

    let shutdown_ctx = Arc::clone(&ctx);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            shutdown_ctx.scheduler.shutdown();
        })
        .await
        .context("server error")?;

    ctx.scheduler.drain().await;
    tracing::info!("paywatch stopped");
    Ok(())
}
