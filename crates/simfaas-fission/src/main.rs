use clap::Parser;
use color_eyre::eyre;
use simfaas_fission::{
    create_app, spawn_usage_sampler, AppState, Cli, Fission, ServerMetrics, DEFAULT_FUNCTION,
};
use simfaas_platform::Platform;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if cli.cold_starts_enabled() {
        info!(
            "cold starts enabled (cold start: {:?}, keep-warm: {:?})",
            cli.cold_start_duration, cli.keep_warm_duration
        );
    } else {
        info!("cold starts disabled. Cold start duration or keep warm duration should be larger than zero.");
    }

    // Setup simulator
    let platform = Platform::with_config(cli.platform_config()?);
    let fission = Fission::with_function_config(platform, cli.function_config())
        .create_undefined_functions(!cli.no_auto_create);
    fission.start()?;
    fission.platform().define(DEFAULT_FUNCTION, cli.function_config());

    // Publish simulated resource usage
    let metrics = Arc::new(ServerMetrics::default());
    let sampler = spawn_usage_sampler(
        fission.platform().clone(),
        metrics.clone(),
        Duration::from_secs(1),
    );

    let app = create_app(AppState::new(fission.clone(), metrics));

    info!("Serving at {}", cli.addr);
    let listener = tokio::net::TcpListener::bind(cli.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sampler.abort();
    fission.close().await?;
    info!("Simulator stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
