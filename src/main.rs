use calverse::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export DASHBOARD_GEM_1=... (and ANALYZER_, FOOD_, TOOLS_ variants)");
        std::process::exit(1);
    });

    eprintln!("🍲 Calverse relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Upstream: {}", config.api_base);
    eprintln!(
        "   Models: {} (text), {} (vision)",
        config.models.text, config.models.vision
    );
    eprintln!(
        "   Client config: {}",
        if config.client.is_some() {
            "ready"
        } else {
            "missing (endpoint will return 500)"
        }
    );
    eprintln!(
        "   Relay: http://0.0.0.0:{}{}\n",
        config.port,
        calverse::server::RELAY_PATH
    );

    calverse::server::serve(config).await?;

    Ok(())
}
