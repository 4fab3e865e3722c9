use crediport_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    crediport_api::telemetry::init_telemetry();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (store, capabilities, routes)
    let (_state, router) = crediport_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    crediport_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
