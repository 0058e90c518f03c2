use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use rvoip_ussd_core::{Engine, MemoryStore};
use rvoip_ussd_gateway::{
    demo, log_startup, setup_logging, FormAdapter, GatewayBuilder, GatewayConfig, GatewayServer, JsonAdapter,
    LoggingConfig,
};

#[derive(Parser, Debug)]
#[command(name = "ussd-gateway")]
#[command(about = "Serve the demo airtime USSD menu to network aggregators")]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the configured bind_address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_address = bind;
        config.validate()?;
    }

    setup_logging(&LoggingConfig::from_gateway(&config)?)?;
    let addr = config.socket_addr()?;
    log_startup(&config, addr);

    let store = Arc::new(MemoryStore::new(config.store_config()));
    let screens = demo::airtime_menu(config.hmac_secret.as_deref());
    let engine = Arc::new(Engine::new(screens.build(), store.clone(), config.engine_config()));
    info!(routes = engine.routes().len(), "Screens registered");

    let shutdown = CancellationToken::new();
    let app = GatewayBuilder::new(engine)
        .with_cancellation(shutdown.clone())
        .form("/ussd", FormAdapter::generic())
        .form("/ussd/africastalking", FormAdapter::africastalking())
        .form("/ussd/infobip", FormAdapter::infobip())
        .json("/ussd/vodacom", JsonAdapter::vodacom())
        .build();

    GatewayServer::new(addr, app)
        .with_store(store)
        .with_shutdown(shutdown)
        .run()
        .await?;
    Ok(())
}
