use std::{env, process::exit, sync::Arc};

use clap::Parser;
use encore::config::{Cli, Config};
use encore::hub::Hub;
use encore::storage::{seed_library, Repositories};
use encore::{housekeeping, server};
use tokio::net::TcpListener;
use tokio::time::Duration;
use tracing::{event, Level};
use tracing_subscriber::{
    fmt::layer, layer::SubscriberExt, registry, util::SubscriberInitExt, EnvFilter,
};

/// The program's entry point.
fn main() {
    registry()
        .with(layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(v) => v,
        Err(e) => {
            event!(Level::ERROR, error = %e, "cannot load the configuration");
            exit(1);
        }
    };

    let disable_multi_threading = env::var("DISABLE_MULTI_THREADING").is_ok_and(|v| v == "true");

    let mut tokio_runtime_builder = if disable_multi_threading {
        event!(Level::INFO, "multi-threading is disabled");
        tokio::runtime::Builder::new_current_thread()
    } else {
        event!(Level::INFO, "multi-threading is enabled");
        tokio::runtime::Builder::new_multi_thread()
    };

    let tokio_runtime = match tokio_runtime_builder.enable_all().build() {
        Ok(v) => v,
        Err(e) => {
            event!(Level::ERROR, error = ?e, "cannot create the Tokio runtime");
            exit(1);
        }
    };

    tokio_runtime.block_on(encore(config));
}

/// Encore's entry point.
async fn encore(config: Config) {
    let repos = Repositories::in_memory();

    if let Some(library) = &config.library {
        match seed_library(&repos, library).await {
            Ok(count) => {
                event!(Level::INFO, count, path = %library.display(), "library seeded");
            }
            Err(e) => {
                event!(Level::ERROR, error = %e, "cannot seed the library");
                exit(1);
            }
        }
    }

    let hub: Arc<Hub> = Hub::new(repos.clone(), config.engine_settings());

    housekeeping::spawn(
        repos,
        hub.clone(),
        config.housekeeping_days,
        Duration::from_secs(config.housekeeping_interval_secs),
    );

    let addr = config.listen_addr();

    let listener = match TcpListener::bind(&addr).await {
        Ok(v) => v,
        Err(e) => {
            event!(Level::ERROR, error = %e, addr = %addr, "cannot bind the listener");
            exit(1);
        }
    };

    event!(Level::INFO, addr = %addr, "listening for room connections");

    server::serve(listener, hub).await;
}
