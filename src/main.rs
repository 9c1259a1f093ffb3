use zonekeeper::settings::Settings;
use zonekeeper::{dns, Storage};

use config::ConfigError;
use env_logger::Env;
use futures::future::{self, FutureExt};

use std::future::Future;
use std::io;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let settings = Settings::load()?;
    log::debug!("Settings loaded:\n{:?}", settings);

    let storage = Storage::new(settings.records);
    log::info!("Serving {} record(s)", storage.len());

    let dns_server = dns::Server {
        lookup: Arc::new(storage),
        listen_addr: settings.dns_address,
        listen_port: settings.dns_port,
        authoritative: settings.authoritative,
    };

    let terminate = match sigterm() {
        Ok(terminate) => terminate.left_future(),
        Err(err) => {
            log::warn!("Not listening for SIGTERM: {}", err);
            future::pending().right_future()
        }
    };

    tokio::select! {
        result = dns_server.run() => {
            if let Err(err) = result {
                log::error!("DNS server stopped: {}", err);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("SIGINT received, shutting down");
        }
        _ = terminate => {
            log::info!("SIGTERM received, shutting down");
        }
    }

    Ok(())
}

/// Resolves once the process is asked to terminate. The handler is in
/// place as soon as this returns.
#[cfg(unix)]
fn sigterm() -> io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    Ok(async move {
        terminate.recv().await;
    })
}

#[cfg(not(unix))]
fn sigterm() -> io::Result<impl Future<Output = ()>> {
    Ok(future::pending())
}
