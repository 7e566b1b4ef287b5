//! Async driver for the blocking pump loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};

use appmgr_core::ConfigStore;

use crate::bus::BusTransport;
use crate::client::AppClient;
use crate::error::ClientError;

/// How long one pump iteration waits for traffic before checking for shutdown.
pub const PUMP_INTERVAL: Duration = Duration::from_millis(200);

/// Install the global fmt subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Fire `shutdown` on ctrl-c, or finish quietly once someone else fires it.
pub fn spawn_ctrl_c(shutdown: broadcast::Sender<()>) -> JoinHandle<()> {
    let mut shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_rx.recv() => {}
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => {
                    tracing::info!("received ctrl-c, shutting down");
                    let _ = shutdown.send(());
                }
                Err(err) => tracing::warn!(error = %err, "ctrl-c handler failed"),
            },
        }
    })
}

/// Pump `client` on a blocking task until `shutdown_rx` fires or the pump
/// fails. Handlers run on that task. The client is handed back afterwards.
pub async fn run_until_shutdown<T, S>(
    client: AppClient<T, S>,
    mut shutdown_rx: broadcast::Receiver<()>,
    poll: Duration,
) -> Result<AppClient<T, S>, ClientError>
where
    T: BusTransport + Send + 'static,
    S: ConfigStore + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    let mut pump = tokio::task::spawn_blocking(move || {
        let mut client = client;
        while !flag.load(Ordering::SeqCst) {
            client.pump(poll)?;
        }
        Ok::<_, ClientError>(client)
    });

    tokio::select! {
        joined = &mut pump => return join_result(joined),
        _ = shutdown_rx.recv() => {
            tracing::info!("shutdown requested, stopping signal pump");
        }
    }
    stop.store(true, Ordering::SeqCst);
    join_result(pump.await)
}

fn join_result<C>(joined: Result<Result<C, ClientError>, JoinError>) -> Result<C, ClientError> {
    joined.map_err(|err| ClientError::Runtime(format!("signal pump join failure: {err}")))?
}
