use tokio::signal;
use tracing::error;

/// Resolves on Ctrl-C or, on unix, SIGTERM. A handler that cannot be installed never
/// fires instead of aborting the process.
pub(crate) async fn shutdown_signal() {
    let ctrl_c_signal = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Error installing Ctrl+C signal handler: {:#?}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate_signal = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                error!("Error installing terminate signal handler: {:#?}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate_signal = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c_signal => {},
        _ = terminate_signal => {},
    };
}
