use mimalloc::MiMalloc;
use modules::{
    account::supervisor::{AccountSupervisor, SupervisorOutcome},
    classifier::spamc::SpamcClassifier,
    common::{parallel::PassLimiter, rustls::SpamWardenTls, signal::SignalManager, Initialize},
    error::SpamWardenResult,
    imap::connection::ImapConnector,
    logger,
    settings::{cli::SETTINGS, config::Config},
};
use std::sync::Arc;
use tracing::{error, info, warn};

mod modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> SpamWardenResult<()> {
    logger::initialize_logging()?;
    info!("Starting spamwarden");
    info!("Version:  {}", spamwarden_version!());

    let config = match initialize().await {
        Ok(config) => config,
        Err(error) => {
            error!("Startup failed: {}", error);
            eprintln!("{:?}", error);
            return Err(error);
        }
    };

    if SETTINGS.spamwarden_check_config {
        info!(
            "Configuration '{}' is valid: {} account(s), poll interval {:?}",
            SETTINGS.spamwarden_config.display(),
            config.accounts.len(),
            config.poll_interval
        );
        return Ok(());
    }

    run_supervisors(config).await
}

/// Installs process-wide state and loads the account list.
async fn initialize() -> SpamWardenResult<Arc<Config>> {
    SpamWardenTls::initialize().await?;
    let config = Config::load(&SETTINGS.spamwarden_config)?;
    Ok(Arc::new(config))
}

async fn run_supervisors(config: Arc<Config>) -> SpamWardenResult<()> {
    let signals = Arc::new(SignalManager::new());
    tokio::spawn({
        let signals = signals.clone();
        async move { signals.listen().await }
    });

    let classifier = Arc::new(SpamcClassifier::new(&config.classifier)?);
    let limiter = PassLimiter::new(config.workers);
    info!(
        "Watching {} account(s) every {:?} (workers: {})",
        config.accounts.len(),
        config.poll_interval,
        match config.workers {
            0 => "unbounded".to_string(),
            n => n.to_string(),
        }
    );

    let handles: Vec<_> = config
        .accounts
        .iter()
        .map(|account| {
            let supervisor = AccountSupervisor::new(
                account.clone(),
                config.poll_interval,
                ImapConnector,
                classifier.clone(),
                limiter.clone(),
                signals.subscribe(),
            );
            (account.name.clone(), tokio::spawn(supervisor.run()))
        })
        .collect();

    let results = futures::future::join_all(
        handles
            .into_iter()
            .map(|(name, handle)| async move { (name, handle.await) }),
    )
    .await;

    for (name, result) in results {
        match result {
            Ok(SupervisorOutcome::Cancelled) => info!("Account '{}' shut down", name),
            Ok(SupervisorOutcome::Fatal(e)) => warn!("Account '{}' gave up: {}", name, e),
            Err(e) => error!("Account '{}' task aborted: {}", name, e),
        }
    }
    info!("All account supervisors have stopped");
    Ok(())
}
