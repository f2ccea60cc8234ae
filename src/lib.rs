mod cli;
pub mod config;
pub mod content;
pub mod db;
pub mod errors;
pub mod history;
pub mod preferences;
pub mod repository;
pub mod services;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use config::{AppConfig, CredentialProvider, EnvCredentials};
use content::{ContentProvider, ContentSourceChain, CuratedProvider, RemoteProvider};
use db::{Database, SentenceRecord, SentenceStore};
use errors::RepositoryError;
use history::HistoryNavigator;
use preferences::Preferences;
use repository::{Clock, SentenceRepository, SystemClock};
use services::{NoopAudio, Pronouncer};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

/// Everything a front end needs, wired from one [`AppConfig`].
pub struct App {
    config: AppConfig,
    repository: SentenceRepository,
    preferences: Preferences,
    pronouncer: Pronouncer,
}

impl App {
    /// Opens the on-disk store and builds the remote-then-curated chain.
    pub fn open(config: AppConfig) -> Result<Self> {
        let db = Database::new(config.db_path())?;
        let credentials: Arc<dyn CredentialProvider> = Arc::new(EnvCredentials);
        let providers: Vec<Arc<dyn ContentProvider>> = vec![
            Arc::new(RemoteProvider::new(config.remote.clone(), credentials)?),
            Arc::new(CuratedProvider::new()),
        ];
        let preferences = Preferences::new(config.preferences_path())?;

        Ok(Self::with_parts(
            config,
            Arc::new(db),
            ContentSourceChain::new(providers),
            Arc::new(SystemClock),
            preferences,
        ))
    }

    pub fn with_parts(
        config: AppConfig,
        store: Arc<dyn SentenceStore>,
        chain: ContentSourceChain,
        clock: Arc<dyn Clock>,
        preferences: Preferences,
    ) -> Self {
        let repository =
            SentenceRepository::new(store, chain, clock, config.pack_size, config.retention);
        Self {
            config,
            repository,
            preferences,
            pronouncer: Pronouncer::new(Arc::new(NoopAudio), Arc::new(NoopAudio)),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn repository(&self) -> &SentenceRepository {
        &self.repository
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn pronouncer(&self) -> &Pronouncer {
        &self.pronouncer
    }

    /// Runs a refresh bounded by `refresh_timeout`.
    ///
    /// On timeout the in-flight generation is cancelled and `TimedOut` comes
    /// back. A batch write already handed to the store may still land after
    /// that; it is additive, so the store stays consistent.
    pub async fn refresh(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<SentenceRecord>, RepositoryError> {
        let Some(limit) = self.config.refresh_timeout else {
            return self.repository.refresh(cancel).await;
        };

        let child = cancel.child_token();
        match tokio::time::timeout(limit, self.repository.refresh(&child)).await {
            Ok(result) => result,
            Err(_) => {
                child.cancel();
                log_warn!("refresh gave up after {limit:?}");
                Err(RepositoryError::TimedOut(limit))
            }
        }
    }

    /// Navigator preloaded with the configured history window.
    pub async fn navigator(&self, seed: Option<u64>) -> Result<HistoryNavigator, RepositoryError> {
        let mut navigator = match seed {
            Some(seed) => HistoryNavigator::with_seed(seed),
            None => HistoryNavigator::new(),
        };
        let loaded = navigator
            .load_from(
                self.repository.store().as_ref(),
                self.repository.today(),
                self.config.history_window_days,
            )
            .await?;
        log_info!("history navigator loaded {loaded} sentences");
        Ok(navigator)
    }

    /// Remembers that `record` was shown. Failures only cost the history hint.
    pub fn mark_viewed(&self, record: &SentenceRecord) {
        if let Err(err) = self.preferences.record_viewed(&record.id) {
            log_warn!("could not record viewed sentence {}: {err:#}", record.id);
        }
    }
}

/// Entry point for the `hanzi-daily` binary.
pub fn run() -> Result<()> {
    utils::logging::init(log::LevelFilter::Info);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    runtime.block_on(cli::dispatch())
}
