use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{LogMailer, Mailer, TokenService};

/// Everything a request handler needs: the storage handle, the token
/// signer, and the mail collaborator. Built once at startup and passed
/// explicitly; no process-wide singletons.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub tokens: Arc<TokenService>,

    pub mailer: Arc<dyn Mailer>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_mailer(config, Arc::new(LogMailer)).await
    }

    /// Build the state with a caller-supplied mail transport.
    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = Arc::new(TokenService::new(
            &config.auth.jwt_secret,
            config.auth.jwt_expires_in_days,
        ));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            tokens,
            mailer,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
