use thiserror::Error;
use tradehall_engine::MarketplaceError;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Could not initialize the daemon. {0}")]
    InitializeError(String),
    #[error("Invalid daemon configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the daemon. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Marketplace backend error. {0}")]
    BackendError(#[from] MarketplaceError),
}
