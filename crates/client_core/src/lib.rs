use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::{CatalogItem, Credentials, LoginStatus};

mod catalog;
pub mod error;
pub mod http;
mod login;
pub mod memory;
pub mod observable;
pub mod settings;

pub use catalog::{CatalogController, FetchOutcome, NextPage};
pub use error::{CatalogError, LoginError};
pub use login::{
    LoginCoordinator, LoginOutcome, LoginState, LoginView, FILL_ALL_FIELDS, LOGIN_FAILED,
    LOGIN_SUCCESSFUL,
};
pub use observable::{Observable, Subscription};

/// Remote provider of catalog pages and template queries.
///
/// A failed call must leave nothing behind: the controller keeps its
/// current listing when an error is returned.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_initial_page(&self) -> Result<Vec<CatalogItem>>;
    /// The page starting at `start_key`, i.e. items whose lot is at least
    /// `start_key`, in lot order.
    async fn fetch_page(&self, start_key: &str) -> Result<Vec<CatalogItem>>;
    async fn fetch_by_template(&self, template: &CatalogItem) -> Result<Vec<CatalogItem>>;
}

pub struct MissingCatalogSource;

#[async_trait]
impl CatalogSource for MissingCatalogSource {
    async fn fetch_initial_page(&self) -> Result<Vec<CatalogItem>> {
        Err(anyhow!("catalog source is unavailable"))
    }

    async fn fetch_page(&self, start_key: &str) -> Result<Vec<CatalogItem>> {
        Err(anyhow!(
            "catalog source is unavailable (page starting at {start_key})"
        ))
    }

    async fn fetch_by_template(&self, _template: &CatalogItem) -> Result<Vec<CatalogItem>> {
        Err(anyhow!("catalog source is unavailable"))
    }
}

/// Remote credential check and session bookkeeping.
#[async_trait]
pub trait AuthSource: Send + Sync {
    /// `Ok(false)` means the service rejected the credentials; `Err` means it
    /// could not be asked.
    async fn check_credentials(&self, credentials: &Credentials) -> Result<bool>;
    async fn complete_login(&self) -> Result<()>;
    async fn current_login_status(&self) -> Result<LoginStatus>;
}

pub struct MissingAuthSource;

#[async_trait]
impl AuthSource for MissingAuthSource {
    async fn check_credentials(&self, _credentials: &Credentials) -> Result<bool> {
        Err(anyhow!("auth source is unavailable"))
    }

    async fn complete_login(&self) -> Result<()> {
        Err(anyhow!("auth source is unavailable"))
    }

    async fn current_login_status(&self) -> Result<LoginStatus> {
        Err(anyhow!("auth source is unavailable"))
    }
}
