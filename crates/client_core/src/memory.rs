//! In-process collaborators for offline use and fixtures.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use shared::domain::{CatalogItem, Credentials, Lot, LoginStatus};
use tokio::sync::Mutex;

use crate::{AuthSource, CatalogSource};

/// Catalog held in memory, ordered by lot and served in fixed-size pages.
pub struct InMemoryCatalogSource {
    items: Vec<CatalogItem>,
    page_size: usize,
}

impl InMemoryCatalogSource {
    pub fn new(mut items: Vec<CatalogItem>, page_size: usize) -> Self {
        items.sort_by_key(|item| item.lot);
        Self {
            items,
            page_size: page_size.max(1),
        }
    }

    /// Load a JSON array of catalog items.
    pub fn from_json_file(path: &Path, page_size: usize) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog fixture '{}'", path.display()))?;
        let items: Vec<CatalogItem> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid catalog fixture '{}'", path.display()))?;
        Ok(Self::new(items, page_size))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalogSource {
    async fn fetch_initial_page(&self) -> Result<Vec<CatalogItem>> {
        Ok(self.items.iter().take(self.page_size).cloned().collect())
    }

    async fn fetch_page(&self, start_key: &str) -> Result<Vec<CatalogItem>> {
        let start: Lot = start_key.parse()?;
        Ok(self
            .items
            .iter()
            .filter(|item| item.lot.is_some_and(|lot| lot >= start))
            .take(self.page_size)
            .cloned()
            .collect())
    }

    async fn fetch_by_template(&self, template: &CatalogItem) -> Result<Vec<CatalogItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| item.matches(template))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct SessionState {
    checked_user: Option<String>,
    logged_in_user: Option<String>,
}

/// Auth source backed by a fixed user table.
pub struct StaticAuthSource {
    users: HashMap<String, String>,
    session: Mutex<SessionState>,
}

impl StaticAuthSource {
    pub fn new<I, U, S>(users: I) -> Self
    where
        I: IntoIterator<Item = (U, S)>,
        U: Into<String>,
        S: Into<String>,
    {
        Self {
            users: users
                .into_iter()
                .map(|(user, secret)| (user.into(), secret.into()))
                .collect(),
            session: Mutex::new(SessionState::default()),
        }
    }
}

#[async_trait]
impl AuthSource for StaticAuthSource {
    async fn check_credentials(&self, credentials: &Credentials) -> Result<bool> {
        let accepted = self
            .users
            .get(&credentials.user)
            .is_some_and(|secret| secret == credentials.secret());
        let mut session = self.session.lock().await;
        session.checked_user = accepted.then(|| credentials.user.clone());
        Ok(accepted)
    }

    async fn complete_login(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        let user = session
            .checked_user
            .take()
            .ok_or_else(|| anyhow!("no verified credentials to complete login with"))?;
        session.logged_in_user = Some(user);
        Ok(())
    }

    async fn current_login_status(&self) -> Result<LoginStatus> {
        let session = self.session.lock().await;
        Ok(LoginStatus {
            logged_in: session.logged_in_user.is_some(),
            user: session.logged_in_user.clone(),
        })
    }
}

#[cfg(test)]
#[path = "tests/memory_tests.rs"]
mod tests;
