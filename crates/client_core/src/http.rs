//! JSON-over-HTTP catalog and auth collaborators.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use shared::{
    domain::{CatalogItem, Credentials, LoginStatus},
    error::ApiError,
    protocol::{AuthCheckRequest, AuthCheckResponse, CatalogPageQuery, SessionRequest},
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{settings::Settings, AuthSource, CatalogSource};

fn build_client(settings: &Settings) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = settings.request_timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build().context("failed to build http client")
}

/// Turn a non-2xx response into an error, preferring the service's
/// `ApiError` body over the bare status line.
async fn ensure_success(res: Response, what: &str) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => Err(anyhow!(api_error).context(format!("{what} returned {status}"))),
        Err(_) => Err(anyhow!("{what} returned {status}")),
    }
}

pub struct HttpCatalogSource {
    http: Client,
    server_url: String,
    page_size: u32,
}

impl HttpCatalogSource {
    pub fn new(server_url: impl Into<String>, page_size: u32) -> Self {
        Self::with_client(Client::new(), server_url, page_size)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::with_client(
            build_client(settings)?,
            settings.server_url.clone(),
            settings.page_size,
        ))
    }

    fn with_client(http: Client, server_url: impl Into<String>, page_size: u32) -> Self {
        Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            page_size,
        }
    }

    async fn get_page(&self, query: CatalogPageQuery) -> Result<Vec<CatalogItem>> {
        debug!(start = ?query.start, limit = query.limit, "http: GET /catalog");
        let res = self
            .http
            .get(format!("{}/catalog", self.server_url))
            .query(&query)
            .send()
            .await?;
        let items = ensure_success(res, "catalog service")
            .await?
            .json()
            .await
            .context("malformed catalog page")?;
        Ok(items)
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_initial_page(&self) -> Result<Vec<CatalogItem>> {
        self.get_page(CatalogPageQuery {
            start: None,
            limit: self.page_size,
        })
        .await
    }

    async fn fetch_page(&self, start_key: &str) -> Result<Vec<CatalogItem>> {
        self.get_page(CatalogPageQuery {
            start: Some(start_key.to_string()),
            limit: self.page_size,
        })
        .await
    }

    async fn fetch_by_template(&self, template: &CatalogItem) -> Result<Vec<CatalogItem>> {
        debug!("http: POST /catalog/search");
        let res = self
            .http
            .post(format!("{}/catalog/search", self.server_url))
            .json(template)
            .send()
            .await?;
        let items = ensure_success(res, "catalog search")
            .await?
            .json()
            .await
            .context("malformed catalog search result")?;
        Ok(items)
    }
}

pub struct HttpAuthSource {
    http: Client,
    server_url: String,
    verified_user: Mutex<Option<String>>,
}

impl HttpAuthSource {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::with_client(
            build_client(settings)?,
            settings.server_url.clone(),
        ))
    }

    fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
            verified_user: Mutex::new(None),
        }
    }

    async fn session_user(&self) -> Result<String> {
        self.verified_user
            .lock()
            .await
            .clone()
            .ok_or_else(|| anyhow!("no verified user for this auth session"))
    }
}

#[async_trait]
impl AuthSource for HttpAuthSource {
    async fn check_credentials(&self, credentials: &Credentials) -> Result<bool> {
        let res = self
            .http
            .post(format!("{}/auth/check", self.server_url))
            .json(&AuthCheckRequest {
                user: &credentials.user,
                secret: credentials.secret(),
            })
            .send()
            .await?;

        let accepted = if res.status() == StatusCode::UNAUTHORIZED {
            false
        } else {
            let body: AuthCheckResponse = ensure_success(res, "auth service")
                .await?
                .json()
                .await
                .context("malformed auth check response")?;
            body.ok
        };

        *self.verified_user.lock().await = accepted.then(|| credentials.user.clone());
        Ok(accepted)
    }

    async fn complete_login(&self) -> Result<()> {
        let user = self.session_user().await?;
        let res = self
            .http
            .post(format!("{}/auth/session", self.server_url))
            .json(&SessionRequest { user })
            .send()
            .await?;
        ensure_success(res, "auth session").await?;
        Ok(())
    }

    async fn current_login_status(&self) -> Result<LoginStatus> {
        let user = self.session_user().await?;
        let res = self
            .http
            .get(format!("{}/auth/session", self.server_url))
            .query(&SessionRequest { user })
            .send()
            .await?;
        let status = ensure_success(res, "auth session")
            .await?
            .json()
            .await
            .context("malformed login status")?;
        Ok(status)
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
