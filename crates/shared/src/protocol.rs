use serde::{Deserialize, Serialize};

/// Query string of `GET /catalog`. Without `start` the first page is served.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogPageQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct AuthCheckRequest<'a> {
    pub user: &'a str,
    pub secret: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthCheckResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRequest {
    pub user: String,
}
