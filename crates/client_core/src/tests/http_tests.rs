use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::Lot,
    error::{ApiError, ErrorCode},
};
use tokio::net::TcpListener;

use super::*;
use crate::{CatalogController, FetchOutcome, NextPage};

#[derive(Clone, Default)]
struct ServerState {
    page_queries: Arc<Mutex<Vec<CatalogPageQuery>>>,
    sessions: Arc<Mutex<Vec<String>>>,
}

type ApiResult<T> = std::result::Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn catalog() -> Vec<CatalogItem> {
    (0..5)
        .map(|lot| {
            CatalogItem::new(
                shared::domain::Lot(lot),
                format!("Book {lot}"),
                if lot % 2 == 0 { "Even Author" } else { "Odd Author" },
                "Fiction",
                "",
            )
        })
        .collect()
}

async fn handle_catalog_page(
    State(state): State<ServerState>,
    Query(query): Query<CatalogPageQuery>,
) -> ApiResult<Vec<CatalogItem>> {
    state.page_queries.lock().await.push(query.clone());
    let start: i64 = match query.start.as_deref() {
        None => 0,
        Some("13") => {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiError::new(ErrorCode::Internal, "index rebuilding")),
            ))
        }
        Some(raw) => raw.parse().map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new(ErrorCode::Validation, "bad start key")),
            )
        })?,
    };
    Ok(Json(
        catalog()
            .into_iter()
            .filter(|item| item.lot.is_some_and(|lot| lot.0 >= start))
            .take(query.limit as usize)
            .collect(),
    ))
}

async fn handle_catalog_search(Json(template): Json<CatalogItem>) -> Json<Vec<CatalogItem>> {
    Json(
        catalog()
            .into_iter()
            .filter(|item| item.matches(&template))
            .collect(),
    )
}

async fn handle_auth_check(Json(body): Json<serde_json::Value>) -> ApiResult<AuthCheckResponse> {
    match (body["user"].as_str(), body["secret"].as_str()) {
        (Some("mallory"), _) => Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiError::new(ErrorCode::Unauthorized, "account locked")),
        )),
        (Some("alice"), Some("hunter2")) => Ok(Json(AuthCheckResponse { ok: true })),
        _ => Ok(Json(AuthCheckResponse { ok: false })),
    }
}

async fn handle_session_start(
    State(state): State<ServerState>,
    Json(body): Json<SessionRequest>,
) -> StatusCode {
    state.sessions.lock().await.push(body.user);
    StatusCode::NO_CONTENT
}

async fn handle_session_status(
    State(state): State<ServerState>,
    Query(query): Query<SessionRequest>,
) -> Json<LoginStatus> {
    let logged_in = state.sessions.lock().await.contains(&query.user);
    Json(LoginStatus {
        logged_in,
        user: logged_in.then_some(query.user),
    })
}

async fn spawn_catalog_server() -> Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/catalog", get(handle_catalog_page))
        .route("/catalog/search", post(handle_catalog_search))
        .route("/auth/check", post(handle_auth_check))
        .route(
            "/auth/session",
            post(handle_session_start).get(handle_session_status),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

#[tokio::test]
async fn pages_are_requested_with_start_key_and_limit() {
    let (server_url, state) = spawn_catalog_server().await.expect("spawn server");
    let source = HttpCatalogSource::new(format!("{server_url}/"), 2);

    let first = source.fetch_initial_page().await.expect("initial page");
    let next = source.fetch_page("2").await.expect("page at 2");

    assert_eq!(first.len(), 2);
    assert_eq!(next.first().and_then(|item| item.lot), Some(Lot(2)));
    assert_eq!(
        *state.page_queries.lock().await,
        vec![
            CatalogPageQuery {
                start: None,
                limit: 2,
            },
            CatalogPageQuery {
                start: Some("2".into()),
                limit: 2,
            },
        ]
    );
}

#[tokio::test]
async fn template_search_posts_the_filter() {
    let (server_url, _state) = spawn_catalog_server().await.expect("spawn server");
    let source = HttpCatalogSource::new(server_url, 2);

    let odd = source
        .fetch_by_template(&CatalogItem::template().with_author("odd"))
        .await
        .expect("search");

    assert_eq!(
        odd.iter().filter_map(|item| item.lot).collect::<Vec<_>>(),
        vec![Lot(1), Lot(3)]
    );
}

#[tokio::test]
async fn service_error_body_is_surfaced() {
    let (server_url, _state) = spawn_catalog_server().await.expect("spawn server");
    let source = HttpCatalogSource::new(server_url, 2);

    let err = source.fetch_page("13").await.expect_err("unavailable");
    let rendered = format!("{err:#}");
    assert!(rendered.contains("503"), "{rendered}");
    assert!(rendered.contains("index rebuilding"), "{rendered}");
}

#[tokio::test]
async fn controller_pages_over_http() {
    let (server_url, _state) = spawn_catalog_server().await.expect("spawn server");
    let settings = Settings {
        server_url,
        page_size: 3,
        request_timeout_secs: Some(5),
    };
    let controller = CatalogController::with_source(Arc::new(
        HttpCatalogSource::from_settings(&settings).expect("source"),
    ));

    controller.load_initial_page().await.expect("initial");
    let next = controller.load_next_page().await.expect("next");

    assert_eq!(
        next,
        NextPage::Requested {
            page: Lot(3),
            outcome: FetchOutcome::Applied { count: 2 },
        }
    );
    assert_eq!(controller.items().get().len(), 5);
}

#[tokio::test]
async fn auth_round_trip_reports_login_status() {
    let (server_url, state) = spawn_catalog_server().await.expect("spawn server");
    let auth = HttpAuthSource::new(server_url);

    assert!(auth
        .check_credentials(&Credentials::new("alice", "hunter2"))
        .await
        .expect("check"));
    auth.complete_login().await.expect("session");
    let status = auth.current_login_status().await.expect("status");

    assert_eq!(*state.sessions.lock().await, vec!["alice".to_string()]);
    assert_eq!(
        status,
        LoginStatus {
            logged_in: true,
            user: Some("alice".into()),
        }
    );
}

#[tokio::test]
async fn wrong_or_unauthorized_credentials_are_rejected() {
    let (server_url, _state) = spawn_catalog_server().await.expect("spawn server");
    let auth = HttpAuthSource::new(server_url);

    assert!(!auth
        .check_credentials(&Credentials::new("alice", "wrong"))
        .await
        .expect("check"));
    assert!(!auth
        .check_credentials(&Credentials::new("mallory", "anything"))
        .await
        .expect("check"));
    assert!(auth.complete_login().await.is_err());
}
