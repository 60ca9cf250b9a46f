use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use banter_api::auth::{self, AppState, AppStateInner};
use banter_api::middleware::require_auth;
use banter_api::{conversations, files, messages, presence, reactions, requests, users};

/// Link-preview fetches give up after this long.
const PREVIEW_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banter=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("BANTER_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("BANTER_DB_PATH").unwrap_or_else(|_| "banter.db".into());
    let upload_dir = std::env::var("BANTER_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into());
    let host = std::env::var("BANTER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("BANTER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = banter_db::Database::open(&PathBuf::from(&db_path))?;

    // Outbound client for link previews; carries the hard fetch timeout.
    let http = reqwest::Client::builder()
        .timeout(PREVIEW_FETCH_TIMEOUT)
        .build()?;

    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        upload_dir: PathBuf::from(upload_dir),
        http,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/offline", post(auth::set_offline))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/auth/sync", post(auth::sync_user))
        .route("/users", get(users::search_users))
        .route("/users/me", get(users::get_me))
        .route("/users/me", patch(users::update_profile))
        .route("/conversations", get(conversations::get_conversations))
        .route("/conversations/direct", post(conversations::create_or_get_direct))
        .route("/conversations/group", post(conversations::create_group))
        .route("/conversations/join", post(conversations::join_by_invite_code))
        .route("/conversations/{conversation_id}", get(conversations::get_group_details))
        .route("/conversations/{conversation_id}", patch(conversations::update_group))
        .route("/conversations/{conversation_id}/members", post(conversations::add_member))
        .route("/conversations/{conversation_id}/leave", post(conversations::leave_group))
        .route("/conversations/{conversation_id}/invite-code", post(conversations::generate_invite_code))
        .route("/conversations/{conversation_id}/read", post(conversations::mark_as_read))
        .route("/conversations/{conversation_id}/read-status", get(conversations::read_status))
        .route("/conversations/{conversation_id}/messages", get(messages::list_messages))
        .route("/conversations/{conversation_id}/messages", post(messages::send_message))
        .route("/conversations/{conversation_id}/presence", get(presence::get_presence))
        .route("/messages/{message_id}", delete(messages::delete_message))
        .route("/messages/{message_id}/reactions", post(reactions::toggle_reaction))
        .route("/reactions", get(reactions::get_reactions))
        .route("/presence", post(presence::update_presence))
        .route("/requests", post(requests::send_request))
        .route("/requests/pending", get(requests::get_pending_incoming))
        .route("/requests/pending/count", get(requests::get_pending_count))
        .route("/requests/status/{other_user_id}", get(requests::get_request_status))
        .route("/requests/{request_id}/accept", post(requests::accept_request))
        .route("/requests/{request_id}/decline", post(requests::decline_request))
        .route("/files", post(files::request_upload_target))
        .route("/files/{file_id}", put(files::upload_file))
        .route("/files/{file_id}", get(files::download_file))
        .route("/files/{file_id}/url", get(files::resolve_file_url))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Banter server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
