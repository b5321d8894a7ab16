use std::net::SocketAddr;

use axum::{
    Json,
    body::Bytes,
    extract::{ConnectInfo, Path, Request, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, warn};

use mediaviewer_db::models::ShortcutRow;
use mediaviewer_db::shortcut_id::is_valid_shortcut;
use mediaviewer_types::api::{CreateShortcutRequest, CreateShortcutResponse};
use mediaviewer_types::metadata::{AuthBundleView, DecodedAuthBundle, HomeserverTarget};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DERIVED_KEY_PREFIX: &str = "X-Derived-Key ";

/// Address to blame in log lines.
fn client_ip(headers: &HeaderMap, addr: SocketAddr, trust_forward_headers: bool) -> String {
    if trust_forward_headers {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            return ip.to_string();
        }
    }
    addr.to_string()
}

/// POST /create: validate a media reference or auth bundle, resolve its
/// homeserver, store it under a fresh shortcut and return `{ file_id }`.
pub async fn create_shortcut(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<CreateShortcutResponse>> {
    let ip = client_ip(&headers, addr, state.trust_forward_headers);

    let req: CreateShortcutRequest =
        serde_json::from_slice(&body).map_err(ApiError::InvalidJson)?;
    let mut shortcut = req.decode()?;

    let homeserver_url = state.resolver.resolve(&shortcut).await.map_err(|e| {
        warn!(
            "Failed to resolve homeserver address of {} requested by {}: {}",
            shortcut.homeserver_domain().unwrap_or("<none>"),
            ip,
            e
        );
        ApiError::Resolution(e)
    })?;
    shortcut.set_homeserver_url(homeserver_url);
    let bundle = shortcut.into_auth_bundle()?;

    let file_id = state.minter.mint();
    let row = ShortcutRow {
        shortcut: file_id.clone(),
        homeserver: bundle.homeserver_url,
        auth_token: bundle.auth_token,
        ciphertext: bundle.ciphertext,
    };

    // Run blocking DB insert off the async runtime
    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.insert_shortcut(&row))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Storage("Failed to create file shortcut")
        })?
        .map_err(|e| {
            error!("Failed to create shortcut requested by {}: {}", ip, e);
            ApiError::Storage("Failed to create file shortcut")
        })?;

    Ok(Json(CreateShortcutResponse { file_id }))
}

/// GET /{file_id}/metadata.json: the public view of a stored bundle.
/// The caller must present the bundle's token as `X-Derived-Key <token>`.
pub async fn get_shortcut_metadata(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> ApiResult<Json<AuthBundleView>> {
    if !is_valid_shortcut(&file_id) {
        return Err(ApiError::NotFound);
    }
    let ip = client_ip(&headers, addr, state.trust_forward_headers);

    let db = state.clone();
    let fid = file_id.clone();
    let row = tokio::task::spawn_blocking(move || db.db.find_shortcut(&fid))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Storage("Failed to get file details")
        })?
        .map_err(|e| {
            error!(
                "Failed to get details of shortcut {} requested by {}: {}",
                file_id, ip, e
            );
            ApiError::Storage("Failed to get file details")
        })?
        .ok_or(ApiError::NotFound)?;

    let bundle = DecodedAuthBundle {
        homeserver: None,
        homeserver_url: row.homeserver,
        auth_token: row.auth_token,
        ciphertext: row.ciphertext,
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let presented = presented.strip_prefix(DERIVED_KEY_PREFIX).unwrap_or(presented);
    if presented != bundle.encoded_auth_token() {
        return Err(ApiError::Unauthorized);
    }

    Ok(Json(bundle.public_view()))
}

/// GET /{file_id}: the viewer page for shortcut-shaped paths, static
/// frontend files for everything else.
pub async fn serve_viewer(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    req: Request,
) -> Response {
    if is_valid_shortcut(&file_id) {
        match ServeFile::new(state.frontend_dir.join("index.html"))
            .oneshot(req)
            .await
        {
            Ok(resp) => resp.into_response(),
            Err(never) => match never {},
        }
    } else {
        match ServeDir::new(&state.frontend_dir).oneshot(req).await {
            Ok(resp) => resp.into_response(),
            Err(never) => match never {},
        }
    }
}

pub async fn health() -> &'static str {
    "ok"
}
