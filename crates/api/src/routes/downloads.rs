//! Download token issuance and redemption.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::models::{DownloadPayload, IssuedDownloadToken};
use domain::EntitlementError;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ClientInfo, CurrentUser};
use crate::middleware::metrics::{
    record_download_security_violation, record_download_token_consumed,
    record_download_token_issued,
};

/// Issue (or re-serve) a short-lived token for the loader of `cheat_name`.
///
/// POST /api/v1/downloads/:cheat_name/token
pub async fn issue_download_token(
    State(state): State<AppState>,
    user: CurrentUser,
    client: ClientInfo,
    Path(cheat_name): Path<String>,
) -> Result<(StatusCode, Json<IssuedDownloadToken>), ApiError> {
    let issued = state
        .engine
        .downloads
        .issue(
            &cheat_name,
            user.user_id,
            client.ip_address,
            client.user_agent,
        )
        .await?;
    record_download_token_issued(issued.reused);

    let status = if issued.reused {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(issued)))
}

/// Redeem a token for the loader binary.
///
/// GET /api/v1/downloads/token/:token
pub async fn consume_download_token(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    match state.engine.downloads.consume(&token, user.user_id).await {
        Ok(payload) => {
            record_download_token_consumed();
            Ok(attachment(payload))
        }
        Err(err @ EntitlementError::SecurityViolation) => {
            record_download_security_violation();
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

fn attachment(payload: DownloadPayload) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&payload.filename)
    );

    let mut response = payload.payload.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// Keeps the filename safe to embed in a quoted header parameter.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| !matches!(c, '"' | '\\' | '/' | ';'))
        .collect();
    if cleaned.trim().is_empty() {
        "download.bin".to_string()
    } else {
        cleaned
    }
}
