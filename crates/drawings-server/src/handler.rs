use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, Query, RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use chrono::{SecondsFormat, TimeZone, Utc};
use drawings_core::names::display_name;
use drawings_core::{
    normalize_gallery_name, BumpState, DrawingId, Drawings, DrawingsError, GalleryListing,
    RasterEncoder, PALETTE, PUBLIC_GALLERY,
};
use drawings_kv::KvEngine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    pub drawings: Drawings<KvEngine>,
    pub encoder: Arc<dyn RasterEncoder>,
}

/// A request failure, rendered as a plain-text response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Drawings(#[from] DrawingsError),

    #[error("not found")]
    NotFound,

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Drawings(e) => match e {
                DrawingsError::InvalidDrawing { .. }
                | DrawingsError::InvalidGalleryName { .. }
                | DrawingsError::WrongGallery { .. }
                | DrawingsError::AlreadyBumped { .. } => StatusCode::BAD_REQUEST,
                DrawingsError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                DrawingsError::NotFound { .. } => StatusCode::NOT_FOUND,
                DrawingsError::Conflict => StatusCode::CONFLICT,
                DrawingsError::IndexInconsistent { .. }
                | DrawingsError::Record(_)
                | DrawingsError::Raster(_)
                | DrawingsError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// `302 Found` to `location`.
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn parse_id(segment: &str) -> ApiResult<DrawingId> {
    DrawingId::parse(segment).ok_or(ApiError::NotFound)
}

fn rfc3339(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Serialize)]
pub struct DrawTarget {
    pub gallery: String,
    pub title: Option<String>,
    pub width: u32,
    pub height: u32,
    pub palette: Vec<[u8; 3]>,
    pub share_url: String,
}

#[derive(Debug, Serialize)]
pub struct DrawingResponse {
    pub id: DrawingId,
    pub gallery: String,
    pub created_at: Option<String>,
    pub score: Option<i64>,
    pub bump: BumpState,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ShareParams {
    pub gallery: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub name: String,
}

/// `GET /`
pub async fn front_page(State(state): State<AppState>) -> ApiResult<Json<GalleryListing>> {
    Ok(Json(state.drawings.gallery(PUBLIC_GALLERY)?))
}

/// `GET /draw?{gallery}`
pub async fn draw(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> ApiResult<Json<DrawTarget>> {
    let gallery = state.drawings.validate_draw_target(query.as_deref())?;
    let canvas = state.drawings.config().canvas();
    Ok(Json(DrawTarget {
        title: (gallery != PUBLIC_GALLERY).then(|| display_name(&gallery)),
        share_url: format!("/share?gallery={gallery}"),
        gallery,
        width: canvas.width,
        height: canvas.height,
        palette: PALETTE.to_vec(),
    }))
}

/// `POST /share?gallery=`: the body is the packed bitmap; responds with the new id.
pub async fn share(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<ShareParams>,
    body: Bytes,
) -> ApiResult<String> {
    let gallery = params
        .gallery
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| PUBLIC_GALLERY.to_string());
    let address = peer.ip().to_string();
    let drawings = state.drawings.clone();
    let id = tokio::task::spawn_blocking(move || drawings.share(&body, &gallery, &address))
        .await??;
    Ok(id.to_string())
}

/// `GET /galleries?name=`: search box redirect.
pub async fn search_gallery(Query(params): Query<SearchParams>) -> Response {
    found(format!("/galleries/{}", normalize_gallery_name(&params.name)))
}

/// `GET /galleries/:name`
pub async fn gallery(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    if name == PUBLIC_GALLERY {
        return Ok(found("/".to_string()));
    }
    Ok(Json(state.drawings.gallery(&name)?).into_response())
}

/// `GET /:id` and `GET /:id.png`
pub async fn drawing(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(segment): Path<String>,
) -> ApiResult<Response> {
    if let Some(stem) = segment.strip_suffix(".png") {
        let id = parse_id(stem)?;
        let png = state.drawings.image(&id, state.encoder.as_ref())?;
        return Ok(([(header::CONTENT_TYPE, state.encoder.content_type())], png).into_response());
    }

    let id = parse_id(&segment)?;
    let view = state.drawings.drawing(&id, &peer.ip().to_string())?;
    Ok(Json(DrawingResponse {
        image_url: format!("/{}.png", view.id),
        created_at: rfc3339(view.date),
        id: view.id,
        gallery: view.gallery,
        score: view.score,
        bump: view.bump,
    })
    .into_response())
}

/// `POST /:id`: bump, then back to the drawing.
pub async fn bump(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(segment): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&segment)?;
    let address = peer.ip().to_string();
    let drawings = state.drawings.clone();
    let target = id.clone();
    tokio::task::spawn_blocking(move || drawings.bump(&target, &address)).await??;
    Ok(found(format!("/{id}")))
}
