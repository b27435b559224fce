use crate::error::{AppError, Result};
use crate::model::{EncodeRequest, EncodeResponse, LinkInfoResponse, StatusResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use lynx_core::ShortCode;
use tracing::debug;

pub async fn encode_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EncodeRequest>, JsonRejection>,
) -> Result<Json<EncodeResponse>> {
    let Json(request) = payload?;
    let link = request.validate()?;

    let id = state
        .shortener()
        .allocate(link.url, link.expire_at, link.once)
        .await?;

    let code = id.short_code();
    debug!(code = %code, "encoded link");
    Ok(Json(EncodeResponse::success(code.to_url(state.base_url()))))
}

pub async fn info_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<LinkInfoResponse>> {
    let code = ShortCode::new(code)?;
    let record = state.shortener().resolve(code.id()).await?;
    Ok(Json(LinkInfoResponse::new(&code, record)))
}

pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let code = ShortCode::new(code)?;
    let url = state.shortener().redirect(code.id()).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

pub async fn delete_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>> {
    let code = ShortCode::new(code)?;
    state.shortener().remove(code.id()).await?;
    debug!(code = %code, "deleted link");
    Ok(Json(StatusResponse::success()))
}

pub async fn not_found_handler() -> AppError {
    AppError::NotFound
}
