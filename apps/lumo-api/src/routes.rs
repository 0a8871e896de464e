use axum::{
	Json, Router,
	extract::{State, rejection::JsonRejection},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use lumo_service::{Error as ServiceError, SearchRequest, SearchResponse};

use crate::state::AppState;

/// Owner of the searched library, set by the upstream auth layer.
pub const HEADER_OWNER_ID: &str = "x-owner-id";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search/chat", post(search_chat))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search_chat(
	State(state): State<AppState>,
	headers: HeaderMap,
	payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	authorize(&headers, state.service.cfg.security.api_auth_token.as_deref())?;

	let owner_id = read_owner_id(&headers)?;
	let Json(payload) = payload.map_err(|err| {
		json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", err.body_text(), None)
	})?;
	let response = state.service.search(owner_id, payload).await?;

	Ok(Json(response))
}

fn authorize(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
	let Some(expected) = expected else {
		return Ok(());
	};

	if read_bearer_token(headers).is_some_and(|token| token == expected) {
		Ok(())
	} else {
		Err(json_error(
			StatusCode::UNAUTHORIZED,
			"UNAUTHORIZED",
			"A valid bearer token is required.",
			None,
		))
	}
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

fn read_owner_id(headers: &HeaderMap) -> Result<i64, ApiError> {
	let invalid = || {
		json_error(
			StatusCode::BAD_REQUEST,
			"INVALID_REQUEST",
			format!("{HEADER_OWNER_ID} must be a positive integer."),
			Some(vec![HEADER_OWNER_ID.to_string()]),
		)
	};
	let raw = headers.get(HEADER_OWNER_ID).ok_or_else(invalid)?;
	let owner_id = raw
		.to_str()
		.ok()
		.and_then(|value| value.trim().parse::<i64>().ok())
		.ok_or_else(invalid)?;

	if owner_id <= 0 {
		return Err(invalid());
	}

	Ok(owner_id)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } => json_error(
				StatusCode::BAD_REQUEST,
				"INVALID_REQUEST",
				message,
				Some(vec!["$.message".to_string()]),
			),
			ServiceError::Provider { message } => {
				tracing::error!(error = %message, "Search failed in the vision provider.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "PROVIDER_ERROR", message, None)
			},
			ServiceError::Storage { message } => {
				tracing::error!(error = %message, "Search failed in storage.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"STORAGE_ERROR",
					"The image library is unavailable.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
