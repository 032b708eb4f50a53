use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::types::Role;

#[derive(Error, Debug)]
pub enum AppError {
	#[error("{entity} {id} not found")]
	NotFound { entity: &'static str, id: i64 },

	#[error("missing or malformed id")]
	MissingId,

	#[error("{0} already assigned")]
	RoleTaken(Role),

	#[error("unknown role: {0}")]
	InvalidRole(String),

	#[error("{entity} {id} is still referenced and can't be deleted")]
	StillReferenced { entity: &'static str, id: i64 },

	#[error("configuration error: {0}")]
	Config(String),

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON document error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("background task failed: {0}")]
	Task(#[from] tokio::task::JoinError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
	pub fn not_found(entity: &'static str, id: i64) -> Self {
		AppError::NotFound { entity, id }
	}

	pub fn status(&self) -> StatusCode {
		match self {
			AppError::NotFound { .. } | AppError::MissingId => StatusCode::NOT_FOUND,
			AppError::RoleTaken(_)
			| AppError::InvalidRole(_)
			| AppError::StillReferenced { .. } => StatusCode::BAD_REQUEST,
			AppError::Config(_)
			| AppError::Database(_)
			| AppError::Io(_)
			| AppError::Json(_)
			| AppError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		let status = self.status();
		if status.is_server_error() {
			error!("request failed: {self}");
		} else {
			warn!("request rejected: {self}");
		}

		(status, self.to_string()).into_response()
	}
}
