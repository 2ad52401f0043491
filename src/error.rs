use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

/// Errors surfaced to the front end. Each variant has a stable wire code.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("missing {0}")]
    MissingParam(String),

    #[error("{0}")]
    BadParams(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{message}")]
    Validation { message: String, fields: Vec<String> },

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    NotPermitted(String),

    #[error("{0}")]
    Conflict(String),

    #[error("select a workspace first")]
    NoWorkspace,

    #[error("{0}")]
    Store(#[from] rusqlite::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("failed to process document: {0}")]
    Render(String),

    #[error("{0}")]
    Config(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>, fields: Vec<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            fields,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingParam(_) | AppError::BadParams(_) => "bad_params",
            AppError::NotFound(_) => "not_found",
            AppError::Validation { .. } => "validation_failed",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::NotPermitted(_) => "not_permitted",
            AppError::Conflict(_) => "conflict",
            AppError::NoWorkspace => "no_workspace",
            AppError::Store(_) | AppError::Json(_) => "db_query_failed",
            AppError::Io(_) => "io_failed",
            AppError::Render(_) => "render_failed",
            AppError::Config(_) => "config_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation { fields, .. } => Some(json!({ "fields": fields })),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(e: zip::result::ZipError) -> Self {
        AppError::Render(e.to_string())
    }
}
