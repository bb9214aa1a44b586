use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use crate::policy::types::{join_roles, RoleSet};

/// A redirect path or URL failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum Rejected {
    #[error("redirect value is empty")]
    #[diagnostic(code(gatehouse::validator::empty))]
    Empty,

    #[error("path contains a directory traversal sequence")]
    #[diagnostic(code(gatehouse::validator::traversal))]
    Traversal,

    #[error("path contains characters outside [A-Za-z0-9/_-]")]
    #[diagnostic(
        code(gatehouse::validator::invalid_characters),
        help("Use a plain slug such as `my-profile` or `members/area`")
    )]
    InvalidCharacters,

    #[error("path is {len} characters long (limit is 100)")]
    #[diagnostic(code(gatehouse::validator::too_long))]
    TooLong { len: usize },

    #[error("path contains the protected segment `{segment}`")]
    #[diagnostic(
        code(gatehouse::validator::denied_segment),
        help("Redirecting into admin, login or core asset locations is not allowed")
    )]
    DeniedSegment { segment: &'static str },

    #[error("redirect URL is malformed")]
    #[diagnostic(code(gatehouse::validator::malformed_url))]
    MalformedUrl,

    #[error("redirect URL has no host")]
    #[diagnostic(code(gatehouse::validator::missing_host))]
    MissingHost,

    #[error("redirect URL scheme `{scheme}` is not allowed")]
    #[diagnostic(
        code(gatehouse::validator::scheme),
        help("Only http and https URLs can be used as redirect targets")
    )]
    UnsupportedScheme { scheme: String },
}

/// Un-restricting these roles would orphan existing assignments.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error(
    "Cannot uncheck the following roles as they are currently used in advanced redirect configurations: {}",
    join_roles(.roles)
)]
#[diagnostic(
    code(gatehouse::store::roles_in_use),
    help("Remove the roles from the advanced redirects first")
)]
pub struct ConflictError {
    pub roles: RoleSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RejectedAssignment {
    #[error("Cannot save role assignment without any roles")]
    #[diagnostic(code(gatehouse::store::empty_assignment))]
    EmptyRoles,

    #[error(
        "Cannot save role assignment because the following roles are not selected in Role Restrictions: {}",
        join_roles(.roles)
    )]
    #[diagnostic(
        code(gatehouse::store::unrestricted_roles),
        help("Select the roles in Role Restrictions first")
    )]
    UnrestrictedRoles { roles: RoleSet },
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("No role assignment at position {index} ({len} configured)")]
#[diagnostic(code(gatehouse::store::not_found))]
pub struct NotFoundError {
    pub index: usize,
    pub len: usize,
}

/// Failure of the durable settings store.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("Failed to access settings file `{path}`")]
    #[diagnostic(
        code(gatehouse::store::io),
        help("Check that the directory exists and is writable by the service")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings document is not valid JSON: {0}")]
    #[diagnostic(code(gatehouse::store::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Settings document is corrupt: {0}")]
    #[diagnostic(code(gatehouse::store::corrupt))]
    Corrupt(String),

    #[error("Settings store is unavailable")]
    #[diagnostic(code(gatehouse::store::unavailable))]
    Unavailable,
}

/// Errors surfaced by the HTTP API.
#[derive(Debug, Error, Diagnostic)]
pub enum ApiError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("Bad request: {0}")]
    #[diagnostic(code(gatehouse::api::bad_request))]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::error!(error = %self, "Policy API request failed");
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
