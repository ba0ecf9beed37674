// errors.rs
use thiserror::Error;

/// Errors originating from either the server logic
/// (routing, missing resources, etc.) or downstream layers (DB, spreadsheets).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Database Error: {0}")]
    DbError(String),
    #[error("Internal Server Error")]
    InternalError,
    #[error("Spreadsheet Error: {0}")]
    XlsxError(String),
}

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::NotFound => 404,
            ServerError::BadRequest(_) => 400,
            ServerError::DbError(_) | ServerError::InternalError => 500,
            ServerError::XlsxError(_) => 422,
        }
    }
}

impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        ServerError::DbError(e.to_string())
    }
}

/// Failures raised by catalog and price-hierarchy writes. These surface to the
/// admin verbatim, so the messages name the offending value.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("code '{code}' already exists")]
    DuplicateCode { code: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("coefficient {0} is outside the allowed range [0, 10]")]
    InvalidCoefficient(f64),
    #[error("range minimum {min} is greater than maximum {max}")]
    InvalidRange { min: f64, max: f64 },
    #[error("invalid price: {0}")]
    InvalidPrice(String),
    #[error("{0} is required")]
    Required(&'static str),
    #[error("nothing to update")]
    EmptyUpdate,
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl CatalogError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for CatalogError {
    fn from(e: rusqlite::Error) -> Self {
        CatalogError::Persistence(e.to_string())
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound { .. } => ServerError::NotFound,
            CatalogError::Persistence(msg) => ServerError::DbError(msg),
            other => ServerError::BadRequest(other.to_string()),
        }
    }
}
