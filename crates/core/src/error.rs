// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] crate::port::CatalogError),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
