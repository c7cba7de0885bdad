use std::fmt::{self, Display};

use thiserror::Error as ThisError;
use warp::http::StatusCode;

/// Every failure an action can surface to its caller.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(#[from] ValidationKind),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    SelfSubscription(String),

    #[error("You don't have permission to perform this action")]
    Forbidden,

    #[error("Authentication credentials were not provided")]
    Unauthorized,

    #[error("{0}")]
    Type(#[from] TypeError),

    #[error("Misconfigured environment: {0}")]
    Config(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Cache failed: {0}")]
    Cache(String),

    #[error("Failed to build response: {0}")]
    Response(#[from] warp::http::Error),
}

#[derive(ThisError, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    #[error("Ingredient amount must be at least 1")]
    NonPositiveAmount,

    #[error("Ingredients can't repeat within a recipe")]
    DuplicateIngredient,

    #[error("Cooking time must be at least 1 minute")]
    NonPositiveCookingTime,

    #[error("Recipe name can't be empty")]
    EmptyName,

    #[error("Tag color must be a hex value such as #E26C2D")]
    InvalidColor,

    #[error("Tag slug may only contain lowercase letters, digits, '-' and '_'")]
    InvalidSlug,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_)
            | Error::AlreadyExists(_)
            | Error::SelfSubscription(_)
            | Error::Type(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Config(_) | Error::Query(_) | Error::Cache(_) | Error::Response(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn not_found(info: &str) -> Self {
        Error::NotFound(info.to_string())
    }

    pub fn already_exists(info: &str) -> Self {
        Error::AlreadyExists(info.to_string())
    }
}

impl warp::reject::Reject for Error {}

/// Postgres rejected composition lines repeating an ingredient.
pub const RECIPE_PARTS_UNIQUE_CONSTRAINT: &str = "recipe_parts_recipe_ingredient_key";

#[derive(Debug)]
pub struct QueryError {
    info: String,
    unique_violation: bool,
    constraint: Option<String>,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
            constraint: None,
        }
    }

    pub fn unique(info: String, constraint: Option<&str>) -> Self {
        Self {
            info,
            unique_violation: true,
            constraint: constraint.map(str::to_string),
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Self::unique(format!("{e}"), e.constraint())
            }
            sqlx::Error::Database(e) => Self::new(format!("{e}")),
            sqlx::Error::RowNotFound => Self::new(String::from("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::ColumnNotFound(e) => Self::new(format!("Column not found: {e}")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<QueryError> for Error {
    // Constraint hits surface as the same user errors the pre-checks give.
    fn from(value: QueryError) -> Self {
        match (value.unique_violation, value.constraint.as_deref()) {
            (true, Some(RECIPE_PARTS_UNIQUE_CONSTRAINT)) => {
                Error::Validation(ValidationKind::DuplicateIngredient)
            }
            (true, _) => Error::AlreadyExists(value.info),
            (false, _) => Error::Query(value.info),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        QueryError::from(value).into()
    }
}

#[derive(Debug)]
pub struct CacheError {
    info: String,
}

impl From<redis::RedisError> for CacheError {
    fn from(value: redis::RedisError) -> Self {
        Self {
            info: format!("{:?} - {:?}", value.code(), value.detail()),
        }
    }
}

impl CacheError {
    pub fn new(info: String) -> Self {
        Self { info }
    }
}

impl From<CacheError> for Error {
    fn from(value: CacheError) -> Self {
        Error::Cache(value.info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}
