use std::fmt;

/// Per-request failure of an operation. Nothing here is fatal to the
/// process; callers map these onto their own response vocabulary.
#[derive(Debug)]
pub enum OpError {
    Validation {
        field: &'static str,
        message: String,
    },
    Permission,
    NotFound(&'static str),
    Conflict(&'static str),
    Database(diesel::result::Error),
}

impl OpError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { field, message } => write!(f, "invalid {field}: {message}"),
            Self::Permission => write!(f, "only the author may modify this recipe"),
            Self::NotFound(what) => write!(f, "no such {what}"),
            Self::Conflict(what) => write!(f, "{what} already exists"),
            Self::Database(e) => write!(f, "database error: {e}"),
        }
    }
}

impl std::error::Error for OpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<diesel::result::Error> for OpError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match e {
            Error::NotFound => Self::NotFound("row"),
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => Self::Conflict("row"),
            Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                Self::NotFound("referenced row")
            }
            Error::DatabaseError(DatabaseErrorKind::CheckViolation, _) => {
                Self::validation("value", "rejected by a check constraint")
            }
            other => Self::Database(other),
        }
    }
}

pub type OpResult<T> = std::result::Result<T, OpError>;
