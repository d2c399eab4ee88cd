use std::fmt;

// === BookmarkError ===

/// Errors raised by the bookmark tree, the import/mutation engines and the
/// search index collaborator.
#[derive(Debug)]
pub enum BookmarkError {
    /// A sibling with the same name (or the same sort slot) already exists.
    Conflict(String),
    /// Node with the given ID was not found for this user.
    NotFound(String),
    /// The request is malformed (empty name, move into own subtree, ...).
    InvalidInput(String),
    /// The bookmark document could not be read at all.
    ParseError(String),
    /// Database operation failed.
    DatabaseError(String),
    /// Full-text index operation failed.
    IndexError(String),
}

impl fmt::Display for BookmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkError::Conflict(msg) => write!(f, "Bookmark conflict: {}", msg),
            BookmarkError::NotFound(id) => write!(f, "Bookmark not found: {}", id),
            BookmarkError::InvalidInput(msg) => write!(f, "Invalid bookmark request: {}", msg),
            BookmarkError::ParseError(msg) => {
                write!(f, "Bookmark document error: {}", msg)
            }
            BookmarkError::DatabaseError(msg) => {
                write!(f, "Bookmark database error: {}", msg)
            }
            BookmarkError::IndexError(msg) => write!(f, "Search index error: {}", msg),
        }
    }
}

impl std::error::Error for BookmarkError {}

impl From<rusqlite::Error> for BookmarkError {
    /// Uniqueness violations become `Conflict` so callers can report them;
    /// every other SQLite failure is fatal to the enclosing operation.
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                BookmarkError::Conflict(err.to_string())
            }
            _ => BookmarkError::DatabaseError(err.to_string()),
        }
    }
}

impl From<tantivy::TantivyError> for BookmarkError {
    fn from(err: tantivy::TantivyError) -> Self {
        BookmarkError::IndexError(err.to_string())
    }
}

// === ConfigError ===

/// Errors related to loading and saving the service configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading or writing the config file.
    IoError(String),
    /// Failed to serialize or deserialize the config file.
    SerializationError(String),
    /// A config value is out of range.
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::SerializationError(msg) => {
                write!(f, "Config serialization error: {}", msg)
            }
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
