//! Определения ошибок для treequire.

use thiserror::Error;

/// Основной тип `Result` для библиотеки.
pub type ImportResult<T> = Result<T, ImportError>;

/// Перечисление всех возможных ошибок разрешения импорта.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Segment '{0}' not found under root '{1}'")]
    SegmentNotFound(String, String),

    #[error("'{0}' is not a loadable module")]
    NotAModule(String),

    #[error("Module '{0}' not found in any valid ancestor")]
    AmbiguousNotFound(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Load error: {0}")]
    LoadError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}
