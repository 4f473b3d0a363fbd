//! # Treequire
//!
//! Контекстное разрешение модулей для скриптовых окружений, где
//! пространство имён — дерево именованных контейнеров.
//!
//! ## Основные модули
//!
//! - [`tree`] - интерфейс дерева контейнеров хоста
//! - [`import`] - система импортов: алиасы, поиск, кэш, генератор
//! - [`error`] - типы ошибок
//!
//! ## Пример использования
//!
//! ```rust,ignore
//! use treequire::{ImportConfig, ImportEngine};
//!
//! // Хост реализует ContainerHost и AncestryNotifier
//! let mut config = ImportConfig::new();
//! config.add_ancestor("Server", server_node);
//! config.add_ancestor("Shared", shared_node);
//! config.add_alias("Utils", "Shared/Utilities");
//!
//! let engine = ImportEngine::new(host, config);
//! let import = engine.importer(calling_module);
//!
//! let value = import.import("@Utils/StringUtils")?;   // абсолютный путь
//! let config_module = import.import("@Config")?;      // поиск от контекста
//! ```

// === Основные модули ===
pub mod error;
pub mod import;
pub mod tree;

#[cfg(test)]
pub(crate) mod testtree;

// === Re-exports для удобства ===
pub use error::{ImportError, ImportResult};
pub use import::{
    resolve_alias, ImportConfig, ImportEngine, ImportSettings, ImportStats, ImportTarget, Importer,
};
pub use tree::{AncestryNotifier, ContainerHost, NodeId, Subscription};
