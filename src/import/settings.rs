//! Загрузка настроек импорта из файла.
//!
//! Сериализуемая часть конфигурации: алиасы и флаги. Корневые
//! контейнеры — живые узлы дерева, в файл они не попадают и добавляются
//! при сборке [`ImportConfig`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ImportConfig, DEFAULT_MAX_SEARCH_DEPTH};
use crate::error::{ImportError, ImportResult};
use crate::tree::NodeId;

/// Настройки импорта, читаемые из JSON-файла.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSettings {
    /// Алиасы: короткое имя -> канонический префикс пути.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// Ограничение глубины поиска.
    #[serde(default = "default_max_search_depth")]
    pub max_search_depth: usize,
    /// Учитывать регистр при сравнении имён.
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    /// Детектировать циклические зависимости.
    #[serde(default = "default_true")]
    pub detect_circular: bool,
    /// Трассировка разрешения.
    #[serde(default)]
    pub debug_log: bool,
    /// Сбор счётчиков и таймингов.
    #[serde(default)]
    pub track_stats: bool,
}

fn default_max_search_depth() -> usize {
    DEFAULT_MAX_SEARCH_DEPTH
}

fn default_true() -> bool {
    true
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            aliases: HashMap::new(),
            max_search_depth: DEFAULT_MAX_SEARCH_DEPTH,
            case_sensitive: true,
            detect_circular: true,
            debug_log: false,
            track_stats: false,
        }
    }
}

impl ImportSettings {
    /// Разобрать настройки из строки JSON.
    pub fn from_json(source: &str) -> ImportResult<Self> {
        serde_json::from_str(source)
            .map_err(|e| ImportError::SerializationError(e.to_string()))
    }

    /// Прочитать настройки из файла.
    pub fn from_file(path: &Path) -> ImportResult<Self> {
        let source = fs::read_to_string(path).map_err(|e| {
            ImportError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&source)
    }

    /// Собрать конфигурацию, добавив корневые контейнеры.
    pub fn into_config(self, ancestors: Vec<(String, NodeId)>) -> ImportConfig {
        ImportConfig {
            ancestors,
            aliases: self.aliases,
            ignore: None,
            max_search_depth: self.max_search_depth,
            case_sensitive: self.case_sensitive,
            detect_circular: self.detect_circular,
            debug_log: self.debug_log,
            track_stats: self.track_stats,
        }
    }
}
