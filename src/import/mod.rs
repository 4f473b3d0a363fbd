//! Система контекстных импортов.
//!
//! Скрипты запрашивают зависимости строками с префиксом `@` или прямыми
//! ссылками на узлы дерева:
//!
//! ```text
//! import("@Shared/Utilities/StringUtils")  ; абсолютный путь от корня
//! import("@Utils/StringUtils")             ; то же самое через алиас
//! import("@Config")                        ; неоднозначное имя, поиск от контекста
//! import(node)                             ; прямая ссылка на модуль
//! ```
//!
//! Разрешение: подстановка алиаса -> кэш -> обход дерева -> загрузка
//! через примитив хоста. Подробности по слоям:
//!
//! - `alias` - подстановка алиасов в первом сегменте пути
//! - `search` - поисковые алгоритмы по дереву контейнеров
//! - `cache` - двухуровневый кэш разрешённых путей
//! - `engine` - генератор функций импорта и защита от циклов
//! - `settings` - загрузка настроек из файла

mod alias;
mod cache;
mod engine;
mod search;
mod settings;

pub use alias::resolve_alias;
pub use cache::ResolutionCache;
pub use engine::{ImportEngine, ImportStats, Importer};
pub use settings::ImportSettings;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::tree::NodeId;

/// Маркер абсолютного пути.
pub const PATH_PREFIX: char = '@';

/// Имя узлов, всегда исключаемых из обхода.
pub const INDEX_NAME: &str = "_Index";

/// Глубина поиска по умолчанию.
pub const DEFAULT_MAX_SEARCH_DEPTH: usize = 50;

/// Предикат исключения узлов из обхода (id узла, имя узла).
pub type IgnorePredicate = Rc<dyn Fn(NodeId, &str) -> bool>;

/// Цель импорта: строка пути или прямая ссылка на узел.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// Строковый путь (с префиксом `@` или без).
    Path(String),
    /// Прямая ссылка на узел дерева.
    Node(NodeId),
}

impl From<&str> for ImportTarget {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for ImportTarget {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<NodeId> for ImportTarget {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

/// Конфигурация системы импортов.
///
/// Неизменяемый снимок: передаётся при создании [`ImportEngine`] и дальше
/// не меняется.
#[derive(Clone)]
pub struct ImportConfig {
    /// Корневые контейнеры: имя корня -> узел. Единственные допустимые
    /// якоря абсолютных путей и граница поиска вверх.
    pub ancestors: Vec<(String, NodeId)>,
    /// Алиасы: короткое имя -> канонический префикс пути.
    pub aliases: HashMap<String, String>,
    /// Предикат исключения узлов из обхода (помимо встроенного `_Index`).
    pub ignore: Option<IgnorePredicate>,
    /// Ограничение глубины поиска.
    pub max_search_depth: usize,
    /// Учитывать регистр при сравнении имён.
    pub case_sensitive: bool,
    /// Детектировать циклические зависимости при загрузке.
    pub detect_circular: bool,
    /// Трассировка разрешения через `log::debug!`.
    pub debug_log: bool,
    /// Собирать счётчики и тайминги.
    pub track_stats: bool,
}

impl ImportConfig {
    /// Создать конфигурацию с настройками по умолчанию.
    pub fn new() -> Self {
        Self {
            ancestors: Vec::new(),
            aliases: HashMap::new(),
            ignore: None,
            max_search_depth: DEFAULT_MAX_SEARCH_DEPTH,
            case_sensitive: true,
            detect_circular: true,
            debug_log: false,
            track_stats: false,
        }
    }

    /// Создать конфигурацию с корневыми контейнерами.
    pub fn with_ancestors(ancestors: Vec<(String, NodeId)>) -> Self {
        Self {
            ancestors,
            ..Self::new()
        }
    }

    /// Добавить корневой контейнер.
    pub fn add_ancestor(&mut self, name: impl Into<String>, node: NodeId) {
        self.ancestors.push((name.into(), node));
    }

    /// Добавить алиас.
    pub fn add_alias(&mut self, name: impl Into<String>, prefix: impl Into<String>) {
        self.aliases.insert(name.into(), prefix.into());
    }

    /// Установить предикат исключения.
    pub fn set_ignore(&mut self, ignore: impl Fn(NodeId, &str) -> bool + 'static) {
        self.ignore = Some(Rc::new(ignore));
    }

    /// Найти корневой контейнер по имени сегмента.
    pub fn ancestor_by_name(&self, name: &str) -> Option<NodeId> {
        self.ancestors
            .iter()
            .find(|(root, _)| names_equal(root, name, self.case_sensitive))
            .map(|(_, node)| *node)
    }

    /// Узлы всех корневых контейнеров в порядке объявления.
    pub fn ancestor_ids(&self) -> Vec<NodeId> {
        self.ancestors.iter().map(|(_, node)| *node).collect()
    }

    /// Исключён ли узел из обхода.
    pub fn is_ignored(&self, node: NodeId, name: &str) -> bool {
        if name == INDEX_NAME {
            return true;
        }
        match &self.ignore {
            Some(pred) => pred(node, name),
            None => false,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ImportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportConfig")
            .field("ancestors", &self.ancestors)
            .field("aliases", &self.aliases)
            .field("ignore", &self.ignore.as_ref().map(|_| "<predicate>"))
            .field("max_search_depth", &self.max_search_depth)
            .field("case_sensitive", &self.case_sensitive)
            .field("detect_circular", &self.detect_circular)
            .field("debug_log", &self.debug_log)
            .field("track_stats", &self.track_stats)
            .finish()
    }
}

/// Сравнить имена с учётом настройки регистра.
pub(crate) fn names_equal(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}
