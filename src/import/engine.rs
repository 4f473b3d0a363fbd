//! Генератор функций импорта.
//!
//! [`ImportEngine`] — продукт фабрики: изолированная вселенная из двух
//! кэшей и набора загружаемых узлов. [`ImportEngine::importer`] выдаёт
//! функцию импорта, привязанную к контексту (узлу вызывающего модуля).
//!
//! Порядок диспетчеризации запроса:
//! 1. строка без `@` — передаётся хосту без изменений;
//! 2. прямая ссылка на узел — проверка загружаемости и загрузка;
//! 3. строка с `@` — алиас -> кэш -> обход от корня или поиск от
//!    контекста -> кэширование -> загрузка.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, warn};
use serde::Serialize;

use super::search::SearchSession;
use super::{names_equal, resolve_alias, ImportConfig, ImportTarget, ResolutionCache, PATH_PREFIX};
use crate::error::{ImportError, ImportResult};
use crate::tree::{AncestryNotifier, ContainerHost, NodeId};

/// Счётчики работы движка импортов.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportStats {
    /// Всего запросов импорта.
    pub requests: u64,
    /// Строки без префикса, ушедшие хосту напрямую.
    pub passthrough: u64,
    /// Импорты по прямой ссылке на узел.
    pub direct: u64,
    /// Попадания в кэш контекста.
    pub context_cache_hits: u64,
    /// Попадания в глобальный кэш.
    pub global_cache_hits: u64,
    /// Разрешения абсолютных путей обходом от корня.
    pub absolute_resolutions: u64,
    /// Неоднозначные разрешения поиском по дереву.
    pub ambiguous_searches: u64,
    /// Суммарное время поиска в наносекундах (при `track_stats`).
    pub search_nanos: u64,
}

/// Движок импортов: конфигурация, кэши и набор загружаемых узлов.
///
/// Каждый вызов [`ImportEngine::new`] создаёт изолированное состояние —
/// кэши разных движков не пересекаются.
pub struct ImportEngine<H: ContainerHost + AncestryNotifier + 'static> {
    host: Rc<H>,
    config: ImportConfig,
    cache: ResolutionCache,
    /// Узлы, находящиеся внутри примитива загрузки хоста.
    in_flight: RefCell<HashSet<NodeId>>,
    stats: RefCell<ImportStats>,
}

impl<H: ContainerHost + AncestryNotifier + 'static> ImportEngine<H> {
    /// Создать движок с данной конфигурацией.
    pub fn new(host: Rc<H>, config: ImportConfig) -> Rc<Self> {
        let notifier: Rc<dyn AncestryNotifier> = Rc::clone(&host) as Rc<dyn AncestryNotifier>;
        Rc::new(Self {
            host,
            config,
            cache: ResolutionCache::new(notifier),
            in_flight: RefCell::new(HashSet::new()),
            stats: RefCell::new(ImportStats::default()),
        })
    }

    /// Сгенерировать функцию импорта для контекста.
    ///
    /// Здесь же создаётся кэш контекста и определяется его первичный
    /// корень. Контекст вне всех корневых контейнеров — не ошибка, но
    /// разрешение будет ограниченным.
    pub fn importer(self: &Rc<Self>, context: NodeId) -> Importer<H> {
        self.cache.register_context(context);

        let primary_root = self.find_primary_root(context);
        if primary_root.is_none() {
            warn!(
                "import context '{}' is outside all configured ancestors",
                self.host.full_name(context)
            );
        }

        Importer {
            engine: Rc::clone(self),
            context,
            primary_root,
        }
    }

    /// Снимок счётчиков.
    pub fn stats(&self) -> ImportStats {
        self.stats.borrow().clone()
    }

    /// Конфигурация движка.
    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Подняться от контекста до первого настроенного корня (включая
    /// сам контекст).
    fn find_primary_root(&self, context: NodeId) -> Option<NodeId> {
        let ancestors: HashSet<NodeId> = self.config.ancestor_ids().into_iter().collect();

        let mut current = Some(context);
        let mut steps = 0;
        while let Some(node) = current {
            if ancestors.contains(&node) {
                return Some(node);
            }
            current = self.host.parent(node);

            steps += 1;
            if steps > self.config.max_search_depth {
                break;
            }
        }
        None
    }

    fn import(
        &self,
        context: NodeId,
        primary_root: Option<NodeId>,
        target: ImportTarget,
    ) -> ImportResult<H::Value> {
        self.stats.borrow_mut().requests += 1;

        match target {
            // Строки без префикса не трогаем: семантика хоста по умолчанию
            ImportTarget::Path(path) if !path.starts_with(PATH_PREFIX) => {
                self.stats.borrow_mut().passthrough += 1;
                self.host.load_raw(&path)
            }
            ImportTarget::Node(node) => {
                self.stats.borrow_mut().direct += 1;
                if !self.host.is_module(node) {
                    return Err(ImportError::NotAModule(self.host.full_name(node)));
                }
                self.load_guarded(node)
            }
            ImportTarget::Path(path) => {
                let canonical = resolve_alias(&path, &self.config.aliases);
                if self.config.debug_log {
                    debug!(
                        "resolving '{}' (canonical '{}') from context {}",
                        path, canonical, context
                    );
                }
                let node = self.resolve_path(context, primary_root, &canonical)?;
                self.load_guarded(node)
            }
        }
    }

    /// Разрешить канонический путь в узел: кэш, затем обход.
    fn resolve_path(
        &self,
        context: NodeId,
        primary_root: Option<NodeId>,
        canonical: &str,
    ) -> ImportResult<NodeId> {
        if let Some(node) = self.cache.get_context(context, canonical) {
            self.stats.borrow_mut().context_cache_hits += 1;
            return Ok(node);
        }
        if let Some(node) = self.cache.get_global(canonical) {
            self.stats.borrow_mut().global_cache_hits += 1;
            return Ok(node);
        }

        let stripped = canonical.strip_prefix(PATH_PREFIX).unwrap_or(canonical);
        let segments: Vec<String> = stripped.split('/').map(String::from).collect();

        if let Some(root) = self.config.ancestor_by_name(&segments[0]) {
            // Абсолютный путь: строгий спуск от названного корня
            self.stats.borrow_mut().absolute_resolutions += 1;
            let node = self.traverse_absolute(root, &segments)?;
            if !self.host.is_module(node) {
                return Err(ImportError::NotAModule(self.host.full_name(node)));
            }
            self.cache.store_global(canonical, node);
            if self.config.debug_log {
                debug!("'{}' resolved to '{}'", canonical, self.host.full_name(node));
            }
            Ok(node)
        } else {
            // Неоднозначное имя: поиск от контекста, затем запасные корни
            self.stats.borrow_mut().ambiguous_searches += 1;
            let started = self.config.track_stats.then(Instant::now);
            let found = self.search_ambiguous(context, primary_root, &segments);
            if let Some(started) = started {
                self.stats.borrow_mut().search_nanos += started.elapsed().as_nanos() as u64;
            }

            let node =
                found.ok_or_else(|| ImportError::AmbiguousNotFound(stripped.to_string()))?;
            self.cache.store_context(context, canonical, node);
            if self.config.debug_log {
                debug!("'{}' resolved to '{}'", canonical, self.host.full_name(node));
            }
            Ok(node)
        }
    }

    /// Строгий спуск по сегментам от корня: каждый сегмент обязан быть
    /// прямым ребёнком, отсутствие — ошибка с именем сегмента и корня.
    fn traverse_absolute(&self, root: NodeId, segments: &[String]) -> ImportResult<NodeId> {
        let mut current = root;
        for segment in &segments[1..] {
            current = self.find_child(current, segment).ok_or_else(|| {
                ImportError::SegmentNotFound(segment.clone(), self.host.node_name(root))
            })?;
        }
        Ok(current)
    }

    fn find_child(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.host
            .children(node)
            .into_iter()
            .find(|&child| {
                names_equal(&self.host.node_name(child), name, self.config.case_sensitive)
            })
    }

    /// Поиск неоднозначного имени: вниз-затем-вверх от контекста в
    /// границах корневых контейнеров, затем остальные корни.
    fn search_ambiguous(
        &self,
        context: NodeId,
        primary_root: Option<NodeId>,
        segments: &[String],
    ) -> Option<NodeId> {
        let mut session = SearchSession::new(&*self.host, &self.config);

        if let Some(base) = session.search_for_module(context, &segments[0]) {
            if segments.len() == 1 {
                return Some(base);
            }
            // Остаток пути спускается строго от найденной базы
            if let Some(node) = self.descend(base, &segments[1..]) {
                if self.host.is_module(node) {
                    return Some(node);
                }
            }
        }

        let fallback: Vec<NodeId> = self
            .config
            .ancestor_ids()
            .into_iter()
            .filter(|&root| Some(root) != primary_root)
            .collect();
        session.search_roots(&fallback, segments)
    }

    fn descend(&self, base: NodeId, segments: &[String]) -> Option<NodeId> {
        let mut current = base;
        for segment in segments {
            current = self.find_child(current, segment)?;
        }
        Some(current)
    }

    /// Загрузка под стражей от циклов: узел помечается на время вызова
    /// примитива хоста, снятие пометки гарантировано на любом выходе.
    fn load_guarded(&self, node: NodeId) -> ImportResult<H::Value> {
        let _guard = if self.config.detect_circular {
            match FlightGuard::acquire(&self.in_flight, node) {
                Some(guard) => Some(guard),
                None => {
                    return Err(ImportError::CircularDependency(self.host.full_name(node)))
                }
            }
        } else {
            None
        };
        self.host.load(node)
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.borrow().len()
    }
}

/// RAII-страж набора загружаемых узлов: вставка при захвате, удаление
/// в Drop — в том числе при ошибке или панике примитива загрузки.
struct FlightGuard<'a> {
    set: &'a RefCell<HashSet<NodeId>>,
    node: NodeId,
}

impl<'a> FlightGuard<'a> {
    fn acquire(set: &'a RefCell<HashSet<NodeId>>, node: NodeId) -> Option<Self> {
        if !set.borrow_mut().insert(node) {
            return None;
        }
        Some(Self { set, node })
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.node);
    }
}

/// Функция импорта, привязанная к контексту.
pub struct Importer<H: ContainerHost + AncestryNotifier + 'static> {
    engine: Rc<ImportEngine<H>>,
    context: NodeId,
    primary_root: Option<NodeId>,
}

impl<H: ContainerHost + AncestryNotifier + 'static> Importer<H> {
    /// Импортировать по строке пути или прямой ссылке на узел.
    pub fn import(&self, target: impl Into<ImportTarget>) -> ImportResult<H::Value> {
        self.engine.import(self.context, self.primary_root, target.into())
    }

    /// Контекст, к которому привязана функция.
    pub fn context(&self) -> NodeId {
        self.context
    }

    /// Первичный корень контекста (None — контекст вне корней).
    pub fn primary_root(&self) -> Option<NodeId> {
        self.primary_root
    }
}

impl<H: ContainerHost + AncestryNotifier + 'static> Clone for Importer<H> {
    fn clone(&self) -> Self {
        Self {
            engine: Rc::clone(&self.engine),
            context: self.context,
            primary_root: self.primary_root,
        }
    }
}
