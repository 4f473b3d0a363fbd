//! Двухуровневый кэш разрешённых путей.
//!
//! Первый уровень — кэш контекста (привязан к узлу, из которого идёт
//! импорт), второй — глобальный кэш путей, однозначных по построению
//! (разрешённых явным обходом от корня). Кэш хранит узлы, а не
//! загруженные значения: мемоизация загрузки остаётся за хостом, кэш
//! сокращает только поиск.
//!
//! Инвалидация — событийная: одноразовая подписка на перенос *цели*
//! выбивает одну запись, постоянная подписка на перенос *контекста*
//! сбрасывает весь его кэш (после переноса контекста его эффективные
//! корни поиска могли измениться).

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::tree::{AncestryNotifier, NodeId, Subscription};

type PathMap = Rc<RefCell<HashMap<String, NodeId>>>;

pub struct ResolutionCache {
    notifier: Rc<dyn AncestryNotifier>,
    /// Глобальный кэш: разрешённый путь -> узел.
    global: PathMap,
    /// Кэши контекстов: узел контекста -> (путь -> узел).
    contexts: RefCell<HashMap<NodeId, PathMap>>,
    /// Постоянные подписки на перенос контекстов.
    subscriptions: RefCell<Vec<Subscription>>,
}

impl ResolutionCache {
    pub fn new(notifier: Rc<dyn AncestryNotifier>) -> Self {
        Self {
            notifier,
            global: Rc::new(RefCell::new(HashMap::new())),
            contexts: RefCell::new(HashMap::new()),
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    /// Создать кэш контекста, если его ещё нет, и подписаться на
    /// перенос самого контекста (сброс всех его записей).
    pub fn register_context(&self, context: NodeId) {
        let _ = self.context_entries(context);
    }

    fn context_entries(&self, context: NodeId) -> PathMap {
        if let Some(entries) = self.contexts.borrow().get(&context) {
            return Rc::clone(entries);
        }

        let entries: PathMap = Rc::new(RefCell::new(HashMap::new()));
        self.contexts.borrow_mut().insert(context, Rc::clone(&entries));

        let weak = Rc::downgrade(&entries);
        let subscription = self.notifier.on_ancestry_changed(
            context,
            Box::new(move || {
                if let Some(entries) = weak.upgrade() {
                    entries.borrow_mut().clear();
                }
            }),
        );
        self.subscriptions.borrow_mut().push(subscription);
        entries
    }

    pub fn get_context(&self, context: NodeId, path: &str) -> Option<NodeId> {
        let contexts = self.contexts.borrow();
        let entries = contexts.get(&context)?;
        let found = entries.borrow().get(path).copied();
        found
    }

    pub fn get_global(&self, path: &str) -> Option<NodeId> {
        self.global.borrow().get(path).copied()
    }

    /// Запомнить результат неоднозначного разрешения в кэше контекста.
    pub fn store_context(&self, context: NodeId, path: &str, target: NodeId) {
        let entries = self.context_entries(context);
        entries.borrow_mut().insert(path.to_string(), target);
        self.evict_on_move(&entries, path, target);
    }

    /// Запомнить результат абсолютного разрешения в глобальном кэше.
    pub fn store_global(&self, path: &str, target: NodeId) {
        self.global.borrow_mut().insert(path.to_string(), target);
        self.evict_on_move(&self.global, path, target);
    }

    /// Одноразовая подписка: перенос цели выбивает ровно эту запись,
    /// если её не успело перезаписать более свежее разрешение.
    fn evict_on_move(&self, entries: &PathMap, path: &str, target: NodeId) {
        let weak = Rc::downgrade(entries);
        let path = path.to_string();
        let _ = self.notifier.on_ancestry_changed_once(
            target,
            Box::new(move || {
                if let Some(entries) = weak.upgrade() {
                    let mut entries = entries.borrow_mut();
                    if entries.get(&path) == Some(&target) {
                        entries.remove(&path);
                    }
                }
            }),
        );
    }

    #[cfg(test)]
    fn context_len(&self, context: NodeId) -> usize {
        self.contexts
            .borrow()
            .get(&context)
            .map(|entries| entries.borrow().len())
            .unwrap_or(0)
    }
}

impl Drop for ResolutionCache {
    fn drop(&mut self) {
        for subscription in self.subscriptions.borrow_mut().drain(..) {
            subscription.dispose();
        }
    }
}
