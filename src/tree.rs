//! Интерфейс дерева контейнеров хоста.
//!
//! Резолвер не владеет деревом — он видит узлы как непрозрачные
//! идентификаторы и запрашивает у хоста имена, детей, родителей и
//! загрузку модулей. События изменения положения узлов приходят через
//! отдельный интерфейс подписки ([`AncestryNotifier`]), чтобы слой кэша
//! можно было тестировать на фейковом нотификаторе без настоящего дерева.

use crate::error::ImportResult;

/// Уникальный идентификатор узла в дереве контейнеров.
pub type NodeId = u64;

/// Интерфейс дерева контейнеров, предоставляемый хостом.
///
/// Порядок, возвращаемый [`children`](ContainerHost::children), значим:
/// при нескольких структурно возможных совпадениях выигрывает первое
/// в порядке перечисления детей.
pub trait ContainerHost {
    /// Значение, которое возвращает примитив загрузки хоста.
    type Value: Clone;

    /// Имя узла.
    fn node_name(&self, node: NodeId) -> String;

    /// Дети узла в порядке перечисления хоста.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Родитель узла (None для корня дерева).
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Является ли узел загружаемым модулем (а не просто контейнером).
    fn is_module(&self, node: NodeId) -> bool;

    /// Загрузить модуль. Мемоизация загрузки — забота хоста.
    fn load(&self, node: NodeId) -> ImportResult<Self::Value>;

    /// Загрузить по сырой строке (семантика хоста по умолчанию,
    /// для строк без префикса `@`).
    fn load_raw(&self, path: &str) -> ImportResult<Self::Value>;

    /// Полное квалифицированное имя узла (только для диагностики).
    fn full_name(&self, node: NodeId) -> String;
}

/// Интерфейс подписки на изменение положения узла в дереве.
pub trait AncestryNotifier {
    /// Одноразовая подписка: callback вызывается при первом изменении
    /// положения узла, после чего подписка снимается.
    fn on_ancestry_changed_once(
        &self,
        node: NodeId,
        callback: Box<dyn FnOnce()>,
    ) -> Subscription;

    /// Постоянная подписка: callback вызывается при каждом изменении
    /// положения узла, пока подписка не отменена.
    fn on_ancestry_changed(&self, node: NodeId, callback: Box<dyn FnMut()>) -> Subscription;
}

/// Хэндл подписки на события дерева.
///
/// Отмена — явная, через [`dispose`](Subscription::dispose). Простое
/// уничтожение хэндла подписку не снимает.
pub struct Subscription {
    disposer: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Создать хэндл с функцией отмены.
    pub fn new(disposer: impl FnOnce() + 'static) -> Self {
        Self {
            disposer: Some(Box::new(disposer)),
        }
    }

    /// Создать пустой хэндл (подписка уже не активна).
    pub fn empty() -> Self {
        Self { disposer: None }
    }

    /// Отменить подписку.
    pub fn dispose(mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.disposer.is_some())
            .finish()
    }
}
