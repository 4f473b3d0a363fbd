//! Тестовое дерево контейнеров в памяти.
//!
//! Реализует [`ContainerHost`] и [`AncestryNotifier`] без настоящего
//! хоста: поддерживает перенос узлов, ручную генерацию событий и
//! подменяемые хуки загрузки (для тестов повторного входа и циклов).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ImportError, ImportResult};
use crate::tree::{AncestryNotifier, ContainerHost, NodeId, Subscription};

type LoadHook = Box<dyn Fn() -> ImportResult<String>>;

struct NodeData {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    module: bool,
}

enum ListenerKind {
    Once(Box<dyn FnOnce()>),
    Persistent(Box<dyn FnMut()>),
}

struct Listener {
    id: u64,
    node: NodeId,
    kind: ListenerKind,
}

pub struct MemoryTree {
    nodes: RefCell<HashMap<NodeId, NodeData>>,
    next_id: Cell<NodeId>,
    listeners: Rc<RefCell<Vec<Listener>>>,
    next_listener: Cell<u64>,
    load_hooks: RefCell<HashMap<NodeId, LoadHook>>,
    /// Журнал вызовов load (для проверки прохождения через примитив хоста).
    load_log: RefCell<Vec<NodeId>>,
}

impl MemoryTree {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            nodes: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_listener: Cell::new(1),
            load_hooks: RefCell::new(HashMap::new()),
            load_log: RefCell::new(Vec::new()),
        })
    }

    /// Добавить узел. `parent == None` создаёт корень.
    pub fn add_node(&self, parent: Option<NodeId>, name: &str, module: bool) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let mut nodes = self.nodes.borrow_mut();
        nodes.insert(
            id,
            NodeData {
                name: name.to_string(),
                parent,
                children: Vec::new(),
                module,
            },
        );
        if let Some(parent) = parent {
            if let Some(data) = nodes.get_mut(&parent) {
                data.children.push(id);
            }
        }
        id
    }

    pub fn add_container(&self, parent: Option<NodeId>, name: &str) -> NodeId {
        self.add_node(parent, name, false)
    }

    pub fn add_module(&self, parent: Option<NodeId>, name: &str) -> NodeId {
        self.add_node(parent, name, true)
    }

    /// Перенести узел. Событие изменения положения получает сам узел
    /// и все его потомки.
    pub fn reparent(&self, node: NodeId, new_parent: Option<NodeId>) {
        {
            let mut nodes = self.nodes.borrow_mut();
            let old_parent = nodes.get(&node).and_then(|data| data.parent);
            if let Some(old) = old_parent {
                if let Some(data) = nodes.get_mut(&old) {
                    data.children.retain(|&child| child != node);
                }
            }
            if let Some(data) = nodes.get_mut(&node) {
                data.parent = new_parent;
            }
            if let Some(new) = new_parent {
                if let Some(data) = nodes.get_mut(&new) {
                    data.children.push(node);
                }
            }
        }

        for id in self.subtree(node) {
            self.fire_ancestry_changed(id);
        }
    }

    /// Все узлы поддерева, включая сам узел.
    fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut result = vec![node];
        let mut index = 0;
        while index < result.len() {
            let current = result[index];
            index += 1;
            if let Some(data) = self.nodes.borrow().get(&current) {
                result.extend(data.children.iter().copied());
            }
        }
        result
    }

    /// Вручную сгенерировать событие изменения положения узла.
    pub fn fire_ancestry_changed(&self, node: NodeId) {
        let mut fired = Vec::new();
        {
            let mut listeners = self.listeners.borrow_mut();
            let mut index = 0;
            while index < listeners.len() {
                if listeners[index].node == node {
                    fired.push(listeners.remove(index));
                } else {
                    index += 1;
                }
            }
        }

        for listener in fired {
            match listener.kind {
                ListenerKind::Once(callback) => callback(),
                ListenerKind::Persistent(mut callback) => {
                    callback();
                    // Постоянные подписки возвращаются на место
                    self.listeners.borrow_mut().push(Listener {
                        id: listener.id,
                        node: listener.node,
                        kind: ListenerKind::Persistent(callback),
                    });
                }
            }
        }
    }

    /// Подменить загрузку узла (например, чтобы внутри load дёрнуть
    /// вложенный import).
    pub fn set_load_hook(&self, node: NodeId, hook: impl Fn() -> ImportResult<String> + 'static) {
        self.load_hooks.borrow_mut().insert(node, Box::new(hook));
    }

    /// Сколько раз вызывался load для узла.
    pub fn load_count(&self, node: NodeId) -> usize {
        self.load_log
            .borrow()
            .iter()
            .filter(|&&id| id == node)
            .count()
    }

    /// Сколько активных подписок висит на дереве.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    fn subscribe(&self, node: NodeId, kind: ListenerKind) -> Subscription {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push(Listener { id, node, kind });

        let listeners = Rc::clone(&self.listeners);
        Subscription::new(move || {
            listeners.borrow_mut().retain(|listener| listener.id != id);
        })
    }
}

impl ContainerHost for MemoryTree {
    type Value = String;

    fn node_name(&self, node: NodeId) -> String {
        self.nodes
            .borrow()
            .get(&node)
            .map(|data| data.name.clone())
            .unwrap_or_default()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(&node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(&node).and_then(|data| data.parent)
    }

    fn is_module(&self, node: NodeId) -> bool {
        self.nodes
            .borrow()
            .get(&node)
            .map(|data| data.module)
            .unwrap_or(false)
    }

    fn load(&self, node: NodeId) -> ImportResult<String> {
        self.load_log.borrow_mut().push(node);

        let hook_result = {
            let hooks = self.load_hooks.borrow();
            hooks.get(&node).map(|hook| hook())
        };
        if let Some(result) = hook_result {
            return result;
        }

        if !self.is_module(node) {
            return Err(ImportError::LoadError(format!(
                "node {} is not loadable",
                node
            )));
        }
        Ok(format!("loaded:{}", self.node_name(node)))
    }

    fn load_raw(&self, path: &str) -> ImportResult<String> {
        Ok(format!("raw:{}", path))
    }

    fn full_name(&self, node: NodeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            parts.push(self.node_name(id));
            current = self.parent(id);
        }
        parts.reverse();
        parts.join(".")
    }
}

impl AncestryNotifier for MemoryTree {
    fn on_ancestry_changed_once(&self, node: NodeId, callback: Box<dyn FnOnce()>) -> Subscription {
        self.subscribe(node, ListenerKind::Once(callback))
    }

    fn on_ancestry_changed(&self, node: NodeId, callback: Box<dyn FnMut()>) -> Subscription {
        self.subscribe(node, ListenerKind::Persistent(callback))
    }
}
