//! Поисковые алгоритмы по дереву контейнеров.
//!
//! Два алгоритма: поиск абсолютного пути в ширину по индексам сегментов
//! ([`SearchSession::bfs_find_path`]) и поиск неоднозначного имени
//! вниз-затем-вверх от контекста ([`SearchSession::search_for_module`]).
//! Оба уважают предикат исключения, ограничение глубины и настройку
//! регистра. Исчерпание глубины — не ошибка, а "не найдено".

use std::collections::{HashSet, VecDeque};

use super::{names_equal, ImportConfig};
use crate::tree::{ContainerHost, NodeId};

/// Сессия поиска: хост, конфигурация и memo-структуры одного вызова.
pub struct SearchSession<'a, H: ContainerHost> {
    host: &'a H,
    config: &'a ImportConfig,
    /// Узлы, уже обработанные поиском вниз (живёт весь вызов
    /// `search_for_module`, чтобы шаг вверх не перепроверял поддерево).
    searched: HashSet<NodeId>,
}

impl<'a, H: ContainerHost> SearchSession<'a, H> {
    pub fn new(host: &'a H, config: &'a ImportConfig) -> Self {
        Self {
            host,
            config,
            searched: HashSet::new(),
        }
    }

    fn matches(&self, name: &str, segment: &str) -> bool {
        names_equal(name, segment, self.config.case_sensitive)
    }

    /// Поиск пути в ширину от корня.
    ///
    /// Очередь хранит пары (узел, индекс сегмента): совпавший ребёнок
    /// продвигает индекс, несовпавший и не исключённый встаёт в очередь
    /// с тем же индексом. Поэтому сегменты пути могут "перешагивать"
    /// промежуточные группирующие контейнеры, не названные в пути.
    /// При нескольких совпадениях выигрывает первое в порядке
    /// перечисления детей.
    pub fn bfs_find_path(
        &mut self,
        root: NodeId,
        segments: &[String],
        first: usize,
    ) -> Option<NodeId> {
        if first >= segments.len() {
            return None;
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(root);
        queue.push_back((root, first, 0usize));

        while let Some((node, index, depth)) = queue.pop_front() {
            if depth >= self.config.max_search_depth {
                continue;
            }

            for child in self.host.children(node) {
                if visited.contains(&child) {
                    continue;
                }
                let child_name = self.host.node_name(child);

                if self.matches(&child_name, &segments[index]) {
                    if index == segments.len() - 1 {
                        if self.host.is_module(child) {
                            return Some(child);
                        }
                    } else {
                        visited.insert(child);
                        queue.push_back((child, index + 1, depth + 1));
                    }
                } else if !self.config.is_ignored(child, &child_name) {
                    visited.insert(child);
                    queue.push_back((child, index, depth + 1));
                }
            }
        }

        None
    }

    /// Поиск неоднозначного имени: вниз от текущей позиции, затем шаг
    /// к родителю и снова вниз, до первого корневого контейнера
    /// включительно.
    pub fn search_for_module(&mut self, origin: NodeId, name: &str) -> Option<NodeId> {
        let boundary: HashSet<NodeId> = self.config.ancestor_ids().into_iter().collect();

        let mut current = origin;
        let mut steps = 0;
        loop {
            if let Some(found) = self.search_down(current, name, 0) {
                return Some(found);
            }
            // Граница ищется, но выше неё не поднимаемся
            if boundary.contains(&current) {
                return None;
            }
            current = self.host.parent(current)?;

            steps += 1;
            if steps > self.config.max_search_depth {
                return None;
            }
        }
    }

    /// Исчерпывающий поиск вниз: сначала прямые дети, затем рекурсия
    /// в не исключённые поддеревья.
    fn search_down(&mut self, node: NodeId, name: &str, depth: usize) -> Option<NodeId> {
        if depth >= self.config.max_search_depth {
            return None;
        }
        if !self.searched.insert(node) {
            return None;
        }

        let children = self.host.children(node);

        for &child in &children {
            let child_name = self.host.node_name(child);
            if self.matches(&child_name, name) && self.host.is_module(child) {
                return Some(child);
            }
        }

        for &child in &children {
            let child_name = self.host.node_name(child);
            if !self.config.is_ignored(child, &child_name) {
                if let Some(found) = self.search_down(child, name, depth + 1) {
                    return Some(found);
                }
            }
        }

        None
    }

    /// Перебор запасных корней: каждый корень ищется не более одного
    /// раза, выигрывает первое попадание в порядке списка.
    pub fn search_roots(&mut self, roots: &[NodeId], segments: &[String]) -> Option<NodeId> {
        let mut tried = HashSet::new();
        for &root in roots {
            if !tried.insert(root) {
                continue;
            }
            if let Some(found) = self.bfs_find_path(root, segments, 0) {
                return Some(found);
            }
        }
        None
    }
}
