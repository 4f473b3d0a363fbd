//! Подстановка алиасов в путях импорта.
//!
//! Алиас заменяет только первый сегмент пути: `@Utils/StringUtils` при
//! таблице `{"Utils": "Shared/Utilities"}` становится
//! `@Shared/Utilities/StringUtils`. Подстановка выполняется ровно один
//! раз — значения таблицы повторно не разрешаются.

use std::collections::HashMap;

use super::PATH_PREFIX;

/// Разрешить алиас в первом сегменте пути.
///
/// Отсутствие совпадения — не ошибка: путь возвращается без изменений.
pub fn resolve_alias(path: &str, aliases: &HashMap<String, String>) -> String {
    let Some(stripped) = path.strip_prefix(PATH_PREFIX) else {
        return path.to_string();
    };

    let mut segments = stripped.split('/');
    let Some(first) = segments.next() else {
        return path.to_string();
    };

    let Some(replacement) = aliases.get(first) else {
        return path.to_string();
    };

    // Склеиваем замену с остатком исходного пути
    let rest: Vec<&str> = segments.collect();
    if rest.is_empty() {
        format!("{}{}", PATH_PREFIX, replacement)
    } else {
        format!("{}{}/{}", PATH_PREFIX, replacement, rest.join("/"))
    }
}
