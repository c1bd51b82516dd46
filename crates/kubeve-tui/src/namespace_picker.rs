//! Namespace resolution and the fuzzy namespace picker overlay.

use kubeve_core::Scope;

use crate::fuzzy;

const ALL_LABEL: &str = "All namespaces";

/// Resolves user input to a scope: `all` or `*` means every namespace, an
/// exact (case-insensitive) name wins, otherwise the best fuzzy match.
#[must_use]
pub fn resolve_namespace(raw: &str, namespaces: &[String]) -> Option<Scope> {
    let query = raw.trim();
    if query.is_empty() {
        return None;
    }
    if query.eq_ignore_ascii_case("all") || query == "*" {
        return Some(Scope::All);
    }
    if let Some(exact) = namespaces.iter().find(|ns| ns.eq_ignore_ascii_case(query)) {
        return Some(Scope::Namespace(exact.clone()));
    }
    let mut best: Option<(&String, i64)> = None;
    for ns in namespaces {
        let (score, matched) = fuzzy::score(query, ns);
        if matched && best.map_or(true, |(_, top)| score > top) {
            best = Some((ns, score));
        }
    }
    best.map(|(ns, _)| Scope::Namespace(ns.clone()))
}

/// Picker state: the all-namespaces entry plus namespaces matching the query,
/// best match first.
#[derive(Debug, Clone, Default)]
pub struct NamespacePicker {
    namespaces: Vec<String>,
    query: String,
    selected: usize,
    entries: Vec<Scope>,
}

impl NamespacePicker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, namespaces: Vec<String>) {
        self.namespaces = namespaces;
        self.query.clear();
        self.selected = 0;
        self.refresh();
    }

    pub fn push_char(&mut self, ch: char) {
        self.query.push(ch);
        self.selected = 0;
        self.refresh();
    }

    pub fn pop_char(&mut self) {
        self.query.pop();
        self.selected = 0;
        self.refresh();
    }

    pub fn move_selection(&mut self, delta: i32) {
        if self.entries.is_empty() {
            self.selected = 0;
            return;
        }
        let len = i64::try_from(self.entries.len()).unwrap_or(i64::MAX);
        let current = i64::try_from(self.selected).unwrap_or(0);
        let next = (current + i64::from(delta)).rem_euclid(len);
        self.selected = usize::try_from(next).unwrap_or(0);
    }

    #[must_use]
    pub fn accept(&self) -> Option<Scope> {
        self.entries.get(self.selected).cloned()
    }

    fn refresh(&mut self) {
        let query = self.query.trim();
        let mut scored: Vec<(i64, &String)> = self
            .namespaces
            .iter()
            .filter_map(|ns| {
                let (score, matched) = fuzzy::score(query, ns);
                matched.then_some((score, ns))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        let mut entries = Vec::with_capacity(scored.len() + 1);
        if fuzzy::score(query, "all").1 {
            entries.push(Scope::All);
        }
        entries.extend(scored.into_iter().map(|(_, ns)| Scope::Namespace(ns.clone())));
        self.entries = entries;
        if self.selected >= self.entries.len() {
            self.selected = 0;
        }
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn entries(&self) -> &[Scope] {
        &self.entries
    }

    #[must_use]
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn render_lines(&self, width: usize, max_rows: usize) -> Vec<String> {
        if max_rows == 0 {
            return Vec::new();
        }
        let mut lines = vec![truncate(&format!("namespace: {}", self.query), width)];
        let list_rows = max_rows - 1;
        if self.entries.is_empty() {
            if list_rows > 0 {
                lines.push(truncate("  No matches", width));
            }
            return lines;
        }
        let start = (self.selected + 1).saturating_sub(list_rows);
        for (idx, scope) in self.entries.iter().enumerate().skip(start).take(list_rows) {
            let marker = if idx == self.selected { ">" } else { " " };
            let label = scope.namespace().unwrap_or(ALL_LABEL);
            lines.push(truncate(&format!("{marker} {label}"), width));
        }
        lines
    }
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

#[cfg(test)]
mod tests {
    use kubeve_core::Scope;

    use super::{resolve_namespace, NamespacePicker};

    fn namespaces() -> Vec<String> {
        ["default", "kube-system", "kube-public", "payments"]
            .iter()
            .map(|s| (*s).to_string())
            .collect()
    }

    #[test]
    fn resolves_all_exact_and_fuzzy() {
        let list = namespaces();
        assert_eq!(resolve_namespace("", &list), None);
        assert_eq!(resolve_namespace("ALL", &list), Some(Scope::All));
        assert_eq!(resolve_namespace("*", &list), Some(Scope::All));
        assert_eq!(
            resolve_namespace("Default", &list),
            Some(Scope::from_namespace("default"))
        );
        assert_eq!(
            resolve_namespace("ksys", &list),
            Some(Scope::from_namespace("kube-system"))
        );
        assert_eq!(resolve_namespace("zzz", &list), None);
    }

    #[test]
    fn picker_filters_and_accepts() {
        let mut picker = NamespacePicker::new();
        picker.open(namespaces());
        assert_eq!(picker.entries().len(), 5);
        assert_eq!(picker.accept(), Some(Scope::All));

        for ch in "pay".chars() {
            picker.push_char(ch);
        }
        assert_eq!(picker.entries(), [Scope::from_namespace("payments")]);
        assert_eq!(picker.accept(), Some(Scope::from_namespace("payments")));

        picker.pop_char();
        picker.pop_char();
        picker.pop_char();
        picker.move_selection(-1);
        assert_eq!(picker.accept(), Some(Scope::from_namespace("payments")));
        let lines = picker.render_lines(30, 10);
        assert_eq!(lines[0], "namespace: ");
        assert_eq!(lines[1], "  All namespaces");
        assert_eq!(lines[5], "> payments");
    }
}
