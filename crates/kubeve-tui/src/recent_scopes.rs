//! Most-recently-used namespace scopes shown in the header and bound to the
//! number keys.

use kubeve_core::Scope;

pub const MAX_RECENT_SCOPES: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentScopes {
    entries: Vec<String>,
}

impl RecentScopes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `scope` to the front. The all-namespaces scope is not recorded
    /// since it always has its own key.
    pub fn record(&mut self, scope: &Scope) {
        let Some(name) = scope.namespace() else {
            return;
        };
        self.entries.retain(|entry| entry != name);
        self.entries.insert(0, name.to_string());
        self.entries.truncate(MAX_RECENT_SCOPES);
    }

    /// Scope for number key `slot`: 0 is all namespaces, 1.. index the list.
    #[must_use]
    pub fn slot(&self, slot: usize) -> Option<Scope> {
        if slot == 0 {
            return Some(Scope::All);
        }
        self.entries
            .get(slot - 1)
            .map(|name| Scope::Namespace(name.clone()))
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Header lines: `<0> All Namespaces` followed by one per entry.
    #[must_use]
    pub fn header_lines(&self) -> Vec<String> {
        std::iter::once("<0> All Namespaces".to_string())
            .chain(
                self.entries
                    .iter()
                    .enumerate()
                    .map(|(i, name)| format!("<{}> {name}", i + 1)),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use kubeve_core::Scope;

    use super::RecentScopes;

    fn ns(name: &str) -> Scope {
        Scope::from_namespace(name)
    }

    #[test]
    fn bounded_mru_without_duplicates() {
        let mut recent = RecentScopes::new();
        for name in ["a", "b", "c", "a", "d"] {
            recent.record(&ns(name));
        }
        assert_eq!(recent.entries(), ["d", "a", "c"]);
    }

    #[test]
    fn all_namespaces_is_not_recorded() {
        let mut recent = RecentScopes::new();
        recent.record(&ns("a"));
        recent.record(&Scope::All);
        assert_eq!(recent.entries(), ["a"]);
    }

    #[test]
    fn slots_and_header() {
        let mut recent = RecentScopes::new();
        recent.record(&ns("kube-system"));
        recent.record(&ns("default"));
        assert_eq!(recent.slot(0), Some(Scope::All));
        assert_eq!(recent.slot(1), Some(ns("default")));
        assert_eq!(recent.slot(2), Some(ns("kube-system")));
        assert_eq!(recent.slot(3), None);
        assert_eq!(
            recent.header_lines(),
            vec!["<0> All Namespaces", "<1> default", "<2> kube-system"]
        );
    }
}
