//! Drill-down overlay for one selected item.

use kubeve_kube::{DrillDown, DrillDownTarget};
use kubeve_render::render::TextRole;

use crate::app::{action_role, status_role};
use crate::view_model::{ItemSource, ViewItem};

pub const TITLE: &str = "Event Drill-Down";
pub const LOADING: &str = "Loading resource drill-down...";
pub const UNAVAILABLE: &str = "Drill-down unavailable for this row.";
pub const FOOTER: &str = "Esc/q to close. Use arrow keys to scroll.";

/// One overlay line: optional label drawn in the info color, then text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailLine {
    pub label: Option<&'static str>,
    pub text: String,
    pub role: TextRole,
}

impl DetailLine {
    fn field(label: &'static str, text: impl Into<String>, role: TextRole) -> Self {
        Self {
            label: Some(label),
            text: text.into(),
            role,
        }
    }

    fn plain(text: impl Into<String>, role: TextRole) -> Self {
        Self {
            label: None,
            text: text.into(),
            role,
        }
    }

    fn blank() -> Self {
        Self::plain(String::new(), TextRole::Primary)
    }

    /// Label and text as drawn.
    #[must_use]
    pub fn rendered(&self) -> String {
        format!("{}{}", self.label.unwrap_or_default(), self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DrillState {
    Loading,
    Unavailable,
    Loaded(DrillDown),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailsOverlay {
    request_id: u64,
    item: ViewItem,
    target: Option<DrillDownTarget>,
    state: DrillState,
    scroll: usize,
}

impl DetailsOverlay {
    /// Opens the overlay for `item`. Items without a usable `Kind/Name` show
    /// the base fields only.
    #[must_use]
    pub fn open(request_id: u64, item: &ViewItem) -> Self {
        let resource = &item.resource;
        let target = (!resource.kind.trim().is_empty() && !resource.name.trim().is_empty())
            .then(|| DrillDownTarget {
                kind: resource.kind.clone(),
                name: resource.name.clone(),
                namespace: item.namespace.clone(),
            });
        let state = if target.is_some() {
            DrillState::Loading
        } else {
            DrillState::Unavailable
        };
        Self {
            request_id,
            item: item.clone(),
            target,
            state,
            scroll: 0,
        }
    }

    #[must_use]
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Object to fetch, when the overlay is still waiting for it.
    #[must_use]
    pub fn pending_target(&self) -> Option<&DrillDownTarget> {
        match self.state {
            DrillState::Loading => self.target.as_ref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state == DrillState::Loading
    }

    /// Installs a fetched drill-down. Results for another request are
    /// ignored; returns whether it was applied.
    pub fn apply(&mut self, request_id: u64, drilldown: DrillDown) -> bool {
        if request_id != self.request_id || self.state != DrillState::Loading {
            return false;
        }
        self.state = DrillState::Loaded(drilldown);
        true
    }

    pub fn scroll_by(&mut self, delta: isize, viewport: usize) {
        let max = self.lines().len().saturating_sub(viewport);
        self.scroll = self.scroll.saturating_add_signed(delta).min(max);
    }

    #[must_use]
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    #[must_use]
    pub fn lines(&self) -> Vec<DetailLine> {
        let cells = &self.item.cells;
        let status = self.item.event_type;
        let mut lines = vec![
            DetailLine::field("Time:      ", cells.timestamp.clone(), TextRole::Primary),
            DetailLine::field("Resource:  ", cells.resource.clone(), TextRole::Primary),
            DetailLine::field("Namespace: ", cells.namespace.clone(), TextRole::Primary),
            DetailLine::field("Status:    ", status.as_str(), status_role(status)),
            DetailLine::field("Action:    ", cells.action.clone(), action_role(&cells.action)),
        ];
        if let ItemSource::Group { count } = self.item.source {
            lines.push(DetailLine::field("Count:     ", count.to_string(), TextRole::Primary));
        }
        let mut message = cells.message.split('\n');
        lines.push(DetailLine::field(
            "Message:   ",
            message.next().unwrap_or_default(),
            TextRole::Primary,
        ));
        lines.extend(
            message.map(|line| DetailLine::plain(format!("           {line}"), TextRole::Primary)),
        );
        lines.push(DetailLine::blank());

        match &self.state {
            DrillState::Loading => lines.push(DetailLine::plain(LOADING, TextRole::Muted)),
            DrillState::Unavailable => lines.push(DetailLine::plain(UNAVAILABLE, TextRole::Warning)),
            DrillState::Loaded(drilldown) => {
                for (heading, body) in [
                    ("Describe", &drilldown.describe),
                    ("Related Resources", &drilldown.related),
                    ("Recent Logs", &drilldown.logs),
                ] {
                    lines.push(DetailLine::plain(heading, TextRole::Success));
                    lines.extend(
                        body.lines()
                            .map(|line| DetailLine::plain(line, TextRole::Primary)),
                    );
                    lines.push(DetailLine::blank());
                }
                lines.push(DetailLine::plain(FOOTER, TextRole::Muted));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use kubeve_core::{Event, EventType, ResourceRef, Scope};
    use kubeve_kube::DrillDown;

    use super::{DetailsOverlay, FOOTER, LOADING, UNAVAILABLE};
    use crate::view_model::ViewModel;

    fn overlay_for(resource: ResourceRef) -> DetailsOverlay {
        let mut view = ViewModel::new(Scope::All);
        view.ingest(Event {
            timestamp: None,
            resource,
            event_type: EventType::Warning,
            reason: "BackOff".into(),
            namespace: "default".into(),
            message: "first\nsecond".into(),
        });
        DetailsOverlay::open(7, &view.items()[0])
    }

    fn texts(overlay: &DetailsOverlay) -> Vec<String> {
        overlay.lines().iter().map(|line| line.rendered()).collect()
    }

    #[test]
    fn loading_then_loaded() {
        let mut overlay = overlay_for(ResourceRef::new("Pod", "web-1"));
        let target = overlay.pending_target().cloned();
        assert_eq!(
            target.map(|t| (t.kind, t.name, t.namespace)),
            Some(("Pod".into(), "web-1".into(), "default".into()))
        );
        let lines = texts(&overlay);
        assert_eq!(lines[0], "Time:      -");
        assert_eq!(lines[3], "Status:    Warning");
        assert_eq!(lines[5], "Message:   first");
        assert_eq!(lines[6], "           second");
        assert!(lines.contains(&LOADING.to_string()));

        assert!(!overlay.apply(8, DrillDown::default()));
        let drilldown = DrillDown {
            describe: "Pod: web-1".into(),
            related: "none".into(),
            logs: "log line".into(),
        };
        assert!(overlay.apply(7, drilldown));
        assert!(overlay.pending_target().is_none());
        let lines = texts(&overlay);
        assert!(lines.contains(&"Describe".to_string()));
        assert!(lines.contains(&"Related Resources".to_string()));
        assert!(lines.contains(&"Recent Logs".to_string()));
        assert!(lines.contains(&"log line".to_string()));
        assert_eq!(lines.last(), Some(&FOOTER.to_string()));
    }

    #[test]
    fn missing_resource_is_unavailable() {
        let overlay = overlay_for(ResourceRef::new("", ""));
        assert!(overlay.pending_target().is_none());
        assert!(texts(&overlay).contains(&UNAVAILABLE.to_string()));
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let mut overlay = overlay_for(ResourceRef::new("Pod", "web-1"));
        let total = overlay.lines().len();
        overlay.scroll_by(100, 3);
        assert_eq!(overlay.scroll(), total - 3);
        overlay.scroll_by(-100, 3);
        assert_eq!(overlay.scroll(), 0);
    }
}
