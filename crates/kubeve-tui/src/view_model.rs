//! Event log → (aggregate) → filter → projection → (wrap) → rows.
//!
//! Rows carry a back-reference into the item list they were generated from
//! and are rebuilt wholesale on every refresh. The only incremental path is
//! raw, unwrapped ingestion, which appends exactly the row a full refresh
//! would have produced.

use kubeve_core::event::format_timestamp;
use kubeve_core::{Event, EventType, ResourceRef, Scope, WatchGeneration};

use crate::aggregate::{aggregate, AggregatedGroup};
use crate::event_log::EventLog;
use crate::layout::{message_width, wrap_message, Column, ColumnSet, SEPARATOR};

// ---------------------------------------------------------------------------
// Items and rows
// ---------------------------------------------------------------------------

/// Formatted cell text for one item, in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCells {
    pub timestamp: String,
    pub namespace: String,
    pub status: String,
    pub action: String,
    pub resource: String,
    pub message: String,
}

impl RowCells {
    #[must_use]
    pub fn cell(&self, column: Column) -> &str {
        match column {
            Column::Timestamp => &self.timestamp,
            Column::Namespace => &self.namespace,
            Column::Status => &self.status,
            Column::Action => &self.action,
            Column::Resource => &self.resource,
            Column::Message => &self.message,
        }
    }

    /// Every column joined with the table separator. Filtering and fuzzy
    /// jump match against this text regardless of column visibility.
    #[must_use]
    pub fn line(&self) -> String {
        Column::ALL
            .iter()
            .map(|column| self.cell(*column))
            .collect::<Vec<_>>()
            .join(SEPARATOR)
    }
}

/// Where a view item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSource {
    /// Position in the event log.
    Event(usize),
    /// Aggregated group with this many events.
    Group { count: usize },
}

/// Identity of an item that survives re-sorting: the log position for raw
/// rows, the group key for aggregated ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKey {
    Event(usize),
    Group {
        namespace: String,
        resource: ResourceRef,
        reason: String,
    },
}

/// One filtered (and possibly aggregated) entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewItem {
    pub cells: RowCells,
    pub event_type: EventType,
    pub resource: ResourceRef,
    pub namespace: String,
    pub source: ItemSource,
}

impl ViewItem {
    fn from_event(index: usize, event: &Event) -> Self {
        Self {
            cells: RowCells {
                timestamp: event.timestamp_text(),
                namespace: event.namespace.clone(),
                status: event.event_type.to_string(),
                action: event.reason.clone(),
                resource: event.resource.to_string(),
                message: event.message.clone(),
            },
            event_type: event.event_type,
            resource: event.resource.clone(),
            namespace: event.namespace.clone(),
            source: ItemSource::Event(index),
        }
    }

    #[must_use]
    pub fn key(&self) -> ItemKey {
        match self.source {
            ItemSource::Event(index) => ItemKey::Event(index),
            ItemSource::Group { .. } => ItemKey::Group {
                namespace: self.namespace.clone(),
                resource: self.resource.clone(),
                reason: self.cells.action.clone(),
            },
        }
    }

    fn from_group(group: AggregatedGroup) -> Self {
        Self {
            cells: RowCells {
                timestamp: format_timestamp(group.last_seen),
                namespace: group.namespace.clone(),
                status: group.count.to_string(),
                action: group.reason,
                resource: group.resource.to_string(),
                message: group.last_message,
            },
            event_type: group.last_type,
            resource: group.resource,
            namespace: group.namespace,
            source: ItemSource::Group { count: group.count },
        }
    }
}

/// One rendered table line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    /// Index into [`ViewModel::items`].
    pub item: usize,
    /// Wrap continuation lines only carry the message column.
    pub continuation: bool,
    pub cells: Vec<(Column, String)>,
}

impl ViewRow {
    #[must_use]
    pub fn cell(&self, column: Column) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, text)| text.as_str())
    }
}

/// Jump/palette candidate for one item, anchored at its first row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCandidate {
    pub item: usize,
    pub row: usize,
    pub text: String,
}

// ---------------------------------------------------------------------------
// ViewModel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ViewModel {
    log: EventLog,
    scope: Scope,
    filter: String,
    aggregate: bool,
    wrap: bool,
    columns: ColumnSet,
    width: Option<usize>,
    items: Vec<ViewItem>,
    rows: Vec<ViewRow>,
}

impl ViewModel {
    #[must_use]
    pub fn new(scope: Scope) -> Self {
        Self {
            log: EventLog::new(),
            scope,
            filter: String::new(),
            aggregate: false,
            wrap: false,
            columns: ColumnSet::all(),
            width: None,
            items: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Starts over for a new subscription: clears the log and rebinds it.
    pub fn reset(&mut self, scope: Scope, generation: WatchGeneration) {
        self.scope = scope;
        self.log.reset(generation);
        self.refresh();
    }

    /// Records `event`. In raw unwrapped mode a visible event is appended as
    /// one row; otherwise everything is recomputed. Returns whether the row
    /// list changed.
    pub fn ingest(&mut self, event: Event) -> bool {
        let index = self.log.push(event);
        if self.aggregate || self.wrap {
            self.refresh();
            return true;
        }
        let Some(event) = self.log.get(index) else {
            return false;
        };
        let item = ViewItem::from_event(index, event);
        if !self.visible(&item) {
            return false;
        }
        let item_index = self.items.len();
        self.rows.push(ViewRow {
            item: item_index,
            continuation: false,
            cells: self.project_line(&item.cells, flatten(&item.cells.message)),
        });
        self.items.push(item);
        true
    }

    /// Rebuilds items and rows from the event log.
    pub fn refresh(&mut self) {
        let candidates: Vec<ViewItem> = if self.aggregate {
            aggregate(
                self.log
                    .events()
                    .iter()
                    .filter(|event| self.scope.contains(&event.namespace)),
            )
            .into_iter()
            .map(ViewItem::from_group)
            .collect()
        } else {
            self.log
                .events()
                .iter()
                .enumerate()
                .map(|(index, event)| ViewItem::from_event(index, event))
                .collect()
        };
        self.items = candidates
            .into_iter()
            .filter(|item| self.visible(item))
            .collect();

        let budget = message_width(&self.columns, self.width);
        let mut rows = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.iter().enumerate() {
            if !self.wrap {
                rows.push(ViewRow {
                    item: index,
                    continuation: false,
                    cells: self.project_line(&item.cells, flatten(&item.cells.message)),
                });
                continue;
            }
            let mut lines = wrap_message(&item.cells.message, budget).into_iter();
            let first = lines.next().unwrap_or_default();
            rows.push(ViewRow {
                item: index,
                continuation: false,
                cells: self.project_line(&item.cells, first),
            });
            for line in lines {
                rows.push(ViewRow {
                    item: index,
                    continuation: true,
                    cells: vec![(Column::Message, line)],
                });
            }
        }
        self.rows = rows;
    }

    fn visible(&self, item: &ViewItem) -> bool {
        self.scope.contains(&item.namespace) && item.cells.line().contains(&self.filter)
    }

    fn project_line(&self, cells: &RowCells, message: String) -> Vec<(Column, String)> {
        self.columns
            .visible()
            .into_iter()
            .map(|column| match column {
                Column::Message => (column, message.clone()),
                other => (other, cells.cell(other).to_string()),
            })
            .collect()
    }

    // -- settings --------------------------------------------------------

    pub fn set_filter(&mut self, filter: &str) {
        if self.filter != filter {
            filter.clone_into(&mut self.filter);
            self.refresh();
        }
    }

    pub fn set_aggregate(&mut self, enabled: bool) {
        if self.aggregate != enabled {
            self.aggregate = enabled;
            self.refresh();
        }
    }

    pub fn set_wrap(&mut self, enabled: bool) {
        if self.wrap != enabled {
            self.wrap = enabled;
            self.refresh();
        }
    }

    pub fn set_columns(&mut self, columns: ColumnSet) {
        if self.columns != columns {
            self.columns = columns;
            self.refresh();
        }
    }

    pub fn toggle_column(&mut self, column: Column) {
        let mut columns = self.columns;
        columns.toggle(column);
        self.set_columns(columns);
    }

    /// Table content width. Only wrapped rows depend on it.
    pub fn set_width(&mut self, width: Option<usize>) {
        if self.width != width {
            self.width = width;
            if self.wrap {
                self.refresh();
            }
        }
    }

    // -- accessors -------------------------------------------------------

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    #[must_use]
    pub fn aggregate_enabled(&self) -> bool {
        self.aggregate
    }

    #[must_use]
    pub fn wrap_enabled(&self) -> bool {
        self.wrap
    }

    #[must_use]
    pub fn columns(&self) -> ColumnSet {
        self.columns
    }

    #[must_use]
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    #[must_use]
    pub fn items(&self) -> &[ViewItem] {
        &self.items
    }

    #[must_use]
    pub fn rows(&self) -> &[ViewRow] {
        &self.rows
    }

    #[must_use]
    pub fn item_for_row(&self, row: usize) -> Option<&ViewItem> {
        self.rows.get(row).and_then(|r| self.items.get(r.item))
    }

    #[must_use]
    pub fn first_row_of_item(&self, item: usize) -> Option<usize> {
        self.rows.iter().position(|row| row.item == item)
    }

    /// Current first row of the item identified by `key`.
    #[must_use]
    pub fn row_of(&self, key: &ItemKey) -> Option<usize> {
        let item = self.items.iter().position(|item| item.key() == *key)?;
        self.first_row_of_item(item)
    }

    /// One candidate per item, anchored at its first rendered row.
    #[must_use]
    pub fn row_candidates(&self) -> Vec<RowCandidate> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.continuation)
            .filter_map(|(row_index, row)| {
                self.items.get(row.item).map(|item| RowCandidate {
                    item: row.item,
                    row: row_index,
                    text: item.cells.line(),
                })
            })
            .collect()
    }
}

fn flatten(message: &str) -> String {
    message.split_whitespace().collect::<Vec<_>>().join(" ")
}
