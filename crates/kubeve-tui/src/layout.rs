//! Column set, width budgeting and message word-wrap.

/// Table columns in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Timestamp,
    Namespace,
    Status,
    Action,
    Resource,
    Message,
}

impl Column {
    pub const ALL: [Self; 6] = [
        Self::Timestamp,
        Self::Namespace,
        Self::Status,
        Self::Action,
        Self::Resource,
        Self::Message,
    ];

    /// Expansion weight used when splitting the table width.
    #[must_use]
    pub fn weight(self) -> usize {
        match self {
            Self::Resource => 2,
            Self::Message => 5,
            _ => 1,
        }
    }

    /// Header label; aggregate mode relabels three columns.
    #[must_use]
    pub fn title(self, aggregate: bool) -> &'static str {
        match (self, aggregate) {
            (Self::Timestamp, false) => "TIME",
            (Self::Timestamp, true) => "LAST SEEN",
            (Self::Namespace, _) => "NAMESPACE",
            (Self::Status, false) => "STATUS",
            (Self::Status, true) => "COUNT",
            (Self::Action, _) => "ACTION",
            (Self::Resource, _) => "RESOURCE",
            (Self::Message, false) => "MESSAGE",
            (Self::Message, true) => "LAST MESSAGE",
        }
    }

    /// Key that toggles the column's visibility.
    #[must_use]
    pub fn toggle_key(self) -> Option<char> {
        match self {
            Self::Timestamp => Some('T'),
            Self::Namespace => Some('N'),
            Self::Status => Some('S'),
            Self::Action => Some('A'),
            Self::Resource => Some('R'),
            Self::Message => None,
        }
    }

    #[must_use]
    pub fn from_toggle_key(key: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|column| column.toggle_key() == Some(key))
    }

    fn index(self) -> usize {
        match self {
            Self::Timestamp => 0,
            Self::Namespace => 1,
            Self::Status => 2,
            Self::Action => 3,
            Self::Resource => 4,
            Self::Message => 5,
        }
    }
}

/// Per-column visibility. The message column is always shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSet {
    visible: [bool; 6],
}

impl Default for ColumnSet {
    fn default() -> Self {
        Self::all()
    }
}

impl ColumnSet {
    #[must_use]
    pub fn all() -> Self {
        Self { visible: [true; 6] }
    }

    #[must_use]
    pub fn is_visible(&self, column: Column) -> bool {
        self.visible[column.index()]
    }

    pub fn set_visible(&mut self, column: Column, visible: bool) {
        if column == Column::Message {
            return;
        }
        self.visible[column.index()] = visible;
    }

    pub fn toggle(&mut self, column: Column) {
        let visible = self.is_visible(column);
        self.set_visible(column, !visible);
    }

    /// Visible columns in display order.
    #[must_use]
    pub fn visible(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|column| self.is_visible(*column))
            .collect()
    }
}

/// Column separator drawn between cells.
pub const SEPARATOR: &str = " │ ";
const SEPARATOR_WIDTH: usize = 3;

pub const MIN_MESSAGE_WIDTH: usize = 20;
/// Message budget when the table width is not known yet.
pub const DEFAULT_MESSAGE_WIDTH: usize = 80;

fn usable_width(columns: &ColumnSet, width: usize) -> (usize, usize) {
    let visible = columns.visible();
    let separators = visible.len().saturating_sub(1) * SEPARATOR_WIDTH;
    let total_weight = visible.iter().map(|c| c.weight()).sum();
    (width.saturating_sub(separators), total_weight)
}

/// Message column budget: its weighted share of the width left after
/// separators, never below [`MIN_MESSAGE_WIDTH`].
#[must_use]
pub fn message_width(columns: &ColumnSet, width: Option<usize>) -> usize {
    let Some(width) = width.filter(|w| *w > 0) else {
        return DEFAULT_MESSAGE_WIDTH;
    };
    let (usable, total_weight) = usable_width(columns, width);
    if total_weight == 0 {
        return usable.max(MIN_MESSAGE_WIDTH);
    }
    (usable * Column::Message.weight() / total_weight).max(MIN_MESSAGE_WIDTH)
}

/// Widths for every visible column. The message column gets its
/// [`message_width`] budget first so wrapped lines are never clipped; the
/// other columns split what is left by weight and rounding slack goes back
/// to the message column.
#[must_use]
pub fn column_widths(columns: &ColumnSet, width: usize) -> Vec<(Column, usize)> {
    let (usable, total_weight) = usable_width(columns, width);
    if total_weight == 0 {
        return Vec::new();
    }
    let message = if width == 0 {
        0
    } else {
        message_width(columns, Some(width))
    };
    let remaining = usable.saturating_sub(message);
    let other_weight = total_weight - Column::Message.weight();

    let mut widths: Vec<(Column, usize)> = columns
        .visible()
        .into_iter()
        .map(|column| {
            let w = if column == Column::Message || other_weight == 0 {
                0
            } else {
                remaining * column.weight() / other_weight
            };
            (column, w)
        })
        .collect();
    let used: usize = widths.iter().map(|(_, w)| *w).sum();
    for (column, w) in &mut widths {
        if *column == Column::Message {
            *w = message.max(usable.saturating_sub(used));
        }
    }
    widths
}

/// Greedy word-wrap of one paragraph. Words longer than `width` are split
/// at the boundary.
#[must_use]
pub fn wrap_line(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        if chars.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            while chars.len() > width {
                let rest = chars.split_off(width);
                lines.push(chars.into_iter().collect());
                chars = rest;
            }
            current = chars.iter().collect();
            current_len = chars.len();
            continue;
        }
        let word_len = chars.len();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
            current_len = word_len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Wraps a possibly multi-line message. Each newline starts a paragraph;
/// blank paragraphs stay as empty lines.
#[must_use]
pub fn wrap_message(text: &str, width: usize) -> Vec<String> {
    text.split('\n')
        .flat_map(|paragraph| {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                vec![String::new()]
            } else {
                wrap_line(paragraph, width)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        column_widths, message_width, wrap_line, wrap_message, Column, ColumnSet,
        DEFAULT_MESSAGE_WIDTH, MIN_MESSAGE_WIDTH,
    };

    #[test]
    fn message_width_uses_weighted_share() {
        let columns = ColumnSet::all();
        // 6 columns -> 5 separators (15), weights sum to 11.
        assert_eq!(message_width(&columns, Some(125)), 110 * 5 / 11);
        assert_eq!(message_width(&columns, None), DEFAULT_MESSAGE_WIDTH);
        assert_eq!(message_width(&columns, Some(0)), DEFAULT_MESSAGE_WIDTH);
        assert_eq!(message_width(&columns, Some(30)), MIN_MESSAGE_WIDTH);
    }

    #[test]
    fn hidden_columns_free_width_for_message() {
        let mut columns = ColumnSet::all();
        for column in [Column::Timestamp, Column::Namespace, Column::Status, Column::Action] {
            columns.toggle(column);
        }
        // resource + message: one separator, weights 2 + 5.
        assert_eq!(message_width(&columns, Some(73)), 70 * 5 / 7);
    }

    #[test]
    fn message_column_cannot_be_hidden() {
        let mut columns = ColumnSet::all();
        columns.toggle(Column::Message);
        assert!(columns.is_visible(Column::Message));
        columns.toggle(Column::Resource);
        assert_eq!(
            columns.visible(),
            vec![
                Column::Timestamp,
                Column::Namespace,
                Column::Status,
                Column::Action,
                Column::Message
            ]
        );
    }

    #[test]
    fn column_widths_fill_the_row() {
        let columns = ColumnSet::all();
        let widths = column_widths(&columns, 125);
        let total: usize = widths.iter().map(|(_, w)| *w).sum();
        assert_eq!(total, 110);
        assert_eq!(widths[4], (Column::Resource, 20));
        assert_eq!(widths[5], (Column::Message, 50));
    }

    #[test]
    fn narrow_tables_keep_the_message_budget() {
        let columns = ColumnSet::all();
        let widths = column_widths(&columns, 40);
        // 25 usable cells; the message keeps its floor plus rounding slack.
        assert_eq!(widths[5], (Column::Message, 24));
        assert!(widths[5].1 >= MIN_MESSAGE_WIDTH);
        let total: usize = widths.iter().map(|(_, w)| *w).sum();
        assert_eq!(total, 40 - 15);
    }

    #[test]
    fn wrapped_lines_fit_the_drawn_message_column() {
        let text = "aaaaaaaaaaaaaaaaaaaa bbbb Back-off restarting failed container app";
        let mut hidden = ColumnSet::all();
        hidden.toggle(Column::Namespace);
        for columns in [ColumnSet::all(), hidden] {
            for width in 30..=200 {
                let drawn = column_widths(&columns, width)
                    .into_iter()
                    .find(|(column, _)| *column == Column::Message)
                    .map(|(_, w)| w)
                    .unwrap_or_default();
                let budget = message_width(&columns, Some(width));
                assert!(drawn >= budget, "width {width}: drawn {drawn} < budget {budget}");
                for line in wrap_message(text, budget) {
                    assert!(line.chars().count() <= drawn, "width {width}: {line:?}");
                }
            }
        }
    }

    #[test]
    fn wrap_packs_words_greedily() {
        assert_eq!(
            wrap_line("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
    }

    #[test]
    fn wrap_hard_splits_long_words() {
        assert_eq!(
            wrap_line("ab abcdefghij k", 4),
            vec!["ab", "abcd", "efgh", "ij k"]
        );
    }

    #[test]
    fn wrap_keeps_blank_paragraphs() {
        assert_eq!(
            wrap_message("first line\n\nsecond", 20),
            vec!["first line", "", "second"]
        );
        assert_eq!(wrap_message("", 20), vec![""]);
    }

    #[test]
    fn wrap_round_trips_word_sequence() {
        let text = "Back-off restarting failed container app in pod web-1_default(1234) \
                    because the readiness probe failed with status code 503";
        for width in [8, 13, 20, 40, 200] {
            let lines = wrap_line(text, width);
            assert!(lines.iter().all(|line| line.chars().count() <= width));
            let rejoined = lines.join(" ");
            let original: Vec<&str> = text.split_whitespace().collect();
            let words: Vec<&str> = rejoined.split_whitespace().collect();
            if original.iter().all(|w| w.chars().count() <= width) {
                assert_eq!(words, original, "width {width}");
            } else {
                assert_eq!(words.concat(), original.concat(), "width {width}");
            }
        }
    }
}
