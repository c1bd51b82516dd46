//! Command palette: direct command invocation or a merged, ranked list of
//! fuzzy matches over commands and visible rows.

use crate::fuzzy;
use crate::view_model::{ItemKey, ViewModel};

/// Boost applied to command matches so they rank above rows of similar
/// quality.
const COMMAND_BOOST: i64 = 50;
/// Result cap when the query is empty.
const EMPTY_QUERY_LIMIT: usize = 20;
const JUMP_LABEL_LIMIT: usize = 120;

// ---------------------------------------------------------------------------
// Command registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaletteCommand {
    Namespace,
    AllNamespaces,
    Filter,
    ClearFilter,
    Jump,
    Wrap,
    Aggregate,
    Autoscroll,
    Theme,
    Columns,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: PaletteCommand,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    pub takes_argument: bool,
}

impl CommandSpec {
    fn search_text(&self) -> String {
        let mut text = self.name.to_string();
        for alias in self.aliases {
            text.push(' ');
            text.push_str(alias);
        }
        text.push(' ');
        text.push_str(self.description);
        text
    }

    fn answers_to(&self, token: &str) -> bool {
        self.name.eq_ignore_ascii_case(token)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(token))
    }
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: PaletteCommand::Namespace,
        name: "ns",
        aliases: &["namespace"],
        description: "Switch namespace: ns <name> (or ns all).",
        takes_argument: true,
    },
    CommandSpec {
        command: PaletteCommand::AllNamespaces,
        name: "all",
        aliases: &["ns-all"],
        description: "Switch to all namespaces.",
        takes_argument: false,
    },
    CommandSpec {
        command: PaletteCommand::Filter,
        name: "filter",
        aliases: &["f"],
        description: "Set filter text: filter <text>.",
        takes_argument: true,
    },
    CommandSpec {
        command: PaletteCommand::ClearFilter,
        name: "clear",
        aliases: &["clear-filter"],
        description: "Clear current filter.",
        takes_argument: false,
    },
    CommandSpec {
        command: PaletteCommand::Jump,
        name: "jump",
        aliases: &["j"],
        description: "Fuzzy jump to event row: jump <query>.",
        takes_argument: true,
    },
    CommandSpec {
        command: PaletteCommand::Wrap,
        name: "wrap",
        aliases: &[],
        description: "Toggle wrapped messages.",
        takes_argument: false,
    },
    CommandSpec {
        command: PaletteCommand::Aggregate,
        name: "aggregate",
        aliases: &["agg"],
        description: "Toggle event aggregation mode.",
        takes_argument: false,
    },
    CommandSpec {
        command: PaletteCommand::Autoscroll,
        name: "autoscroll",
        aliases: &["follow"],
        description: "Toggle autoscroll mode.",
        takes_argument: false,
    },
    CommandSpec {
        command: PaletteCommand::Theme,
        name: "theme",
        aliases: &[],
        description: "Apply and save a theme: theme <name>.",
        takes_argument: true,
    },
    CommandSpec {
        command: PaletteCommand::Columns,
        name: "columns",
        aliases: &["cols"],
        description: "Toggle a column (T/N/S/A/R) or show all: columns [key].",
        takes_argument: true,
    },
    CommandSpec {
        command: PaletteCommand::Quit,
        name: "quit",
        aliases: &["exit"],
        description: "Quit kubeve.",
        takes_argument: false,
    },
];

#[must_use]
pub fn command_spec(command: PaletteCommand) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.command == command)
}

/// Splits `raw` into a command and its argument when the first token names
/// a command or alias (case-insensitive).
#[must_use]
pub fn parse_command_input(raw: &str) -> Option<(PaletteCommand, String)> {
    let trimmed = raw.trim();
    let token = trimmed.split_whitespace().next()?;
    let spec = COMMANDS.iter().find(|spec| spec.answers_to(token))?;
    let argument = trimmed[token.len()..].trim().to_string();
    Some((spec.command, argument))
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// A row the palette can jump to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpTarget {
    pub key: ItemKey,
    pub row: usize,
    pub label: String,
    pub detail: String,
    pub search: String,
}

/// One jump target per visible item, anchored at its first rendered row.
#[must_use]
pub fn jump_targets(view: &ViewModel) -> Vec<JumpTarget> {
    view.row_candidates()
        .into_iter()
        .filter_map(|candidate| {
            let item = view.items().get(candidate.item)?;
            let cells = &item.cells;
            Some(JumpTarget {
                key: item.key(),
                row: candidate.row,
                label: short_text(
                    &format!("{}  {}  {}", cells.resource, cells.action, cells.message),
                    JUMP_LABEL_LIMIT,
                ),
                detail: format!(
                    "row {} • {} • ns={}",
                    candidate.row + 1,
                    cells.timestamp,
                    cells.namespace
                ),
                search: candidate.text,
            })
        })
        .collect()
}

/// Row with the best score for `query`; ties go to the later row.
#[must_use]
pub fn best_jump(query: &str, targets: &[JumpTarget]) -> Option<usize> {
    if query.trim().is_empty() {
        return None;
    }
    targets
        .iter()
        .filter_map(|target| {
            let (score, matched) = fuzzy::score(query, &target.search);
            matched.then_some((score, target.row))
        })
        .max()
        .map(|(_, row)| row)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteEntry {
    Command(&'static CommandSpec),
    Jump(JumpTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteMatch {
    pub entry: PaletteEntry,
    pub score: i64,
}

impl PaletteMatch {
    #[must_use]
    pub fn display(&self) -> String {
        match &self.entry {
            PaletteEntry::Command(spec) => format!("cmd  {}", spec.name),
            PaletteEntry::Jump(target) => format!("jump {}", target.label),
        }
    }
}

/// Merged ranking: score desc, commands before rows, commands by name,
/// rows by later row first. An empty query is capped.
#[must_use]
pub fn build_results(query: &str, targets: &[JumpTarget]) -> Vec<PaletteMatch> {
    let query = query.trim();
    let mut results: Vec<PaletteMatch> = Vec::new();
    for spec in COMMANDS {
        let (score, matched) = fuzzy::score(query, &spec.search_text());
        if matched {
            results.push(PaletteMatch {
                entry: PaletteEntry::Command(spec),
                score: score + COMMAND_BOOST,
            });
        }
    }
    for target in targets {
        let (score, matched) = fuzzy::score(query, &target.search);
        if matched {
            results.push(PaletteMatch {
                entry: PaletteEntry::Jump(target.clone()),
                score,
            });
        }
    }

    results.sort_by(|a, b| {
        b.score.cmp(&a.score).then_with(|| match (&a.entry, &b.entry) {
            (PaletteEntry::Command(x), PaletteEntry::Command(y)) => x.name.cmp(y.name),
            (PaletteEntry::Command(_), PaletteEntry::Jump(_)) => std::cmp::Ordering::Less,
            (PaletteEntry::Jump(_), PaletteEntry::Command(_)) => std::cmp::Ordering::Greater,
            (PaletteEntry::Jump(x), PaletteEntry::Jump(y)) => y.row.cmp(&x.row),
        })
    });
    if query.is_empty() {
        results.truncate(EMPTY_QUERY_LIMIT);
    }
    results
}

// ---------------------------------------------------------------------------
// Palette state
// ---------------------------------------------------------------------------

/// What accepting the palette asks the app to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteAction {
    Run {
        command: PaletteCommand,
        argument: String,
    },
    /// Rows may have moved since the palette opened; resolve `key` against
    /// the current view.
    Jump(ItemKey),
}

/// Stateful palette controller. Jump targets are captured when it opens and
/// carry item keys, not just rows.
#[derive(Debug, Clone, Default)]
pub struct CommandPalette {
    targets: Vec<JumpTarget>,
    query: String,
    selected: usize,
    matches: Vec<PaletteMatch>,
}

impl CommandPalette {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, targets: Vec<JumpTarget>) {
        self.targets = targets;
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
        if self.matches.is_empty() {
            self.selected = 0;
            return;
        }
        let len = i64::try_from(self.matches.len()).unwrap_or(i64::MAX);
        let current = i64::try_from(self.selected).unwrap_or(0);
        let next = (current + i64::from(delta)).rem_euclid(len);
        self.selected = usize::try_from(next).unwrap_or(0);
    }

    /// Resolves the input: a leading command token wins, otherwise the
    /// selected match runs. A selected command that takes an argument gets
    /// the raw query as its argument when the query is a single word.
    #[must_use]
    pub fn accept(&self) -> Option<PaletteAction> {
        let raw = self.query.trim();
        if let Some((command, argument)) = parse_command_input(raw) {
            return Some(PaletteAction::Run { command, argument });
        }
        match &self.matches.get(self.selected)?.entry {
            PaletteEntry::Command(spec) => {
                let argument = if spec.takes_argument
                    && !raw.is_empty()
                    && !raw.contains(char::is_whitespace)
                {
                    raw.to_string()
                } else {
                    String::new()
                };
                Some(PaletteAction::Run {
                    command: spec.command,
                    argument,
                })
            }
            PaletteEntry::Jump(target) => Some(PaletteAction::Jump(target.key.clone())),
        }
    }

    fn refresh(&mut self) {
        self.matches = build_results(&self.query, &self.targets);
        if self.selected >= self.matches.len() {
            self.selected = 0;
        }
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn matches(&self) -> &[PaletteMatch] {
        &self.matches
    }

    /// Result lines (selection marked with `>`) followed by the input line.
    /// The list scrolls to keep the selection visible.
    #[must_use]
    pub fn render_lines(&self, width: usize, max_rows: usize) -> Vec<String> {
        if max_rows == 0 {
            return Vec::new();
        }
        let list_rows = max_rows - 1;
        let mut lines = Vec::new();
        if self.matches.is_empty() {
            if list_rows > 0 {
                lines.push(truncate("  No matches", width));
            }
        } else {
            let start = (self.selected + 1).saturating_sub(list_rows);
            for (idx, item) in self.matches.iter().enumerate().skip(start).take(list_rows) {
                let marker = if idx == self.selected { ">" } else { " " };
                lines.push(truncate(&format!("{marker} {}", item.display()), width));
            }
        }
        lines.push(truncate(&format!(": {}", self.query), width));
        lines
    }
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn short_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
