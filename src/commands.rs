//! Text commands understood by the interactive viewer.
//!
//! Each command maps onto one engine operation, so the loop in `main` only
//! has to read a line, parse it and print the result.

use anyhow::{anyhow, bail, Context, Result};

use crate::data::filter::FilterValue;
use crate::data::record::FieldAccess;
use crate::data::view_engine::DataViewEngine;
use crate::data::view_state::ViewChange;

/// Names offered by completion, in help order
pub const COMMAND_NAMES: &[&str] = &[
    "search", "filter", "min", "max", "start", "end", "sort", "page", "next", "prev", "size",
    "reset", "columns", "export", "log", "help", "quit",
];

/// A parsed viewer command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search(String),
    /// Merge a fragment into one column's filter
    Filter { key: String, fragment: FilterValue },
    Sort(String),
    Page(usize),
    NextPage,
    PreviousPage,
    PageSize(usize),
    Reset,
    Columns,
    Export(String),
    Log(usize),
    Help,
    Quit,
}

/// What the caller should do after a command ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The view may have changed; redraw it
    Redraw,
    /// The engine ignored the change
    Ignored(String),
    /// Not a view change; the caller handles it
    Passthrough,
}

fn parse_number(text: &str, what: &str) -> Result<usize> {
    text.trim()
        .parse::<usize>()
        .with_context(|| format!("{} must be a whole number, got '{}'", what, text.trim()))
}

/// Split `key rest...` into the key and the (possibly empty) remainder
fn key_and_rest<'a>(args: &'a str, command: &str) -> Result<(&'a str, &'a str)> {
    let args = args.trim();
    if args.is_empty() {
        bail!("Usage: {} <column> [value]", command);
    }
    Ok(match args.split_once(char::is_whitespace) {
        Some((key, rest)) => (key, rest.trim()),
        None => (args, ""),
    })
}

/// Parse one input line
pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let (name, args) = match line.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args),
        None => (line, ""),
    };

    let name = name.to_ascii_lowercase();

    let command = match name.as_str() {
        // Search keeps inner whitespace as typed
        "search" => Command::Search(args.trim_start().to_string()),
        "filter" => {
            let (key, text) = key_and_rest(args, "filter")?;
            Command::Filter {
                key: key.to_string(),
                fragment: FilterValue::text(text),
            }
        }
        "min" | "max" | "start" | "end" => {
            let (key, bound) = key_and_rest(args, &name)?;
            let fragment = match name.as_str() {
                "min" => FilterValue::min(bound),
                "max" => FilterValue::max(bound),
                "start" => FilterValue::start(bound),
                _ => FilterValue::end(bound),
            };
            Command::Filter {
                key: key.to_string(),
                fragment,
            }
        }
        "sort" => {
            let key = args.trim();
            if key.is_empty() {
                bail!("Usage: sort <column>");
            }
            Command::Sort(key.to_string())
        }
        "page" => Command::Page(parse_number(args, "Page")?),
        "next" | "n" => Command::NextPage,
        "prev" | "p" => Command::PreviousPage,
        "size" => Command::PageSize(parse_number(args, "Page size")?),
        "reset" => Command::Reset,
        "columns" => Command::Columns,
        "export" => {
            let path = args.trim();
            if path.is_empty() {
                bail!("Usage: export <file.csv>");
            }
            Command::Export(path.to_string())
        }
        "log" => {
            if args.trim().is_empty() {
                Command::Log(20)
            } else {
                Command::Log(parse_number(args, "Log count")?)
            }
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        "" => bail!("Empty command"),
        other => return Err(anyhow!("Unknown command '{}' (try 'help')", other)),
    };

    Ok(command)
}

impl Command {
    /// The engine change this command requests, if it is a view command
    fn view_change(&self) -> Option<ViewChange> {
        let change = match self {
            Command::Search(term) => ViewChange::SearchTerm(term.clone()),
            Command::Filter { key, fragment } => ViewChange::ColumnFilter {
                key: key.clone(),
                fragment: fragment.clone(),
            },
            Command::Sort(key) => ViewChange::Sort(key.clone()),
            Command::Page(index) => ViewChange::PageIndex(*index),
            Command::PageSize(size) => ViewChange::PageSize(*size),
            Command::Reset => ViewChange::Reset,
            _ => return None,
        };
        Some(change)
    }

    fn ignored_message(&self) -> String {
        match self {
            Command::Search(_) => "Global search is disabled".to_string(),
            Command::Filter { key, .. } => format!("Cannot filter on '{}'", key),
            Command::Sort(key) => format!("Cannot sort by '{}'", key),
            _ => "Command had no effect".to_string(),
        }
    }
}

/// Run a view command against the engine.
///
/// The engine decides whether a change is accepted; a rejected change is
/// reported as [`Outcome::Ignored`].
pub fn execute<R: FieldAccess>(engine: &mut DataViewEngine<R>, command: &Command) -> Outcome {
    let applied = match command {
        Command::NextPage => engine.next_page(),
        Command::PreviousPage => engine.previous_page(),
        other => match other.view_change() {
            Some(change) => engine.apply(change),
            None => return Outcome::Passthrough,
        },
    };

    if applied {
        Outcome::Redraw
    } else {
        Outcome::Ignored(command.ignored_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::{ColumnDef, ColumnType, FilterKind};
    use crate::data::view_engine::ViewOptions;
    use serde_json::{json, Value};

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("search  open case").unwrap(),
            Command::Search("open case".into())
        );
        assert_eq!(
            parse_command("filter status Pending Review").unwrap(),
            Command::Filter {
                key: "status".into(),
                fragment: FilterValue::text("Pending Review"),
            }
        );
        assert_eq!(
            parse_command("MIN amount 10").unwrap(),
            Command::Filter {
                key: "amount".into(),
                fragment: FilterValue::min("10"),
            }
        );
        assert_eq!(
            parse_command("end opened").unwrap(),
            Command::Filter {
                key: "opened".into(),
                fragment: FilterValue::end(""),
            }
        );
        assert_eq!(parse_command("page 3").unwrap(), Command::Page(3));
        assert_eq!(parse_command("log").unwrap(), Command::Log(20));
        assert_eq!(parse_command("q").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("page two").is_err());
        assert!(parse_command("sort").is_err());
        assert!(parse_command("filter").is_err());
        assert!(parse_command("frobnicate").is_err());
        assert!(parse_command("export").is_err());
    }

    #[test]
    fn test_execute_reports_ignored_changes() {
        let columns: Vec<ColumnDef<Value>> = vec![
            ColumnDef::new("id"),
            ColumnDef::new("amount")
                .with_type(ColumnType::Number)
                .with_sortable(true)
                .with_filter(FilterKind::NumberRange),
        ];
        let rows = vec![json!({ "id": "A", "amount": 1 }), json!({ "id": "B", "amount": 5 })];
        let mut engine = DataViewEngine::new(columns, rows, ViewOptions::default()).unwrap();

        assert!(matches!(
            execute(&mut engine, &Command::Sort("id".into())),
            Outcome::Ignored(_)
        ));
        assert!(matches!(
            execute(&mut engine, &Command::Sort("nope".into())),
            Outcome::Ignored(_)
        ));
        assert_eq!(
            execute(&mut engine, &parse_command("min amount 2").unwrap()),
            Outcome::Redraw
        );
        assert_eq!(engine.view().total_count, 1);
        assert_eq!(execute(&mut engine, &Command::Help), Outcome::Passthrough);
    }

    #[test]
    fn test_execute_defers_to_engine_toggles() {
        let columns: Vec<ColumnDef<Value>> = vec![
            ColumnDef::new("id").with_filter(FilterKind::Text),
            ColumnDef::new("amount")
                .with_type(ColumnType::Number)
                .with_sortable(true),
        ];
        let rows = vec![json!({ "id": "A", "amount": 1 }), json!({ "id": "B", "amount": 5 })];
        let options = ViewOptions {
            enable_global_search: false,
            enable_column_search: false,
            ..ViewOptions::default()
        };
        let mut engine = DataViewEngine::new(columns, rows, options).unwrap();

        assert_eq!(
            execute(&mut engine, &Command::Search("A".into())),
            Outcome::Ignored("Global search is disabled".into())
        );
        assert!(matches!(
            execute(&mut engine, &parse_command("filter id A").unwrap()),
            Outcome::Ignored(_)
        ));
        assert_eq!(engine.view().total_count, 2);
        assert!(!engine.view().is_reset_available);

        assert_eq!(
            execute(&mut engine, &Command::Sort("amount".into())),
            Outcome::Redraw
        );
        assert_eq!(execute(&mut engine, &Command::NextPage), Outcome::Redraw);
        assert_eq!(execute(&mut engine, &Command::Columns), Outcome::Passthrough);
    }
}
