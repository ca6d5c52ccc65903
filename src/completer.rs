use reedline::{Completer, Span, Suggestion};

use case_table::commands::COMMAND_NAMES;

/// Commands whose first argument is a column key
const COLUMN_COMMANDS: &[&str] = &["filter", "min", "max", "start", "end", "sort"];

/// Completes command names, then column keys for column commands
pub struct CommandCompleter {
    columns: Vec<String>,
}

impl CommandCompleter {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    fn candidates(&self, words_before: &[&str]) -> Vec<(String, &'static str)> {
        match words_before {
            [] => COMMAND_NAMES
                .iter()
                .map(|name| (name.to_string(), "command"))
                .collect(),
            [command] if COLUMN_COMMANDS.contains(&command.to_ascii_lowercase().as_str()) => self
                .columns
                .iter()
                .map(|key| (key.clone(), "column"))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let input = &line[..pos.min(line.len())];

        let partial_start = input
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let partial = &input[partial_start..];
        let words_before: Vec<&str> = input[..partial_start].split_whitespace().collect();

        self.candidates(&words_before)
            .into_iter()
            .filter(|(value, _)| value.to_lowercase().starts_with(&partial.to_lowercase()))
            .map(|(value, description)| Suggestion {
                value,
                description: Some(description.to_string()),
                extra: None,
                span: Span {
                    start: partial_start,
                    end: pos,
                },
                style: None,
                append_whitespace: true,
            })
            .collect()
    }
}
