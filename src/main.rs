use anyhow::{bail, Context, Result};
use crossterm::style::Stylize;
use reedline::{
    default_emacs_keybindings, ColumnarMenu, Emacs, FileBackedHistory, KeyCode, KeyModifiers,
    MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline,
    ReedlineEvent, ReedlineMenu, Signal,
};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

mod completer;

use case_table::commands::{execute, parse_command, Command, Outcome};
use case_table::config::Config;
use case_table::data::filter::FilterValue;
use case_table::data::record::FieldAccess;
use case_table::data::view_engine::DataViewEngine;
use case_table::loaders::{load_file, LoadedFile, LoadedTable};
use case_table::logging::{get_log_buffer, init_tracing};
use case_table::table_display::{display_view, export_to_csv, render_columns};
use completer::CommandCompleter;

/// Options gathered from the command line
#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    file: String,
    search: Option<String>,
    filters: Vec<(String, FilterValue)>,
    /// Column key and whether to sort descending
    sort: Option<(String, bool)>,
    page: Option<usize>,
    page_size: Option<usize>,
    interactive: bool,
}

impl CliOptions {
    /// Any flag that shapes the view makes this a one-shot run
    fn has_view_flags(&self) -> bool {
        self.search.is_some()
            || !self.filters.is_empty()
            || self.sort.is_some()
            || self.page.is_some()
            || self.page_size.is_some()
    }
}

#[derive(Debug, PartialEq)]
enum CliAction {
    Help,
    GenerateConfig,
    Run(CliOptions),
}

/// Split `key=value`
fn key_value(flag: &str, text: &str) -> Result<(String, String)> {
    match text.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => bail!("{} expects key=value, got '{}'", flag, text),
    }
}

fn parse_args(args: &[String]) -> Result<CliAction> {
    let mut options = CliOptions::default();
    let mut file = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .with_context(|| format!("{} requires a value", flag))
        };

        match arg.as_str() {
            "-h" | "--help" => return Ok(CliAction::Help),
            "--generate-config" => return Ok(CliAction::GenerateConfig),
            "-i" | "--interactive" => options.interactive = true,
            "--search" => options.search = Some(value("--search")?),
            "--filter" | "--min" | "--max" | "--start" | "--end" => {
                let (key, text) = key_value(arg, &value(arg.as_str())?)?;
                let fragment = match arg.as_str() {
                    "--filter" => FilterValue::text(text),
                    "--min" => FilterValue::min(text),
                    "--max" => FilterValue::max(text),
                    "--start" => FilterValue::start(text),
                    _ => FilterValue::end(text),
                };
                options.filters.push((key, fragment));
            }
            "--sort" => {
                let spec = value("--sort")?;
                options.sort = Some(match spec.rsplit_once(':') {
                    Some((key, "desc")) => (key.to_string(), true),
                    Some((key, "asc")) => (key.to_string(), false),
                    _ => (spec.clone(), false),
                });
            }
            "--page" => {
                let text = value("--page")?;
                options.page = Some(
                    text.parse()
                        .with_context(|| format!("--page expects a number, got '{}'", text))?,
                );
            }
            "--page-size" => {
                let text = value("--page-size")?;
                options.page_size = Some(
                    text.parse()
                        .with_context(|| format!("--page-size expects a number, got '{}'", text))?,
                );
            }
            flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
            path => {
                if file.is_some() {
                    bail!("Only one data file can be opened at a time");
                }
                file = Some(path.to_string());
            }
        }
    }

    match file {
        Some(file) => {
            options.file = file;
            Ok(CliAction::Run(options))
        }
        None => Ok(CliAction::Help),
    }
}

struct ViewPrompt {
    table: String,
}

impl Prompt for ViewPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{}> ", self.table))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => "".into(),
            PromptEditMode::Vi(vi_mode) => match vi_mode {
                reedline::PromptViMode::Normal => "N ".into(),
                reedline::PromptViMode::Insert => "I ".into(),
            },
            PromptEditMode::Custom(str) => format!("{str} ").into(),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse search: {}) ",
            prefix, history_search.term
        ))
    }
}

fn print_usage() {
    println!("{}", "case-table - searchable, filterable, paged table viewer".blue().bold());
    println!();
    println!("{}", "Usage:".yellow());
    println!("  case-table [OPTIONS] FILE.json|FILE.csv");
    println!();
    println!("{}", "Options:".yellow());
    println!("  {}        - Search all columns", "--search <text>".green());
    println!("  {}  - Text filter on one column", "--filter <key=text>".green());
    println!("  {}  - Number range bounds", "--min/--max <key=n>".green());
    println!("  {} - Date range bounds", "--start/--end <key=date>".green());
    println!("  {}   - Sort by a column", "--sort <key[:desc]>".green());
    println!("  {}      - Rows per page", "--page-size <n>".green());
    println!("  {}           - Page to show", "--page <n>".green());
    println!("  {}     - Keep the prompt open after flags", "-i, --interactive".green());
    println!("  {}   - Write the commented default config", "--generate-config".green());
    println!();
    println!("Without view options the interactive prompt opens directly.");
}

fn print_commands(page_size_options: &[usize]) {
    let sizes = page_size_options
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    println!("{}", "Commands:".yellow());
    println!("  {}       - Search all columns (empty clears)", "search <text>".green());
    println!("  {} - Text filter (no text clears)", "filter <key> [text]".green());
    println!("  {}   - Number range bound", "min|max <key> [n]".green());
    println!("  {} - Date range bound", "start|end <key> [date]".green());
    println!("  {}          - Cycle none, asc, desc", "sort <key>".green());
    println!("  {}            - Go to page", "page <n>".green());
    println!("  {}           - Next / previous page", "next, prev".green());
    println!("  {}            - Rows per page (offered: {})", "size <n>".green(), sizes);
    println!("  {}               - Clear search, filters and sort", "reset".green());
    println!("  {}             - Describe the columns", "columns".green());
    println!("  {}   - Save the filtered rows", "export <file.csv>".green());
    println!("  {}             - Show recent log lines", "log [n]".green());
    println!("  {}           - Exit", "quit, Ctrl+D".green());
}

fn generate_config() -> Result<()> {
    let path = Config::get_config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Error creating config directory: {:?}", parent))?;
    }
    std::fs::write(&path, Config::create_default_with_comments())
        .with_context(|| format!("Error writing config file: {:?}", path))?;
    println!("Configuration file created at: {:?}", path);
    Ok(())
}

fn build_engine<R: FieldAccess>(
    table: LoadedTable<R>,
    config: &Config,
    cli: &CliOptions,
) -> Result<DataViewEngine<R>> {
    let columns = table.infer_columns();
    let mut options = config.view_options();
    if let Some(size) = cli.page_size {
        options.page_size = size;
    }

    let mut engine = DataViewEngine::new(columns, table.rows, options)
        .with_context(|| format!("Failed to build view for '{}'", table.name))?;

    if let Some(term) = &cli.search {
        engine.set_search_term(term.clone());
    }
    for (key, fragment) in &cli.filters {
        if !engine.schema().contains(key) {
            warn!("Ignoring filter on unknown column '{}'", key);
            eprintln!("{}", format!("No column named '{}'", key).red());
            continue;
        }
        engine.set_column_filter(key.clone(), fragment.clone());
    }
    if let Some((key, descending)) = &cli.sort {
        engine.set_sort(key.clone());
        if *descending {
            engine.set_sort(key.clone());
        }
        if engine.state().sort.is_none() {
            eprintln!("{}", format!("Cannot sort by '{}'", key).red());
        }
    }
    if let Some(page) = cli.page {
        engine.set_page_index(page);
    }

    Ok(engine)
}

fn create_line_editor(columns: Vec<String>) -> Reedline {
    let completion_menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_completion")
            .with_columns(1)
            .with_column_width(None)
            .with_column_padding(2),
    );

    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Menu("command_completion".to_string()),
    );

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new(columns)))
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    let history_path =
        dirs::data_local_dir().map(|dir| dir.join("case-table").join("history.txt"));
    if let Some(path) = history_path {
        match FileBackedHistory::with_file(200, path.clone()) {
            Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
            Err(e) => warn!("History disabled, could not open {:?}: {}", path, e),
        }
    }

    line_editor
}

fn run_interactive<R: FieldAccess>(
    mut engine: DataViewEngine<R>,
    table_name: &str,
) -> Result<()> {
    let mut line_editor = create_line_editor(engine.schema().keys());
    let prompt = ViewPrompt {
        table: table_name.to_string(),
    };

    display_view(&engine.view());
    println!("Type {} for commands.", "help".green());

    loop {
        let line = match line_editor.read_line(&prompt)? {
            Signal::Success(line) => line,
            Signal::CtrlD | Signal::CtrlC => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                continue;
            }
        };
        debug!("Command: {:?}", command);

        match execute(&mut engine, &command) {
            Outcome::Redraw => display_view(&engine.view()),
            Outcome::Ignored(reason) => eprintln!("{}", reason.yellow()),
            Outcome::Passthrough => match command {
                Command::Columns => println!("{}", render_columns(engine.schema().columns())),
                Command::Export(path) => match export_to_csv(&engine, Path::new(&path)) {
                    Ok(count) => println!("{}", format!("Exported {} rows to {}", count, path).green()),
                    Err(e) => eprintln!("{}", format!("Export error: {:#}", e).red()),
                },
                Command::Log(count) => match get_log_buffer() {
                    Some(buffer) => {
                        for entry in buffer.get_recent(count) {
                            println!("{}", entry.format_for_display());
                        }
                    }
                    None => println!("Logging is not initialized"),
                },
                Command::Help => print_commands(&engine.options().page_size_options),
                Command::Quit => break,
                _ => {}
            },
        }
    }

    println!("\nGoodbye!");
    Ok(())
}

fn run<R: FieldAccess>(table: LoadedTable<R>, config: &Config, cli: &CliOptions) -> Result<()> {
    let name = table.name.clone();
    let engine = build_engine(table, config, cli)?;

    if cli.has_view_flags() && !cli.interactive {
        display_view(&engine.view());
        return Ok(());
    }
    run_interactive(engine, &name)
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let cli = match parse_args(&args) {
        Ok(CliAction::Help) => {
            print_usage();
            return Ok(());
        }
        Ok(CliAction::GenerateConfig) => return generate_config(),
        Ok(CliAction::Run(cli)) => cli,
        Err(e) => {
            eprintln!("{}", format!("Error: {:#}", e).red());
            print_usage();
            std::process::exit(2);
        }
    };

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format!("Using default config: {:#}", e).yellow());
            Config::default()
        }
    };
    init_tracing(&config.logging.level);

    match load_file(&cli.file)? {
        LoadedFile::Json(table) => run(table, &config, &cli),
        LoadedFile::Csv(table) => run(table, &config, &cli),
    }
}
