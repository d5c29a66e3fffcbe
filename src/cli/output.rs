//! Terminal rendering shared by the beatframe commands.

use colored::{ColoredString, Colorize};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use serde::Serialize;

use crate::models::{BeatFailure, FillInStatus, RuleStatus};

/// How a command prints: colored terminal text, JSON, or a Markdown shot list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Markdown,
}

impl OutputMode {
    /// `--json` wins over `--md`.
    pub fn from_flags(json: bool, md: bool) -> Self {
        match (json, md) {
            (true, _) => OutputMode::Json,
            (false, true) => OutputMode::Markdown,
            _ => OutputMode::Human,
        }
    }
}

/// How much of each compiled beat the human mode shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    /// One `beat_id<TAB>prompt` line per beat.
    Brief,
    /// Summary table plus each prompt with its reason.
    Standard,
    /// Adds rule outcomes, notes and budget drops.
    Full,
}

impl DetailLevel {
    pub fn from_flags(brief: bool, full: bool) -> Self {
        match (brief, full) {
            (true, _) => DetailLevel::Brief,
            (false, true) => DetailLevel::Full,
            _ => DetailLevel::Standard,
        }
    }
}

/// Kind of a pipeline note, read from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Warning,
    Adjusted,
    Info,
}

impl NoteKind {
    pub fn of(note: &str) -> Self {
        if note.starts_with("WARNING") {
            NoteKind::Warning
        } else if note.starts_with("ADJUSTED") {
            NoteKind::Adjusted
        } else {
            NoteKind::Info
        }
    }
}

pub fn output_json<T: Serialize>(item: &T) {
    match serde_json::to_string_pretty(item) {
        Ok(json) => println!("{}", json),
        Err(e) => print_error(&format!("Failed to serialize to JSON: {}", e)),
    }
}

/// Rounded table; prints `empty` instead when there are no rows.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>, empty: &str) {
    if rows.is_empty() {
        println!("{}", empty.dimmed());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(headers);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_success(msg: &str) {
    println!("{} {}", "OK".green().bold(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

/// Indented pipeline note, colored by kind.
pub fn print_note(note: &str) {
    let line = match NoteKind::of(note) {
        NoteKind::Warning => note.yellow(),
        NoteKind::Adjusted => note.cyan(),
        NoteKind::Info => note.dimmed(),
    };
    println!("    {}", line);
}

/// One line per beat that could not be compiled.
pub fn print_failure(failure: &BeatFailure) {
    println!(
        "  {} {} ({}): {}",
        "x".red().bold(),
        failure.beat_id,
        failure.scene_id,
        failure.message
    );
}

pub fn rule_status(status: RuleStatus) -> ColoredString {
    match status {
        RuleStatus::Pass => "pass".green(),
        RuleStatus::Repaired => "repaired".cyan(),
        RuleStatus::Warning => "warning".yellow(),
    }
}

/// Short table label for a fill-in outcome.
pub fn fill_in_label(status: &FillInStatus) -> &'static str {
    match status {
        FillInStatus::Skipped => "-",
        FillInStatus::Filled { .. } => "filled",
        FillInStatus::Partial { .. } => "partial",
        FillInStatus::Fallback { .. } => "fallback",
    }
}

pub fn print_header(title: &str) {
    println!("\n{}\n", title.bold());
}

pub fn print_kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

pub fn print_hint(msg: &str) {
    println!("{}", msg.dimmed());
}
