//! Output formatting utilities
//!
//! Handles JSON, YAML, and table output formats.

use std::io::IsTerminal;

use anyhow::Result;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::OutputFormat;
use crate::config::RuntimeContext;

/// Format and print data according to the configured output format
pub fn print_output<T: Serialize>(ctx: &RuntimeContext, data: &T) -> Result<()> {
    let output = format_output(ctx.output_format(), std::io::stdout().is_terminal(), data)?;
    println!("{output}");
    Ok(())
}

/// Format data for the given output format
pub fn format_output<T: Serialize>(format: OutputFormat, is_tty: bool, data: &T) -> Result<String> {
    match format {
        OutputFormat::Json => {
            if is_tty {
                Ok(serde_json::to_string_pretty(data)?)
            } else {
                Ok(serde_json::to_string(data)?)
            }
        }
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Table | OutputFormat::Auto => {
            // For auto, use JSON when piped
            if !is_tty && matches!(format, OutputFormat::Auto) {
                Ok(serde_json::to_string(data)?)
            } else {
                Ok(serde_json::to_string_pretty(data)?)
            }
        }
    }
}

/// Print structured data for json/yaml (or piped auto), otherwise run `human`
pub fn output_for_format<T, F>(ctx: &RuntimeContext, data: &T, human: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce() -> Result<()>,
{
    let is_tty = std::io::stdout().is_terminal();
    match ctx.output_format() {
        OutputFormat::Json | OutputFormat::Yaml => print_output(ctx, data),
        OutputFormat::Auto if !is_tty => print_output(ctx, data),
        _ => human(),
    }
}

/// Print a table from items that implement Tabled
pub fn print_table<T: Tabled>(ctx: &RuntimeContext, items: &[T]) -> Result<()> {
    let no_headers = ctx.global.no_headers || ctx.config.output.no_headers;
    println!("{}", build_table(items, no_headers));
    Ok(())
}

fn build_table<T: Tabled>(items: &[T], no_headers: bool) -> Table {
    let mut table = Table::new(items);
    table.with(Style::sharp());

    if no_headers {
        table.with(tabled::settings::Remove::row(
            tabled::settings::object::Rows::first(),
        ));
    }

    table
}

/// Shorten `text` to `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
