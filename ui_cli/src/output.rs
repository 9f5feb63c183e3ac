//! Terminal output helpers.

use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::OutputFormat;

pub fn info(message: &str) {
    println!("{} {}", "•".blue(), message);
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn warn(message: &str) {
    eprintln!("{} {}", "!".yellow().bold(), message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

pub fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Key/value line, aligned.
pub fn field(key: &str, value: &str) {
    println!("  {:<18} {}", format!("{}:", key).dimmed(), value);
}

/// Print a list as a table, JSON or YAML.
pub fn print_data<T: Serialize + Tabled>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("  {}", "(none)".dimmed());
            } else {
                let mut table = Table::new(items);
                table.with(Style::rounded());
                println!("{}", table);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(items)?),
    }
    Ok(())
}

/// Print a single serializable value in a machine format.
pub fn print_item<T: Serialize>(item: &T, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(item)?),
        _ => println!("{}", serde_json::to_string_pretty(item)?),
    }
    Ok(())
}
