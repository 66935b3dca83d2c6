//! Output formatting for CLI

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Compact format (single line per item)
    Compact,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// Output writer that handles different formats.
///
/// Data goes to stdout; status messages go to stderr unless the format is `table`, so
/// `json` and `yaml` output stays machine-readable.
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format }
    }

    /// Write a single item
    pub fn write<T: Serialize + TableDisplay>(&self, item: &T) -> Result<()> {
        match self.format {
            OutputFormat::Table => item.display_single(),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(item)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(item)?),
            OutputFormat::Compact => item.display_compact(),
        }
        Ok(())
    }

    /// Write a list of items
    pub fn write_list<T: Serialize + TableDisplay>(&self, items: &[T], headers: &[&str]) -> Result<()> {
        match self.format {
            OutputFormat::Table => {
                if items.is_empty() {
                    println!("{}", "Nothing to show.".dimmed());
                    return Ok(());
                }

                let mut table = new_table(headers);
                for item in items {
                    table.add_row(item.to_row());
                }

                println!("{table}");
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(items)?),
            OutputFormat::Compact => {
                for item in items {
                    item.display_compact();
                }
            }
        }
        Ok(())
    }

    /// Write a success message
    pub fn success(&self, message: &str) {
        if self.format == OutputFormat::Table {
            println!("{} {}", "✓".green(), message);
        } else {
            eprintln!("{}", message);
        }
    }

    /// Write a warning message
    pub fn warning(&self, message: &str) {
        if self.format == OutputFormat::Table {
            println!("{} {}", "⚠".yellow(), message);
        } else {
            eprintln!("Warning: {}", message);
        }
    }

    /// Start a spinner for long operations
    pub fn spinner(&self, message: &str) -> Option<indicatif::ProgressBar> {
        if self.format != OutputFormat::Table {
            return None;
        }
        let pb = indicatif::ProgressBar::new_spinner();
        if let Ok(style) = indicatif::ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    }

    /// Create a progress bar
    pub fn progress_bar(&self, total: u64, message: &str) -> Option<indicatif::ProgressBar> {
        if self.format != OutputFormat::Table {
            return None;
        }
        let pb = indicatif::ProgressBar::new(total);
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        }
        pb.set_message(message.to_string());
        Some(pb)
    }
}

/// Trait for displaying items in a table
pub trait TableDisplay {
    /// Convert item to a table row
    fn to_row(&self) -> Vec<Cell>;

    /// Display a single item in detail
    fn display_single(&self);

    /// Display in compact format
    fn display_compact(&self);
}

/// Rounded UTF-8 table with cyan headers.
pub fn new_table<S: AsRef<str>>(headers: &[S]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h.as_ref()).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

/// Print a key-value pair in detail format
pub fn print_field(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Print a list field
pub fn print_list_field(key: &str, values: &[String]) {
    if values.is_empty() {
        println!("  {}: {}", key.cyan(), "-".dimmed());
    } else {
        println!("  {}:", key.cyan());
        for v in values {
            println!("    - {}", v);
        }
    }
}

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Four decimals, `<0.0001` below that.
pub fn format_p_value(p: f64) -> String {
    if p < 1e-4 {
        "<0.0001".to_string()
    } else {
        format!("{:.4}", p)
    }
}

/// Two decimals; infinite values print as `inf`.
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.2}", value)
    }
}

/// p-value cell, green when below `alpha`.
pub fn p_value_cell(p: f64, alpha: f64) -> Cell {
    let cell = Cell::new(format_p_value(p));
    if p < alpha {
        cell.fg(Color::Green)
    } else {
        cell
    }
}

/// Status badge with color
pub fn status_badge(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "analyzed" | "fitted" | "completed" => status.to_string().green().to_string(),
        "failed" => status.to_string().red().to_string(),
        "skipped" => status.to_string().yellow().to_string(),
        _ => status.to_string(),
    }
}
