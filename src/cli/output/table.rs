//! Table output formatting for CLI commands
//!
//! Formats validated addresses and job summaries using comfy-table.

use crate::domain::models::{JobStatus, ValidatedAddress};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use std::env;

use super::truncate;

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<u16>,
}

impl TableFormatter {
    /// Create a new table formatter
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Create a new table formatter with custom settings
    pub const fn with_config(use_colors: bool, max_width: Option<u16>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// Format validated addresses, one row per address in result order
    pub fn format_addresses(&self, addresses: &[ValidatedAddress]) -> String {
        let mut table = self.create_base_table();

        table.set_header(vec![
            Cell::new("#").add_attribute(Attribute::Bold),
            Cell::new("UPRN").add_attribute(Attribute::Bold),
            Cell::new("Address").add_attribute(Attribute::Bold),
            Cell::new("Postcode").add_attribute(Attribute::Bold),
            Cell::new("Lat").add_attribute(Attribute::Bold),
            Cell::new("Lon").add_attribute(Attribute::Bold),
            Cell::new("Class").add_attribute(Attribute::Bold),
        ]);

        for (i, address) in addresses.iter().enumerate() {
            table.add_row(vec![
                Cell::new(i + 1),
                Cell::new(address.uprn.as_str()),
                Cell::new(truncate(&address.address.full, 60)),
                Cell::new(&address.address.postcode),
                Cell::new(format!("{:.6}", address.lat)),
                Cell::new(format!("{:.6}", address.lon)),
                Cell::new(&address.classification.code),
            ]);
        }

        table.to_string()
    }

    /// Format a terminal job status as a single labelled row
    pub fn format_status(&self, status: &JobStatus) -> String {
        let mut table = self.create_base_table();
        let label = status.label();

        let status_cell = if self.use_colors {
            Cell::new(label).fg(status_color(status))
        } else {
            Cell::new(format!("{} {label}", status_icon(status)))
        };

        table.add_row(vec![Cell::new("Status").add_attribute(Attribute::Bold), status_cell]);
        if let JobStatus::Failed { reason, .. } = status {
            table.add_row(vec![Cell::new("Reason").add_attribute(Attribute::Bold), Cell::new(reason)]);
        }

        table.to_string()
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(width);
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if the terminal supports colors
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    if let Ok(term) = env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    true
}

const fn status_color(status: &JobStatus) -> Color {
    match status {
        JobStatus::Succeeded { .. } => Color::Green,
        JobStatus::Running => Color::Cyan,
        JobStatus::Queued => Color::Yellow,
        JobStatus::Failed { .. } => Color::Red,
        JobStatus::Cancelled => Color::DarkGrey,
    }
}

const fn status_icon(status: &JobStatus) -> &'static str {
    match status {
        JobStatus::Succeeded { .. } => "✓",
        JobStatus::Running => "⟳",
        JobStatus::Queued => "○",
        JobStatus::Failed { .. } => "✗",
        JobStatus::Cancelled => "⊘",
    }
}
