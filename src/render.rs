//! Output rendering for inspection results

use anyhow::Result;
use clap::ValueEnum;
use tabled::builder::Builder;
use tabled::settings::object::Cell;
use tabled::settings::{Span, Style};

use crate::inspect::Inspection;
use nplist_policy::{Direction, DisplayRow};

/// Output format selected on the command line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Two-section table, ingress then egress
    #[default]
    Table,
    /// JSON document with every row
    Json,
}

/// Render an inspection in the requested format
pub fn render(inspection: &Inspection, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(format!(
            "Inspecting {}/{}\n{}",
            inspection.namespace,
            inspection.pod,
            table(&inspection.rows)
        )),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(inspection)?),
    }
}

/// Render rows as an ingress section followed by an egress section.
///
/// Each section starts with its own header row. The header's direction cell
/// spans the whole section, so the column reads as one merged cell.
pub fn table(rows: &[DisplayRow]) -> String {
    let mut builder = Builder::default();
    // (header row index, rows covered by the direction cell)
    let mut sections = Vec::new();
    let mut next_row = 0;

    for direction in [Direction::Ingress, Direction::Egress] {
        builder.push_record([
            direction.as_str(),
            "NetPol",
            "Action",
            "Port",
            direction.peer_header(),
        ]);
        let header_row = next_row;
        next_row += 1;

        for row in rows.iter().filter(|r| r.direction == direction) {
            let [_, policy, action, ports, peers] = row.cells();
            builder.push_record(["", policy, action, ports, peers]);
            next_row += 1;
        }
        sections.push((header_row, next_row - header_row));
    }

    let mut table = builder.build();
    table.with(Style::modern());
    for (header_row, height) in sections {
        if height > 1 {
            table.modify(Cell::new(header_row, 0), Span::row(height.try_into().unwrap_or(1)));
        }
    }
    table.to_string()
}
