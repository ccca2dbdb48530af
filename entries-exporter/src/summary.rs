//! Summary tables printed after a run.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use entries_exporter_core::{ExportReport, PurgeResult};

/// Per-form export counts with a totals row.
pub fn export_table(report: &ExportReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Form ID"),
        header_cell("Form"),
        header_cell("Total"),
        header_cell("Processed"),
        header_cell("Written"),
        header_cell("Skipped"),
        header_cell("Errors"),
    ]);
    apply_table_style(&mut table);
    for index in [0, 2, 3, 4, 5, 6] {
        align_column(&mut table, index, CellAlignment::Right);
    }

    for result in &report.results {
        table.add_row(vec![
            Cell::new(result.form_id),
            Cell::new(&result.form_title),
            Cell::new(result.total_count),
            Cell::new(result.processed),
            count_cell(result.written, Color::Green),
            count_cell(result.skipped, Color::Yellow),
            count_cell(result.errors, Color::Red),
        ]);
    }

    let totals = report.totals();
    table.add_row(vec![
        dim_cell("-"),
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(totals.total_count).add_attribute(Attribute::Bold),
        Cell::new(totals.processed).add_attribute(Attribute::Bold),
        count_cell(totals.written, Color::Green).add_attribute(Attribute::Bold),
        count_cell(totals.skipped, Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(totals.errors, Color::Red).add_attribute(Attribute::Bold),
    ]);

    table
}

/// Forms skipped for missing columns, or `None` when there were none.
pub fn schema_error_table(report: &ExportReport) -> Option<Table> {
    if !report.has_schema_errors() {
        return None;
    }

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Form ID"),
        header_cell("Form"),
        header_cell("Missing columns"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);

    for error in &report.schema_errors {
        table.add_row(vec![
            Cell::new(error.form_id),
            Cell::new(&error.form_title),
            Cell::new(error.missing.join(", ")).fg(Color::Red),
        ]);
    }

    Some(table)
}

/// Per-form purge counts.
pub fn purge_table(results: &[PurgeResult], dry_run: bool) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Form ID"),
        header_cell("Form"),
        header_cell("Matched"),
        header_cell(if dry_run { "Would delete" } else { "Deleted" }),
        header_cell("Errors"),
    ]);
    apply_table_style(&mut table);
    for index in [0, 2, 3, 4] {
        align_column(&mut table, index, CellAlignment::Right);
    }

    for result in results {
        table.add_row(vec![
            Cell::new(result.form_id),
            Cell::new(&result.form_title),
            Cell::new(result.matched),
            count_cell(result.deleted, Color::Yellow),
            count_cell(result.errors, Color::Red),
        ]);
    }

    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: u64, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
