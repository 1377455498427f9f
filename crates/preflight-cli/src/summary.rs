use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use preflight_model::DiagnosticReport;

/// Prints one row per report after `preflight all`.
pub fn print_summary(reports: &[DiagnosticReport]) {
    println!("{}", summary_table(reports));
}

fn summary_table(reports: &[DiagnosticReport]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Service"),
        header_cell("Result"),
        header_cell("Stage"),
        header_cell("Diagnosis"),
    ]);
    apply_table_style(&mut table);
    for report in reports {
        let (stage, diagnosis) = match &report.diagnosis {
            Some(diagnosis) => (
                Cell::new(diagnosis.stage.label()),
                Cell::new(diagnosis.category.title()),
            ),
            None => (dim_cell("-"), dim_cell("-")),
        };
        table.add_row(vec![
            Cell::new(report.target.service_name()).add_attribute(Attribute::Bold),
            result_cell(report),
            stage,
            diagnosis,
        ]);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn result_cell(report: &DiagnosticReport) -> Cell {
    if report.is_passed() {
        Cell::new("passed")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("failed")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
