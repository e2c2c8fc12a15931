use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};
use pageflow_router::NavigationEntry;
use pageflow_store::{Snapshot, Value};

use crate::scenario::{Scenario, ScenarioReport};

pub fn print_summary(report: &ScenarioReport) {
    println!();
    println!("Scenario: {}", report.scenario.name());
    println!("Background fetches: {}", report.fetches);
    println!("Cached entries: {}", report.cached_entries);
    println!("View activations: {}", report.activations);
    println!();
    println!("Navigation stack:");
    println!("{}", stack_table(&report.stack));
    println!();
    println!("Store:");
    println!("{}", store_table(&report.store));
}

pub fn print_scenarios() {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Scenario"), header_cell("Description")]);
    apply_summary_table_style(&mut table);
    for scenario in Scenario::ALL {
        table.add_row(vec![
            Cell::new(scenario.name())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(scenario.description()),
        ]);
    }
    println!("{table}");
}

/// Navigation entries, bottom of the stack first.
pub fn stack_table(stack: &[NavigationEntry]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Route"),
        header_cell("Params"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    let top = stack.len().saturating_sub(1);
    for (depth, entry) in stack.iter().enumerate() {
        let route = if depth == top {
            Cell::new(&entry.route_name)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new(&entry.route_name)
        };
        let params = if entry.params.is_empty() {
            dim_cell("-")
        } else {
            Cell::new(Value::Object(entry.params.clone()))
        };
        table.add_row(vec![Cell::new(depth), route, params]);
    }
    table
}

/// Store contents sorted by key.
pub fn store_table(store: &Snapshot) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Key"),
        header_cell("Type"),
        header_cell("Value"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for (key, value) in store {
        table.add_row(vec![
            Cell::new(key).fg(Color::Blue),
            dim_cell(type_name(value)),
            value_cell(value),
        ]);
    }
    table
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn value_cell(value: &Value) -> Cell {
    match value {
        Value::Null => dim_cell("-"),
        Value::String(text) => Cell::new(text),
        other => Cell::new(other),
    }
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
    if table.column_count() >= 3 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Fixed(16)),
            ColumnConstraint::UpperBoundary(Width::Fixed(16)),
            ColumnConstraint::UpperBoundary(Width::Percentage(70)),
        ]);
    }
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

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
