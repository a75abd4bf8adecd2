//! Plain-text rendering of bound tables and result previews.

use crate::db::{QueryResult, TableHandle};

/// Widest a rendered cell may get before it is cut.
const MAX_CELL_WIDTH: usize = 40;

/// Renders headers and rows as an aligned grid.
pub fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let headers: Vec<String> = headers.iter().map(|h| clip(h)).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| clip(cell)).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            let len = cell.chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let mut out = String::new();
    out.push_str(&render_line(&headers, &widths));
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    out.push('\n');
    for row in &rows {
        out.push_str(&render_line(row, &widths));
    }
    out
}

fn render_line(cells: &[String], widths: &[usize]) -> String {
    let line = widths
        .iter()
        .enumerate()
        .map(|(i, &w)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            format!("{cell:<w$}")
        })
        .collect::<Vec<_>>()
        .join(" | ");
    format!("{}\n", line.trim_end())
}

fn clip(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_WIDTH {
        return cell.to_string();
    }
    let kept: String = cell.chars().take(MAX_CELL_WIDTH - 1).collect();
    format!("{kept}…")
}

/// Renders a result set with a row-count footer.
pub fn render_result(result: &QueryResult) -> String {
    let headers: Vec<String> = result.columns.iter().map(|c| c.name.clone()).collect();
    let rows: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_display_string()).collect())
        .collect();

    let mut out = render_grid(&headers, &rows);
    let noun = if result.row_count == 1 { "row" } else { "rows" };
    out.push_str(&format!(
        "({} {noun}, {} ms)\n",
        result.row_count,
        result.execution_time.as_millis()
    ));
    if let Some(warning) = result.truncation_warning() {
        out.push_str(&warning);
        out.push('\n');
    }
    out
}

/// Renders the column list of a bound table.
pub fn render_schema(table: &TableHandle) -> String {
    let rows: Vec<Vec<String>> = table
        .columns
        .iter()
        .map(|c| vec![c.name.clone(), c.data_type.clone()])
        .collect();
    format!(
        "{}\n{}",
        table.qualified_name(),
        render_grid(&["column".to_string(), "type".to_string()], &rows)
    )
}
