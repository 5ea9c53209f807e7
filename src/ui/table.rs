use unicode_width::UnicodeWidthStr;

use crate::records::{cell_to_string, Table};
use crate::utils::truncate_to_width;

/// Widest a single cell may render before it is cut.
const MAX_CELL_WIDTH: usize = 40;

/// Render `table` as a bordered text grid showing at most `max_rows` rows.
pub fn render_table(table: &Table, max_rows: usize) -> String {
    let header: Vec<String> = table
        .columns
        .iter()
        .map(|column| truncate_to_width(column, MAX_CELL_WIDTH))
        .collect();

    let shown = table.rows.len().min(max_rows);
    let body: Vec<Vec<String>> = table.rows[..shown]
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| truncate_to_width(&cell_to_string(cell), MAX_CELL_WIDTH))
                .collect()
        })
        .collect();

    let mut col_widths: Vec<usize> = header.iter().map(|cell| cell.width()).collect();
    for row in &body {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = col_widths.get_mut(i) {
                *width = (*width).max(cell.width());
            }
        }
    }

    let border = format!(
        "+{}+",
        col_widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    out.push_str(&format_row(&header, &col_widths));
    out.push('\n');
    out.push_str(&border);
    out.push('\n');
    for row in &body {
        out.push_str(&format_row(row, &col_widths));
        out.push('\n');
    }
    if !body.is_empty() {
        out.push_str(&border);
        out.push('\n');
    }

    if table.rows.len() > shown {
        out.push_str(&format!(
            "... {} more row(s) not shown\n",
            table.rows.len() - shown
        ));
    }
    out.push_str(&format!(
        "{} row(s) x {} column(s)\n",
        table.rows.len(),
        table.columns.len()
    ));
    out
}

pub fn print_table(table: &Table, max_rows: usize) {
    print!("{}", render_table(table, max_rows));
}

fn format_row(cells: &[String], col_widths: &[usize]) -> String {
    let formatted = col_widths
        .iter()
        .enumerate()
        .map(|(i, width)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = width - cell.width();
            format!(" {}{} ", cell, " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("|");
    format!("|{}|", formatted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aligns_wide_characters() {
        let table = Table::new(
            vec!["Stkcd".to_string(), "ShortName".to_string()],
            vec![
                vec![json!("000001"), json!("平安银行")],
                vec![json!("600000"), json!("浦发银行")],
            ],
        );

        let rendered = render_table(&table, 10);
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "+--------+-----------+");
        assert_eq!(lines[1], "| Stkcd  | ShortName |");
        assert_eq!(lines[3], "| 000001 | 平安银行  |");
        assert!(rendered.ends_with("2 row(s) x 2 column(s)\n"));
    }

    #[test]
    fn caps_preview_rows() {
        let rows = (0..5).map(|i| vec![json!(i)]).collect();
        let table = Table::new(vec!["n".to_string()], rows);

        let rendered = render_table(&table, 2);
        assert!(rendered.contains("... 3 more row(s) not shown"));
        assert!(!rendered.contains("| 4 "));
    }
}
