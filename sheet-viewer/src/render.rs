//! Plain-text table rendering of loaded rows.

use serde_json::Value;
use unicode_width::UnicodeWidthStr;

use crate::view::Row;

const COLUMN_GAP: &str = "  ";

/// Display text of a cell. Missing and null cells are empty, arrays are
/// joined with ", ", objects are compact JSON.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| cell_text(Some(item)))
            .collect::<Vec<_>>()
            .join(", "),
        Some(object @ Value::Object(_)) => object.to_string(),
    }
}

/// Render `rows` under a header of `columns`, followed by a row count line.
pub fn render_table<'a, I>(rows: I, columns: &[String]) -> String
where
    I: IntoIterator<Item = &'a Row>,
{
    let cells: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| single_line(&cell_text(row.get(column))))
                .collect()
        })
        .collect();

    let mut out = String::new();
    if !columns.is_empty() {
        let widths: Vec<usize> = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                cells
                    .iter()
                    .map(|row| row[idx].width())
                    .chain(std::iter::once(column.width()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        push_line(&mut out, columns.iter().map(String::as_str), &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_line(&mut out, rule.iter().map(String::as_str), &widths);
        for row in &cells {
            push_line(&mut out, row.iter().map(String::as_str), &widths);
        }
    }

    out.push_str(&format!("Rows: {}", cells.len()));
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| format!("{}{}", cell, " ".repeat(width.saturating_sub(cell.width()))))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    out.push_str(line.trim_end());
    out.push('\n');
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn stringifies_cells() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&Value::Null)), "");
        assert_eq!(cell_text(Some(&json!("Ann"))), "Ann");
        assert_eq!(cell_text(Some(&json!(30))), "30");
        assert_eq!(cell_text(Some(&json!(2.5))), "2.5");
        assert_eq!(cell_text(Some(&json!(true))), "true");
        assert_eq!(cell_text(Some(&json!(["a", 1, null]))), "a, 1, ");
        assert_eq!(cell_text(Some(&json!({"k": [1, 2]}))), r#"{"k":[1,2]}"#);
        assert_eq!(
            cell_text(Some(&json!("2024-01-15T00:00:00"))),
            "2024-01-15T00:00:00"
        );
    }

    #[test]
    fn renders_aligned_columns() {
        let rows = vec![
            row(json!({"id": 1, "name": "Ann", "age": 30})),
            row(json!({"id": 2, "name": "Bo"})),
        ];
        let columns = vec!["name".to_string(), "age".to_string()];

        let table = render_table(&rows, &columns);

        assert_eq!(
            table,
            "name  age\n\
             ----  ---\n\
             Ann   30\n\
             Bo\n\
             Rows: 2"
        );
    }

    #[test]
    fn renders_count_without_columns() {
        let rows: Vec<Row> = Vec::new();
        assert_eq!(render_table(&rows, &[]), "Rows: 0");
    }
}
