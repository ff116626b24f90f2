use serde_json::{Map, Value};

use crate::filter::{matches_all, FilterRow};
use crate::render::render_table;

/// A fetched record: field name to JSON value, in server order.
pub type Row = Map<String, Value>;

/// Synthetic record id added by the server; never shown as a column.
const ID_FIELD: &str = "id";

/// Client-side view of one loaded dataset: every loaded row, the rows that
/// pass the current filters, and the columns to display.
///
/// Only `load`, `apply_filters`, `clear_filters` and `reset` change it.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    rows: Vec<Row>,
    visible: Vec<usize>,
    columns: Vec<String>,
}

impl TableView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the loaded rows. Columns are recomputed and every row becomes
    /// visible.
    pub fn load(&mut self, rows: Vec<Row>) {
        self.columns = deduce_columns(&rows);
        self.visible = (0..rows.len()).collect();
        self.rows = rows;
    }

    /// Keep the loaded rows that pass every filter. Returns the number of
    /// matches. Never touches the loaded set itself.
    pub fn apply_filters(&mut self, filters: &[FilterRow]) -> usize {
        self.visible = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches_all(filters, row))
            .map(|(idx, _)| idx)
            .collect();
        self.visible.len()
    }

    pub fn clear_filters(&mut self) {
        self.visible = (0..self.rows.len()).collect();
    }

    pub fn reset(&mut self) {
        self.rows.clear();
        self.visible.clear();
        self.columns.clear();
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        self.visible.iter().map(move |idx| &self.rows[*idx])
    }

    pub fn loaded_len(&self) -> usize {
        self.rows.len()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// True once rows with at least one column are loaded.
    pub fn is_loaded(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn render(&self) -> String {
        render_table(self.visible_rows(), &self.columns)
    }
}

/// Union of field names across `rows`, first-seen order, without `id`.
pub fn deduce_columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if key != ID_FIELD && !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(value: Value) -> Vec<Row> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn people() -> Vec<Row> {
        rows(json!([
            {"id": 1, "name": "Ann", "age": 30, "city": "Oslo"},
            {"id": 2, "name": "Bo", "age": 25, "city": "Bergen"},
            {"id": 3, "name": "Dana", "age": 35, "city": "Oslo"},
        ]))
    }

    fn visible_ids(view: &TableView) -> Vec<i64> {
        view.visible_rows()
            .map(|row| row["id"].as_i64().unwrap())
            .collect()
    }

    #[test]
    fn load_derives_columns_without_id() {
        let mut view = TableView::new();
        view.load(rows(json!([
            {"id": 1, "name": "Ann"},
            {"id": 2, "name": "Bo", "extra": true},
        ])));

        assert_eq!(view.columns(), ["name", "extra"]);
        assert_eq!(view.visible_len(), 2);
        assert!(view.is_loaded());
    }

    #[test]
    fn filters_are_conjunctive() {
        let mut view = TableView::new();
        view.load(people());

        let by_name = FilterRow::new("name", "a");
        let by_city = FilterRow::new("city", "oslo");

        view.apply_filters(std::slice::from_ref(&by_name));
        let name_ids = visible_ids(&view);
        view.apply_filters(std::slice::from_ref(&by_city));
        let city_ids = visible_ids(&view);
        view.apply_filters(&[by_name, by_city]);
        let both_ids = visible_ids(&view);

        let intersection: Vec<i64> = name_ids
            .iter()
            .copied()
            .filter(|id| city_ids.contains(id))
            .collect();
        assert_eq!(both_ids, intersection);
        assert_eq!(both_ids, vec![1, 3]);
    }

    #[test]
    fn blank_filter_keeps_everything() {
        let mut view = TableView::new();
        view.load(people());

        assert_eq!(view.apply_filters(&[FilterRow::new("city", "")]), 3);
        assert_eq!(visible_ids(&view), vec![1, 2, 3]);
    }

    #[test]
    fn example_filter_finds_ann() {
        let mut view = TableView::new();
        view.load(rows(json!([
            {"id": 10, "name": "Ann", "age": 30},
            {"id": 11, "name": "Bo", "age": 25},
        ])));

        assert_eq!(view.apply_filters(&[FilterRow::new("name", "an")]), 1);
        assert_eq!(visible_ids(&view), vec![10]);
    }

    #[test]
    fn clear_restores_loaded_rows_and_filters_never_drop_them() {
        let mut view = TableView::new();
        view.load(people());

        view.apply_filters(&[FilterRow::new("name", "zzz")]);
        assert_eq!(view.visible_len(), 0);
        assert_eq!(view.loaded_len(), 3);

        view.clear_filters();
        assert_eq!(visible_ids(&view), vec![1, 2, 3]);
    }

    #[test]
    fn reset_empties_everything() {
        let mut view = TableView::new();
        view.load(people());
        view.reset();

        assert_eq!(view.loaded_len(), 0);
        assert!(view.columns().is_empty());
        assert_eq!(view.render(), "Rows: 0");
    }
}
