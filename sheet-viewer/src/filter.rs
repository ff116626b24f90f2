use crate::render::cell_text;
use crate::view::Row;

/// One column/substring pair. A row passes when the rendered text of the
/// column contains the query, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRow {
    pub column: String,
    pub query: String,
}

impl FilterRow {
    pub fn new(column: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            query: query.into(),
        }
    }

    /// Blank queries match everything.
    pub fn is_blank(&self) -> bool {
        self.query.trim().is_empty()
    }

    pub fn matches(&self, row: &Row) -> bool {
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        match row.get(&self.column) {
            Some(value) => cell_text(Some(value)).to_lowercase().contains(&needle),
            None => false,
        }
    }
}

/// Conjunction of all filters.
pub fn matches_all(filters: &[FilterRow], row: &Row) -> bool {
    filters.iter().all(|filter| filter.matches(row))
}
