use chrono::NaiveDateTime;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Name of the synthetic identifier merged into every fetched record.
pub const RECORD_ID_KEY: &str = "id";

/// A single cell value after normalization.
///
/// Serialized untagged so the stored blob reads as plain JSON. Variant order
/// matters for deserialization: integers are tried before floats and dates
/// before free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDateTime),
    Text(String),
    List(Vec<FieldValue>),
    Map(IndexMap<String, FieldValue>),
}

impl FieldValue {
    /// The value used for cells missing from a row.
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

/// One spreadsheet row: header name to cell value, in header order.
pub type Record = IndexMap<String, FieldValue>;

/// A record as returned to clients, with its row id merged in front of the
/// original fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    pub data: Record,
}

/// Union of keys across `records` in first-seen order, without the synthetic
/// `id` field.
pub fn column_set<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut columns = IndexSet::new();
    for record in records {
        for key in record.keys() {
            if key != RECORD_ID_KEY && !columns.contains(key) {
                columns.insert(key.clone());
            }
        }
    }
    columns.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn column_set_unions_keys_in_first_seen_order() {
        let records = vec![
            record(&[("name", "Ann".into()), ("age", FieldValue::Int(30))]),
            record(&[("name", "Bo".into()), ("city", "Oslo".into()), ("id", FieldValue::Int(9))]),
        ];

        assert_eq!(column_set(&records), vec!["name", "age", "city"]);
    }

    #[test]
    fn column_set_of_nothing_is_empty() {
        let records: Vec<Record> = Vec::new();
        assert!(column_set(&records).is_empty());
    }

    #[test]
    fn stored_record_puts_id_first() {
        let stored = StoredRecord {
            id: 7,
            data: record(&[("name", "Ann".into()), ("age", FieldValue::Int(30))]),
        };

        let json = serde_json::to_string(&stored).unwrap();
        assert_eq!(json, r#"{"id":7,"name":"Ann","age":30}"#);
    }

    #[test]
    fn blob_restores_value_variants() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let original = record(&[
            ("name", "Ann".into()),
            ("age", FieldValue::Int(30)),
            ("score", FieldValue::Float(9.5)),
            ("joined", FieldValue::Date(date)),
            ("active", FieldValue::Bool(true)),
            ("note", FieldValue::empty()),
        ]);

        let blob = serde_json::to_string(&original).unwrap();
        assert!(blob.contains(r#""joined":"2024-01-15T00:00:00""#));

        let restored: Record = serde_json::from_str(&blob).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn empty_values() {
        assert!(FieldValue::empty().is_empty());
        assert!(FieldValue::Null.is_empty());
        assert!(!FieldValue::Int(0).is_empty());
    }
}
