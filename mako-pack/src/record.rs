use config::{
    GROUP_NAME, IGNORED, PROBABILITY_MODIFIED, RNAME, SAMPLE_NAME, TRANSCRIPT_ID,
    TRANSCRIPT_POSITION,
};
use hashbrown::HashMap;
use rusqlite::types::ValueRef;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::DataSourceError;

/// every column of a table row, in table order
pub type Columns = Map<String, Value>;

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SiteRecord {
    pub transcript_id: String,
    pub transcript_position: i64,
    pub rname: String,
    pub columns: Columns,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ReadRecord {
    pub rname: String,
    pub transcript_position: i64,
    pub sample_name: String,
    pub group_name: String,
    pub probability_modified: f64, // NaN when NULL
    pub ignored: bool,
    pub columns: Columns,
}

/// one (column, value) pair of a site row in long format
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LongRow {
    pub column: String,
    pub value: Value,
}

/// column names of a result set plus the positions of the required ones
#[derive(Debug, Clone)]
pub struct Layout {
    table: &'static str,
    names: Vec<String>,
    required: HashMap<&'static str, usize>,
}

impl Layout {
    pub fn new(
        table: &'static str,
        names: Vec<String>,
        required: &[&'static str],
    ) -> Result<Self, DataSourceError> {
        let mut positions = HashMap::new();

        for column in required {
            let idx = names.iter().position(|name| name == column).ok_or(
                DataSourceError::MissingColumn {
                    table: table.to_string(),
                    column: column.to_string(),
                },
            )?;
            positions.insert(*column, idx);
        }

        Ok(Self {
            table,
            names,
            required: positions,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    fn idx(&self, column: &'static str) -> usize {
        // constructor guarantees every required column is present
        self.required[column]
    }

    fn columns(&self, row: &Row) -> Result<Columns, DataSourceError> {
        let mut columns = Map::with_capacity(self.names.len());
        for (i, name) in self.names.iter().enumerate() {
            columns.insert(name.clone(), cell(row.get_ref(i)?));
        }

        Ok(columns)
    }

    fn text(&self, row: &Row, column: &'static str) -> Result<String, DataSourceError> {
        match row.get_ref(self.idx(column))? {
            ValueRef::Text(t) => Ok(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Integer(i) => Ok(i.to_string()),
            other => Err(self.invalid(column, other)),
        }
    }

    fn position(&self, row: &Row, column: &'static str) -> Result<i64, DataSourceError> {
        match row.get_ref(self.idx(column))? {
            ValueRef::Integer(i) => Ok(i),
            ValueRef::Real(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
            other => Err(self.invalid(column, other)),
        }
    }

    fn probability(&self, row: &Row, column: &'static str) -> Result<f64, DataSourceError> {
        match row.get_ref(self.idx(column))? {
            ValueRef::Real(f) => Ok(f),
            ValueRef::Integer(i) => Ok(i as f64),
            ValueRef::Null => Ok(f64::NAN),
            other => Err(self.invalid(column, other)),
        }
    }

    fn flag(&self, row: &Row, column: &'static str) -> Result<Option<bool>, DataSourceError> {
        let value = row.get_ref(self.idx(column))?;
        match value {
            ValueRef::Null => Ok(None),
            ValueRef::Integer(i) => Ok(Some(i != 0)),
            ValueRef::Text(t) => match String::from_utf8_lossy(t).trim().to_lowercase().as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(self.invalid(column, value)),
            },
            other => Err(self.invalid(column, other)),
        }
    }

    fn invalid(&self, column: &'static str, value: ValueRef) -> DataSourceError {
        DataSourceError::InvalidValue {
            table: self.table.to_string(),
            column: column.to_string(),
            value: cell(value).to_string(),
        }
    }
}

impl SiteRecord {
    pub fn from_row(row: &Row, layout: &Layout) -> Result<Self, DataSourceError> {
        Ok(Self {
            transcript_id: layout.text(row, TRANSCRIPT_ID)?,
            transcript_position: layout.position(row, TRANSCRIPT_POSITION)?,
            rname: layout.text(row, RNAME)?,
            columns: layout.columns(row)?,
        })
    }
}

impl ReadRecord {
    pub fn from_row(row: &Row, layout: &Layout) -> Result<Self, DataSourceError> {
        Ok(Self {
            rname: layout.text(row, RNAME)?,
            transcript_position: layout.position(row, TRANSCRIPT_POSITION)?,
            sample_name: layout.text(row, SAMPLE_NAME)?,
            group_name: layout.text(row, GROUP_NAME)?,
            probability_modified: layout.probability(row, PROBABILITY_MODIFIED)?,
            // a NULL flag never satisfies `ignored = false`
            ignored: layout.flag(row, IGNORED)?.unwrap_or(true),
            columns: layout.columns(row)?,
        })
    }

    /// "{sample_name} ({group_name})"
    pub fn label(&self) -> String {
        format!("{} ({})", self.sample_name, self.group_name)
    }
}

/// convert a raw SQLite cell into a pass-through value
pub fn cell(value: ValueRef) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<blob: {} bytes>", b.len())),
    }
}

/// melt matching site records into (column, value) rows, column-major
pub fn melt(records: &[&SiteRecord], names: &[String]) -> Vec<LongRow> {
    let mut rows = Vec::with_capacity(records.len() * names.len());

    for name in names {
        for record in records {
            rows.push(LongRow {
                column: name.clone(),
                value: record.columns.get(name).cloned().unwrap_or(Value::Null),
            });
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell(ValueRef::Null), Value::Null);
        assert_eq!(cell(ValueRef::Integer(7)), serde_json::json!(7));
        assert_eq!(cell(ValueRef::Real(0.25)), serde_json::json!(0.25));
        assert_eq!(cell(ValueRef::Text(b"ENST1")), serde_json::json!("ENST1"));
        assert_eq!(cell(ValueRef::Real(f64::NAN)), Value::Null);
    }

    #[test]
    fn test_layout_missing_column() {
        let names = vec![TRANSCRIPT_ID.to_string(), RNAME.to_string()];
        let err = Layout::new("sites", names, &[TRANSCRIPT_ID, TRANSCRIPT_POSITION, RNAME])
            .unwrap_err();

        assert!(matches!(
            err,
            DataSourceError::MissingColumn { ref column, .. } if column == TRANSCRIPT_POSITION
        ));
    }

    #[test]
    fn test_read_record_from_row() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT 'r1' AS rname, 10.0 AS transcript_position, 'S1' AS sample_name,
                        'G1' AS group_name, NULL AS probability_modified, 'False' AS ignored,
                        42 AS extra",
            )
            .unwrap();
        let names = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let layout = Layout::new("reads", names, &config::READ_COLUMNS).unwrap();

        let record = stmt
            .query_row([], |row| Ok(ReadRecord::from_row(row, &layout)))
            .unwrap()
            .unwrap();

        assert_eq!(record.rname, "r1");
        assert_eq!(record.transcript_position, 10);
        assert!(record.probability_modified.is_nan());
        assert!(!record.ignored);
        assert_eq!(record.label(), "S1 (G1)");
        assert_eq!(
            record.columns.keys().collect::<Vec<_>>(),
            vec![
                "rname",
                "transcript_position",
                "sample_name",
                "group_name",
                "probability_modified",
                "ignored",
                "extra"
            ]
        );
    }

    #[test]
    fn test_fractional_position_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = conn
            .prepare("SELECT 'T1' AS transcript_id, 10.5 AS transcript_position, 'r1' AS rname")
            .unwrap();
        let names = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let layout = Layout::new("sites", names, &config::SITE_COLUMNS).unwrap();

        let result = stmt
            .query_row([], |row| Ok(SiteRecord::from_row(row, &layout)))
            .unwrap();

        assert!(matches!(result, Err(DataSourceError::InvalidValue { .. })));
    }

    #[test]
    fn test_melt_is_column_major() {
        let mut a = Map::new();
        a.insert("transcript_id".into(), serde_json::json!("T1"));
        a.insert("rname".into(), serde_json::json!("r1"));
        let mut b = a.clone();
        b.insert("rname".into(), serde_json::json!("r2"));

        let ra = SiteRecord {
            transcript_id: "T1".into(),
            transcript_position: 10,
            rname: "r1".into(),
            columns: a,
        };
        let rb = SiteRecord {
            rname: "r2".into(),
            columns: b,
            ..ra.clone()
        };

        let names = vec!["transcript_id".to_string(), "rname".to_string()];
        let rows = melt(&[&ra, &rb], &names);

        let flat = rows
            .iter()
            .map(|r| (r.column.as_str(), r.value.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            flat,
            vec![
                ("transcript_id", serde_json::json!("T1")),
                ("transcript_id", serde_json::json!("T1")),
                ("rname", serde_json::json!("r1")),
                ("rname", serde_json::json!("r2")),
            ]
        );
    }
}
