//! Flattening of nested JSON records into rectangular tables.
//!
//! Nested objects become dotted column names
//! (`relationships.projects.links.related`), the JSON:API `attributes.`
//! prefix is dropped (`attributes.name` becomes `name`) and arrays are kept
//! whole as JSON text.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::models::EntityType;

const ATTRIBUTES_PREFIX: &str = "attributes.";

/// A scalar table cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text content, or the rendering of numbers and booleans.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Text(s) => Some(s.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => n.as_f64(),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Parse an RFC 3339 timestamp.
    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        self.as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => Cell::Number(n.clone()),
            Value::String(s) => Cell::Text(s.clone()),
            // Lists are not expanded.
            Value::Array(_) | Value::Object(_) => Cell::Text(value.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_none(),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Number(n) => n.serialize(serializer),
            Cell::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// A rectangular table of flattened records.
///
/// Every row has exactly one cell per column. Rows keep pagination order;
/// columns keep the order in which they were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Cell at `row` / `column`; `None` if either is out of range.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let col = *self.index.get(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// First non-empty cell among `columns`, rendered as a string.
    pub fn first_value(&self, row: usize, columns: &[&str]) -> Option<String> {
        columns
            .iter()
            .filter_map(|c| self.cell(row, c))
            .find_map(Cell::as_string)
            .filter(|s| !s.is_empty())
    }

    /// The `id` column as strings, skipping empty cells.
    pub fn ids(&self) -> Vec<String> {
        self.column_values("id")
    }

    /// Non-empty values of a column, in row order.
    pub fn column_values(&self, column: &str) -> Vec<String> {
        (0..self.len())
            .filter_map(|row| self.cell(row, column).and_then(Cell::as_string))
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Id of a related entity, whether it came as an attribute
    /// (`contractor`, `contractor_id`) or a relationship
    /// (`relationships.contractor.data.id`).
    pub fn related_id(&self, row: usize, relation: &str) -> Option<String> {
        let relationship = format!("relationships.{relation}.data.id");
        let suffixed = format!("{relation}_id");
        self.first_value(row, &[relationship.as_str(), relation, suffixed.as_str()])
    }

    /// Row index of the record with the given id.
    pub fn find_by_id(&self, id: &str) -> Option<usize> {
        (0..self.len()).find(|&row| {
            self.cell(row, "id")
                .and_then(Cell::as_string)
                .is_some_and(|v| v == id)
        })
    }

    /// Append a record given as (column, cell) pairs.
    ///
    /// New columns are appended and existing rows padded with `Empty`.
    pub fn push_record<I>(&mut self, record: I)
    where
        I: IntoIterator<Item = (String, Cell)>,
    {
        let width_before = self.columns.len();
        let mut row = vec![Cell::Empty; width_before];
        for (column, cell) in record {
            let col = self.column_index_or_insert(column);
            if col >= row.len() {
                row.resize(col + 1, Cell::Empty);
            }
            row[col] = cell;
        }
        let width = self.columns.len();
        if width > width_before {
            for existing in &mut self.rows {
                existing.resize(width, Cell::Empty);
            }
        }
        row.resize(width, Cell::Empty);
        self.rows.push(row);
    }

    /// A table with only the rows for which `keep` returns true.
    ///
    /// Columns are kept as they are, even when no row survives.
    pub fn filter_rows(&self, mut keep: impl FnMut(usize) -> bool) -> Table {
        let rows = (0..self.len())
            .filter(|&row| keep(row))
            .map(|row| self.rows[row].clone())
            .collect();
        Table {
            columns: self.columns.clone(),
            index: self.index.clone(),
            rows,
        }
    }

    /// Append all rows of `other`, merging columns.
    pub fn extend(&mut self, other: Table) {
        let Table { columns, rows, .. } = other;
        for row in rows {
            self.push_record(columns.iter().cloned().zip(row));
        }
    }

    fn column_index_or_insert(&mut self, column: String) -> usize {
        if let Some(&i) = self.index.get(&column) {
            return i;
        }
        let i = self.columns.len();
        self.index.insert(column.clone(), i);
        self.columns.push(column);
        i
    }
}

impl Serialize for Table {
    /// Serializes as an array of objects in column order.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Row<'a>(&'a [String], &'a [Cell]);

        impl Serialize for Row<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(self.0.len()))?;
                for (column, cell) in self.0.iter().zip(self.1) {
                    map.serialize_entry(column, cell)?;
                }
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Row(&self.columns, row))?;
        }
        seq.end()
    }
}

/// Flatten raw records into a table.
pub fn flatten(records: &[Value]) -> Table {
    let mut table = Table::new();
    for record in records {
        table.push_record(flatten_record(record));
    }
    table
}

/// Flatten one record into (dotted column, cell) pairs in document order.
pub fn flatten_record(record: &Value) -> Vec<(String, Cell)> {
    let mut out = Vec::new();
    match record {
        Value::Object(map) => flatten_into(map, "", &mut out),
        other => out.push(("value".to_string(), Cell::from_json(other))),
    }
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, Cell)>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(inner, &path, out),
            Value::Object(_) => out.push((column_name(path), Cell::Empty)),
            other => out.push((column_name(path), Cell::from_json(other))),
        }
    }
}

fn column_name(path: String) -> String {
    match path.strip_prefix(ATTRIBUTES_PREFIX) {
        Some(stripped) => stripped.to_string(),
        None => path,
    }
}

/// One table per entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tables(BTreeMap<EntityType, Table>);

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: EntityType, table: Table) {
        self.0.insert(entity, table);
    }

    pub fn get(&self, entity: EntityType) -> Option<&Table> {
        self.0.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tables in entity fetch order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityType, &Table)> {
        self.0.iter().map(|(e, t)| (*e, t))
    }
}

impl FromIterator<(EntityType, Table)> for Tables {
    fn from_iter<I: IntoIterator<Item = (EntityType, Table)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
