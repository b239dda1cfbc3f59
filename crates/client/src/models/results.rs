//! Decoded search results.
//!
//! # What this module handles:
//! - Records yielded by the results decoder (rows and diagnostic messages)
//! - Field values, including multi-valued fields
//! - Pagination parameters for results retrieval
//!
//! # What this module does NOT handle:
//! - Decoding the wire format (see [`crate::reader`])

use std::fmt;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use splunk_jobs_config::constants::DEFAULT_RESULTS_PAGE_SIZE;

/// One decoded unit of a results stream.
///
/// Serializes as `{"type": "result" | "message", "data": {...}}` so a row
/// field named `type` cannot shadow the record tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ResultRecord {
    /// A data row.
    Result(ResultRow),
    /// A diagnostic emitted by the service alongside the rows.
    Message(Message),
}

impl ResultRecord {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Result(_) => RecordKind::Result,
            Self::Message(_) => RecordKind::Message,
        }
    }

    pub fn as_result(&self) -> Option<&ResultRow> {
        match self {
            Self::Result(row) => Some(row),
            Self::Message(_) => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Self::Message(msg) => Some(msg),
            Self::Result(_) => None,
        }
    }

    pub fn into_result(self) -> Option<ResultRow> {
        match self {
            Self::Result(row) => Some(row),
            Self::Message(_) => None,
        }
    }
}

/// Tag of a [`ResultRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Result,
    Message,
}

impl RecordKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Result => "result",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of one field in a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    /// A multi-valued field, in service order.
    Multi(Vec<String>),
}

impl FieldValue {
    pub(crate) fn from_values(mut values: Vec<String>) -> Self {
        match values.len() {
            0 => Self::Single(String::new()),
            1 => Self::Single(values.remove(0)),
            _ => Self::Multi(values),
        }
    }

    /// First value; the whole value for single-valued fields.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Single(s) => s,
            Self::Multi(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(s) => std::slice::from_ref(s),
            Self::Multi(values) => values,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(s) => f.write_str(s),
            Self::Multi(values) => f.write_str(&values.join("\n")),
        }
    }
}

/// One result row with fields in the order the service sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    offset: Option<u64>,
    fields: Vec<(String, FieldValue)>,
}

impl ResultRow {
    pub fn new(offset: Option<u64>) -> Self {
        Self {
            offset,
            fields: Vec::new(),
        }
    }

    /// Append a field; a repeated name replaces the earlier value in place.
    pub fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Position of the row within the full result set, if the service sent one.
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// First value of a field.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).map(FieldValue::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Severity of a service diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Other(String),
}

impl MessageLevel {
    pub fn from_wire(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "WARN" | "WARNING" => Self::Warn,
            "ERROR" => Self::Error,
            "FATAL" => Self::Fatal,
            _ => Self::Other(value.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for MessageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MessageLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A diagnostic message from a results stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

/// Pagination and shaping parameters for results retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsParams {
    /// Maximum rows to return; `0` asks the service for everything.
    pub count: u64,
    pub offset: u64,
    /// Post-processing SPL applied to the results (`search` parameter).
    pub post_process: Option<String>,
    /// Restrict returned fields (`f` parameter, repeated).
    pub field_list: Vec<String>,
}

impl Default for ResultsParams {
    fn default() -> Self {
        Self {
            count: DEFAULT_RESULTS_PAGE_SIZE,
            offset: 0,
            post_process: None,
            field_list: Vec::new(),
        }
    }
}

impl ResultsParams {
    /// Every result in one response.
    pub fn all() -> Self {
        Self {
            count: 0,
            ..Self::default()
        }
    }

    pub fn page(count: u64, offset: u64) -> Self {
        Self {
            count,
            offset,
            ..Self::default()
        }
    }

    pub fn post_process(mut self, search: impl Into<String>) -> Self {
        self.post_process = Some(search.into());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.field_list = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Parameters for the following page after `received` rows came back.
    ///
    /// `None` once a page came back short (or empty), meaning there is no more.
    pub fn next_page(&self, received: u64) -> Option<Self> {
        if received == 0 || self.count == 0 || received < self.count {
            return None;
        }
        Some(Self {
            offset: self.offset + received,
            ..self.clone()
        })
    }

    pub(crate) fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("output_mode", "xml".to_string()),
            ("count", self.count.to_string()),
            ("offset", self.offset.to_string()),
        ];
        if let Some(search) = self.post_process.as_deref()
            && !search.trim().is_empty()
        {
            params.push(("search", search.to_string()));
        }
        for field in &self.field_list {
            params.push(("f", field.clone()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_from_values() {
        assert_eq!(
            FieldValue::from_values(vec![]),
            FieldValue::Single(String::new())
        );
        assert_eq!(
            FieldValue::from_values(vec!["a".into()]),
            FieldValue::Single("a".into())
        );
        let multi = FieldValue::from_values(vec!["a".into(), "b".into()]);
        assert!(multi.is_multi());
        assert_eq!(multi.as_str(), "a");
        assert_eq!(multi.values().len(), 2);
    }

    #[test]
    fn test_row_preserves_order_and_serializes_as_map() {
        let mut row = ResultRow::new(Some(0));
        row.push("zeta", FieldValue::Single("1".into()));
        row.push("alpha", FieldValue::Multi(vec!["x".into(), "y".into()]));
        assert_eq!(row.field_names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":["x","y"]}"#);
    }

    #[test]
    fn test_row_push_replaces_duplicate_names() {
        let mut row = ResultRow::new(None);
        row.push("count", FieldValue::Single("1".into()));
        row.push("count", FieldValue::Single("2".into()));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get_str("count"), Some("2"));
    }

    #[test]
    fn test_record_serialization_is_tagged() {
        let record = ResultRecord::Message(Message {
            level: MessageLevel::from_wire("warn"),
            text: "disk almost full".into(),
        });
        assert_eq!(record.kind(), RecordKind::Message);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["data"]["level"], "WARN");
    }

    #[test]
    fn test_row_field_named_type_keeps_record_tag() {
        let mut row = ResultRow::new(Some(0));
        row.push("type", FieldValue::Single("error".into()));
        row.push("count", FieldValue::Single("12".into()));

        let line = serde_json::to_string(&ResultRecord::Result(row)).unwrap();
        assert_eq!(
            line,
            r#"{"type":"result","data":{"type":"error","count":"12"}}"#
        );
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["type"], "result");
        assert_eq!(parsed["data"]["type"], "error");
    }

    #[test]
    fn test_message_level_keeps_unknown() {
        assert_eq!(
            MessageLevel::from_wire("NOTICE"),
            MessageLevel::Other("NOTICE".into())
        );
        assert_eq!(MessageLevel::from_wire("fatal"), MessageLevel::Fatal);
    }

    #[test]
    fn test_next_page() {
        let params = ResultsParams::page(100, 0);
        let next = params.next_page(100).unwrap();
        assert_eq!(next.offset, 100);
        assert_eq!(next.count, 100);
        assert!(next.next_page(40).is_none());
        assert!(params.next_page(0).is_none());
        assert!(ResultsParams::all().next_page(500).is_none());
    }

    #[test]
    fn test_query_params() {
        let params = ResultsParams::page(10, 20)
            .post_process("| stats count")
            .fields(["host", "count"]);
        assert_eq!(
            params.query_params(),
            vec![
                ("output_mode", "xml".to_string()),
                ("count", "10".to_string()),
                ("offset", "20".to_string()),
                ("search", "| stats count".to_string()),
                ("f", "host".to_string()),
                ("f", "count".to_string()),
            ]
        );
    }
}
