//! Deterministic builders for job documents and results streams.
//!
//! Output mirrors what a search head sends so that tests can exercise the
//! decoder and job handle without a live server.

use serde_json::{Map, Value, json};

// =============================================================================
// Results XML Generator
// =============================================================================

/// Generates a Splunk XML results document.
///
/// # Example
/// ```ignore
/// use splunk_jobs::testing::generators::ResultsXmlGenerator;
///
/// let xml = ResultsXmlGenerator::new()
///     .with_fields(["host", "count"])
///     .with_row_count(3)
///     .with_message("INFO", "Search finished")
///     .generate();
/// ```
#[derive(Debug, Clone)]
pub struct ResultsXmlGenerator {
    preview: bool,
    fields: Vec<String>,
    row_count: usize,
    multi_value_field: Option<String>,
    raw: bool,
    messages: Vec<(String, String)>,
}

impl Default for ResultsXmlGenerator {
    fn default() -> Self {
        Self {
            preview: false,
            fields: vec!["count".to_string()],
            row_count: 1,
            multi_value_field: None,
            raw: false,
            messages: Vec::new(),
        }
    }
}

impl ResultsXmlGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_row_count(mut self, rows: usize) -> Self {
        self.row_count = rows;
        self
    }

    /// Emit two values for `field` in every row.
    pub fn with_multi_value(mut self, field: impl Into<String>) -> Self {
        self.multi_value_field = Some(field.into());
        self
    }

    /// Add a highlighted `_raw` field to every row.
    pub fn with_raw(mut self) -> Self {
        self.raw = true;
        self
    }

    pub fn with_message(mut self, level: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.push((level.into(), text.into()));
        self
    }

    /// Value of `field` in row `row`.
    pub fn value(field: &str, row: usize) -> String {
        format!("{field}-{row}")
    }

    /// Reassembled `_raw` text of row `row`.
    pub fn raw_value(row: usize) -> String {
        format!("event {row} status=200 & ok")
    }

    pub fn generate(&self) -> String {
        let mut xml = String::from("<?xml version='1.0' encoding='UTF-8'?>\n");
        xml.push_str(&format!(
            "<results preview='{}'>\n",
            if self.preview { 1 } else { 0 }
        ));

        xml.push_str("<meta>\n<fieldOrder>\n");
        for field in &self.fields {
            xml.push_str(&format!("<field>{field}</field>\n"));
        }
        if self.raw {
            xml.push_str("<field>_raw</field>\n");
        }
        xml.push_str("</fieldOrder>\n</meta>\n");

        if !self.messages.is_empty() {
            xml.push_str("<messages>\n");
            for (level, text) in &self.messages {
                xml.push_str(&format!("  <msg type=\"{}\">{}</msg>\n", level, escape(text)));
            }
            xml.push_str("</messages>\n");
        }

        for row in 0..self.row_count {
            xml.push_str(&format!("\t<result offset='{row}'>\n"));
            for field in &self.fields {
                xml.push_str(&format!("\t\t<field k='{field}'>\n"));
                xml.push_str(&format!(
                    "\t\t\t<value><text>{}</text></value>\n",
                    escape(&Self::value(field, row))
                ));
                if self.multi_value_field.as_deref() == Some(field.as_str()) {
                    xml.push_str(&format!(
                        "\t\t\t<value><text>{}-b</text></value>\n",
                        escape(&Self::value(field, row))
                    ));
                }
                xml.push_str("\t\t</field>\n");
            }
            if self.raw {
                xml.push_str(&format!(
                    "\t\t<field k='_raw'><v xml:space='preserve' trunc='0'>event {row} <sg h='1'>status=200</sg> &amp; ok</v></field>\n"
                ));
            }
            xml.push_str("\t</result>\n");
        }

        xml.push_str("</results>\n");
        xml
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// =============================================================================
// Job Document Builder
// =============================================================================

/// Builds `GET /search/jobs/{sid}?output_mode=json` documents.
#[derive(Debug, Clone)]
pub struct JobDocumentBuilder {
    sid: String,
    content: Map<String, Value>,
}

impl JobDocumentBuilder {
    /// A running job with the usual properties present.
    pub fn new(sid: impl Into<String>) -> Self {
        let sid = sid.into();
        let mut content = Map::new();
        content.insert("sid".to_string(), json!(sid));
        content.insert("dispatchState".to_string(), json!("RUNNING"));
        content.insert("doneProgress".to_string(), json!(0.5));
        content.insert("isDone".to_string(), json!(false));
        content.insert("isFailed".to_string(), json!(false));
        content.insert("isFinalized".to_string(), json!(false));
        content.insert("isPaused".to_string(), json!(false));
        content.insert("isPreviewEnabled".to_string(), json!(true));
        content.insert("eventCount".to_string(), json!(0));
        content.insert("resultCount".to_string(), json!(0));
        content.insert("ttl".to_string(), json!(600));
        content.insert("priority".to_string(), json!(5));
        Self { sid, content }
    }

    /// Mark the job finished.
    pub fn done(self) -> Self {
        self.with("isDone", json!(true))
            .with("dispatchState", json!("DONE"))
            .with("doneProgress", json!(1.0))
    }

    /// Mark the job failed.
    pub fn failed(self) -> Self {
        self.with("isFailed", json!(true))
            .with("isDone", json!(true))
            .with("dispatchState", json!("FAILED"))
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.content.insert(key.to_string(), value);
        self
    }

    /// The Atom-style document wrapping the content.
    pub fn build(&self) -> Value {
        json!({
            "links": {},
            "origin": "https://localhost:8089/services/search/jobs",
            "entry": [{
                "name": self.sid,
                "id": format!("https://localhost:8089/services/search/jobs/{}", self.sid),
                "content": Value::Object(self.content.clone()),
            }],
            "paging": {"total": 1, "perPage": 0, "offset": 0},
        })
    }
}
