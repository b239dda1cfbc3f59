//! Incremental decoder for Splunk's XML results format.
//!
//! Responsibilities:
//! - Read a forward-only byte stream event by event and yield one
//!   [`ResultRecord`] at a time.
//! - Expose the preview flag and field order of the current `<results>` block.
//! - Reassemble multi-valued fields and highlighted `_raw` segments.
//!
//! Does NOT handle:
//! - Issuing requests or deciding when a job is ready (see [`crate::job`]).
//!
//! Invariants:
//! - At most one decoded record is buffered ahead of the caller, so memory is
//!   bounded by the largest single record, not by the result-set size.
//! - A record is only yielded once its closing tag was read; truncated tails
//!   fail with [`ClientError::Parse`] and nothing partial is emitted.
//! - After an error the reader is exhausted.
//!
//! Wire shape:
//!
//! ```text
//! <results preview='0'>
//!   <meta><fieldOrder><field>count</field></fieldOrder></meta>
//!   <messages><msg type='INFO'>...</msg></messages>
//!   <result offset='0'>
//!     <field k='count'><value><text>1</text></value></field>
//!     <field k='_raw'><v xml:space='preserve'>a <sg h='1'>b</sg></v></field>
//!   </result>
//! </results>
//! ```
//!
//! Export responses concatenate several such blocks (previews first).

use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::io;

use bytes::Bytes;
use futures::stream::{BoxStream, Stream};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::io::StreamReader;
use tracing::{debug, trace};

use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;
use crate::models::{FieldValue, Message, MessageLevel, ResultRecord, ResultRow};

/// Response body as handed to the decoder: transport chunks behind a fixed-size buffer.
pub type TransportBody = BufReader<StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>>;

/// A decoder reading straight from an HTTP response.
pub type ResultsStream = ResultsReader<TransportBody>;

/// Owned copy of the parts of an XML event the decoder cares about.
#[derive(Debug)]
enum XmlEvent {
    Start {
        name: Vec<u8>,
        attrs: Vec<(Vec<u8>, String)>,
    },
    End(Vec<u8>),
    Text(String),
    Eof,
}

fn attr<'a>(attrs: &'a [(Vec<u8>, String)], key: &[u8]) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.as_slice() == key)
        .map(|(_, v)| v.as_str())
}

/// Streaming decoder over any buffered async byte source.
pub struct ResultsReader<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    pending: VecDeque<ResultRecord>,
    is_preview: bool,
    field_order: Vec<String>,
    in_block: bool,
    saw_declaration: bool,
    blocks: usize,
    results_read: u64,
    last_tag: String,
    finished: bool,
    metrics: Option<MetricsCollector>,
}

impl<R> fmt::Debug for ResultsReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultsReader")
            .field("is_preview", &self.is_preview)
            .field("field_order", &self.field_order)
            .field("blocks", &self.blocks)
            .field("results_read", &self.results_read)
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<R: AsyncBufRead + Unpin> ResultsReader<R> {
    /// Start decoding `source`.
    ///
    /// Reads up to and including the first record so that [`is_preview`](Self::is_preview)
    /// and [`field_order`](Self::field_order) are known on return. An empty
    /// source is an empty, non-preview stream; a source that stops after the
    /// XML declaration is a [`ClientError::Parse`].
    pub async fn open(source: R) -> Result<Self> {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.expand_empty_elements = true;
        config.trim_text(false);

        let mut this = Self {
            reader,
            buf: Vec::new(),
            pending: VecDeque::with_capacity(1),
            is_preview: false,
            field_order: Vec::new(),
            in_block: false,
            saw_declaration: false,
            blocks: 0,
            results_read: 0,
            last_tag: String::new(),
            finished: false,
            metrics: None,
        };
        this.fill().await?;
        Ok(this)
    }

    /// Count every yielded record with `metrics`.
    pub fn with_metrics(mut self, metrics: Option<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether the current block holds partial (preview) results.
    pub fn is_preview(&self) -> bool {
        self.is_preview
    }

    /// Field names of the current block in presentation order.
    pub fn field_order(&self) -> &[String] {
        &self.field_order
    }

    /// Number of result rows yielded so far.
    pub fn results_read(&self) -> u64 {
        self.results_read
    }

    /// Next record, or `None` once the stream is exhausted.
    pub async fn next_record(&mut self) -> Result<Option<ResultRecord>> {
        if self.pending.is_empty()
            && !self.finished
            && let Err(e) = self.fill().await
        {
            self.finished = true;
            self.pending.clear();
            return Err(e);
        }

        let record = self.pending.pop_front();
        if let Some(record) = &record {
            if matches!(record, ResultRecord::Result(_)) {
                self.results_read += 1;
            }
            if let Some(metrics) = &self.metrics {
                metrics.record_result_record(record.kind().as_str());
            }
        }
        Ok(record)
    }

    /// Next data row, skipping messages.
    pub async fn next_result(&mut self) -> Result<Option<ResultRow>> {
        while let Some(record) = self.next_record().await? {
            if let ResultRecord::Result(row) = record {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    /// Drain the remaining records into memory.
    pub async fn collect(mut self) -> Result<Vec<ResultRecord>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }

    /// Consume the reader as a [`Stream`] of records. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<ResultRecord>> {
        futures::stream::try_unfold(self, |mut reader| async move {
            Ok(reader.next_record().await?.map(|record| (record, reader)))
        })
    }

    /// Read events until a record is queued or the input ends.
    async fn fill(&mut self) -> Result<()> {
        while self.pending.is_empty() && !self.finished {
            match self.next_event().await? {
                XmlEvent::Eof => {
                    if self.in_block {
                        return Err(self.parse_error("stream ended before </results>"));
                    }
                    if self.blocks == 0 && self.saw_declaration {
                        return Err(self.parse_error("stream ended before <results>"));
                    }
                    trace!(blocks = self.blocks, "Results stream exhausted");
                    self.finished = true;
                }
                XmlEvent::Start { name, attrs } => {
                    if name.as_slice() == b"results" {
                        if self.in_block {
                            return Err(self.parse_error("nested <results> element"));
                        }
                        self.in_block = true;
                        self.blocks += 1;
                        self.is_preview = attr(&attrs, b"preview")
                            .map(|v| matches!(v.trim(), "1" | "true"))
                            .unwrap_or(false);
                        debug!(
                            block = self.blocks,
                            preview = self.is_preview,
                            "Results block started"
                        );
                        continue;
                    }
                    if !self.in_block {
                        return Err(self.parse_error("element outside of <results>"));
                    }
                    match name.as_slice() {
                        b"meta" => self.read_meta().await?,
                        b"msg" => {
                            let level = MessageLevel::from_wire(attr(&attrs, b"type").unwrap_or(""));
                            let text = self.read_text_until(b"msg").await?;
                            self.pending
                                .push_back(ResultRecord::Message(Message { level, text }));
                        }
                        b"result" => {
                            let offset = attr(&attrs, b"offset").and_then(|v| v.trim().parse().ok());
                            let row = self.read_result(offset).await?;
                            self.pending.push_back(ResultRecord::Result(row));
                        }
                        _ => {}
                    }
                }
                XmlEvent::End(name) => {
                    if name.as_slice() == b"results" {
                        self.in_block = false;
                    }
                }
                XmlEvent::Text(text) => {
                    if !self.in_block && !text.trim().is_empty() {
                        self.last_tag = truncate_fragment(&text);
                        return Err(self.parse_error("text outside of <results>"));
                    }
                }
            }
        }
        Ok(())
    }

    /// `<meta>`: pick up `<fieldOrder>` and skip everything else.
    async fn read_meta(&mut self) -> Result<()> {
        let mut in_field_order = false;
        let mut order = Vec::new();
        let mut current: Option<String> = None;

        loop {
            match self.next_event().await? {
                XmlEvent::Eof => return Err(self.parse_error("stream ended inside <meta>")),
                XmlEvent::Start { name, .. } => match name.as_slice() {
                    b"fieldOrder" => in_field_order = true,
                    b"field" if in_field_order => current = Some(String::new()),
                    _ => {}
                },
                XmlEvent::End(name) => match name.as_slice() {
                    b"meta" => break,
                    b"fieldOrder" => in_field_order = false,
                    b"field" => {
                        if let Some(field) = current.take() {
                            order.push(field);
                        }
                    }
                    _ => {}
                },
                XmlEvent::Text(text) => {
                    if let Some(field) = current.as_mut() {
                        field.push_str(&text);
                    }
                }
            }
        }

        if !order.is_empty() {
            self.field_order = order;
        }
        Ok(())
    }

    /// Concatenated text content up to the closing `tag`.
    async fn read_text_until(&mut self, tag: &[u8]) -> Result<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            match self.next_event().await? {
                XmlEvent::Eof => return Err(self.parse_error("stream ended inside an element")),
                XmlEvent::Start { .. } => depth += 1,
                XmlEvent::End(name) => {
                    if depth == 0 && name.as_slice() == tag {
                        return Ok(text);
                    }
                    depth = depth.saturating_sub(1);
                }
                XmlEvent::Text(t) => text.push_str(&t),
            }
        }
    }

    /// One `<result>` element, read to its closing tag.
    async fn read_result(&mut self, offset: Option<u64>) -> Result<ResultRow> {
        let fragment = self.last_tag.clone();
        let mut row = ResultRow::new(offset);
        let mut field: Option<(String, Vec<String>)> = None;
        let mut value: Option<String> = None;
        let mut value_explicit = false;
        let mut capture = 0usize;

        loop {
            let event = match self.next_event().await {
                Ok(event) => event,
                Err(ClientError::Parse {
                    position, message, ..
                }) => {
                    return Err(ClientError::Parse {
                        position,
                        fragment,
                        message,
                    });
                }
                Err(e) => return Err(e),
            };
            match event {
                XmlEvent::Eof => {
                    self.last_tag = fragment;
                    return Err(self.parse_error("stream ended inside a result record"));
                }
                XmlEvent::Start { name, attrs } => match name.as_slice() {
                    b"field" => {
                        let Some(key) = attr(&attrs, b"k") else {
                            self.last_tag = fragment;
                            return Err(self.parse_error("<field> without a k attribute"));
                        };
                        field = Some((key.to_string(), Vec::new()));
                    }
                    b"value" => {
                        value = Some(String::new());
                        value_explicit = true;
                    }
                    b"text" | b"v" => {
                        if value.is_none() {
                            value = Some(String::new());
                            value_explicit = false;
                        }
                        capture += 1;
                    }
                    _ => {}
                },
                XmlEvent::End(name) => match name.as_slice() {
                    b"text" | b"v" => {
                        capture = capture.saturating_sub(1);
                        if !value_explicit
                            && let (Some(v), Some((_, values))) = (value.take(), field.as_mut())
                        {
                            values.push(v);
                        }
                    }
                    b"value" => {
                        if let (Some(v), Some((_, values))) = (value.take(), field.as_mut()) {
                            values.push(v);
                        }
                        value_explicit = false;
                    }
                    b"field" => {
                        if let Some((key, values)) = field.take() {
                            row.push(key, FieldValue::from_values(values));
                        }
                        value = None;
                        capture = 0;
                    }
                    b"result" => return Ok(row),
                    _ => {}
                },
                XmlEvent::Text(text) => {
                    if capture > 0
                        && let Some(v) = value.as_mut()
                    {
                        v.push_str(&text);
                    }
                }
            }
        }
    }

    async fn next_event(&mut self) -> Result<XmlEvent> {
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into_async(&mut self.buf).await {
                Ok(event) => event,
                Err(e) => {
                    let position = self.reader.buffer_position() as u64;
                    return Err(xml_error(e, position, &self.last_tag));
                }
            };
            let position = self.reader.buffer_position() as u64;

            let owned = match event {
                Event::Start(start) => {
                    let name = start.local_name().as_ref().to_vec();
                    let attrs = collect_attrs(&start)
                        .map_err(|e| xml_error(e, position, &self.last_tag))?;
                    self.last_tag = render_tag(&name, &attrs);
                    XmlEvent::Start { name, attrs }
                }
                Event::End(end) => XmlEvent::End(end.local_name().as_ref().to_vec()),
                Event::Text(text) => XmlEvent::Text(
                    text.unescape()
                        .map_err(|e| xml_error(e, position, &self.last_tag))?
                        .into_owned(),
                ),
                Event::CData(cdata) => {
                    XmlEvent::Text(String::from_utf8_lossy(&cdata.into_inner()).into_owned())
                }
                Event::Eof => XmlEvent::Eof,
                Event::Decl(_) => {
                    self.saw_declaration = true;
                    continue;
                }
                _ => continue,
            };
            return Ok(owned);
        }
    }

    fn parse_error(&self, message: &str) -> ClientError {
        ClientError::Parse {
            position: self.reader.buffer_position() as u64,
            fragment: self.last_tag.clone(),
            message: message.to_string(),
        }
    }
}

fn collect_attrs(start: &BytesStart<'_>) -> std::result::Result<Vec<(Vec<u8>, String)>, quick_xml::Error> {
    let mut attrs = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute?;
        let value = attribute.unescape_value()?.into_owned();
        attrs.push((attribute.key.local_name().as_ref().to_vec(), value));
    }
    Ok(attrs)
}

fn render_tag(name: &[u8], attrs: &[(Vec<u8>, String)]) -> String {
    let mut tag = format!("<{}", String::from_utf8_lossy(name));
    for (key, value) in attrs {
        let _ = write!(tag, " {}='{}'", String::from_utf8_lossy(key), value);
    }
    tag.push('>');
    tag
}

fn truncate_fragment(text: &str) -> String {
    const MAX: usize = 64;
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

fn xml_error(error: impl Into<quick_xml::Error>, position: u64, fragment: &str) -> ClientError {
    match error.into() {
        quick_xml::Error::Io(e) => ClientError::StreamInterrupted(e.to_string()),
        other => ClientError::Parse {
            position,
            fragment: fragment.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn decode(xml: &str) -> Result<(bool, Vec<String>, Vec<ResultRecord>)> {
        let mut reader = ResultsReader::open(xml.as_bytes()).await?;
        let preview = reader.is_preview();
        let order = reader.field_order().to_vec();
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().await? {
            records.push(record);
        }
        Ok((preview, order, records))
    }

    #[tokio::test]
    async fn test_single_count_result() {
        let xml = "<?xml version='1.0' encoding='UTF-8'?>\n<results preview='0'>\n<meta>\n<fieldOrder>\n<field>count</field>\n</fieldOrder>\n</meta>\n<result offset='0'>\n<field k='count'>\n<value><text>1</text></value>\n</field>\n</result>\n</results>\n";
        let (preview, order, records) = decode(xml).await.unwrap();
        assert!(!preview);
        assert_eq!(order, vec!["count"]);
        assert_eq!(records.len(), 1);
        let row = records[0].as_result().unwrap();
        assert_eq!(row.offset(), Some(0));
        assert_eq!(row.get_str("count"), Some("1"));
    }

    #[tokio::test]
    async fn test_empty_source_is_empty_stream() {
        let (preview, order, records) = decode("").await.unwrap();
        assert!(!preview);
        assert!(order.is_empty());
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_declaration_without_results_is_parse_error() {
        let declaration = "<?xml version='1.0' encoding='UTF-8'?>";
        for body in [declaration.to_string(), format!("{declaration}\n")] {
            let err = decode(&body).await.unwrap_err();
            assert!(
                matches!(&err, ClientError::Parse { message, .. } if message.contains("before <results>")),
                "unexpected error for {body:?}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_debug_reports_block_state() {
        let xml = "<results preview='1'><meta><fieldOrder><field>host</field></fieldOrder></meta></results>";
        let reader = ResultsReader::open(xml.as_bytes()).await.unwrap();
        let debug = format!("{reader:?}");
        assert!(debug.starts_with("ResultsReader"));
        assert!(debug.contains("is_preview: true"));
        assert!(debug.contains("\"host\""));
    }

    #[tokio::test]
    async fn test_multi_value_and_raw_segments() {
        let xml = "<results preview='1'><result offset='4'>\
            <field k='host'><value><text>a</text></value><value><text>b</text></value></field>\
            <field k='_raw'><v xml:space='preserve' trunc='0'>GET <sg h='1'>/index</sg> 200</v></field>\
            <field k='empty'><value><text></text></value></field>\
            </result></results>";
        let (preview, _, records) = decode(xml).await.unwrap();
        assert!(preview);
        let row = records[0].as_result().unwrap();
        assert_eq!(
            row.get("host"),
            Some(&FieldValue::Multi(vec!["a".into(), "b".into()]))
        );
        assert_eq!(row.get_str("_raw"), Some("GET /index 200"));
        assert_eq!(row.get_str("empty"), Some(""));
        assert_eq!(row.field_names().collect::<Vec<_>>(), vec!["host", "_raw", "empty"]);
    }

    #[tokio::test]
    async fn test_messages_are_records() {
        let xml = "<results preview='0'><messages><msg type='DEBUG'>base lispy: [ AND ]</msg>\
            <msg type='WARN'>Some &amp; other</msg></messages></results>";
        let (_, _, records) = decode(xml).await.unwrap();
        assert_eq!(records.len(), 2);
        let first = records[0].as_message().unwrap();
        assert_eq!(first.level, MessageLevel::Debug);
        assert_eq!(first.text, "base lispy: [ AND ]");
        assert_eq!(records[1].as_message().unwrap().text, "Some & other");
    }

    #[tokio::test]
    async fn test_truncated_record_is_not_emitted() {
        let xml = "<results preview='0'><result offset='0'><field k='n'><value><text>1</text></value></field></result>\
            <result offset='1'><field k='n'><value><text>2";
        let mut reader = ResultsReader::open(xml.as_bytes()).await.unwrap();
        let first = reader.next_record().await.unwrap().unwrap();
        assert_eq!(first.as_result().unwrap().get_str("n"), Some("1"));

        match reader.next_record().await {
            Err(ClientError::Parse { fragment, .. }) => {
                assert_eq!(fragment, "<result offset='1'>");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(reader.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_xml_body_is_parse_error() {
        let err = ResultsReader::open(&b"{\"results\": []}"[..]).await.err().unwrap();
        assert!(matches!(err, ClientError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_mismatched_tags_are_parse_error() {
        let xml = "<results preview='0'><result offset='0'><field k='a'></value></field></result></results>";
        let err = decode(xml).await.err().unwrap();
        assert!(matches!(err, ClientError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_concatenated_blocks_update_preview() {
        let xml = "<results preview='1'><result offset='0'><field k='c'><value><text>1</text></value></field></result></results>\
            <results preview='0'><meta><fieldOrder><field>c</field><field>d</field></fieldOrder></meta>\
            <result offset='0'><field k='c'><value><text>2</text></value></field></result></results>";
        let mut reader = ResultsReader::open(xml.as_bytes()).await.unwrap();
        assert!(reader.is_preview());
        reader.next_record().await.unwrap().unwrap();

        let second = reader.next_record().await.unwrap().unwrap();
        assert!(!reader.is_preview());
        assert_eq!(reader.field_order(), ["c", "d"]);
        assert_eq!(second.as_result().unwrap().get_str("c"), Some("2"));
        assert!(reader.next_record().await.unwrap().is_none());
        assert_eq!(reader.results_read(), 2);
    }

    #[tokio::test]
    async fn test_into_stream_yields_records() {
        use futures::TryStreamExt;

        let xml = "<results preview='0'><result><field k='a'><value><text>x</text></value></field></result>\
            <result><field k='a'><value><text>y</text></value></field></result></results>";
        let reader = ResultsReader::open(xml.as_bytes()).await.unwrap();
        let records: Vec<_> = reader.into_stream().try_collect().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].as_result().unwrap().offset(), None);
    }

    #[test]
    fn test_truncate_fragment() {
        let long = "x".repeat(100);
        let out = truncate_fragment(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.len(), 67);
    }
}
