//! C10: output sinks (§4.9). Every sink sits behind [`OutputSink`] so the
//! pipeline driver (C7) never special-cases a sink kind; each document's
//! rendered extraction result is handed to every configured sink in
//! declared order.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{DocScraperError, IoError};
use crate::tree::Document;

pub trait OutputSink: Send {
    fn accept(&mut self, doc: &Document, rendered: &Value) -> Result<(), DocScraperError>;
    fn finish(&mut self) -> Result<(), DocScraperError>;
}

fn write_err(path: impl Into<PathBuf>, source: io::Error) -> DocScraperError {
    DocScraperError::Io(IoError::Write {
        path: path.into(),
        source,
    })
}

/// The JSON-serialized form used by the three whole-record sinks (§4.9):
/// strings keep their quotes, matching "each document's rendered JSON".
fn json_text(rendered: &Value) -> String {
    rendered.to_string()
}

/// The bare-string form used by CSV cells: a JSON string becomes its raw
/// text, everything else falls back to its JSON rendering.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `stdout` (§4.9): one rendered record per document, `separator`-joined.
pub struct StdoutSink {
    separator: String,
    wrote_any: bool,
}

impl StdoutSink {
    pub fn new(separator: String) -> Self {
        Self {
            separator,
            wrote_any: false,
        }
    }
}

impl OutputSink for StdoutSink {
    fn accept(&mut self, _doc: &Document, rendered: &Value) -> Result<(), DocScraperError> {
        if self.wrote_any {
            print!("{}", self.separator);
        }
        print!("{}", json_text(rendered));
        self.wrote_any = true;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DocScraperError> {
        if self.wrote_any {
            println!();
        }
        io::stdout().flush().map_err(|e| write_err("<stdout>", e))
    }
}

/// `single_file` (§4.9): every document concatenated into one file with the
/// same separator convention as [`StdoutSink`].
pub struct SingleFileSink {
    path: PathBuf,
    separator: String,
    file: File,
    wrote_any: bool,
}

impl SingleFileSink {
    pub fn new(path: PathBuf, separator: String) -> Result<Self, DocScraperError> {
        let file = File::create(&path).map_err(|e| write_err(path.clone(), e))?;
        Ok(Self {
            path,
            separator,
            file,
            wrote_any: false,
        })
    }
}

impl OutputSink for SingleFileSink {
    fn accept(&mut self, _doc: &Document, rendered: &Value) -> Result<(), DocScraperError> {
        if self.wrote_any {
            write!(self.file, "{}", self.separator).map_err(|e| write_err(self.path.clone(), e))?;
        }
        write!(self.file, "{}", json_text(rendered)).map_err(|e| write_err(self.path.clone(), e))?;
        self.wrote_any = true;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DocScraperError> {
        self.file.flush().map_err(|e| write_err(self.path.clone(), e))
    }
}

/// `template_path` (§4.9): one file per document; `{i}` is a monotonically
/// increasing counter, `{name}` is `Document.attrs["name"]`.
pub struct TemplatePathSink {
    output_path_template: String,
    counter: usize,
}

impl TemplatePathSink {
    pub fn new(output_path_template: String) -> Self {
        Self {
            output_path_template,
            counter: 0,
        }
    }

    fn path_for(&self, doc: &Document) -> PathBuf {
        let name = doc
            .root()
            .value()
            .kind
            .as_document()
            .and_then(|d| d.attrs.get("name"))
            .cloned()
            .unwrap_or_default();
        PathBuf::from(
            self.output_path_template
                .replace("{i}", &self.counter.to_string())
                .replace("{name}", &name),
        )
    }
}

impl OutputSink for TemplatePathSink {
    fn accept(&mut self, doc: &Document, rendered: &Value) -> Result<(), DocScraperError> {
        let path = self.path_for(doc);
        let mut file = File::create(&path).map_err(|e| write_err(path.clone(), e))?;
        write!(file, "{}", json_text(rendered)).map_err(|e| write_err(path, e))?;
        self.counter += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DocScraperError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotingStyle {
    #[default]
    Minimal,
    All,
    NonNumeric,
    None,
}

impl From<QuotingStyle> for csv::QuoteStyle {
    fn from(v: QuotingStyle) -> Self {
        match v {
            QuotingStyle::Minimal => csv::QuoteStyle::Necessary,
            QuotingStyle::All => csv::QuoteStyle::Always,
            QuotingStyle::NonNumeric => csv::QuoteStyle::NonNumeric,
            QuotingStyle::None => csv::QuoteStyle::Never,
        }
    }
}

/// `csv_file` (§4.9): declared `fields` become columns; `flatten_list`, if
/// set, expands that one list-valued field into multiple rows, repeating
/// every other field's value across the expansion.
pub struct CsvFileSink {
    path: PathBuf,
    fields: Vec<String>,
    flatten_list: Option<String>,
    writer: csv::Writer<File>,
}

impl CsvFileSink {
    pub fn new(
        path: PathBuf,
        fields: Vec<String>,
        flatten_list: Option<String>,
        delimiter: u8,
        quote: u8,
        escape: Option<u8>,
        double_quote: bool,
        terminator: csv::Terminator,
        quote_style: csv::QuoteStyle,
    ) -> Result<Self, DocScraperError> {
        let mut builder = csv::WriterBuilder::new();
        builder
            .delimiter(delimiter)
            .quote(quote)
            .double_quote(double_quote)
            .terminator(terminator)
            .quote_style(quote_style);
        if let Some(esc) = escape {
            builder.escape(esc);
        }
        let mut writer = builder
            .from_path(&path)
            .map_err(|source| DocScraperError::Io(IoError::Csv(source)))?;
        writer
            .write_record(&fields)
            .map_err(|source| DocScraperError::Io(IoError::Csv(source)))?;
        Ok(Self {
            path,
            fields,
            flatten_list,
            writer,
        })
    }

    fn cell(&self, value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(v) => cell_text(v),
        }
    }
}

impl OutputSink for CsvFileSink {
    fn accept(&mut self, _doc: &Document, rendered: &Value) -> Result<(), DocScraperError> {
        let obj = rendered.as_object();
        let row_count = self
            .flatten_list
            .as_deref()
            .and_then(|f| obj.and_then(|o| o.get(f)))
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(1)
            .max(1);

        for row in 0..row_count {
            let record: Vec<String> = self
                .fields
                .iter()
                .map(|field| {
                    let value = obj.and_then(|o| o.get(field));
                    match (self.flatten_list.as_deref(), value.and_then(Value::as_array)) {
                        (Some(flat), Some(items)) if flat == field => {
                            self.cell(items.get(row))
                        }
                        _ => self.cell(value),
                    }
                })
                .collect();
            self.writer
                .write_record(&record)
                .map_err(|source| DocScraperError::Io(IoError::Csv(source)))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DocScraperError> {
        self.writer
            .flush()
            .map_err(|e| write_err(self.path.clone(), e))
    }
}

fn default_separator() -> String {
    "\n".to_string()
}

fn default_comma() -> char {
    ','
}

fn default_quote() -> char {
    '"'
}

fn default_lineterminator() -> String {
    "\n".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvDialectConfig {
    #[serde(default = "default_comma")]
    pub delimiter: char,
    #[serde(default = "default_quote")]
    pub quotechar: char,
    #[serde(default)]
    pub escapechar: Option<char>,
    #[serde(default = "default_true")]
    pub doublequote: bool,
    #[serde(default = "default_lineterminator")]
    pub lineterminator: String,
    #[serde(default)]
    pub quoting: QuotingStyle,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StdoutConfig {
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for StdoutConfig {
    fn default() -> Self {
        Self {
            separator: default_separator(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SingleFileConfig {
    pub path: String,
    #[serde(default = "default_separator")]
    pub separator: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatePathConfig {
    pub output_path_template: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvFileConfig {
    pub path: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub flatten_list: Option<String>,
    #[serde(default)]
    pub dialect: CsvDialectConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum OutputConfig {
    Stdout(StdoutConfig),
    SingleFile(SingleFileConfig),
    TemplatePath(TemplatePathConfig),
    CsvFile(CsvFileConfig),
}

impl OutputConfig {
    pub fn compile(&self) -> Result<Box<dyn OutputSink>, DocScraperError> {
        Ok(match self {
            OutputConfig::Stdout(c) => Box::new(StdoutSink::new(c.separator.clone())) as Box<dyn OutputSink>,
            OutputConfig::SingleFile(c) => {
                Box::new(SingleFileSink::new(PathBuf::from(&c.path), c.separator.clone())?) as Box<dyn OutputSink>
            }
            OutputConfig::TemplatePath(c) => {
                Box::new(TemplatePathSink::new(c.output_path_template.clone())) as Box<dyn OutputSink>
            }
            OutputConfig::CsvFile(c) => {
                let d = &c.dialect;
                let terminator = if d.lineterminator == "\r\n" {
                    csv::Terminator::CRLF
                } else {
                    csv::Terminator::Any(d.lineterminator.as_bytes().first().copied().unwrap_or(b'\n'))
                };
                Box::new(CsvFileSink::new(
                    PathBuf::from(&c.path),
                    c.fields.clone(),
                    c.flatten_list.clone(),
                    d.delimiter as u8,
                    d.quotechar as u8,
                    d.escapechar.map(|c| c as u8),
                    d.doublequote,
                    terminator,
                    d.quoting.into(),
                )?) as Box<dyn OutputSink>
            }
        })
    }
}
