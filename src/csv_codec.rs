//! Delimited text codec for tag tables.
//!
//! Two dialects share one format: plain fields joined by a single-character
//! delimiter, or "wrapped" fields where every value is enclosed in double
//! quotes and embedded quotes are doubled. Writers pick the dialect from
//! configuration; readers detect it from the header line.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Write};
use std::path::Path;

use log::info;

use crate::error::{Result, TagCsvError};

pub const QUOTE: char = '"';

const BOM: char = '\u{feff}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    delimiter: u8,
    wrap_fields: bool,
}

impl Dialect {
    /// The delimiter must be a single ASCII character other than the quote
    /// character or a line break.
    pub fn new(delimiter: char, wrap_fields: bool) -> Result<Self> {
        Ok(Dialect {
            delimiter: delimiter_byte(delimiter)?,
            wrap_fields,
        })
    }

    pub fn delimiter(&self) -> char {
        self.delimiter as char
    }

    pub fn wrap_fields(&self) -> bool {
        self.wrap_fields
    }

    /// True when `value` cannot be written safely in this dialect.
    /// Only the unwrapped dialect has unsafe values.
    pub fn conflicts_with(&self, value: &str) -> bool {
        !self.wrap_fields && value.contains(self.delimiter())
    }
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() || matches!(delimiter, QUOTE | '\n' | '\r') {
        return Err(TagCsvError::Config(format!(
            "Field separator {:?} is not usable; pick a single ASCII character other than a quote or line break",
            delimiter
        )));
    }
    Ok(delimiter as u8)
}

/// Writes one line per record in the configured dialect.
pub struct CsvWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl CsvWriter<File> {
    pub fn create(path: &Path, dialect: Dialect) -> Result<Self> {
        let file = File::create(path)?;
        Ok(CsvWriter::from_writer(file, dialect))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn from_writer(writer: W, dialect: Dialect) -> Self {
        let quote_style = if dialect.wrap_fields {
            csv::QuoteStyle::Always
        } else {
            csv::QuoteStyle::Never
        };
        let inner = csv::WriterBuilder::new()
            .delimiter(dialect.delimiter)
            .quote(QUOTE as u8)
            .double_quote(true)
            .quote_style(quote_style)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        CsvWriter { inner }
    }

    pub fn write_fields<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.inner.write_record(fields)?;
        Ok(())
    }

    /// Flush buffered output and hand back the underlying writer.
    pub fn finish(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| TagCsvError::Io(e.into_error()))
    }
}

/// One data row, addressed by header column name.
#[derive(Debug, Clone)]
pub struct CsvRow {
    line: u64,
    fields: HashMap<String, String>,
}

impl CsvRow {
    /// 1-based line number of the row in the source file.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Column lookup is exact and case-sensitive.
    pub fn get(&self, column: &str) -> Result<&str> {
        self.fields
            .get(column)
            .map(String::as_str)
            .ok_or_else(|| TagCsvError::MissingField {
                field: column.to_string(),
            })
    }
}

/// A row that could not be mapped onto the header.
#[derive(Debug)]
pub struct RowError {
    pub line: u64,
    pub error: TagCsvError,
}

/// Header-driven reader that detects the wrapped dialect.
pub struct CsvReader<R: Read> {
    inner: csv::Reader<io::Chain<Cursor<Vec<u8>>, R>>,
    header: Vec<String>,
    wrapped: bool,
    record: csv::StringRecord,
}

impl CsvReader<BufReader<File>> {
    pub fn open(path: &Path, delimiter: char) -> Result<Self> {
        let file = File::open(path)?;
        CsvReader::from_reader(BufReader::new(file), delimiter).map_err(|e| match e {
            TagCsvError::NoHeader { .. } => TagCsvError::NoHeader {
                path: path.to_path_buf(),
            },
            other => other,
        })
    }
}

impl<R: BufRead> CsvReader<R> {
    /// Read the header line and set up the reader for the remaining rows.
    ///
    /// Wrap mode is enabled when any header column starts and ends with a
    /// quote; it then applies to every row that follows.
    pub fn from_reader(mut reader: R, delimiter: char) -> Result<Self> {
        let delimiter = delimiter_byte(delimiter)?;

        let mut first_line = String::new();
        reader.read_line(&mut first_line)?;
        let first_line = first_line.strip_prefix(BOM).unwrap_or(&first_line).to_string();
        if first_line.trim_end_matches(['\r', '\n']).is_empty() {
            return Err(TagCsvError::NoHeader {
                path: Default::default(),
            });
        }

        let wrapped = detect_wrapped(&first_line, delimiter as char);
        if wrapped {
            info!("Text wrapping detected, trimming double quotes from data");
        }

        let source = Cursor::new(first_line.into_bytes()).chain(reader);
        let mut inner = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .quoting(wrapped)
            .quote(QUOTE as u8)
            .double_quote(true)
            .from_reader(source);

        let header: Vec<String> = inner.headers()?.iter().map(str::to_string).collect();

        Ok(CsvReader {
            inner,
            header,
            wrapped,
            record: csv::StringRecord::new(),
        })
    }
}

impl<R: Read> CsvReader<R> {
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    /// Next data row.
    ///
    /// The outer `Result` carries fatal read failures; the inner one rejects
    /// a single row whose field count differs from the header.
    pub fn next_row(&mut self) -> Result<Option<std::result::Result<CsvRow, RowError>>> {
        loop {
            if !self.inner.read_record(&mut self.record)? {
                return Ok(None);
            }
            let line = self.record.position().map(|p| p.line()).unwrap_or(0);

            if self.record.len() == 1 && self.record[0].is_empty() {
                continue;
            }

            if self.record.len() != self.header.len() {
                return Ok(Some(Err(RowError {
                    line,
                    error: TagCsvError::RowLength {
                        expected: self.header.len(),
                        found: self.record.len(),
                    },
                })));
            }

            let fields = self
                .header
                .iter()
                .cloned()
                .zip(self.record.iter().map(str::to_string))
                .collect();
            return Ok(Some(Ok(CsvRow { line, fields })));
        }
    }
}

fn detect_wrapped(header_line: &str, delimiter: char) -> bool {
    header_line
        .trim_end_matches(['\r', '\n'])
        .split(delimiter)
        .any(|column| column.len() >= 2 && column.starts_with(QUOTE) && column.ends_with(QUOTE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_to_string(dialect: Dialect, rows: &[&[&str]]) -> String {
        let mut writer = CsvWriter::from_writer(Vec::new(), dialect);
        for row in rows {
            writer.write_fields(row.iter()).unwrap();
        }
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    fn reader(text: &str, delimiter: char) -> CsvReader<Cursor<Vec<u8>>> {
        CsvReader::from_reader(Cursor::new(text.as_bytes().to_vec()), delimiter).unwrap()
    }

    fn collect_rows(
        reader: &mut CsvReader<Cursor<Vec<u8>>>,
    ) -> Vec<std::result::Result<CsvRow, RowError>> {
        let mut rows = Vec::new();
        while let Some(row) = reader.next_row().unwrap() {
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_dialect_rejects_bad_delimiters() {
        assert!(Dialect::new(';', false).is_ok());
        assert!(Dialect::new('\t', true).is_ok());
        assert!(matches!(Dialect::new('"', false), Err(TagCsvError::Config(_))));
        assert!(matches!(Dialect::new('\n', false), Err(TagCsvError::Config(_))));
        assert!(matches!(Dialect::new('§', false), Err(TagCsvError::Config(_))));
    }

    #[test]
    fn test_conflicts_only_when_unwrapped() {
        let plain = Dialect::new(',', false).unwrap();
        let wrapped = Dialect::new(',', true).unwrap();
        assert!(plain.conflicts_with("a,b"));
        assert!(!plain.conflicts_with("a;b"));
        assert!(!wrapped.conflicts_with("a,b"));
    }

    #[test]
    fn test_write_unwrapped() {
        let out = write_to_string(
            Dialect::new(';', false).unwrap(),
            &[&["a", "b c", ""], &["x\"y", "1", "2"]],
        );
        assert_eq!(out, "a;b c;\nx\"y;1;2\n");
    }

    #[test]
    fn test_write_wrapped_escapes_quotes() {
        let out = write_to_string(
            Dialect::new(',', true).unwrap(),
            &[&["a", "say \"hi\"", "x,y", ""]],
        );
        assert_eq!(out, "\"a\",\"say \"\"hi\"\"\",\"x,y\",\"\"\n");
    }

    #[test]
    fn test_read_unwrapped_keeps_quotes() {
        let mut r = reader("A;B\n\"x\";y\n", ';');
        assert!(!r.is_wrapped());
        assert_eq!(r.header(), &["A".to_string(), "B".to_string()]);
        let rows = collect_rows(&mut r);
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("A").unwrap(), "\"x\"");
        assert_eq!(row.get("B").unwrap(), "y");
        assert_eq!(row.line(), 2);
    }

    #[test]
    fn test_read_detects_wrapping() {
        let mut r = reader("\"A\",\"B\"\n\"x,1\",\"say \"\"hi\"\"\"\n", ',');
        assert!(r.is_wrapped());
        assert_eq!(r.header(), &["A".to_string(), "B".to_string()]);
        let rows = collect_rows(&mut r);
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("A").unwrap(), "x,1");
        assert_eq!(row.get("B").unwrap(), "say \"hi\"");
    }

    #[test]
    fn test_wrapped_round_trip() {
        let dialect = Dialect::new(';', true).unwrap();
        let values = ["plain", "semi;colon", "quote\"inside", "\"edge\"", ""];
        let text = write_to_string(dialect, &[&["C1", "C2", "C3", "C4", "C5"], &values]);

        let mut r = reader(&text, ';');
        let rows = collect_rows(&mut r);
        let row = rows[0].as_ref().unwrap();
        for (i, expected) in values.iter().enumerate() {
            assert_eq!(row.get(&format!("C{}", i + 1)).unwrap(), *expected);
        }
    }

    #[test]
    fn test_empty_input_has_no_header() {
        let result = CsvReader::from_reader(Cursor::new(Vec::new()), ',');
        assert!(matches!(result, Err(TagCsvError::NoHeader { .. })));

        let result = CsvReader::from_reader(Cursor::new(b"\n".to_vec()), ',');
        assert!(matches!(result, Err(TagCsvError::NoHeader { .. })));
    }

    #[test]
    fn test_row_length_mismatch() {
        let mut r = reader("A,B\n1\n1,2\n1,2,3\n", ',');
        let rows = collect_rows(&mut r);
        assert_eq!(rows.len(), 3);

        let short = rows[0].as_ref().unwrap_err();
        assert_eq!(short.line, 2);
        assert!(matches!(short.error, TagCsvError::RowLength { expected: 2, found: 1 }));

        assert!(rows[1].is_ok());

        let long = rows[2].as_ref().unwrap_err();
        assert!(matches!(long.error, TagCsvError::RowLength { expected: 2, found: 3 }));
    }

    #[test]
    fn test_missing_field_lookup() {
        let mut r = reader("A,B\n1,2\n", ',');
        let rows = collect_rows(&mut r);
        let row = rows[0].as_ref().unwrap();
        assert!(matches!(row.get("a"), Err(TagCsvError::MissingField { field }) if field == "a"));
    }

    #[test]
    fn test_bom_and_crlf() {
        let mut r = reader("\u{feff}A,B\r\n1,2\r\n\r\n", ',');
        assert_eq!(r.header(), &["A".to_string(), "B".to_string()]);
        let rows = collect_rows(&mut r);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_ref().unwrap().get("B").unwrap(), "2");
    }
}
