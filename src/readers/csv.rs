//! Delimited file reader
//!
//! Streams rows through the csv crate; consecutive rows sharing the
//! `field_entry` value form one document.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};

use csv::{StringRecord, StringRecordsIntoIter};
use tracing::info;

use super::{assemble, DocumentIter, Reader};
use crate::error::{Error, Result};
use crate::extractors::{Context, Row, Scope};
use crate::field::Field;
use crate::sources::{Location, Source};
use crate::{Document, Format, Metadata};

/// Reader for CSV and other delimited files
#[derive(Debug, Clone)]
pub struct CsvReader {
    fields: Vec<Field>,
    delimiter: u8,
    skip_lines: usize,
    field_entry: Option<String>,
    required_field: Option<String>,
}

impl CsvReader {
    pub fn new(fields: Vec<Field>) -> Self {
        CsvReader {
            fields,
            delimiter: b',',
            skip_lines: 0,
            field_entry: None,
            required_field: None,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Lines to drop before the header row
    pub fn skip_lines(mut self, lines: usize) -> Self {
        self.skip_lines = lines;
        self
    }

    /// Column whose value identifies a document across consecutive rows
    pub fn field_entry(mut self, column: impl Into<String>) -> Self {
        self.field_entry = Some(column.into());
        self
    }

    /// Column that must be non-empty for a row to count at all
    pub fn required_field(mut self, column: impl Into<String>) -> Self {
        self.required_field = Some(column.into());
        self
    }

    fn open(&self, location: &Location) -> Result<Box<dyn BufRead>> {
        let input: Box<dyn BufRead> = match location {
            Location::Path(path) => {
                info!(path = %path.display(), "Reading CSV file");
                Box::new(BufReader::new(File::open(path)?))
            }
            Location::Bytes(bytes) => Box::new(Cursor::new(bytes.clone())),
            Location::Url(_) => Box::new(Cursor::new(location.read_bytes(Format::Csv)?)),
            Location::Files(_) => {
                return Err(Error::UnsupportedSource {
                    format: Format::Csv,
                    kind: location.kind(),
                })
            }
        };
        Ok(input)
    }
}

impl Reader for CsvReader {
    fn format(&self) -> Format {
        Format::Csv
    }

    fn fields(&self) -> &[Field] {
        &self.fields
    }

    fn read_source(&self, source: Source) -> Result<DocumentIter<'_>> {
        let mut input = self.open(&source.location)?;
        for _ in 0..self.skip_lines {
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break;
            }
        }

        let mut rows = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(input);
        let headers = rows.headers()?.clone();

        Ok(Box::new(RowGroups {
            reader: self,
            headers,
            records: rows.into_records(),
            metadata: source.metadata,
            group: Vec::new(),
            group_id: None,
            index: 0,
            exhausted: false,
        }))
    }
}

/// Groups rows into documents while streaming
struct RowGroups<'r> {
    reader: &'r CsvReader,
    headers: StringRecord,
    records: StringRecordsIntoIter<Box<dyn BufRead>>,
    metadata: Metadata,
    group: Vec<Row>,
    group_id: Option<String>,
    index: usize,
    exhausted: bool,
}

impl RowGroups<'_> {
    fn to_row(&self, record: &StringRecord) -> Row {
        self.headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect()
    }

    /// Turn the pending group into a document; `None` if it is dropped
    fn flush(&mut self) -> Result<Option<Document>> {
        let rows = std::mem::take(&mut self.group);
        if rows.is_empty() {
            return Ok(None);
        }
        let index = self.index;
        self.index += 1;
        let ctx = Context::new(Scope::Rows(&rows), &self.metadata).at(index);
        assemble(&self.reader.fields, &ctx)
    }
}

impl Iterator for RowGroups<'_> {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.exhausted {
            let record = match self.records.next() {
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    self.exhausted = true;
                    return Some(Err(e.into()));
                }
                None => {
                    self.exhausted = true;
                    break;
                }
            };
            let row = self.to_row(&record);

            if let Some(required) = &self.reader.required_field {
                if row.get(required).map(|v| v.is_empty()).unwrap_or(true) {
                    continue;
                }
            }

            let starts_new = match &self.reader.field_entry {
                Some(key) => {
                    let id = row.get(key).cloned().unwrap_or_default();
                    let same = self.group_id.as_deref() == Some(id.as_str());
                    self.group_id = Some(id);
                    !same
                }
                None => true,
            };

            if starts_new && !self.group.is_empty() {
                let flushed = self.flush();
                self.group.push(row);
                match flushed {
                    Ok(Some(doc)) => return Some(Ok(doc)),
                    Ok(None) => continue,
                    Err(e) => return Some(Err(e)),
                }
            }
            self.group.push(row);
        }

        // Final group
        self.flush().transpose()
    }
}
