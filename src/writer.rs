//! Output sink for the four normalized tables and the optional text dump.
//!
//! Every CSV output follows one contract: a header row, comma delimiter,
//! `"` quoting only where needed, `\n` record terminator. The loader script
//! must skip one header line on all four tables.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use serde::Serialize;

use crate::config::OutputPaths;
use crate::error::{SplitError, SplitResult};
use crate::record::{
    EntityRecord, MessageRecord, MetadataRecord, TargetRecord, ENTITY_HEADERS, MESSAGE_HEADERS,
    METADATA_HEADERS, TARGET_HEADERS,
};

/// One CSV table on disk, remembering its path for error reports.
struct TableWriter {
    path: PathBuf,
    writer: Writer<File>,
}

impl TableWriter {
    fn create(path: &Path, headers: &[&str]) -> SplitResult<Self> {
        let file = create_file(path)?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .delimiter(b',')
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);
        writer
            .write_record(headers)
            .map_err(|e| SplitError::write(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    fn write<T: Serialize>(&mut self, record: &T) -> SplitResult<()> {
        self.writer
            .serialize(record)
            .map_err(|e| SplitError::write(&self.path, e))
    }

    fn flush(&mut self) -> SplitResult<()> {
        self.writer
            .flush()
            .map_err(|e| SplitError::io(&self.path, e))
    }
}

/// Plain-text dump of cleaned messages: id line, message line, blank line.
struct TextWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl TextWriter {
    fn create(path: &Path) -> SplitResult<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(create_file(path)?),
        })
    }

    fn write(&mut self, record: &MessageRecord) -> SplitResult<()> {
        writeln!(self.out, "{}\n{}\n", record.id, record.message)
            .map_err(|e| SplitError::io(&self.path, e))
    }

    fn flush(&mut self) -> SplitResult<()> {
        self.out.flush().map_err(|e| SplitError::io(&self.path, e))
    }
}

/// Truncate-or-create, making parent directories as needed.
fn create_file(path: &Path) -> SplitResult<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| SplitError::io(parent, e))?;
        }
    }
    File::create(path).map_err(|e| SplitError::io(path, e))
}

/// All output files of one run, written row-synchronously.
pub struct OutputSink {
    messages: TableWriter,
    entities: TableWriter,
    targets: TableWriter,
    metadata: TableWriter,
    text: Option<TextWriter>,
}

impl OutputSink {
    /// Create every output and write its header. Existing files are replaced.
    pub fn create(paths: &OutputPaths) -> SplitResult<Self> {
        Ok(Self {
            messages: TableWriter::create(&paths.messages, &MESSAGE_HEADERS)?,
            entities: TableWriter::create(&paths.entities, &ENTITY_HEADERS)?,
            targets: TableWriter::create(&paths.targets, &TARGET_HEADERS)?,
            metadata: TableWriter::create(&paths.metadata, &METADATA_HEADERS)?,
            text: paths.text.as_deref().map(TextWriter::create).transpose()?,
        })
    }

    pub fn write_message(&mut self, record: &MessageRecord) -> SplitResult<()> {
        self.messages.write(record)?;
        if let Some(text) = self.text.as_mut() {
            text.write(record)?;
        }
        Ok(())
    }

    pub fn write_entity(&mut self, record: &EntityRecord) -> SplitResult<()> {
        self.entities.write(record)
    }

    pub fn write_target(&mut self, record: &TargetRecord) -> SplitResult<()> {
        self.targets.write(record)
    }

    pub fn write_metadata(&mut self, record: &MetadataRecord) -> SplitResult<()> {
        self.metadata.write(record)
    }

    /// Flush everything. Must be called before the sink is dropped, since a
    /// drop swallows write errors.
    pub fn finish(mut self) -> SplitResult<()> {
        self.messages.flush()?;
        self.entities.flush()?;
        self.targets.flush()?;
        self.metadata.flush()?;
        if let Some(text) = self.text.as_mut() {
            text.flush()?;
        }
        Ok(())
    }
}
