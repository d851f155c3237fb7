//! Row orchestrator: one linear pass from the export to the four tables.
//!
//! Each ad is fully decomposed and written to every output before the next
//! row is read. Row-local problems degrade in place; only I/O failures stop
//! the run.

use std::io::Read;

use tracing::{debug, info, warn};

use crate::cleaner::clean_message;
use crate::config::SplitConfig;
use crate::entities::decompose_entities;
use crate::error::SplitResult;
use crate::metadata::project_metadata;
use crate::reader::{AdReader, RowOutcome};
use crate::record::{
    AdRecord, Decomposed, EntityRecord, MessageRecord, MetadataRecord, TargetRecord,
};
use crate::targets::decompose_targets;
use crate::writer::OutputSink;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitStats {
    /// Input rows consumed, skipped ones included.
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_skipped: usize,
    pub entities_written: usize,
    pub targets_written: usize,
    pub sentinel_targets: usize,
    pub entity_parse_failures: usize,
    pub target_parse_failures: usize,
}

/// Everything derived from one ad, ready to write.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitRow {
    pub message: MessageRecord,
    pub entities: Decomposed<EntityRecord>,
    pub targets: Decomposed<TargetRecord>,
    pub metadata: MetadataRecord,
}

/// Decompose one ad into its four output shapes.
pub fn split_record(ad: AdRecord) -> SplitRow {
    let message = MessageRecord {
        id: ad.id.clone(),
        message: clean_message(&ad.message),
    };
    let entities = decompose_entities(&ad.id, &ad.entities);
    let targets = decompose_targets(&ad.id, &ad.targets);
    let metadata = project_metadata(&ad.id, ad.metadata);
    SplitRow {
        message,
        entities,
        targets,
        metadata,
    }
}

/// Export splitting pipeline.
pub struct Splitter {
    config: SplitConfig,
}

impl Splitter {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Split the configured input file into the configured outputs.
    ///
    /// The input is opened before any output is created, so a missing input
    /// leaves existing outputs untouched.
    pub fn run(&self) -> SplitResult<SplitStats> {
        self.config.validate()?;
        let reader = AdReader::open(&self.config.input)?;
        let sink = OutputSink::create(&self.config.outputs)?;

        info!(
            "Splitting {:?} (limit: {})",
            self.config.input,
            self.config
                .limit
                .map(|n| n.to_string())
                .unwrap_or_else(|| "all rows".to_string())
        );

        self.split(reader, sink)
    }

    /// Drive `reader` into `sink`, honouring the row limit.
    pub fn split<R: Read>(
        &self,
        mut reader: AdReader<R>,
        mut sink: OutputSink,
    ) -> SplitResult<SplitStats> {
        let mut stats = SplitStats::default();

        while !self.limit_reached(stats.rows_read) {
            let Some(outcome) = reader.next() else {
                break;
            };
            let outcome = outcome?;
            stats.rows_read += 1;

            match outcome {
                RowOutcome::Ad(ad) => {
                    let row = split_record(ad);
                    write_row(&mut sink, &row, &mut stats)?;
                }
                RowOutcome::Skipped { row, reason } => {
                    warn!("Skipping input row {}: {}", row, reason);
                    stats.rows_skipped += 1;
                }
            }

            if self.config.report_every > 0 && stats.rows_read % self.config.report_every == 0 {
                info!("Processed {} rows", stats.rows_read);
            }
        }

        sink.finish()?;

        info!(
            "Split complete: {} rows read, {} written, {} skipped; {} entities, {} targets ({} sentinel)",
            stats.rows_read,
            stats.rows_written,
            stats.rows_skipped,
            stats.entities_written,
            stats.targets_written,
            stats.sentinel_targets
        );
        if stats.entity_parse_failures > 0 || stats.target_parse_failures > 0 {
            warn!(
                "Unparseable nested columns: {} entities, {} targets",
                stats.entity_parse_failures, stats.target_parse_failures
            );
        }

        Ok(stats)
    }

    // Checked before pulling the next row so the limit bounds rows consumed.
    fn limit_reached(&self, rows_read: usize) -> bool {
        self.config.limit.is_some_and(|limit| rows_read >= limit)
    }
}

fn write_row(sink: &mut OutputSink, row: &SplitRow, stats: &mut SplitStats) -> SplitResult<()> {
    sink.write_message(&row.message)?;

    for entity in &row.entities.records {
        sink.write_entity(entity)?;
    }
    stats.entities_written += row.entities.records.len();
    if row.entities.parse_failed {
        stats.entity_parse_failures += 1;
    }

    for target in &row.targets.records {
        sink.write_target(target)?;
        if target.is_sentinel() {
            stats.sentinel_targets += 1;
        }
    }
    stats.targets_written += row.targets.records.len();
    if row.targets.parse_failed {
        stats.target_parse_failures += 1;
    }

    sink.write_metadata(&row.metadata)?;
    stats.rows_written += 1;
    debug!(
        "Row {} written: {} entities, {} targets",
        row.message.id,
        row.entities.records.len(),
        row.targets.records.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputPaths;
    use crate::error::SplitError;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;

    const EXPORT: &str = "\
id,html,political,not_political,title,message,thumbnail,created_at,updated_at,lang,images,impressions,political_probability,targeting,suppressed,targets,advertiser,entities,page,lower_page,targetings,paid_for_by,targetedness,listbuilding_fundraising_proba
A1,<div>x</div>,2,0,Hi Co,<b>Hi</b> there,t.png,2019-03-27 19:34:03.0,2019-03-28 02:15:40.0,en-US,{},1,0.99,<p>seen</p>,f,{},Hi Co,\"[{\"\"entity\"\":\"\"Trump\"\",\"\"entity_type\"\":\"\"Person\"\"}]\",https://fb.com/hi,https://fb.com/hi,{},Hi PAC,1,0.12
A2,,1,1,Age Ads,\"<p>Line one</p>\n<p>Line &amp; two</p>\",,,,en-US,,3,0.5,,f,\"{\"\"Age\"\":\"\"34 and older\"\",\"\"MinAge\"\":\"\"34\"\"}\",Age Ads,[],,,,,2,
,,0,0,No id,orphan,,,,,,,,,,,,,,,,,,
A3,,0,0,Broken,plain,,,,,,,,,,\"[{\"\"target\"\": \"\"Region\"\", \"\"segment\"\": \"\"Ohio\"\"}, {\"\"target\"\": \"\"Region\"\", \"\"segment\"\": \"\"Iowa\"\"}]\",,not json,,,,,,
";

    fn setup(dir: &Path, text: bool) -> SplitConfig {
        let input = dir.join("export.csv");
        fs::write(&input, EXPORT).unwrap();
        let mut outputs = OutputPaths::in_dir(&dir.join("out"));
        if text {
            outputs.text = Some(dir.join("out").join("messages.txt"));
        }
        SplitConfig {
            input,
            outputs,
            limit: None,
            report_every: 0,
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(|f| f.to_string()).collect())
            .collect()
    }

    fn ids(rows: &[Vec<String>]) -> Vec<&str> {
        rows.iter().map(|r| r[0].as_str()).collect()
    }

    #[test]
    fn test_split_record_example() {
        let ad = AdRecord {
            id: "A1".to_string(),
            message: "<b>Hi</b> there".to_string(),
            entities: r#"[{"entity":"Trump","entity_type":"Person"}]"#.to_string(),
            targets: "{}".to_string(),
            ..Default::default()
        };
        let row = split_record(ad);
        assert_eq!(row.message.message, "Hi there");
        assert_eq!(row.entities.records.len(), 1);
        assert_eq!(row.entities.records[0].entity, "Trump");
        assert_eq!(row.targets.records, vec![TargetRecord::sentinel("A1")]);
        assert_eq!(row.metadata.id, "A1");
    }

    #[test]
    fn test_run_writes_four_tables() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), true);
        let stats = Splitter::new(config.clone()).run().unwrap();

        assert_eq!(stats.rows_read, 4);
        assert_eq!(stats.rows_written, 3);
        assert_eq!(stats.rows_skipped, 1);
        assert_eq!(stats.entity_parse_failures, 1);
        assert_eq!(stats.sentinel_targets, 1);

        let messages = read_rows(&config.outputs.messages);
        assert_eq!(
            messages,
            vec![
                vec!["A1".to_string(), "Hi there".to_string()],
                vec!["A2".to_string(), "Line one Line & two".to_string()],
                vec!["A3".to_string(), "plain".to_string()],
            ]
        );

        let entities = read_rows(&config.outputs.entities);
        assert_eq!(
            entities,
            vec![vec!["A1".to_string(), "Trump".to_string(), "Person".to_string()]]
        );

        let targets = read_rows(&config.outputs.targets);
        let target_triples: Vec<(&str, &str, &str)> = targets
            .iter()
            .map(|r| (r[0].as_str(), r[1].as_str(), r[2].as_str()))
            .collect();
        assert_eq!(
            target_triples,
            vec![
                ("A1", "none", "none"),
                ("A2", "Age", "34 and older"),
                ("A2", "MinAge", "34"),
                ("A3", "Region", "Ohio"),
                ("A3", "Region", "Iowa"),
            ]
        );

        let text = fs::read_to_string(config.outputs.text.as_ref().unwrap()).unwrap();
        assert!(text.starts_with("A1\nHi there\n\nA2\n"));
    }

    #[test]
    fn test_metadata_projection_in_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), false);
        Splitter::new(config.clone()).run().unwrap();

        let mut reader = csv::Reader::from_path(&config.outputs.metadata).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(|h| h.to_string()).collect();
        assert_eq!(headers, crate::record::METADATA_HEADERS.to_vec());

        let rows: Vec<HashMap<String, String>> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["id"], "A1");
        assert_eq!(rows[0]["political"], "2");
        assert_eq!(rows[0]["political_probability"], "0.99");
        assert_eq!(rows[0]["targeting"], "<p>seen</p>");
        assert_eq!(rows[0]["paid_for_by"], "Hi PAC");
        assert_eq!(rows[1]["listbuilding_fundraising_proba"], "0.0");
        assert_eq!(rows[2]["impressions"], "0");
    }

    #[test]
    fn test_every_id_covered() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), false);
        Splitter::new(config.clone()).run().unwrap();

        let expected = vec!["A1", "A2", "A3"];
        let messages = read_rows(&config.outputs.messages);
        let metadata = read_rows(&config.outputs.metadata);
        let targets = read_rows(&config.outputs.targets);
        assert_eq!(ids(&messages), expected);
        assert_eq!(ids(&metadata), expected);
        let mut target_ids = ids(&targets);
        target_ids.dedup();
        assert_eq!(target_ids, expected);
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = setup(dir.path(), true);
        config.limit = Some(3);
        let outputs = [
            config.outputs.messages.clone(),
            config.outputs.entities.clone(),
            config.outputs.targets.clone(),
            config.outputs.metadata.clone(),
            config.outputs.text.clone().unwrap(),
        ];

        Splitter::new(config.clone()).run().unwrap();
        let first: Vec<Vec<u8>> = outputs.iter().map(|p| fs::read(p).unwrap()).collect();
        Splitter::new(config).run().unwrap();
        let second: Vec<Vec<u8>> = outputs.iter().map(|p| fs::read(p).unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_limit_bounds_rows_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = setup(dir.path(), false);
        config.limit = Some(1);
        let stats = Splitter::new(config.clone()).run().unwrap();
        assert_eq!(stats.rows_read, 1);
        assert_eq!(read_rows(&config.outputs.messages).len(), 1);
        assert_eq!(read_rows(&config.outputs.metadata).len(), 1);
        assert_eq!(read_rows(&config.outputs.targets).len(), 1);
        assert_eq!(read_rows(&config.outputs.entities).len(), 1);

        config.limit = Some(0);
        let stats = Splitter::new(config.clone()).run().unwrap();
        assert_eq!(stats.rows_read, 0);
        assert!(read_rows(&config.outputs.messages).is_empty());

        config.limit = Some(100);
        let stats = Splitter::new(config).run().unwrap();
        assert_eq!(stats.rows_read, 4);
    }

    #[test]
    fn test_missing_input_is_fatal_and_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = SplitConfig::resolve(
            dir.path().join("absent.csv"),
            crate::config::ConfigLayer {
                out_dir: Some(dir.path().join("out")),
                ..Default::default()
            },
        );
        let result = Splitter::new(config.clone()).run();
        assert!(matches!(result, Err(SplitError::MissingInput(_))));
        assert!(!config.outputs.messages.exists());
    }

    #[test]
    fn test_unwritable_output_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = setup(dir.path(), false);
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        config.outputs = OutputPaths::in_dir(&blocker);

        let result = Splitter::new(config.clone()).run();
        assert!(matches!(result, Err(SplitError::Io { .. })));
        assert_eq!(fs::read_to_string(&config.input).unwrap(), EXPORT);
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "not a directory");
    }
}
