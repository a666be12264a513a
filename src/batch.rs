use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregator::WordAggregator;
use crate::config::SubcueConfig;
use crate::subtitle_file::{subtitle_path, write_document};
use crate::transcript::{convert, CharacterRecord};

/// One entry of a job list. Fields other than these are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub uuid: String,
    #[serde(rename = "charData", default)]
    pub char_data: Option<CharacterRecord>,
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub out_dir: PathBuf,
    pub force: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub written: Vec<WrittenJob>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedJob>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenJob {
    pub uuid: String,
    pub path: PathBuf,
    pub cues: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedJob {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// The `uuid` as found in the job list when it was rejected as an id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_uuid: Option<String>,
    pub index: usize,
    pub reason: String,
}

impl FailedJob {
    fn new(index: usize, uuid: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            uuid,
            raw_uuid: None,
            index,
            reason: reason.into(),
        }
    }
}

/// Reads the job list as raw entries. Entries are typed one at a time by
/// `run_batch`, so one badly shaped job does not reject the whole list.
pub fn load_jobs(path: &Path) -> Result<Vec<Value>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read job list {}", path.display()))?;
    serde_json::from_str(&contents).map_err(|error| {
        anyhow!(
            "failed to parse job list {} at line {}, column {}: {}",
            path.display(),
            error.line(),
            error.column(),
            error
        )
    })
}

pub fn validate_job_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("job uuid must not be empty");
    }
    if let Some(invalid) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        bail!("job uuid '{}' contains invalid character '{}'", id, invalid);
    }
    Ok(())
}

/// Writes one subtitle document per job into `options.out_dir`.
///
/// A job whose subtitle file already exists is considered done and skipped
/// unless `force` is set. Jobs with bad ids, a wrongly typed entry or
/// malformed character data are reported and skipped. Filesystem failures
/// abort the whole batch.
pub fn run_batch(
    jobs: Vec<Value>,
    config: &SubcueConfig,
    options: &BatchOptions,
) -> Result<BatchSummary> {
    let aggregator = WordAggregator::new(config.aggregator);
    let mut summary = BatchSummary::default();

    fs::create_dir_all(&options.out_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            options.out_dir.display()
        )
    })?;

    for (index, entry) in jobs.into_iter().enumerate() {
        let Some(uuid) = entry.get("uuid").and_then(Value::as_str).map(str::to_owned) else {
            warn!("skipping job #{index}: missing string `uuid`");
            summary
                .failed
                .push(FailedJob::new(index, None, "job is missing string field `uuid`"));
            continue;
        };

        if let Err(error) = validate_job_id(&uuid) {
            warn!("skipping job #{index}: {error}");
            summary.failed.push(FailedJob {
                raw_uuid: Some(uuid),
                ..FailedJob::new(index, None, error.to_string())
            });
            continue;
        }

        let target = subtitle_path(&options.out_dir, &uuid, &config.output.subtitle_suffix);
        if target.exists() && !options.force {
            info!("subtitles already exist for {}: {}", uuid, target.display());
            summary.skipped.push(uuid);
            continue;
        }

        let job: Job = match serde_json::from_value(entry) {
            Ok(job) => job,
            Err(error) => {
                warn!("job {uuid} is not a valid job entry: {error}");
                summary.failed.push(FailedJob::new(
                    index,
                    Some(uuid),
                    format!("invalid job entry: {error}"),
                ));
                continue;
            }
        };

        let Some(record) = job.char_data else {
            warn!("job {} has no charData", job.uuid);
            summary.failed.push(FailedJob::new(
                index,
                Some(job.uuid),
                "job is missing field `charData`",
            ));
            continue;
        };

        let document = match convert(record, &aggregator) {
            Ok(document) => document,
            Err(error) => {
                warn!("job {} has malformed character data: {error}", job.uuid);
                summary
                    .failed
                    .push(FailedJob::new(index, Some(job.uuid), error.to_string()));
                continue;
            }
        };

        let written = write_document(&target, &document, config.output.indent)
            .with_context(|| format!("failed writing subtitles for job {}", job.uuid))?;
        info!(
            "wrote {} cues for {} to {}",
            document.transcription.len(),
            job.uuid,
            written.path.display()
        );
        summary.written.push(WrittenJob {
            uuid: job.uuid,
            path: written.path,
            cues: document.transcription.len(),
            sha256: written.sha256,
        });
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::{run_batch, validate_job_id, BatchOptions};
    use crate::config::SubcueConfig;

    fn jobs(value: serde_json::Value) -> Vec<serde_json::Value> {
        serde_json::from_value(value).expect("jobs should parse")
    }

    #[test]
    fn validates_job_id_rules() {
        for valid in ["abc", "0f8e-11aa", "job_1"] {
            validate_job_id(valid).expect("valid id should pass");
        }
        for invalid in ["", "../etc", "a b", "a/b", "a.b"] {
            assert!(validate_job_id(invalid).is_err(), "invalid id should fail: {invalid}");
        }
    }

    #[test]
    fn writes_skips_and_reports_failures() {
        let dir = tempdir().expect("tempdir should create");
        let out_dir = dir.path().join("public");
        std::fs::create_dir_all(&out_dir).expect("out dir should create");
        std::fs::write(out_dir.join("done_subtitles.json"), "{}").expect("marker should write");

        let list = jobs(json!([
            {
                "uuid": "fresh",
                "title": "ignored",
                "charData": {
                    "characters": ["h", "i"],
                    "character_start_times_seconds": [0.0, 0.1]
                }
            },
            { "uuid": "done", "charData": { "characters": [], "character_start_times_seconds": [] } },
            { "uuid": "short", "charData": { "characters": ["a"], "character_start_times_seconds": [] } },
            { "uuid": "bare" },
            { "uuid": "../escape", "charData": {} }
        ]));

        let summary = run_batch(
            list,
            &SubcueConfig::default(),
            &BatchOptions {
                out_dir: out_dir.clone(),
                force: false,
            },
        )
        .expect("batch should succeed");

        assert_eq!(summary.written.len(), 1);
        assert_eq!(summary.written[0].uuid, "fresh");
        assert_eq!(summary.written[0].cues, 1);
        assert!(out_dir.join("fresh_subtitles.json").is_file());

        assert_eq!(summary.skipped, vec!["done".to_owned()]);
        assert_eq!(
            std::fs::read_to_string(out_dir.join("done_subtitles.json")).expect("marker should read"),
            "{}"
        );

        let failed = summary
            .failed
            .iter()
            .map(|job| (job.index, job.uuid.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            failed,
            vec![
                (2, Some("short".to_owned())),
                (3, Some("bare".to_owned())),
                (4, None)
            ]
        );
        assert!(summary.failed[0].reason.contains("length mismatch"));
        assert_eq!(summary.failed[2].raw_uuid.as_deref(), Some("../escape"));
        assert!(!out_dir.join("short_subtitles.json").exists());
    }

    #[test]
    fn wrongly_typed_jobs_do_not_stop_the_batch() {
        let dir = tempdir().expect("tempdir should create");
        let out_dir = dir.path().to_path_buf();

        let list = jobs(json!([
            { "uuid": "numeric", "charData": { "characters": ["a", 1], "character_start_times_seconds": [0.0, 1.0] } },
            { "uuid": "good", "charData": { "characters": ["o", "k"], "character_start_times_seconds": [0.0, 1.0] } },
            { "uuid": "holes", "charData": { "characters": ["a"], "character_start_times_seconds": [null] } },
            { "uuid": "scalar", "charData": 5 },
            { "uuid": 42, "charData": { "characters": [], "character_start_times_seconds": [] } },
            "not an object",
            { "uuid": "after", "charData": { "characters": ["x"], "character_start_times_seconds": [2.0] } }
        ]));

        let summary = run_batch(
            list,
            &SubcueConfig::default(),
            &BatchOptions {
                out_dir: out_dir.clone(),
                force: false,
            },
        )
        .expect("batch should continue past bad entries");

        let written = summary
            .written
            .iter()
            .map(|job| job.uuid.as_str())
            .collect::<Vec<_>>();
        assert_eq!(written, vec!["good", "after"]);
        assert!(out_dir.join("good_subtitles.json").is_file());
        assert!(out_dir.join("after_subtitles.json").is_file());

        let failed = summary
            .failed
            .iter()
            .map(|job| (job.index, job.uuid.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            failed,
            vec![
                (0, Some("numeric".to_owned())),
                (2, Some("holes".to_owned())),
                (3, Some("scalar".to_owned())),
                (4, None),
                (5, None)
            ]
        );
        assert!(summary.failed[0].reason.starts_with("invalid job entry: "));
        assert!(!out_dir.join("numeric_subtitles.json").exists());
    }

    #[test]
    fn force_rewrites_existing_subtitles() {
        let dir = tempdir().expect("tempdir should create");
        let out_dir = dir.path().to_path_buf();
        std::fs::write(out_dir.join("done_subtitles.json"), "{}").expect("marker should write");

        let summary = run_batch(
            jobs(json!([{
                "uuid": "done",
                "charData": { "characters": ["o", "k"], "character_start_times_seconds": [1.0, 2.0] }
            }])),
            &SubcueConfig::default(),
            &BatchOptions {
                out_dir: out_dir.clone(),
                force: true,
            },
        )
        .expect("batch should succeed");

        assert_eq!(summary.written.len(), 1);
        assert!(summary.skipped.is_empty());
        let contents =
            std::fs::read_to_string(out_dir.join("done_subtitles.json")).expect("output should read");
        assert!(contents.contains("\"text\": \"ok\""), "{contents}");
    }
}
