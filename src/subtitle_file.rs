use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use sha2::{Digest, Sha256};

use crate::transcript::{CharacterRecord, TranscriptionDocument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: usize,
}

pub fn load_character_record(path: &Path) -> Result<CharacterRecord> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read character data {}", path.display()))?;
    serde_json::from_str(&contents).map_err(|error| {
        anyhow!(
            "failed to parse json in {} at line {}, column {}: {}",
            path.display(),
            error.line(),
            error.column(),
            error
        )
    })
}

/// `<out_dir>/<job_id><suffix>`, the file name the renderer looks up per job.
pub fn subtitle_path(out_dir: &Path, job_id: &str, suffix: &str) -> PathBuf {
    out_dir.join(format!("{job_id}{suffix}"))
}

pub fn encode_document(document: &TranscriptionDocument, indent: usize) -> Result<Vec<u8>> {
    let indent = " ".repeat(indent);
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    document
        .serialize(&mut serializer)
        .context("failed to serialize transcription document")?;
    Ok(buffer)
}

pub fn write_document(
    path: &Path,
    document: &TranscriptionDocument,
    indent: usize,
) -> Result<WrittenFile> {
    let encoded = encode_document(document, indent)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    fs::write(path, &encoded)
        .with_context(|| format!("failed to write transcription {}", path.display()))?;

    Ok(WrittenFile {
        path: path.to_path_buf(),
        sha256: sha256_hex(&encoded),
        bytes: encoded.len(),
    })
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::{load_character_record, sha256_hex, subtitle_path, write_document};
    use crate::transcript::{TranscriptionDocument, WordCue};

    fn document() -> TranscriptionDocument {
        TranscriptionDocument {
            systeminfo: json!(""),
            model: json!({}),
            params: json!({}),
            result: json!({}),
            transcription: vec![WordCue {
                text: "cat".to_owned(),
                start_in_seconds: 8.0,
            }],
        }
    }

    #[test]
    fn writes_four_space_indented_json() {
        let dir = tempdir().expect("tempdir should create");
        let path = dir.path().join("nested/out.json");
        let written = write_document(&path, &document(), 4).expect("write should succeed");

        let contents = std::fs::read_to_string(&path).expect("output should read");
        assert!(contents.starts_with("{\n    \"systeminfo\": \"\",\n"), "{contents}");
        assert!(contents.contains("\n        {\n            \"text\": \"cat\""), "{contents}");
        assert_eq!(written.sha256, sha256_hex(contents.as_bytes()));
        assert_eq!(written.bytes, contents.len());

        let reparsed: TranscriptionDocument =
            serde_json::from_str(&contents).expect("output should parse");
        assert_eq!(reparsed, document());
    }

    #[test]
    fn identical_documents_hash_identically() {
        let dir = tempdir().expect("tempdir should create");
        let first = write_document(&dir.path().join("a.json"), &document(), 4)
            .expect("write should succeed");
        let second = write_document(&dir.path().join("b.json"), &document(), 4)
            .expect("write should succeed");
        assert_eq!(first.sha256, second.sha256);
    }

    #[test]
    fn parse_errors_report_location() {
        let dir = tempdir().expect("tempdir should create");
        let path = dir.path().join("chars.json");
        std::fs::write(&path, "{\n  \"characters\": [\"a\",\n}").expect("input should write");

        let error = load_character_record(&path).expect_err("bad json should fail");
        assert!(error.to_string().contains("line 3"), "{error}");
    }

    #[test]
    fn subtitle_path_appends_suffix() {
        let path = subtitle_path(std::path::Path::new("public"), "abc-123", "_subtitles.json");
        assert_eq!(path, std::path::PathBuf::from("public/abc-123_subtitles.json"));
    }
}
