use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aggregator::WordAggregator;
use crate::error::MalformedInputError;

pub const CHARACTERS_FIELD: &str = "characters";
pub const START_TIMES_FIELD: &str = "character_start_times_seconds";

/// Character-level transcript as produced by the speech service.
///
/// Both arrays are optional here so that a missing field can be reported by
/// name instead of surfacing as a generic parse error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_start_times_seconds: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systeminfo: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Characters with their aligned start times. Lengths always match.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterStream {
    characters: Vec<String>,
    timestamps: Vec<f64>,
}

impl CharacterStream {
    pub fn new(characters: Vec<String>, timestamps: Vec<f64>) -> Result<Self, MalformedInputError> {
        if characters.len() != timestamps.len() {
            return Err(MalformedInputError::length_mismatch(
                characters.len(),
                timestamps.len(),
            ));
        }
        Ok(Self {
            characters,
            timestamps,
        })
    }

    pub fn characters(&self) -> &[String] {
        &self.characters
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordCue {
    pub text: String,
    #[serde(rename = "startInSeconds")]
    pub start_in_seconds: f64,
}

/// Word-level transcript handed to the subtitle renderer.
///
/// Field order is part of the on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionDocument {
    pub systeminfo: Value,
    pub model: Value,
    pub params: Value,
    pub result: Value,
    pub transcription: Vec<WordCue>,
}

#[derive(Debug, Clone, PartialEq)]
struct Passthrough {
    systeminfo: Value,
    model: Value,
    params: Value,
    result: Value,
}

impl Passthrough {
    fn from_record(record: &mut CharacterRecord) -> Self {
        Self {
            systeminfo: present_or(record.systeminfo.take(), || Value::String(String::new())),
            model: present_or(record.model.take(), empty_object),
            params: present_or(record.params.take(), empty_object),
            result: present_or(record.result.take(), empty_object),
        }
    }
}

fn present_or(value: Option<Value>, default: impl FnOnce() -> Value) -> Value {
    match value {
        Some(Value::Null) | None => default(),
        Some(value) => value,
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl CharacterRecord {
    /// Validates the character arrays without consuming the record.
    pub fn stream(&self) -> Result<CharacterStream, MalformedInputError> {
        self.clone().take_stream()
    }

    fn take_stream(&mut self) -> Result<CharacterStream, MalformedInputError> {
        let characters = self
            .characters
            .take()
            .ok_or_else(|| MalformedInputError::missing(CHARACTERS_FIELD))?;
        let timestamps = self
            .character_start_times_seconds
            .take()
            .ok_or_else(|| MalformedInputError::missing(START_TIMES_FIELD))?;
        CharacterStream::new(characters, timestamps)
    }
}

/// Aggregates a record into a transcription document, copying its metadata through.
pub fn convert(
    mut record: CharacterRecord,
    aggregator: &WordAggregator,
) -> Result<TranscriptionDocument, MalformedInputError> {
    let stream = record.take_stream()?;
    let passthrough = Passthrough::from_record(&mut record);

    Ok(TranscriptionDocument {
        systeminfo: passthrough.systeminfo,
        model: passthrough.model,
        params: passthrough.params,
        result: passthrough.result,
        transcription: aggregator.aggregate_stream(&stream),
    })
}
