pub mod aggregator;
pub mod batch;
pub mod config;
pub mod error;
pub mod error_codes;
pub mod subtitle_file;
pub mod transcript;

pub use aggregator::{aggregate, AggregatorConfig, WordAggregator};
pub use error::MalformedInputError;
pub use transcript::{convert, CharacterRecord, CharacterStream, TranscriptionDocument, WordCue};
