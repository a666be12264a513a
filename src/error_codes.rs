use std::fmt;

use anyhow::Error;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::MalformedInputError;

pub const MALFORMED_INPUT: &str = "E_MALFORMED_INPUT";
pub const INVALID_CONFIG: &str = "E_INVALID_CONFIG";
pub const IO: &str = "E_IO";
pub const FAILED: &str = "E_FAILED";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodedErrorKind {
    Usage,
    Input,
    Runtime,
}

#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    pub fn usage(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            kind: CodedErrorKind::Usage,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn exit_code(&self) -> i32 {
        match (self.kind, self.code) {
            (CodedErrorKind::Usage, _) => 2,
            (CodedErrorKind::Input, _) => 3,
            (CodedErrorKind::Runtime, IO) => 5,
            (CodedErrorKind::Runtime, _) => 1,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code.to_owned(),
                message: self.message.clone(),
                details: self.details.clone(),
            },
        }
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<CodedError>())
}

/// Maps any CLI failure onto a stable code. Explicit coded errors win, then
/// malformed character data, then filesystem errors.
pub fn classify(error: &Error) -> CodedError {
    if let Some(coded) = find_coded_error(error) {
        return coded.clone();
    }

    let message = format!("{error:#}");
    if let Some(malformed) = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<MalformedInputError>())
    {
        return CodedError {
            code: MALFORMED_INPUT,
            message,
            details: Some(json!({ "field": malformed.field() })),
            kind: CodedErrorKind::Input,
        };
    }

    let code = if error
        .chain()
        .any(|cause| cause.downcast_ref::<std::io::Error>().is_some())
    {
        IO
    } else {
        FAILED
    };
    CodedError {
        code,
        message,
        details: None,
        kind: CodedErrorKind::Runtime,
    }
}
