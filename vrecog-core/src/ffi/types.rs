//! FFI handle and status types

use crate::error::VRecogError;
use crate::model::{Model, SpeakerModel};
use crate::recognizer::RecognizerSession;
use crate::result::ErrorResult;
use std::ffi::CString;

/// Opaque model handle; one model reference
pub struct VRecogModel {
    pub(crate) model: Model,
}

/// Opaque speaker model handle; one speaker model reference
pub struct VRecogSpkModel {
    pub(crate) model: SpeakerModel,
}

/// Opaque recognizer handle
pub struct VRecogRecognizer {
    pub(crate) session: RecognizerSession,
    /// Backing store for the last string returned to the caller
    last_result: CString,
}

impl VRecogRecognizer {
    pub(crate) fn new(session: RecognizerSession) -> Self {
        Self {
            session,
            last_result: CString::default(),
        }
    }

    /// Keep `json` alive until the next call on this handle
    pub(crate) fn store_result(&mut self, json: String) -> &CString {
        self.last_result = CString::new(json).unwrap_or_else(|e| {
            tracing::error!("Result contains an interior NUL byte at {}", e.nul_position());
            CString::default()
        });
        &self.last_result
    }
}

/// Status codes that do not come from the recognizer itself
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VRecogStatus {
    Ok = 0,
    NullPointer = -10,
    InvalidArgument = -11,
    Panic = -12,
}

/// Failure at the C boundary
#[derive(Debug)]
pub enum FfiError {
    NullPointer(&'static str),
    InvalidArgument(String),
    Panic(String),
    Recognizer(VRecogError),
}

impl FfiError {
    pub fn code(&self) -> i32 {
        match self {
            Self::NullPointer(_) => VRecogStatus::NullPointer as i32,
            Self::InvalidArgument(_) => VRecogStatus::InvalidArgument as i32,
            Self::Panic(_) => VRecogStatus::Panic as i32,
            Self::Recognizer(e) => e.ffi_code(),
        }
    }

    /// Error rendered in the result schema
    pub fn to_json(&self) -> String {
        let error = match self {
            Self::NullPointer(name) => format!("null pointer: {}", name),
            Self::InvalidArgument(reason) => format!("invalid argument: {}", reason),
            Self::Panic(msg) => format!("internal error: {}", msg),
            Self::Recognizer(e) => e.to_string(),
        };
        serde_json::to_string(&ErrorResult {
            code: self.code(),
            error,
        })
        .unwrap_or_default()
    }
}

impl From<VRecogError> for FfiError {
    fn from(e: VRecogError) -> Self {
        Self::Recognizer(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(FfiError::NullPointer("model").code(), -10);
        assert_eq!(FfiError::from(VRecogError::SessionClosed).code(), -3);
    }

    #[test]
    fn test_error_json() {
        let json = FfiError::from(VRecogError::SessionClosed).to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["code"], -3);
        assert!(value["error"].as_str().unwrap().contains("finalized"));
    }
}
