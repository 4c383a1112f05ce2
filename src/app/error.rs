use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct AppError {
    pub error: String,
    pub code: String,
    pub trace_id: String,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
            trace_id: trace_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new("ERR_VALIDATION", message, trace_id)
    }

    pub fn system(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new("ERR_SYSTEM", message, trace_id)
    }

    pub fn tool_not_found(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new("ERR_TOOL_NOT_FOUND", message, trace_id)
    }

    pub fn process_start(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new("ERR_PROCESS_START", message, trace_id)
    }

    pub fn timeout(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new("ERR_TIMEOUT", message, trace_id)
    }

    pub fn cancelled(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new("ERR_CANCELLED", message, trace_id)
    }

    pub fn port_unavailable(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new("ERR_PORT_UNAVAILABLE", message, trace_id)
    }

    pub fn unsupported_platform(message: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self::new("ERR_UNSUPPORTED_PLATFORM", message, trace_id)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.code)
    }
}

impl std::error::Error for AppError {}
