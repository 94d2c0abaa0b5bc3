use rmcp::model::{CallToolResult, Content};
use websift_core::{BackendErrorKind, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidParams,
    NotConfigured,
    InvalidKey,
    QuotaExceeded,
    BackendUnavailable,
    MalformedResponse,
    SearchFailed,
}

impl ErrorCode {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::InvalidParams => "invalid_params",
            Self::NotConfigured => "not_configured",
            Self::InvalidKey => "invalid_key",
            Self::QuotaExceeded => "quota_exceeded",
            Self::BackendUnavailable => "backend_unavailable",
            Self::MalformedResponse => "malformed_response",
            Self::SearchFailed => "search_failed",
        }
    }

    pub(crate) fn retryable(self) -> bool {
        match self {
            Self::BackendUnavailable | Self::SearchFailed => true,
            // Keys, quota, config and bad input need a change before a retry can help.
            Self::InvalidParams
            | Self::NotConfigured
            | Self::InvalidKey
            | Self::QuotaExceeded
            | Self::MalformedResponse => false,
        }
    }

    pub(crate) fn hint(self) -> &'static str {
        match self {
            Self::InvalidParams => "Pass non-empty string arguments.",
            Self::NotConfigured => "The server is missing configuration; run `websift doctor`.",
            Self::InvalidKey => "The search backend rejected the API key; check the server's credentials.",
            Self::QuotaExceeded => "The search backend's usage limit was reached; check the plan's limits or try later.",
            Self::BackendUnavailable => "The search backend could not be reached; retry later.",
            Self::MalformedResponse => "The search backend returned an unexpected response shape.",
            Self::SearchFailed => "The search failed; retry later.",
        }
    }
}

impl From<&Error> for ErrorCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::InvalidParams(_) => Self::InvalidParams,
            Error::NotConfigured(_) | Error::UnsupportedModelFamily(_) => Self::NotConfigured,
            Error::MalformedResponse { .. } => Self::MalformedResponse,
            Error::Backend { kind, .. } => match kind {
                BackendErrorKind::InvalidKey => Self::InvalidKey,
                BackendErrorKind::QuotaExceeded => Self::QuotaExceeded,
                BackendErrorKind::Network | BackendErrorKind::Timeout => Self::BackendUnavailable,
                BackendErrorKind::Http(_) => Self::SearchFailed,
            },
        }
    }
}

/// Text of a tool-level error: machine-greppable code first, then message and hint.
pub(crate) fn error_text(code: ErrorCode, message: impl ToString) -> String {
    format!(
        "error[{}]: {}\nretryable: {}\nhint: {}",
        code.as_str(),
        message.to_string(),
        code.retryable(),
        code.hint()
    )
}

/// Tool call that failed: `is_error` is set so clients never mistake it for results.
pub(crate) fn tool_error(code: ErrorCode, message: impl ToString) -> CallToolResult {
    CallToolResult::error(vec![Content::text(error_text(code, message))])
}

pub(crate) fn tool_text(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}
