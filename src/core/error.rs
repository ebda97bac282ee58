use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,
    ValidationInvalidJson,

    TagInvalidName,
    TagMergeClash,

    DocumentNotFound,
    DocumentStale,

    MetadataParseFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::TagInvalidName => "tag.invalid_name",
            ErrorCode::TagMergeClash => "tag.merge_clash",

            ErrorCode::DocumentNotFound => "document.not_found",
            ErrorCode::DocumentStale => "document.stale",

            ErrorCode::MetadataParseFailed => "metadata.parse_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInvalidNameDetails {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMergeClashDetails {
    pub from: String,
    pub to: String,
    pub origin: String,
    pub clash: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentNotFoundDetails {
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStaleDetails {
    pub path: String,
    pub start: usize,
    pub end: usize,
    pub expected: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataParseFailedDetails {
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalJsonErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn validation_invalid_json(err: serde_json::Error, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn tag_invalid_name(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::TagInvalidName,
            format!("\"{}\" is not a valid tag name", name),
            to_details(TagInvalidNameDetails { name }),
        )
        .with_hint("Tag names cannot contain whitespace or punctuation other than '/', '-' and '_'")
    }

    pub fn tag_merge_clash(
        from: impl Into<String>,
        to: impl Into<String>,
        origin: impl Into<String>,
        clash: impl Into<String>,
    ) -> Self {
        let details = TagMergeClashDetails {
            from: from.into(),
            to: to.into(),
            origin: origin.into(),
            clash: clash.into(),
        };
        let message = format!(
            "Renaming {} to {} would merge {} into existing tag {}",
            details.from, details.to, details.origin, details.clash
        );

        Self::new(ErrorCode::TagMergeClash, message, to_details(details))
            .with_hint("Re-run with --force to merge the tags anyway (this cannot be undone)")
    }

    pub fn document_not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(
            ErrorCode::DocumentNotFound,
            format!("Document {} not found", path),
            to_details(DocumentNotFoundDetails { path }),
        )
    }

    pub fn document_stale(details: DocumentStaleDetails) -> Self {
        let message = format!("Document {} has changed since indexing", details.path);
        Self::new(ErrorCode::DocumentStale, message, to_details(details))
            .with_hint("Rebuild the tag index and run the rename again")
    }

    pub fn metadata_parse_failed(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::MetadataParseFailed,
            "Front matter is not valid YAML",
            to_details(MetadataParseFailedDetails {
                error: error.into(),
            }),
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalJsonErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    /// First line of the underlying problem, suitable for per-document reports.
    pub fn summary(&self) -> String {
        match self.details.get("error").and_then(Value::as_str) {
            Some(inner) => format!("{}: {}", self.message, inner),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_dotted_strings() {
        assert_eq!(ErrorCode::DocumentStale.as_str(), "document.stale");
        assert_eq!(ErrorCode::TagMergeClash.as_str(), "tag.merge_clash");
        assert_eq!(ErrorCode::MetadataParseFailed.as_str(), "metadata.parse_failed");
    }

    #[test]
    fn tag_merge_clash_carries_both_tags() {
        let err = Error::tag_merge_clash("#foo", "#bar", "#foo/x", "#bar/x");
        assert_eq!(err.code, ErrorCode::TagMergeClash);
        assert_eq!(err.details["origin"], "#foo/x");
        assert_eq!(err.details["clash"], "#bar/x");
        assert!(err.message.contains("#bar/x"));
        assert_eq!(err.hints.len(), 1);
    }

    #[test]
    fn summary_includes_inner_error() {
        let err = Error::metadata_parse_failed("did not find expected key");
        assert_eq!(
            err.summary(),
            "Front matter is not valid YAML: did not find expected key"
        );

        let err = Error::document_not_found("notes/a.md");
        assert_eq!(err.summary(), "Document notes/a.md not found");
    }

    #[test]
    fn document_stale_omits_missing_found_text() {
        let err = Error::document_stale(DocumentStaleDetails {
            path: "a.md".to_string(),
            start: 3,
            end: 7,
            expected: "#foo".to_string(),
            found: None,
        });
        assert_eq!(err.details["start"], 3);
        assert!(err.details.get("found").is_none());
    }
}
