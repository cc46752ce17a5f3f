use thiserror::Error;

use crate::models::Language;

/// Errors raised by catalog operations. Each one is scoped to the single
/// operation that produced it.
///
/// `Clone` so that one coalesced fetch outcome can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Non-success HTTP response. `message` is the server's `error` field when present.
    #[error("{message} (HTTP {status})")]
    Remote { status: u16, message: String },

    /// The two language listings of the category set disagree.
    #[error("category listings disagree: {primary} {primary_lang} vs {secondary} {secondary_lang}")]
    Consistency {
        primary: usize,
        secondary: usize,
        primary_lang: Language,
        secondary_lang: Language,
    },

    #[error("template {0} is not in the loaded set")]
    NotFound(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("required field `{field}` is empty")]
    InvalidDraft { field: &'static str },

    #[error("background fetch aborted: {0}")]
    Task(String),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound(_))
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Decode(err.to_string())
    }
}

/// Reasons a template could not be committed to the host's text field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("no template is selected")]
    NoTemplateSelected,

    #[error("the template has no {0} prompt text")]
    MissingLanguageText(Language),

    #[error("the host exposes no text field named `{0}`")]
    NoTextFieldFound(String),
}
