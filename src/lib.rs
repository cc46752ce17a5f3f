//! Client-side manager for a bilingual catalog of prompt templates.
//!
//! Categories are fetched once per session in both languages and merged.
//! Template lists are fetched per category on first use and cached for the
//! active display language; search only looks at what is already cached.

pub mod api;
pub mod bridge;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod cursor;
pub mod error;
pub mod logging;
pub mod merge;
pub mod models;
pub mod search;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, CatalogSource};
pub use bridge::{PromptHost, apply_template};
pub use catalog::Catalog;
pub use config::Config;
pub use error::{ApplyError, CatalogError};
pub use models::{Category, Language, Template, TemplateDraft, TemplateId, USER_CATEGORY_ID};
