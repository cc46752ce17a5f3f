use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::CatalogError;

/// Pseudo-category holding the templates authored by the user.
pub const USER_CATEGORY_ID: &str = "user_custom";

const USER_ID_PREFIX: &str = "user_";
const DEFAULT_USER_CATEGORY: &str = "custom";

/// Display or prompt language. `Zh` is the primary language, `En` the secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Zh,
    En,
}

impl Language {
    /// Wire code used in `lang=` query parameters.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Zh => "zh",
            Language::En => "en",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Language::Zh => Language::En,
            Language::En => Language::Zh,
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "zh" => Some(Language::Zh),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifiers arrive as integers (curated templates) or strings (user templates).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Str(String),
}

impl RawId {
    fn into_canonical(self) -> String {
        match self {
            RawId::Int(n) => n.to_string(),
            RawId::Str(s) => s,
        }
    }
}

fn deserialize_canonical_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(RawId::into_canonical)
}

/// Canonical template identifier. All equality and dedup checks go through the string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_user_authored(&self) -> bool {
        self.0.starts_with(USER_ID_PREFIX)
    }
}

impl<'de> Deserialize<'de> for TemplateId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_canonical_id(deserializer).map(TemplateId)
    }
}

impl From<&str> for TemplateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for TemplateId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized bilingual text. An empty slot means the text is absent in that language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalizedText {
    pub zh: String,
    pub en: String,
}

impl LocalizedText {
    pub fn new(zh: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            zh: zh.into(),
            en: en.into(),
        }
    }

    /// Text present in only one language.
    pub fn single(lang: Language, text: impl Into<String>) -> Self {
        let mut out = Self::default();
        *out.slot_mut(lang) = text.into();
        out
    }

    pub fn get(&self, lang: Language) -> Option<&str> {
        let text = match lang {
            Language::Zh => &self.zh,
            Language::En => &self.en,
        };
        (!text.is_empty()).then_some(text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.zh.is_empty() && self.en.is_empty()
    }

    fn slot_mut(&mut self, lang: Language) -> &mut String {
        match lang {
            Language::Zh => &mut self.zh,
            Language::En => &mut self.en,
        }
    }
}

/// Text fields come either as one string or as a per-language object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireText {
    Plain(String),
    Localized {
        #[serde(default)]
        zh: Option<String>,
        #[serde(default)]
        en: Option<String>,
    },
}

impl WireText {
    /// Plain text belongs to the requested language, or to both when the
    /// endpoint is not language-projected.
    fn resolve(self, lang: Option<Language>) -> LocalizedText {
        match (self, lang) {
            (WireText::Plain(text), Some(lang)) => LocalizedText::single(lang, text),
            (WireText::Plain(text), None) => LocalizedText::new(text.clone(), text),
            (WireText::Localized { zh, en }, _) => {
                LocalizedText::new(zh.unwrap_or_default(), en.unwrap_or_default())
            }
        }
    }
}

/// Where a curated template came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireSource {
    Bare(String),
    Detailed {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
}

impl WireSource {
    fn into_source(self) -> Option<Source> {
        let (name, url) = match self {
            WireSource::Bare(name) => (name, None),
            WireSource::Detailed { name, url } => (name.unwrap_or_default(), url),
        };
        if name.trim().is_empty() {
            return None;
        }
        Some(Source {
            name,
            url: url.filter(|u| !u.trim().is_empty()),
        })
    }
}

/// A template as it appears on the wire, before normalization.
#[derive(Debug, Deserialize)]
pub struct TemplateRecord {
    id: TemplateId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<WireText>,
    #[serde(default)]
    prompt: Option<WireText>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    source: Option<WireSource>,
    #[serde(default)]
    difficulty: Option<String>,
}

impl TemplateRecord {
    /// Normalizes the record. `lang` is the language the response was projected to,
    /// `None` for bilingual endpoints.
    pub fn into_template(self, lang: Option<Language>, fallback_category: &str) -> Template {
        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| fallback_category.to_string());

        Template {
            id: self.id,
            title: self.title.unwrap_or_default(),
            category,
            description: self
                .description
                .map(|d| d.resolve(lang))
                .unwrap_or_default(),
            prompt: self.prompt.map(|p| p.resolve(lang)).unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            images: self.images.unwrap_or_default(),
            source: self.source.and_then(WireSource::into_source),
            difficulty: self.difficulty.filter(|d| !d.trim().is_empty()),
        }
    }
}

/// A single prompt template, normalized at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    pub id: TemplateId,
    pub title: String,
    pub category: String,
    pub description: LocalizedText,
    pub prompt: LocalizedText,
    pub tags: Vec<String>,
    /// Relative image paths, e.g. `images/333.jpeg`.
    pub images: Vec<String>,
    pub source: Option<Source>,
    pub difficulty: Option<String>,
}

impl Template {
    pub fn is_user_authored(&self) -> bool {
        self.id.is_user_authored()
    }

    /// File names of the example images, as served by the image endpoint.
    pub fn image_names(&self) -> impl Iterator<Item = &str> {
        self.images
            .iter()
            .map(|path| path.rsplit('/').next().unwrap_or(path.as_str()))
    }
}

/// One category as returned by a single-language listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRaw {
    #[serde(deserialize_with = "deserialize_canonical_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

/// A category with both language names merged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: String,
    pub name_zh: String,
    pub name_en: String,
    pub count: u32,
}

impl Category {
    pub fn name(&self, lang: Language) -> &str {
        match lang {
            Language::Zh => &self.name_zh,
            Language::En => &self.name_en,
        }
    }
}

fn serialize_tags<S>(tags: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&tags.join(","))
}

/// Body of a create or update request for a user-authored template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateDraft {
    pub title: String,
    pub category: String,
    pub description_zh: String,
    pub description_en: String,
    pub prompt_zh: String,
    pub prompt_en: String,
    #[serde(serialize_with = "serialize_tags")]
    pub tags: Vec<String>,
}

impl TemplateDraft {
    /// Prefills a draft from an existing template for editing.
    pub fn from_template(template: &Template) -> Self {
        Self {
            title: template.title.clone(),
            category: template.category.clone(),
            description_zh: template.description.zh.clone(),
            description_en: template.description.en.clone(),
            prompt_zh: template.prompt.zh.clone(),
            prompt_en: template.prompt.en.clone(),
            tags: template.tags.clone(),
        }
    }

    /// Splits a comma separated tag input, dropping blanks.
    pub fn parse_tags(input: &str) -> Vec<String> {
        input
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Checks required fields and fills in the defaults for category and tags.
    pub fn validate(mut self) -> Result<Self, CatalogError> {
        for (field, value) in [
            ("title", &self.title),
            ("prompt_zh", &self.prompt_zh),
            ("prompt_en", &self.prompt_en),
        ] {
            if value.trim().is_empty() {
                return Err(CatalogError::InvalidDraft { field });
            }
        }
        if self.category.trim().is_empty() {
            self.category = DEFAULT_USER_CATEGORY.to_string();
        }
        if self.tags.is_empty() {
            self.tags = vec![DEFAULT_USER_CATEGORY.to_string()];
        }
        Ok(self)
    }
}
