use crate::error::CatalogError;
use crate::models::{Language, TemplateId};

/// Category/template part of the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    NoCategory,
    CategorySelected {
        category: String,
    },
    TemplateSelected {
        category: String,
        template: TemplateId,
    },
}

/// The user's current selection. Language and prompt tab are orthogonal to
/// the selection and never reset it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    selection: Selection,
    language: Language,
    prompt_tab: Language,
}

impl Cursor {
    pub fn new(language: Language) -> Self {
        Self {
            selection: Selection::NoCategory,
            language,
            prompt_tab: language,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn active_category(&self) -> Option<&str> {
        match &self.selection {
            Selection::NoCategory => None,
            Selection::CategorySelected { category }
            | Selection::TemplateSelected { category, .. } => Some(category),
        }
    }

    pub fn active_template(&self) -> Option<&TemplateId> {
        match &self.selection {
            Selection::TemplateSelected { template, .. } => Some(template),
            _ => None,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn prompt_tab(&self) -> Language {
        self.prompt_tab
    }

    /// Moves to `CategorySelected` from any state, dropping the active template.
    pub fn select_category(&mut self, category_id: &str) {
        self.selection = Selection::CategorySelected {
            category: category_id.to_string(),
        };
    }

    /// Moves to `TemplateSelected`. The caller has already checked that the id
    /// resolves; without an active category there is nothing to resolve against.
    pub fn select_template(&mut self, id: TemplateId) -> Result<(), CatalogError> {
        let category = self
            .active_category()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?
            .to_string();
        self.selection = Selection::TemplateSelected {
            category,
            template: id,
        };
        Ok(())
    }

    pub fn clear_template(&mut self) {
        if let Selection::TemplateSelected { category, .. } = &self.selection {
            let category = category.clone();
            self.selection = Selection::CategorySelected { category };
        }
    }

    /// Returns whether the language actually changed.
    pub fn set_language(&mut self, lang: Language) -> bool {
        let changed = self.language != lang;
        self.language = lang;
        changed
    }

    pub fn set_prompt_tab(&mut self, tab: Language) {
        self.prompt_tab = tab;
    }
}
