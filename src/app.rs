use prompt_catalog::cache::TemplateList;
use prompt_catalog::{Catalog, Category, Language, PromptHost, Template, USER_CATEGORY_ID};
use std::sync::Arc;

#[derive(Debug, PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Focus {
    Categories,
    Templates,
}

/// The host widget templates are applied to: one named, editable text field.
pub struct PromptNode {
    pub field: String,
    pub value: String,
}

impl PromptHost for PromptNode {
    fn text_field_mut(&mut self, name: &str) -> Option<&mut String> {
        (name == self.field).then_some(&mut self.value)
    }
}

/// Terminal view state on top of the catalog.
pub struct App {
    pub catalog: Arc<Catalog>,
    /// Merged categories, shown after the "My Templates" row.
    pub categories: Vec<Category>,
    /// Highlighted row in the category pane; row 0 is the user category.
    pub category_index: usize,
    /// Templates currently listed: a category or the latest search results.
    pub templates: TemplateList,
    pub template_index: usize,
    pub search_query: String,
    pub input_mode: InputMode,
    pub focus: Focus,
    pub node: PromptNode,
    pub is_loading: bool,
    pub error: Option<String>,
    pub notification: Option<String>,
    pub detail_scroll: u16,
}

impl App {
    pub fn new(catalog: Arc<Catalog>, prompt_field: String) -> Self {
        Self {
            catalog,
            categories: Vec::new(),
            category_index: 0,
            templates: TemplateList::default(),
            template_index: 0,
            search_query: String::new(),
            input_mode: InputMode::Normal,
            focus: Focus::Categories,
            node: PromptNode {
                field: prompt_field,
                value: String::new(),
            },
            is_loading: true,
            error: None,
            notification: None,
            detail_scroll: 0,
        }
    }

    pub fn clear_messages(&mut self) {
        self.error = None;
        self.notification = None;
    }

    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
        self.category_index = self.category_index.min(self.categories.len());
    }

    pub fn category_count(&self) -> usize {
        self.categories.len() + 1
    }

    pub fn category_id_at(&self, index: usize) -> Option<String> {
        match index {
            0 => Some(USER_CATEGORY_ID.to_string()),
            n => self.categories.get(n - 1).map(|c| c.id.clone()),
        }
    }

    pub fn highlighted_category(&self) -> Option<String> {
        self.category_id_at(self.category_index)
    }

    pub fn category_label(&self, index: usize) -> String {
        let lang = self.catalog.language();
        match index {
            0 => self
                .catalog
                .category_name(USER_CATEGORY_ID)
                .unwrap_or_default(),
            n => self
                .categories
                .get(n - 1)
                .map(|c| format!("{} ({})", c.name(lang), c.count))
                .unwrap_or_default(),
        }
    }

    /// Replaces the template pane and keeps the active template highlighted when listed.
    pub fn show_templates(&mut self, templates: TemplateList) {
        self.templates = templates;
        let active = self.catalog.cursor().active_template().cloned();
        self.template_index = active
            .and_then(|id| self.templates.iter().position(|t| t.id == id))
            .unwrap_or(0);
        self.detail_scroll = 0;
    }

    /// Re-runs the current query against the catalog. A blank query ends the
    /// search and lists the active category again.
    pub fn refresh_list(&mut self) {
        let list = self.catalog.search(&self.search_query);
        self.show_templates(list);
    }

    pub fn highlighted_template(&self) -> Option<&Template> {
        self.templates.get(self.template_index)
    }

    pub fn next(&mut self) {
        match self.focus {
            Focus::Categories => {
                self.category_index = (self.category_index + 1) % self.category_count();
            }
            Focus::Templates if !self.templates.is_empty() => {
                self.template_index = (self.template_index + 1) % self.templates.len();
                self.select_highlighted();
            }
            Focus::Templates => {}
        }
    }

    pub fn previous(&mut self) {
        match self.focus {
            Focus::Categories => {
                self.category_index = self
                    .category_index
                    .checked_sub(1)
                    .unwrap_or(self.category_count() - 1);
            }
            Focus::Templates if !self.templates.is_empty() => {
                self.template_index = self
                    .template_index
                    .checked_sub(1)
                    .unwrap_or(self.templates.len() - 1);
                self.select_highlighted();
            }
            Focus::Templates => {}
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Categories => Focus::Templates,
            Focus::Templates => Focus::Categories,
        };
        if self.focus == Focus::Templates {
            self.select_highlighted();
        }
    }

    /// Moves the catalog cursor to the highlighted template.
    pub fn select_highlighted(&mut self) {
        self.detail_scroll = 0;
        let Some(id) = self.highlighted_template().map(|t| t.id.clone()) else {
            return;
        };
        if let Err(err) = self.catalog.select_template(&id) {
            self.error = Some(err.to_string());
        }
    }

    pub fn toggle_prompt_tab(&mut self) {
        let tab = self.catalog.prompt_tab().other();
        self.catalog.set_prompt_tab(tab);
    }

    pub fn apply_selected(&mut self) {
        self.clear_messages();
        let field = self.node.field.clone();
        match self.catalog.apply_selected(&mut self.node, &field) {
            Ok(_) => {
                let title = self
                    .catalog
                    .active_template()
                    .map(|t| t.title)
                    .unwrap_or_default();
                self.notification = Some(format!(
                    "Applied \"{}\" ({})",
                    title,
                    self.catalog.prompt_tab()
                ));
            }
            Err(err) => self.error = Some(err.to_string()),
        }
    }

    pub fn get_detail(&self) -> String {
        let Some(template) = self.catalog.active_template() else {
            return "No template selected.".to_string();
        };
        let lang = self.catalog.language();
        let tab = self.catalog.prompt_tab();

        let mut detail = format!("{}\nID: {}", template.title, template.id);
        if let Some(difficulty) = &template.difficulty {
            detail.push_str(&format!("\nDifficulty: {difficulty}"));
        }
        if let Some(source) = &template.source {
            detail.push_str(&format!("\nSource: {}", source.name));
            if let Some(url) = &source.url {
                detail.push_str(&format!(" <{url}>"));
            }
        }
        if let Some(description) = template
            .description
            .get(lang)
            .or_else(|| template.description.get(lang.other()))
        {
            detail.push_str(&format!("\n\n{}", description.trim()));
        }

        let tab_name = match tab {
            Language::Zh => "中文",
            Language::En => "English",
        };
        detail.push_str(&format!("\n\n--- Prompt [{tab_name}] ---\n"));
        detail.push_str(template.prompt.get(tab).unwrap_or("(not available in this language)"));

        if !template.tags.is_empty() {
            detail.push_str(&format!("\n\nTags: {}", template.tags.join(", ")));
        }
        let images: Vec<_> = template.image_names().collect();
        if !images.is_empty() {
            detail.push_str(&format!("\nImages: {}", images.join(", ")));
        }
        detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prompt_catalog::models::{CategoryRaw, LocalizedText};
    use prompt_catalog::{CatalogError, CatalogSource, TemplateDraft, TemplateId};

    /// Serves three templates for category `1` and nothing else.
    struct OneCategory;

    fn template(id: &str, title: &str) -> Template {
        Template {
            id: TemplateId::from(id),
            title: title.to_string(),
            category: "1".to_string(),
            description: LocalizedText::default(),
            prompt: LocalizedText::default(),
            tags: Vec::new(),
            images: Vec::new(),
            source: None,
            difficulty: None,
        }
    }

    #[async_trait]
    impl CatalogSource for OneCategory {
        async fn list_categories(&self, _lang: Language) -> Result<Vec<CategoryRaw>, CatalogError> {
            Ok(Vec::new())
        }

        async fn list_templates(
            &self,
            _category_id: &str,
            _lang: Language,
        ) -> Result<Vec<Template>, CatalogError> {
            Ok(vec![template("1", "T1"), template("2", "T2"), template("3", "T3")])
        }

        async fn list_user_templates(&self) -> Result<Vec<Template>, CatalogError> {
            Ok(Vec::new())
        }

        async fn create_user_template(&self, _draft: &TemplateDraft) -> Result<Template, CatalogError> {
            Err(CatalogError::NotFound("create".into()))
        }

        async fn update_user_template(
            &self,
            id: &TemplateId,
            _draft: &TemplateDraft,
        ) -> Result<Template, CatalogError> {
            Err(CatalogError::NotFound(id.to_string()))
        }

        async fn delete_user_template(&self, id: &TemplateId) -> Result<(), CatalogError> {
            Err(CatalogError::NotFound(id.to_string()))
        }
    }

    #[tokio::test]
    async fn clearing_the_query_ends_the_search() {
        let catalog = Arc::new(Catalog::new(Arc::new(OneCategory), Language::Zh));
        catalog.select_category("1").await.expect("loaded");
        let mut app = App::new(Arc::clone(&catalog), "prompt".to_string());

        app.search_query = "t3".to_string();
        app.refresh_list();
        assert_eq!(app.templates.len(), 1);
        assert!(catalog.search_results().is_some());

        app.search_query.clear();
        app.refresh_list();
        assert_eq!(app.templates.len(), 3);
        assert!(catalog.search_results().is_none());
    }
}
