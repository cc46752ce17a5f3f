//! Scripted in-memory catalog source for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::api::CatalogSource;
use crate::error::CatalogError;
use crate::models::{
    CategoryRaw, Language, LocalizedText, Template, TemplateDraft, TemplateId, USER_CATEGORY_ID,
};

pub(crate) fn template(id: &str, title: &str, category: &str) -> Template {
    Template {
        id: TemplateId::from(id),
        title: title.to_string(),
        category: category.to_string(),
        description: LocalizedText::default(),
        prompt: LocalizedText::new(format!("{title} 提示"), format!("{title} prompt")),
        tags: Vec::new(),
        images: Vec::new(),
        source: None,
        difficulty: None,
    }
}

pub(crate) fn category(id: &str, name: &str, count: u32) -> CategoryRaw {
    CategoryRaw {
        id: id.to_string(),
        name: name.to_string(),
        count,
    }
}

#[derive(Default)]
pub(crate) struct FakeSource {
    categories: Mutex<HashMap<Language, Vec<CategoryRaw>>>,
    templates: Mutex<HashMap<(String, Language), Vec<Template>>>,
    user_templates: Mutex<Vec<Template>>,
    calls: Mutex<HashMap<String, usize>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failures: Mutex<HashMap<String, CatalogError>>,
    panics: Mutex<HashSet<String>>,
    next_user_id: Mutex<usize>,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn put_categories(&self, lang: Language, categories: Vec<CategoryRaw>) {
        self.categories.lock().insert(lang, categories);
    }

    pub(crate) fn put_templates(&self, category_id: &str, lang: Language, templates: Vec<Template>) {
        self.templates
            .lock()
            .insert((category_id.to_string(), lang), templates);
    }

    pub(crate) fn put_user_templates(&self, templates: Vec<Template>) {
        *self.user_templates.lock() = templates;
    }

    /// Holds every template fetch for `category_id` until the returned gate is notified.
    pub(crate) fn gate(&self, category_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .insert(category_id.to_string(), Arc::clone(&gate));
        gate
    }

    /// Makes the next call keyed by `key` (a category id, or `categories`) fail.
    pub(crate) fn fail_next(&self, key: &str, err: CatalogError) {
        self.failures.lock().insert(key.to_string(), err);
    }

    /// Makes the next template fetch for `category_id` panic.
    pub(crate) fn panic_next(&self, category_id: &str) {
        self.panics.lock().insert(category_id.to_string());
    }

    pub(crate) fn template_calls(&self, category_id: &str, lang: Language) -> usize {
        self.count(&format!("templates:{category_id}:{lang}"))
    }

    pub(crate) fn user_calls(&self) -> usize {
        self.count("user-templates")
    }

    fn count(&self, key: &str) -> usize {
        self.calls.lock().get(key).copied().unwrap_or(0)
    }

    fn record(&self, key: String) {
        *self.calls.lock().entry(key).or_insert(0) += 1;
    }

    fn take_failure(&self, key: &str) -> Result<(), CatalogError> {
        match self.failures.lock().remove(key) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn wait_gate(&self, category_id: &str) {
        let gate = self.gates.lock().get(category_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn store_user(&self, id: TemplateId, draft: &TemplateDraft) -> Template {
        let template = Template {
            id,
            title: draft.title.clone(),
            category: draft.category.clone(),
            description: LocalizedText::new(draft.description_zh.clone(), draft.description_en.clone()),
            prompt: LocalizedText::new(draft.prompt_zh.clone(), draft.prompt_en.clone()),
            tags: draft.tags.clone(),
            images: Vec::new(),
            source: None,
            difficulty: None,
        };
        let mut users = self.user_templates.lock();
        match users.iter_mut().find(|t| t.id == template.id) {
            Some(existing) => *existing = template.clone(),
            None => users.push(template.clone()),
        }
        template
    }
}

#[async_trait]
impl CatalogSource for FakeSource {
    async fn list_categories(&self, lang: Language) -> Result<Vec<CategoryRaw>, CatalogError> {
        self.record(format!("categories:{lang}"));
        self.take_failure("categories")?;
        Ok(self.categories.lock().get(&lang).cloned().unwrap_or_default())
    }

    async fn list_templates(
        &self,
        category_id: &str,
        lang: Language,
    ) -> Result<Vec<Template>, CatalogError> {
        self.record(format!("templates:{category_id}:{lang}"));
        self.wait_gate(category_id).await;
        let crash = self.panics.lock().remove(category_id);
        if crash {
            panic!("scripted crash fetching {category_id}");
        }
        self.take_failure(category_id)?;
        Ok(self
            .templates
            .lock()
            .get(&(category_id.to_string(), lang))
            .cloned()
            .unwrap_or_default())
    }

    async fn list_user_templates(&self) -> Result<Vec<Template>, CatalogError> {
        self.record("user-templates".to_string());
        self.take_failure(USER_CATEGORY_ID)?;
        Ok(self.user_templates.lock().clone())
    }

    async fn create_user_template(&self, draft: &TemplateDraft) -> Result<Template, CatalogError> {
        let id = {
            let mut next = self.next_user_id.lock();
            *next += 1;
            TemplateId::new(format!("user_{}", *next))
        };
        Ok(self.store_user(id, draft))
    }

    async fn update_user_template(
        &self,
        id: &TemplateId,
        draft: &TemplateDraft,
    ) -> Result<Template, CatalogError> {
        if !self.user_templates.lock().iter().any(|t| &t.id == id) {
            return Err(CatalogError::Remote {
                status: 404,
                message: "Template not found".into(),
            });
        }
        Ok(self.store_user(id.clone(), draft))
    }

    async fn delete_user_template(&self, id: &TemplateId) -> Result<(), CatalogError> {
        let mut users = self.user_templates.lock();
        let before = users.len();
        users.retain(|t| &t.id != id);
        if users.len() == before {
            return Err(CatalogError::Remote {
                status: 404,
                message: "Template not found".into(),
            });
        }
        Ok(())
    }
}
