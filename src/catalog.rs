use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::CatalogSource;
use crate::bridge::{PromptHost, apply_template};
use crate::cache::{CategoryCache, TemplateList};
use crate::cursor::Cursor;
use crate::error::{ApplyError, CatalogError};
use crate::merge::merge_categories;
use crate::models::{Category, Language, Template, TemplateDraft, TemplateId, USER_CATEGORY_ID};
use crate::search::search_loaded;

struct ViewState {
    cursor: Cursor,
    /// Most recent non-empty search result set.
    search_results: Option<TemplateList>,
}

/// One catalog view: category list, template cache, cursor and search state.
///
/// All methods take `&self`; the cursor and search state sit behind a mutex so
/// a catalog shared between tasks is mutated one operation at a time. Lock
/// order is view state first, then the cache.
pub struct Catalog {
    source: Arc<dyn CatalogSource>,
    cache: CategoryCache,
    categories: Mutex<Vec<Category>>,
    view: Mutex<ViewState>,
}

impl Catalog {
    pub fn new(source: Arc<dyn CatalogSource>, language: Language) -> Self {
        Self {
            cache: CategoryCache::new(Arc::clone(&source), language),
            source,
            categories: Mutex::new(Vec::new()),
            view: Mutex::new(ViewState {
                cursor: Cursor::new(language),
                search_results: None,
            }),
        }
    }

    /// Fetches the category listings in both languages concurrently and merges them.
    pub async fn open(&self) -> Result<Vec<Category>, CatalogError> {
        let categories = self.refresh_categories().await?;
        info!(count = categories.len(), "catalog opened");
        Ok(categories)
    }

    pub async fn refresh_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let (primary, secondary) = tokio::join!(
            self.source.list_categories(Language::Zh),
            self.source.list_categories(Language::En)
        );
        let merged = merge_categories(primary?, secondary?)?;
        *self.categories.lock() = merged.clone();
        Ok(merged)
    }

    pub fn categories(&self) -> Vec<Category> {
        self.categories.lock().clone()
    }

    /// Display name of a category in the current language.
    pub fn category_name(&self, category_id: &str) -> Option<String> {
        let lang = self.language();
        if category_id == USER_CATEGORY_ID {
            let name = match lang {
                Language::Zh => "我的模板",
                Language::En => "My Templates",
            };
            return Some(name.to_string());
        }
        self.categories
            .lock()
            .iter()
            .find(|c| c.id == category_id)
            .map(|c| c.name(lang).to_string())
    }

    pub fn cursor(&self) -> Cursor {
        self.view.lock().cursor.clone()
    }

    pub fn language(&self) -> Language {
        self.view.lock().cursor.language()
    }

    pub fn prompt_tab(&self) -> Language {
        self.view.lock().cursor.prompt_tab()
    }

    /// Cached templates of the active category, if loaded.
    pub fn active_templates(&self) -> Option<TemplateList> {
        let view = self.view.lock();
        view.cursor
            .active_category()
            .and_then(|id| self.cache.get(id))
    }

    pub fn active_template(&self) -> Option<Template> {
        let view = self.view.lock();
        let id = view.cursor.active_template()?;
        self.resolve(&view, id)
    }

    pub fn search_results(&self) -> Option<TemplateList> {
        self.view.lock().search_results.clone()
    }

    pub fn is_loading(&self, category_id: &str) -> bool {
        self.cache.is_loading(category_id, self.language())
    }

    /// Makes `category_id` the active category and loads its templates.
    ///
    /// The cursor moves before the fetch starts, so a later selection wins even
    /// if this fetch resolves after it; the fetched list still lands in the cache.
    pub async fn select_category(&self, category_id: &str) -> Result<TemplateList, CatalogError> {
        let lang = {
            let mut view = self.view.lock();
            view.cursor.select_category(category_id);
            view.cursor.language()
        };
        debug!(category = category_id, %lang, "category selected");
        self.cache.ensure_loaded(category_id, lang).await
    }

    /// Selects a template from the active category or the latest search results.
    /// An unknown id leaves the cursor untouched.
    pub fn select_template(&self, id: &TemplateId) -> Result<Template, CatalogError> {
        let mut view = self.view.lock();
        let not_found = || CatalogError::NotFound(id.to_string());
        let category = view.cursor.active_category().ok_or_else(not_found)?;

        let found = self
            .cache
            .get(category)
            .and_then(|list| list.iter().find(|t| &t.id == id).cloned())
            .or_else(|| {
                view.search_results
                    .as_ref()
                    .and_then(|list| list.iter().find(|t| &t.id == id).cloned())
            })
            .ok_or_else(not_found)?;

        view.cursor.select_template(found.id.clone())?;
        Ok(found)
    }

    /// Switches the display language: wipes the cache, reloads the active
    /// category and keeps the active template only if it is still there.
    pub async fn set_language(&self, lang: Language) -> Result<Option<TemplateList>, CatalogError> {
        let (category, template) = {
            let mut view = self.view.lock();
            if !view.cursor.set_language(lang) {
                drop(view);
                return Ok(self.active_templates());
            }
            self.cache.set_language(lang);
            view.search_results = None;
            (
                view.cursor.active_category().map(str::to_string),
                view.cursor.active_template().cloned(),
            )
        };
        info!(%lang, "display language changed");

        let Some(category) = category else {
            return Ok(None);
        };
        let reloaded = self.cache.ensure_loaded(&category, lang).await;

        let mut view = self.view.lock();
        let still_active = template.is_some() && view.cursor.active_template() == template.as_ref();
        match reloaded {
            Ok(list) => {
                if still_active && !list.iter().any(|t| Some(&t.id) == template.as_ref()) {
                    debug!(category = %category, "active template gone after language switch");
                    view.cursor.clear_template();
                }
                Ok(Some(list))
            }
            Err(err) => {
                if still_active {
                    view.cursor.clear_template();
                }
                Err(err)
            }
        }
    }

    pub fn set_prompt_tab(&self, tab: Language) {
        self.view.lock().cursor.set_prompt_tab(tab);
    }

    /// Searches the categories already in the cache, never fetching.
    ///
    /// A blank keyword ends the search and returns the active category's list
    /// exactly as cached.
    pub fn search(&self, keyword: &str) -> TemplateList {
        let cached = self.cache.cached_categories();
        let mut view = self.view.lock();

        match search_loaded(cached.iter().map(|(_, list)| list.as_slice()), keyword) {
            Some(results) => {
                debug!(keyword, hits = results.len(), categories = cached.len(), "search");
                let results = Arc::new(results);
                view.search_results = Some(Arc::clone(&results));
                results
            }
            None => {
                view.search_results = None;
                view.cursor
                    .active_category()
                    .and_then(|id| self.cache.get(id))
                    .unwrap_or_default()
            }
        }
    }

    pub async fn create_user_template(&self, draft: TemplateDraft) -> Result<Template, CatalogError> {
        let draft = draft.validate()?;
        let created = self.source.create_user_template(&draft).await?;
        info!(id = %created.id, "user template created");
        self.refresh_user_templates().await;
        Ok(created)
    }

    pub async fn update_user_template(
        &self,
        id: &TemplateId,
        draft: TemplateDraft,
    ) -> Result<Template, CatalogError> {
        if !id.is_user_authored() {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        let draft = draft.validate()?;
        let updated = self.source.update_user_template(id, &draft).await?;
        info!(%id, "user template updated");
        self.refresh_user_templates().await;
        Ok(updated)
    }

    pub async fn delete_user_template(&self, id: &TemplateId) -> Result<(), CatalogError> {
        if !id.is_user_authored() {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        self.source.delete_user_template(id).await?;
        info!(%id, "user template deleted");
        self.refresh_user_templates().await;
        Ok(())
    }

    /// Commits the active template, in the active prompt tab language, to `field`.
    pub fn apply_selected<H>(&self, host: &mut H, field: &str) -> Result<String, ApplyError>
    where
        H: PromptHost + ?Sized,
    {
        let (template, tab) = {
            let view = self.view.lock();
            let template = view
                .cursor
                .active_template()
                .and_then(|id| self.resolve(&view, id));
            (template, view.cursor.prompt_tab())
        };
        let template = template.ok_or(ApplyError::NoTemplateSelected)?;
        let committed = apply_template(host, field, &template, tab)?;
        info!(id = %template.id, lang = %tab, "template applied");
        Ok(committed)
    }

    /// Drops the stale user list after a mutation and reloads it when it is on screen.
    async fn refresh_user_templates(&self) {
        self.cache.invalidate(USER_CATEGORY_ID);
        let reload = {
            let mut view = self.view.lock();
            view.search_results = None;
            (view.cursor.active_category() == Some(USER_CATEGORY_ID)).then(|| view.cursor.language())
        };

        if let Some(lang) = reload {
            if let Err(err) = self.cache.ensure_loaded(USER_CATEGORY_ID, lang).await {
                warn!(error = %err, "reloading user templates failed");
            }
        }

        let mut view = self.view.lock();
        let dangling = view
            .cursor
            .active_template()
            .is_some_and(|id| self.resolve(&view, id).is_none());
        if dangling {
            view.cursor.clear_template();
        }
    }

    /// Finds a template by id in the active category, then the search results,
    /// then any cached category.
    fn resolve(&self, view: &ViewState, id: &TemplateId) -> Option<Template> {
        let find = |list: &TemplateList| list.iter().find(|t| &t.id == id).cloned();
        view.cursor
            .active_category()
            .and_then(|c| self.cache.get(c))
            .and_then(|list| find(&list))
            .or_else(|| view.search_results.as_ref().and_then(find))
            .or_else(|| {
                self.cache
                    .cached_categories()
                    .iter()
                    .find_map(|(_, list)| find(list))
            })
    }
}
