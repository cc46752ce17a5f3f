use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::CatalogSource;
use crate::error::CatalogError;
use crate::models::{Language, Template, USER_CATEGORY_ID};

/// Template list for one category, shared between the cache and its readers.
pub type TemplateList = Arc<Vec<Template>>;

type FetchOutcome = Result<TemplateList, CatalogError>;
type Flight = Shared<BoxFuture<'static, FetchOutcome>>;
type FlightKey = (String, Language);

struct CacheState {
    language: Language,
    entries: HashMap<String, TemplateList>,
    /// Category ids in the order they were first cached.
    order: Vec<String>,
    in_flight: HashMap<FlightKey, (u64, Flight)>,
    next_flight: u64,
}

impl CacheState {
    /// Stores a finished fetch only if its flight is still registered and its
    /// language is still the active one.
    fn finish(&mut self, key: &FlightKey, flight_id: u64, outcome: &FetchOutcome) {
        if !self.unregister(key, flight_id) {
            debug!(category = %key.0, lang = %key.1, "discarding superseded fetch");
            return;
        }

        match outcome {
            Ok(templates) if key.1 == self.language => {
                if self.entries.insert(key.0.clone(), Arc::clone(templates)).is_none() {
                    self.order.push(key.0.clone());
                }
            }
            Ok(_) => debug!(category = %key.0, lang = %key.1, "fetch finished for inactive language"),
            Err(err) => warn!(category = %key.0, lang = %key.1, error = %err, "category fetch failed"),
        }
    }

    /// Removes the flight if it is still the one registered under `key`.
    fn unregister(&mut self, key: &FlightKey, flight_id: u64) -> bool {
        let registered = matches!(self.in_flight.get(key), Some((id, _)) if *id == flight_id);
        if registered {
            self.in_flight.remove(key);
        }
        registered
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.in_flight.clear();
    }
}

/// Lazily populated per-category template store for the active display language.
///
/// Entries live for the whole session; they are only dropped by an explicit
/// invalidation or a language switch. Concurrent loads of the same
/// `(category, language)` pair share a single remote request.
#[derive(Clone)]
pub struct CategoryCache {
    source: Arc<dyn CatalogSource>,
    state: Arc<Mutex<CacheState>>,
}

impl CategoryCache {
    pub fn new(source: Arc<dyn CatalogSource>, language: Language) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(CacheState {
                language,
                entries: HashMap::new(),
                order: Vec::new(),
                in_flight: HashMap::new(),
                next_flight: 0,
            })),
        }
    }

    pub fn language(&self) -> Language {
        self.state.lock().language
    }

    /// Cache-only lookup, never fetches.
    pub fn get(&self, category_id: &str) -> Option<TemplateList> {
        self.state.lock().entries.get(category_id).cloned()
    }

    /// Every cached entry, in the order the categories were first cached.
    pub fn cached_categories(&self) -> Vec<(String, TemplateList)> {
        let state = self.state.lock();
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id).map(|t| (id.clone(), Arc::clone(t))))
            .collect()
    }

    pub fn is_loading(&self, category_id: &str, lang: Language) -> bool {
        self.state
            .lock()
            .in_flight
            .contains_key(&(category_id.to_string(), lang))
    }

    /// Returns the templates of a category, fetching them if needed.
    ///
    /// A call made while a fetch for the same pair is outstanding waits for that
    /// fetch instead of issuing another request. A failed fetch leaves the entry
    /// absent, so retrying is just calling this again.
    pub async fn ensure_loaded(&self, category_id: &str, lang: Language) -> FetchOutcome {
        let flight = {
            let mut state = self.state.lock();
            if lang == state.language {
                if let Some(templates) = state.entries.get(category_id) {
                    return Ok(Arc::clone(templates));
                }
            }

            let key = (category_id.to_string(), lang);
            match state.in_flight.get(&key) {
                Some((_, flight)) => {
                    debug!(category = category_id, %lang, "joining in-flight fetch");
                    flight.clone()
                }
                None => {
                    let flight_id = state.next_flight;
                    state.next_flight += 1;
                    let flight = self.spawn_fetch(key.clone(), flight_id);
                    state.in_flight.insert(key, (flight_id, flight.clone()));
                    flight
                }
            }
        };
        flight.await
    }

    /// Runs the fetch on its own task so an abandoned waiter cannot cancel it.
    fn spawn_fetch(&self, key: FlightKey, flight_id: u64) -> Flight {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let registry = Arc::downgrade(&self.state);
        let flight_key = key.clone();
        debug!(category = %key.0, lang = %key.1, "fetching category");

        let handle = tokio::spawn(async move {
            let (category_id, lang) = &key;
            let fetched = if category_id == USER_CATEGORY_ID {
                source.list_user_templates().await
            } else {
                source.list_templates(category_id, *lang).await
            };
            let outcome = fetched.map(Arc::new);
            state.lock().finish(&key, flight_id, &outcome);
            outcome
        });

        // A task that died never reached `finish`; drop its flight so the
        // next call fetches again.
        async move {
            handle.await.unwrap_or_else(|e| {
                warn!(category = %flight_key.0, lang = %flight_key.1, error = %e, "category fetch task died");
                if let Some(state) = registry.upgrade() {
                    state.lock().unregister(&flight_key, flight_id);
                }
                Err(CatalogError::Task(e.to_string()))
            })
        }
        .boxed()
        .shared()
    }

    /// Drops one entry and forgets any fetch outstanding for it.
    pub fn invalidate(&self, category_id: &str) {
        let mut state = self.state.lock();
        state.entries.remove(category_id);
        state.order.retain(|id| id != category_id);
        state.in_flight.retain(|(id, _), _| id != category_id);
    }

    pub fn invalidate_all(&self) {
        self.state.lock().clear();
    }

    /// Switches the active language. Cached payloads are language specific,
    /// so a change wipes every entry. Returns whether the language changed.
    pub fn set_language(&self, lang: Language) -> bool {
        let mut state = self.state.lock();
        if state.language == lang {
            return false;
        }
        state.clear();
        state.language = lang;
        debug!(%lang, "category cache wiped for language switch");
        true
    }
}
