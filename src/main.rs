mod app;
mod ui;

use crate::ui::draw;
use anyhow::Result;
use app::{App, Focus, InputMode};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use prompt_catalog::cache::TemplateList;
use prompt_catalog::search::Debouncer;
use prompt_catalog::{config, logging, ApiClient, Catalog, CatalogError, Category, Config, TemplateId};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::sync::Arc;
use std::{io, time::Duration};
use tokio::sync::mpsc;
use tracing::info;

enum AppEvent {
    Tick,
    Key(event::KeyEvent),
    CategoriesLoaded(Result<Vec<Category>, CatalogError>),
    TemplatesLoaded {
        category: String,
        result: Result<TemplateList, CatalogError>,
    },
    LanguageChanged(Result<Option<TemplateList>, CatalogError>),
    SearchDue(String),
    TemplateDeleted(Result<(), CatalogError>),
    Error(String),
}

type EventSender = mpsc::Sender<AppEvent>;

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    fn terminal_mut(&mut self) -> &mut Terminal<CrosstermBackend<io::Stdout>> {
        &mut self.terminal
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}

fn spawn_open(catalog: &Arc<Catalog>, tx: &EventSender) {
    let catalog = Arc::clone(catalog);
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = catalog.open().await;
        let _ = tx.send(AppEvent::CategoriesLoaded(result)).await;
    });
}

fn spawn_select(catalog: &Arc<Catalog>, tx: &EventSender, category: String) {
    let catalog = Arc::clone(catalog);
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = catalog.select_category(&category).await;
        let _ = tx.send(AppEvent::TemplatesLoaded { category, result }).await;
    });
}

fn spawn_language_toggle(catalog: &Arc<Catalog>, tx: &EventSender) {
    let catalog = Arc::clone(catalog);
    let tx = tx.clone();
    tokio::spawn(async move {
        let lang = catalog.language().other();
        let result = catalog.set_language(lang).await;
        let _ = tx.send(AppEvent::LanguageChanged(result)).await;
    });
}

fn spawn_delete(catalog: &Arc<Catalog>, tx: &EventSender, id: TemplateId) {
    let catalog = Arc::clone(catalog);
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = catalog.delete_user_template(&id).await;
        let _ = tx.send(AppEvent::TemplateDeleted(result)).await;
    });
}

fn schedule_search(debouncer: &mut Debouncer, tx: &EventSender, query: String) {
    let tx = tx.clone();
    debouncer.schedule(async move {
        let _ = tx.send(AppEvent::SearchDue(query)).await;
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    logging::init(config::project_dirs()?.cache_dir())?;
    info!(base_url = %config.base_url, lang = %config.default_language, "starting");

    let client = ApiClient::new(&config)?;
    let catalog = Arc::new(Catalog::new(Arc::new(client), config.default_language));

    let mut session = TerminalSession::new()?;
    let mut app = App::new(Arc::clone(&catalog), config.prompt_field.clone());
    let mut debouncer = Debouncer::new(config.search_debounce());
    let (tx, mut rx) = mpsc::channel(100);

    spawn_open(&catalog, &tx);

    // Event loop thread
    let tx_c = tx.clone();
    tokio::spawn(async move {
        loop {
            if event::poll(Duration::from_millis(100)).unwrap_or(false) {
                match event::read() {
                    Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                        let _ = tx_c.send(AppEvent::Key(key)).await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        let _ = tx_c.send(AppEvent::Error(err.to_string())).await;
                    }
                }
            }
            let _ = tx_c.send(AppEvent::Tick).await;
        }
    });

    'main_loop: loop {
        session.terminal_mut().draw(|f| draw(f, &mut app))?;

        let Some(ev) = rx.recv().await else {
            break;
        };
        match ev {
            AppEvent::Tick => {}
            AppEvent::Error(e) => {
                app.error = Some(e);
                app.is_loading = false;
            }
            AppEvent::CategoriesLoaded(Ok(categories)) => {
                app.is_loading = false;
                let first = categories.first().map(|c| c.id.clone());
                app.set_categories(categories);
                if app.catalog.cursor().active_category().is_none() {
                    if let Some(first) = first {
                        app.category_index = 1;
                        spawn_select(&catalog, &tx, first);
                    }
                }
            }
            AppEvent::CategoriesLoaded(Err(e)) => {
                app.is_loading = false;
                app.error = Some(format!("Failed to load categories: {e}"));
            }
            AppEvent::TemplatesLoaded { category, result } => match result {
                Ok(_) => {
                    let is_active = app.catalog.cursor().active_category() == Some(category.as_str());
                    if is_active {
                        app.refresh_list();
                    }
                }
                Err(e) => app.error = Some(e.to_string()),
            },
            AppEvent::LanguageChanged(result) => match result {
                Ok(_) => app.refresh_list(),
                Err(e) => app.error = Some(e.to_string()),
            },
            AppEvent::SearchDue(query) => {
                if query == app.search_query {
                    app.refresh_list();
                }
            }
            AppEvent::TemplateDeleted(result) => match result {
                Ok(()) => {
                    app.notification = Some("Template deleted.".to_string());
                    app.refresh_list();
                }
                Err(e) => app.error = Some(format!("Delete failed: {e}")),
            },
            AppEvent::Key(key) => match app.input_mode {
                InputMode::Editing => match key.code {
                    KeyCode::Char(c) => {
                        app.clear_messages();
                        app.search_query.push(c);
                        schedule_search(&mut debouncer, &tx, app.search_query.clone());
                    }
                    KeyCode::Backspace => {
                        app.clear_messages();
                        app.search_query.pop();
                        schedule_search(&mut debouncer, &tx, app.search_query.clone());
                    }
                    KeyCode::Esc | KeyCode::Enter => {
                        app.input_mode = InputMode::Normal;
                    }
                    KeyCode::Down => app.next(),
                    KeyCode::Up => app.previous(),
                    _ => {}
                },
                InputMode::Normal => match key.code {
                    KeyCode::Char('i') | KeyCode::Char('/') => {
                        app.clear_messages();
                        app.input_mode = InputMode::Editing;
                        app.focus = Focus::Templates;
                    }
                    KeyCode::Char('q') | KeyCode::Esc => {
                        break 'main_loop;
                    }
                    KeyCode::Tab => app.toggle_focus(),
                    KeyCode::Down | KeyCode::Char('j')
                        if key.modifiers.contains(KeyModifiers::ALT) =>
                    {
                        app.detail_scroll = app.detail_scroll.saturating_add(1);
                    }
                    KeyCode::Up | KeyCode::Char('k')
                        if key.modifiers.contains(KeyModifiers::ALT) =>
                    {
                        app.detail_scroll = app.detail_scroll.saturating_sub(1);
                    }
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Enter => match app.focus {
                        Focus::Categories => {
                            if let Some(id) = app.highlighted_category() {
                                app.clear_messages();
                                debouncer.cancel();
                                app.search_query.clear();
                                app.catalog.search("");
                                spawn_select(&catalog, &tx, id);
                                app.focus = Focus::Templates;
                            }
                        }
                        Focus::Templates => app.select_highlighted(),
                    },
                    KeyCode::Char('l') => {
                        app.clear_messages();
                        spawn_language_toggle(&catalog, &tx);
                    }
                    KeyCode::Char('t') => app.toggle_prompt_tab(),
                    KeyCode::Char('a') => app.apply_selected(),
                    KeyCode::Char('d') => {
                        app.clear_messages();
                        match app.catalog.active_template() {
                            Some(t) if t.is_user_authored() => spawn_delete(&catalog, &tx, t.id),
                            Some(_) => {
                                app.error = Some("Only your own templates can be deleted.".to_string());
                            }
                            None => app.error = Some("No template selected.".to_string()),
                        }
                    }
                    KeyCode::Char('r') => {
                        app.clear_messages();
                        app.is_loading = true;
                        spawn_open(&catalog, &tx);
                        if let Some(active) = app.catalog.cursor().active_category() {
                            spawn_select(&catalog, &tx, active.to_string());
                        }
                    }
                    _ => {}
                },
            },
        }
    }

    info!("exiting");
    Ok(())
}
