use ratatui::{
    layout::Alignment,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, InputMode};
use prompt_catalog::Language;

/// Main entry point for drawing the TUI. Dispatches to individual pane drawers.
pub fn draw(f: &mut Frame, app: &mut App) {
    let vertical_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Header
                Constraint::Min(10),   // Categories | Templates | Detail
                Constraint::Length(3), // Search
                Constraint::Length(6), // Prompt field
                Constraint::Length(4), // Status/Shortcuts
            ]
            .as_ref(),
        )
        .split(f.area());

    let lang_label = match app.catalog.language() {
        Language::Zh => "中文",
        Language::En => "English",
    };
    let header = Paragraph::new(format!(
        "Prompt Template Catalog  ·  {} categories  ·  {}",
        app.categories.len(),
        lang_label
    ))
    .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    )
    .alignment(Alignment::Center);
    f.render_widget(header, vertical_chunks[0]);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(25),
                Constraint::Percentage(30),
                Constraint::Percentage(45),
            ]
            .as_ref(),
        )
        .split(vertical_chunks[1]);

    draw_category_pane(f, app, main_chunks[0]);
    draw_template_pane(f, app, main_chunks[1]);
    draw_detail_pane(f, app, main_chunks[2]);
    draw_search_pane(f, app, vertical_chunks[2]);
    draw_prompt_pane(f, app, vertical_chunks[3]);
    draw_status_pane(f, app, vertical_chunks[4]);
}

fn pane_border(app: &App, pane: Focus) -> Style {
    if app.focus == pane && app.input_mode == InputMode::Normal {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn highlight_style() -> Style {
    Style::default()
        .bg(Color::Blue)
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

/// Renders the category list, with "My Templates" pinned on top.
fn draw_category_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let active = app.catalog.cursor().active_category().map(str::to_string);

    let items: Vec<ListItem> = if app.is_loading && app.categories.is_empty() {
        vec![ListItem::new("Loading categories...")
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))]
    } else {
        (0..app.category_count())
            .map(|i| {
                let label = app.category_label(i);
                let is_active = active.is_some() && app.category_id_at(i) == active;
                let style = if is_active {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(label).style(style)
            })
            .collect()
    };

    let mut state = ListState::default();
    state.select(Some(app.category_index));

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Categories ")
                .border_style(pane_border(app, Focus::Categories)),
        )
        .highlight_style(highlight_style())
        .highlight_symbol("▶ ");

    f.render_stateful_widget(list, area, &mut state);
}

/// Renders the templates of the active category or the current search results.
fn draw_template_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let loading = app
        .catalog
        .cursor()
        .active_category()
        .is_some_and(|id| app.catalog.is_loading(id));

    let items: Vec<ListItem> = if loading && app.templates.is_empty() {
        vec![ListItem::new("Fetching templates...")
            .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC))]
    } else if app.templates.is_empty() {
        let hint = if app.search_query.trim().is_empty() {
            "← Select a category."
        } else {
            "No results in loaded categories."
        };
        vec![ListItem::new(hint).style(Style::default().fg(Color::Yellow))]
    } else {
        app.templates
            .iter()
            .map(|t| {
                let marker = if t.is_user_authored() { "★ " } else { "" };
                ListItem::new(format!("{}{}", marker, t.title))
            })
            .collect()
    };

    let mut state = ListState::default();
    if app.templates.is_empty() {
        state.select(None);
    } else {
        state.select(Some(app.template_index));
    }

    let title = if app.catalog.search_results().is_some() {
        format!(" Results ({}) ", app.templates.len())
    } else {
        " Templates ".to_string()
    };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(pane_border(app, Focus::Templates)),
        )
        .highlight_style(highlight_style())
        .highlight_symbol("▶ ");

    f.render_stateful_widget(list, area, &mut state);
}

/// Renders the selected template's details and its prompt in the active tab language.
fn draw_detail_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let title = format!(" Detail [{}] ", app.catalog.prompt_tab());
    let detail = Paragraph::new(app.get_detail())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(
                    title,
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ))
                .border_style(Style::default().fg(Color::Yellow)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));

    f.render_widget(detail, area);
}

/// Renders the search input field.
fn draw_search_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let input_style = if let InputMode::Editing = app.input_mode {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let title = if let InputMode::Editing = app.input_mode {
        Span::styled(" Search loaded categories (Typing...) ", Style::default().fg(Color::Cyan))
    } else {
        Span::styled(
            " Search (Press '/' or 'i' to type) ",
            Style::default().fg(Color::DarkGray),
        )
    };

    let input = Paragraph::new(app.search_query.as_str())
        .style(input_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(input_style),
        );
    f.render_widget(input, area);

    if let InputMode::Editing = app.input_mode {
        let typed = app.search_query.chars().count() as u16;
        let cursor_x = area.x.saturating_add(1).saturating_add(typed);
        let max_x = area.x.saturating_add(area.width.saturating_sub(1));
        let cursor_x = cursor_x.min(max_x);
        f.set_cursor_position((cursor_x, area.y + 1));
    }
}

/// Renders the host text field that applied templates are appended to.
fn draw_prompt_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let content_height = area.height.saturating_sub(2) as usize;
    let lines: Vec<&str> = app.node.value.lines().collect();
    let scroll = lines.len().saturating_sub(content_height) as u16;

    let prompt = Paragraph::new(app.node.value.as_str())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Field: {} ", app.node.field))
                .border_style(Style::default().fg(Color::Green)),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(prompt, area);
}

/// Renders the bottom status bar with messages and key shortcuts.
fn draw_status_pane(f: &mut Frame, app: &mut App, area: Rect) {
    let mut status_lines = Vec::new();

    if let Some(msg) = &app.notification {
        status_lines.push(Line::from(vec![
            Span::styled(
                " SUCCESS ",
                Style::default()
                    .bg(Color::Green)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(msg, Style::default().fg(Color::LightGreen)),
        ]));
    } else if let Some(err) = &app.error {
        status_lines.push(Line::from(vec![
            Span::styled(
                " ERROR ",
                Style::default()
                    .bg(Color::Red)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(err, Style::default().fg(Color::LightRed)),
        ]));
    } else {
        status_lines.push(Line::from(Span::styled(
            " Ready ",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let shortcuts = [
        ("TAB", "Pane"),
        ("ENTER", "Open"),
        ("/", "Search"),
        ("L", "Language"),
        ("T", "Prompt Tab"),
        ("A", "Apply"),
        ("D", "Delete Mine"),
        ("R", "Reload"),
        ("Q", "Quit"),
    ];

    let mut shortcut_spans = Vec::new();
    for (i, (key, desc)) in shortcuts.iter().enumerate() {
        if i > 0 {
            shortcut_spans.push(Span::raw("  "));
        }
        shortcut_spans.push(Span::styled(
            format!(" {} ", key),
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ));
        shortcut_spans.push(Span::raw(format!(" {}", desc)));
    }
    status_lines.push(Line::from(shortcut_spans));

    let status = Paragraph::new(status_lines)
        .block(Block::default().borders(Borders::ALL).title(" Info & Controls "));
    f.render_widget(status, area);
}
