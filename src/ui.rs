// 🖥️ Intake Review TUI
// Browse an intake plan before applying it: what goes where, what was
// rejected and why, which destinations collide.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ecodata_filing::{IntakeOutcome, IntakePlan, IntakeRecord, IntakeSummary, ProjectEntry};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::collections::HashMap;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Projects,
    Inbox,
    Views,
}

/// Which records the inbox table shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    All,
    Ready,
    AlreadyPlaced,
    Collisions,
    Rejected,
}

impl FilterType {
    pub fn matches(&self, outcome: &IntakeOutcome) -> bool {
        match self {
            FilterType::All => true,
            FilterType::Ready => matches!(outcome, IntakeOutcome::Ready { .. }),
            FilterType::AlreadyPlaced => matches!(outcome, IntakeOutcome::AlreadyPlaced { .. }),
            FilterType::Collisions => matches!(outcome, IntakeOutcome::Collision { .. }),
            FilterType::Rejected => matches!(outcome, IntakeOutcome::Rejected { .. }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterType::All => "ALL",
            FilterType::Ready => "READY",
            FilterType::AlreadyPlaced => "ALREADY PLACED",
            FilterType::Collisions => "COLLISIONS",
            FilterType::Rejected => "REJECTED",
        }
    }
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Projects => Page::Inbox,
            Page::Inbox => Page::Views,
            Page::Views => Page::Projects,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Projects => Page::Views,
            Page::Inbox => Page::Projects,
            Page::Views => Page::Inbox,
        }
    }
}

pub struct App {
    pub plan: IntakePlan,
    pub projects: Vec<ProjectEntry>,
    /// Indices into `plan.records` passing the active filter
    pub visible: Vec<usize>,
    pub state: TableState,
    pub projects_state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub filter: FilterType,
    summary: IntakeSummary,
}

impl App {
    pub fn new(plan: IntakePlan, projects: Vec<ProjectEntry>) -> Self {
        let summary = plan.summary();
        let mut projects_state = TableState::default();
        if !projects.is_empty() {
            projects_state.select(Some(0));
        }

        let mut app = Self {
            plan,
            projects,
            visible: Vec::new(),
            state: TableState::default(),
            projects_state,
            current_page: Page::Inbox,
            show_detail: false,
            filter: FilterType::All,
            summary,
        };
        app.apply_filter(FilterType::All);
        app
    }

    pub fn summary(&self) -> &IntakeSummary {
        &self.summary
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_record(&self) -> Option<&IntakeRecord> {
        self.state
            .selected()
            .and_then(|i| self.visible.get(i))
            .and_then(|&index| self.plan.records.get(index))
    }

    pub fn apply_filter(&mut self, filter: FilterType) {
        self.filter = filter;
        self.visible = self
            .plan
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(&r.outcome))
            .map(|(i, _)| i)
            .collect();

        // Reset selection to first item
        if self.visible.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(FilterType::All);
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    /// (project, files routed to it in this plan)
    pub fn project_summary(&self) -> Vec<(&ProjectEntry, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for record in &self.plan.records {
            if let Some(code) = record.project_code.as_deref() {
                *counts.entry(code).or_insert(0) += 1;
            }
        }

        self.projects
            .iter()
            .map(|p| (p, counts.get(p.code.as_str()).copied().unwrap_or(0)))
            .collect()
    }

    fn active_len(&self) -> usize {
        match self.current_page {
            Page::Projects => self.projects.len(),
            _ => self.visible.len(),
        }
    }

    fn active_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Projects => &mut self.projects_state,
            _ => &mut self.state,
        }
    }

    pub fn next(&mut self) {
        let len = self.active_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.active_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.active_len();
        if len == 0 {
            return;
        }
        let state = self.active_state();
        let i = state.selected().map(|i| (i + 20).min(len - 1)).unwrap_or(0);
        state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.active_len() == 0 {
            return;
        }
        let state = self.active_state();
        let i = state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        state.select(Some(i));
    }

    pub fn first(&mut self) {
        if self.active_len() == 0 {
            return;
        }
        self.active_state().select(Some(0));
    }

    pub fn last(&mut self) {
        let len = self.active_len();
        if len == 0 {
            return;
        }
        self.active_state().select(Some(len - 1));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('c') => {
                    app.clear_filter();
                    app.current_page = Page::Inbox;
                }
                KeyCode::Char(digit @ '1'..='5') if app.current_page == Page::Views => {
                    let filter = match digit {
                        '1' => FilterType::All,
                        '2' => FilterType::Ready,
                        '3' => FilterType::AlreadyPlaced,
                        '4' => FilterType::Collisions,
                        _ => FilterType::Rejected,
                    };
                    app.apply_filter(filter);
                    app.current_page = Page::Inbox;
                }
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Inbox {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_inbox(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Projects => render_projects(f, chunks[1], app),
            Page::Inbox => render_inbox(f, chunks[1], app),
            Page::Views => render_views(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn outcome_color(outcome: &IntakeOutcome) -> Color {
    match outcome {
        IntakeOutcome::Ready { .. } => Color::Green,
        IntakeOutcome::AlreadyPlaced { .. } => Color::DarkGray,
        IntakeOutcome::Collision { .. } => Color::Yellow,
        IntakeOutcome::Rejected { .. } => Color::Red,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [(Page::Projects, "Projects"), (Page::Inbox, "Inbox"), (Page::Views, "Views")];

    let mut spans = vec![];
    for (i, (page, name)) in pages.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(*name, style));
    }

    let summary = app.summary();
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(format!("Files: {}", summary.total), Style::default().fg(Color::White)));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(format!("✓ {}", summary.ready), Style::default().fg(Color::Green)));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(format!("⚠ {}", summary.collisions), Style::default().fg(Color::Yellow)));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(format!("✗ {}", summary.rejected), Style::default().fg(Color::Red)));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_inbox(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .visible
        .iter()
        .filter_map(|&i| app.plan.records.get(i))
        .map(|record| {
            let color = outcome_color(&record.outcome);
            let target = match &record.outcome {
                IntakeOutcome::Rejected { error } => error.kind().to_string(),
                other => other.destination().map(|d| d.to_string()).unwrap_or_default(),
            };
            Row::new(vec![
                Cell::from(truncate(&record.file.relative_path, 40)),
                Cell::from(record.outcome.label()).style(Style::default().fg(color)),
                Cell::from(record.project_code.clone().unwrap_or_default()),
                Cell::from(truncate(&target, 60)).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let title = format!(" Inbox - {} ", app.filter.name());
    let table = Table::new(
        rows,
        [
            Constraint::Length(42),
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Min(20),
        ],
    )
    .header(header_row(&["Inbox file", "Status", "Project", "Destination / Error"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_projects(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .project_summary()
        .into_iter()
        .map(|(project, count)| {
            let status_color = if project.is_archived() { Color::DarkGray } else { Color::Green };
            Row::new(vec![
                Cell::from(project.code.to_string()),
                Cell::from(project.name.to_string()),
                Cell::from(project.status.as_str()).style(Style::default().fg(status_color)),
                Cell::from(format!("{}", count)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(40),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["Code", "Name", "Status", "Inbox files"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Projects - metadata/projects.csv "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.projects_state);
}

fn render_views(f: &mut Frame, area: Rect, app: &App) {
    let summary = app.summary();
    let entries = [
        ('1', FilterType::All, summary.total, Color::White),
        ('2', FilterType::Ready, summary.ready, Color::Green),
        ('3', FilterType::AlreadyPlaced, summary.already_placed, Color::DarkGray),
        ('4', FilterType::Collisions, summary.collisions, Color::Yellow),
        ('5', FilterType::Rejected, summary.rejected, Color::Red),
    ];

    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Quick Views & Filters",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    for (key, filter, count, color) in entries {
        let marker = if app.filter == filter {
            Span::styled("→", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
        } else {
            Span::raw(" ")
        };
        content.push(Line::from(vec![
            Span::raw("   "),
            marker,
            Span::styled(key.to_string(), Style::default().fg(Color::Yellow)),
            Span::raw(format!(". {:<18}", filter.name())),
            Span::styled(format!("{:>5} files", count), Style::default().fg(color)),
        ]));
    }

    if !summary.errors_by_kind.is_empty() {
        content.push(Line::from(""));
        content.push(Line::from(Span::styled(
            "  Rejections by kind",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        for (kind, count) in &summary.errors_by_kind {
            content.push(Line::from(vec![
                Span::raw(format!("     {:<22}", kind)),
                Span::styled(format!("{:>5}", count), Style::default().fg(Color::Red)),
            ]));
        }
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Hint: press 1-5 to filter, c to clear",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Views "),
    );

    f.render_widget(paragraph, area);
}

fn detail_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {}: ", label), Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" File Details ");

    let Some(record) = app.selected_record() else {
        f.render_widget(Paragraph::new("No file selected").block(block), area);
        return;
    };

    let color = outcome_color(&record.outcome);
    let mut content = vec![
        Line::from(""),
        detail_line("Inbox path", record.file.relative_path.clone(), Color::White),
        detail_line("Filename", record.file.filename.clone(), Color::White),
        detail_line("Size", format!("{} bytes", record.file.size_bytes), Color::White),
        detail_line("Status", record.outcome.label().to_string(), color),
        Line::from(""),
    ];

    match &record.outcome {
        IntakeOutcome::Rejected { error } => {
            content.push(detail_line("Error kind", error.kind().to_string(), Color::Red));
            content.push(detail_line("Field", error.field().to_string(), Color::Red));
            if let Some(position) = error.position() {
                content.push(detail_line("Position", format!("byte {}", position), Color::Red));
            }
            content.push(Line::from(""));
            content.push(Line::from(Span::styled(
                format!("  {}", wrap_text(&error.detail(), 35)),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        IntakeOutcome::Collision { destination, reason } => {
            content.push(detail_line("Destination", destination.to_string(), color));
            content.push(detail_line("Reason", reason.clone(), color));
        }
        IntakeOutcome::Ready { destination } | IntakeOutcome::AlreadyPlaced { destination } => {
            content.push(detail_line("Destination", destination.to_string(), color));
        }
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (selected, total) = match app.current_page {
        Page::Projects => (app.projects_state.selected().map(|i| i + 1).unwrap_or(0), app.projects.len()),
        _ => (app.state.selected().map(|i| i + 1).unwrap_or(0), app.visible.len()),
    };

    let mut spans = vec![Span::styled(format!(" Row: {}/{} ", selected, total), Style::default().fg(Color::Cyan))];

    if app.filter != FilterType::All {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(format!("Filter: {}", app.filter.name()), Style::default().fg(Color::Green)));
        spans.push(Span::raw(" ("));
        spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(" clear)"));
    }

    for (key, label, color) in [
        ("Enter", " Details", Color::Yellow),
        ("Tab", " Page", Color::Yellow),
        ("↑/↓", " Nav", Color::Yellow),
        ("PgUp/PgDn", " Fast", Color::Yellow),
        ("q", " Quit", Color::Red),
    ] {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(key, Style::default().fg(color)));
        spans.push(Span::raw(label));
    }

    let status_bar = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::White)));

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecodata_filing::{plan_intake, InMemoryRegistry, InboxFile, ProjectStore, ValidationPolicy, Validator};
    use std::path::{Path, PathBuf};

    fn inbox_file(name: &str) -> InboxFile {
        InboxFile {
            relative_path: name.to_string(),
            path: PathBuf::from(name),
            filename: name.to_string(),
            extension: String::new(),
            size_bytes: 0,
        }
    }

    fn app() -> App {
        let store = InMemoryRegistry::new();
        store.register("WAT01", "river-sampling-2024").unwrap();
        store.register("CHM03", "groundwater-analysis").unwrap();
        let validator = Validator::new(ValidationPolicy {
            reference_year: Some(2026),
            ..ValidationPolicy::default()
        });

        let files = vec![
            inbox_file("2024_WAT01_DATA_a.csv"),
            inbox_file("badname.xlsx"),
            inbox_file("2024_WAT01_DATA_b.csv"),
        ];
        // A root that doesn't exist: every valid file is Ready
        let plan = plan_intake(Path::new("/nonexistent-ecodata-root"), files, &store, &validator);
        App::new(plan, store.list())
    }

    #[test]
    fn test_filter_rejected() {
        let mut app = app();
        assert_eq!(app.visible.len(), 3);

        app.apply_filter(FilterType::Rejected);
        assert_eq!(app.visible.len(), 1);
        assert_eq!(app.selected_record().unwrap().file.filename, "badname.xlsx");

        app.clear_filter();
        assert_eq!(app.visible.len(), 3);
    }

    #[test]
    fn test_empty_filter_clears_selection() {
        let mut app = app();
        app.apply_filter(FilterType::Collisions);
        assert!(app.visible.is_empty());
        assert!(app.selected_record().is_none());
        app.next();
        app.page_up();
        app.first();
        app.last();
        assert!(app.state.selected().is_none());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        app.previous();
        assert_eq!(app.state.selected(), Some(2));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(2));
        app.page_up();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_project_summary_counts_files() {
        let app = app();
        let summary: Vec<(String, usize)> = app
            .project_summary()
            .into_iter()
            .map(|(p, n)| (p.code.to_string(), n))
            .collect();
        assert_eq!(summary, vec![("CHM03".to_string(), 0), ("WAT01".to_string(), 2)]);
    }

    #[test]
    fn test_page_cycle() {
        let mut app = app();
        assert_eq!(app.current_page, Page::Inbox);
        app.next_page();
        assert_eq!(app.current_page, Page::Views);
        app.next_page();
        assert_eq!(app.current_page, Page::Projects);
        app.previous_page();
        assert_eq!(app.current_page, Page::Views);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ååååååååååå", 6), "ååå...");
    }
}
