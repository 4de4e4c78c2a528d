use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use fund_catalog::{Fund, Strategy};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const PAGE_SIZE: usize = 20;

pub struct App {
    /// All funds, ordered by name
    pub funds: Vec<Fund>,
    pub filtered_funds: Vec<Fund>,
    pub state: TableState,
    pub filter: Option<Strategy>,
    pub show_detail: bool,
}

impl App {
    pub fn new(funds: Vec<Fund>) -> Self {
        let mut state = TableState::default();
        if !funds.is_empty() {
            state.select(Some(0));
        }

        let filtered_funds = funds.clone();

        Self {
            funds,
            filtered_funds,
            state,
            filter: None,
            show_detail: false,
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_fund(&self) -> Option<&Fund> {
        self.state.selected().and_then(|i| self.filtered_funds.get(i))
    }

    pub fn apply_filter(&mut self, filter: Option<Strategy>) {
        self.filter = filter;

        self.filtered_funds = match filter {
            None => self.funds.clone(),
            Some(strategy) => self
                .funds
                .iter()
                .filter(|fund| fund.strategy == strategy)
                .cloned()
                .collect(),
        };

        // Reset selection to first item
        if !self.filtered_funds.is_empty() {
            self.state.select(Some(0));
        } else {
            self.state.select(None);
        }
    }

    pub fn cycle_filter(&mut self) {
        self.apply_filter(Strategy::cycle(self.filter));
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(None);
    }

    /// Total AUM of the visible funds, summed in `i128`; None when nothing reports one
    pub fn total_aum(&self) -> Option<i128> {
        self.filtered_funds
            .iter()
            .filter_map(|fund| fund.aum)
            .fold(None, |total, aum| Some(total.unwrap_or(0) + i128::from(aum)))
    }

    pub fn next(&mut self) {
        let len = self.filtered_funds.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.filtered_funds.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.filtered_funds.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + PAGE_SIZE).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.filtered_funds.is_empty() {
            return;
        }
        let i = self
            .state
            .selected()
            .map(|i| i.saturating_sub(PAGE_SIZE))
            .unwrap_or(0);
        self.state.select(Some(i));
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

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Char('f') => app.cycle_filter(),
                KeyCode::Char('c') | KeyCode::Char('0') => app.clear_filter(),
                KeyCode::Char('1') => app.apply_filter(Some(Strategy::LongShortEquity)),
                KeyCode::Char('2') => app.apply_filter(Some(Strategy::GlobalMacro)),
                KeyCode::Char('3') => app.apply_filter(Some(Strategy::Arbitrage)),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => {
                    if !app.filtered_funds.is_empty() {
                        app.state.select(Some(0));
                    }
                }
                KeyCode::End => {
                    if !app.filtered_funds.is_empty() {
                        app.state.select(Some(app.filtered_funds.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Fund table
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        "Funds",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];

    for (i, strategy) in Strategy::ALL.iter().enumerate() {
        spans.push(Span::raw(" │ "));
        let style = if app.filter == Some(*strategy) {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{} {}", i + 1, strategy), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Count: {}", app.filtered_funds.len()),
        Style::default().fg(Color::White),
    ));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Total AUM: {}", format_aum(app.total_aum())),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Name", "Strategy", "AUM (USD)", "Inception"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.filtered_funds.iter().map(|fund| {
        let color = match fund.strategy {
            Strategy::LongShortEquity => Color::Cyan,
            Strategy::GlobalMacro => Color::Magenta,
            Strategy::Arbitrage => Color::Green,
        };

        Row::new(vec![
            Cell::from(truncate(&fund.name, 40)),
            Cell::from(fund.strategy.as_str()).style(Style::default().fg(color)),
            Cell::from(format_aum(fund.aum.map(i128::from))),
            Cell::from(format_date(fund)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(42),
            Constraint::Length(20),
            Constraint::Length(18),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Funds "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let label = Style::default().fg(Color::Yellow);

    let lines = match app.selected_fund() {
        Some(fund) => vec![
            Line::from(vec![Span::styled("ID:        ", label), Span::raw(fund.id.to_string())]),
            Line::from(vec![Span::styled("Name:      ", label), Span::raw(fund.name.clone())]),
            Line::from(vec![
                Span::styled("Strategy:  ", label),
                Span::raw(fund.strategy.as_str()),
            ]),
            Line::from(vec![
                Span::styled("AUM:       ", label),
                Span::raw(format_aum(fund.aum.map(i128::from))),
            ]),
            Line::from(vec![Span::styled("Inception: ", label), Span::raw(format_date(fund))]),
        ],
        None => vec![Line::from("No fund selected")],
    };

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Detail "),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let key = Style::default().fg(Color::Yellow);

    let mut spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, app.filtered_funds.len()),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(strategy) = app.filter {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            format!("Filter: {}", strategy),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::raw(" ("));
        spans.push(Span::styled("c", key));
        spans.push(Span::raw(" clear)"));
    }

    spans.push(Span::raw(" | "));
    spans.push(Span::styled("1-3/f", key));
    spans.push(Span::raw(" Strategy | "));
    spans.push(Span::styled("Enter", key));
    spans.push(Span::raw(" Details | "));
    spans.push(Span::styled("↑/↓", key));
    spans.push(Span::raw(" Nav | "));
    spans.push(Span::styled("q", key));
    spans.push(Span::raw(" Quit"));

    let status = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}

/// 355000000 → "355,000,000"; missing values render as "-"
fn format_aum(aum: Option<i128>) -> String {
    let Some(aum) = aum else {
        return "-".to_string();
    };

    let digits = aum.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if aum < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn format_date(fund: &Fund) -> String {
    fund.inception_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
