use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use tracing::{debug, info, warn};
use tui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{BarChart, Block, Borders, List, ListItem, ListState, Paragraph, Tabs},
    Frame, Terminal,
};

use crate::aggregate::{CountryChart, TopChart, TopCounts};
use crate::controller::{Controller, Recomputed};
use crate::error::DashResult;
use crate::presenter::{Controls, Presenter};

enum Event<I> {
    Input(I),
    Tick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NextCategory,
    PreviousCategory,
    CursorUp,
    CursorDown,
    ToggleAge,
    ClearAges,
    Quit,
}

pub fn action_for(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Right | KeyCode::Tab | KeyCode::Char('l') => Some(Action::NextCategory),
        KeyCode::Left | KeyCode::BackTab | KeyCode::Char('h') => Some(Action::PreviousCategory),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::CursorUp),
        KeyCode::Down | KeyCode::Char('j') => Some(Action::CursorDown),
        KeyCode::Char(' ') | KeyCode::Enter => Some(Action::ToggleAge),
        KeyCode::Char('c') => Some(Action::ClearAges),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

/// Last rendered controls and charts, drawn on every frame.
#[derive(Default)]
pub struct TerminalDashboard {
    controls: Option<Controls>,
    top_chart: Option<TopChart>,
    country_chart: Option<CountryChart>,
    age_cursor: usize,
    updated_at: String,
}

impl Presenter for TerminalDashboard {
    fn render_controls(&mut self, controls: &Controls) -> DashResult<()> {
        self.age_cursor = self
            .age_cursor
            .min(controls.age_options.len().saturating_sub(1));
        self.controls = Some(controls.clone());
        Ok(())
    }

    fn render_top_chart(&mut self, chart: &TopChart) -> DashResult<()> {
        self.top_chart = Some(chart.clone());
        Ok(())
    }

    fn render_country_chart(&mut self, chart: &CountryChart) -> DashResult<()> {
        self.country_chart = Some(chart.clone());
        Ok(())
    }
}

impl TerminalDashboard {
    fn move_cursor(&mut self, up: bool) {
        let len = self.controls.as_ref().map_or(0, |c| c.age_options.len());
        if len == 0 {
            return;
        }
        self.age_cursor = if up {
            (self.age_cursor + len - 1) % len
        } else {
            (self.age_cursor + 1) % len
        };
    }

    fn age_under_cursor(&self) -> Option<String> {
        self.controls
            .as_ref()
            .and_then(|c| c.age_options.get(self.age_cursor))
            .map(|o| o.value.clone())
    }

    /// Applies one key action. Returns false when the dashboard should close.
    pub fn handle(&mut self, controller: &mut Controller, action: Action) -> DashResult<bool> {
        let recomputed = match action {
            Action::Quit => return Ok(false),
            Action::CursorUp => {
                self.move_cursor(true);
                return Ok(true);
            }
            Action::CursorDown => {
                self.move_cursor(false);
                return Ok(true);
            }
            Action::NextCategory => controller.next_category(),
            Action::PreviousCategory => controller.previous_category(),
            Action::ClearAges => controller.clear_ages(),
            Action::ToggleAge => match self.age_under_cursor() {
                Some(raw) => controller.toggle_age(&raw),
                None => Recomputed::default(),
            },
        };
        debug!(?action, outputs = ?recomputed.outputs(), "handled input");
        controller.publish(self, &recomputed)?;
        if !recomputed.is_empty() {
            self.updated_at = controller.last_recomputed().format("%H:%M:%S").to_string();
        }
        Ok(true)
    }

    fn draw<B: Backend>(&self, rect: &mut Frame<B>) {
        let size = rect.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints(
                [
                    Constraint::Length(3),
                    Constraint::Percentage(55),
                    Constraint::Min(8),
                    Constraint::Length(3),
                ]
                .as_ref(),
            )
            .split(size);

        if let Some(controls) = &self.controls {
            self.draw_tabs(rect, controls, chunks[0]);
        }

        let middle = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(28), Constraint::Min(20)].as_ref())
            .split(chunks[1]);
        if let Some(controls) = &self.controls {
            self.draw_age_checklist(rect, controls, middle[0]);
        }
        if let Some(chart) = &self.top_chart {
            draw_top_chart(rect, chart, middle[1]);
        }
        if let Some(chart) = &self.country_chart {
            draw_country_chart(rect, chart, chunks[2]);
        }
        self.draw_status(rect, chunks[3]);
    }

    fn draw_tabs<B: Backend>(&self, rect: &mut Frame<B>, controls: &Controls, area: Rect) {
        let titles = controls
            .categories
            .iter()
            .map(|c| Spans::from(Span::raw(c.name().to_string())))
            .collect();
        let tabs = Tabs::new(titles)
            .select(controls.selected_tab())
            .block(Block::default().title("Category").borders(Borders::ALL))
            .style(Style::default().fg(Color::Cyan))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .divider(Span::raw("|"));
        rect.render_widget(tabs, area);
    }

    fn draw_age_checklist<B: Backend>(&self, rect: &mut Frame<B>, controls: &Controls, area: Rect) {
        let items: Vec<ListItem> = controls
            .age_options
            .iter()
            .map(|option| {
                let mark = if controls.is_age_selected(option) { "[x]" } else { "[ ]" };
                ListItem::new(Spans::from(vec![
                    Span::styled(mark, Style::default().fg(Color::Green)),
                    Span::raw(format!(" {}", option.label)),
                ]))
            })
            .collect();
        let title = if controls.selected_ages.is_empty() {
            "Age Filter (all)".to_string()
        } else {
            format!("Age Filter ({})", controls.selected_ages.len())
        };
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
        let mut state = ListState::default();
        if !controls.age_options.is_empty() {
            state.select(Some(self.age_cursor));
        }
        rect.render_stateful_widget(list, area, &mut state);
    }

    fn draw_status<B: Backend>(&self, rect: &mut Frame<B>, area: Rect) {
        let respondents = self.country_chart.as_ref().map_or(0, |c| c.total());
        let status = Paragraph::new(Spans::from(vec![
            Span::styled(
                format!("Respondents: {}  Updated: {}  ", respondents, self.updated_at),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "←/→ category  ↑/↓ age  space toggle  c clear  q quit",
                Style::default().fg(Color::DarkGray),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
        rect.render_widget(status, area);
    }
}

/// One line per entry, largest first. With `mirrored` the bar grows to the
/// left so two panels meet at a shared axis.
pub fn bar_lines(series: &TopCounts, max: usize, width: usize, mirrored: bool) -> Vec<String> {
    series
        .iter()
        .rev()
        .map(|entry| {
            let len = if max == 0 {
                0
            } else {
                (entry.count * width / max).max(1)
            };
            let bar = "█".repeat(len);
            if mirrored {
                format!("{} {} {}", entry.label, entry.count, bar)
            } else {
                format!("{} {} {}", bar, entry.count, entry.label)
            }
        })
        .collect()
}

fn draw_top_chart<B: Backend>(rect: &mut Frame<B>, chart: &TopChart, area: Rect) {
    let block = Block::default().title(chart.title.clone()).borders(Borders::ALL);
    let inner = block.inner(area);
    rect.render_widget(block, area);
    if chart.is_empty() {
        let note = Paragraph::new(format!("No {} answers for this selection", chart.category))
            .alignment(Alignment::Center);
        rect.render_widget(note, inner);
        return;
    }

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(inner);

    // one scale across both series
    let max = chart
        .have_worked_with
        .iter()
        .chain(chart.want_to_work_with.iter())
        .map(|c| c.count)
        .max()
        .unwrap_or(0);
    let panels = [
        (&chart.have_worked_with, "Have Worked With", true, Color::Blue, halves[0]),
        (&chart.want_to_work_with, "Want to Work With", false, Color::Magenta, halves[1]),
    ];
    for (series, title, mirrored, color, area) in panels {
        let label_width = series.iter().map(|c| c.label.chars().count() + 8).max().unwrap_or(0);
        let width = (area.width as usize).saturating_sub(label_width + 2);
        let lines: Vec<Spans> = bar_lines(series, max, width, mirrored)
            .into_iter()
            .map(|l| Spans::from(Span::styled(l, Style::default().fg(color))))
            .collect();
        let alignment = if mirrored { Alignment::Right } else { Alignment::Left };
        let panel = Paragraph::new(lines)
            .block(Block::default().title(title).borders(Borders::TOP))
            .alignment(alignment);
        rect.render_widget(panel, area);
    }
}

fn draw_country_chart<B: Backend>(rect: &mut Frame<B>, chart: &CountryChart, area: Rect) {
    const BAR_WIDTH: u16 = 8;
    let fits = (area.width.saturating_sub(2) / (BAR_WIDTH + 1)) as usize;
    let ranked = chart.ranked();
    let data: Vec<(&str, u64)> = ranked
        .iter()
        .take(fits)
        .map(|(country, count)| (*country, *count as u64))
        .collect();
    let title = format!("{} ({} countries)", chart.title, ranked.len());
    let bars = BarChart::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .data(&data)
        .bar_width(BAR_WIDTH)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Yellow))
        .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));
    rect.render_widget(bars, area);
}

/// A failed interaction only costs that interaction; fatal errors close the
/// dashboard.
fn keep_running(result: DashResult<bool>) -> DashResult<bool> {
    match result {
        Err(e) if !e.is_fatal() => {
            warn!(error = %e, "input ignored");
            Ok(true)
        }
        other => other,
    }
}

/// Runs the interactive dashboard until the user quits.
pub fn run(controller: &mut Controller, tick_rate: Duration) -> DashResult<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = event_loop(&mut terminal, controller, tick_rate);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    controller: &mut Controller,
    tick_rate: Duration,
) -> DashResult<()> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut last_tick = Instant::now();
        loop {
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_secs(0));

            match event::poll(timeout) {
                Ok(true) => {
                    if let Ok(CEvent::Key(key)) = event::read() {
                        if key.kind == KeyEventKind::Press && tx.send(Event::Input(key)).is_err() {
                            return;
                        }
                    }
                }
                Ok(false) => {}
                Err(_) => return,
            }

            if last_tick.elapsed() >= tick_rate {
                if tx.send(Event::Tick).is_err() {
                    return;
                }
                last_tick = Instant::now();
            }
        }
    });

    let mut dashboard = TerminalDashboard::default();
    controller.publish(&mut dashboard, &Recomputed::all())?;
    dashboard.updated_at = controller.last_recomputed().format("%H:%M:%S").to_string();
    info!("dashboard started");

    loop {
        terminal.draw(|rect| dashboard.draw(rect))?;

        let event = match rx.recv() {
            Ok(event) => event,
            Err(_) => break,
        };
        match event {
            Event::Input(key) => {
                if let Some(action) = action_for(key.code) {
                    if !keep_running(dashboard.handle(controller, action))? {
                        break;
                    }
                }
            }
            Event::Tick => {}
        }
    }
    info!("dashboard closed");
    Ok(())
}
