use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::MetricKind;
use crate::sampler::{Producer, SampleBatch, SimulatedSource};
use crate::ui::app::LiveState;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Sparkline};
use ratatui::Terminal;
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;

const COLOR_THROUGHPUT: Color = Color::Blue;
const COLOR_LATENCY: Color = Color::Green;
const COLOR_ERRORS: Color = Color::Red;
const COLOR_MUTED: Color = Color::DarkGray;
const COLOR_HEADER: Color = Color::White;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn run_tui(cfg: &AppConfig) -> Result<(), AppError> {
    let state = LiveState::new(cfg.capacity()?, cfg.sample_interval());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let loop_result = run_loop(&mut terminal, state).await;

    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    loop_result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut state: LiveState,
) -> Result<(), AppError> {
    let (tx, mut rx) = mpsc::channel::<SampleBatch>(32);
    let mut producer = Some(start_producer(&state, tx.clone()));

    while state.running {
        while let Ok(batch) = rx.try_recv() {
            state.apply(&batch);
        }
        if producer.as_ref().is_some_and(Producer::is_finished) {
            producer = None;
            state.paused = true;
            state.status = "producer stopped, press r to restart".into();
        }

        terminal.draw(|f| render(f, &state))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => state.running = false,
                    KeyCode::Char('p') => {
                        if let Some(running) = producer.take() {
                            running.stop().await;
                            state.paused = true;
                            state.status = "paused".into();
                        }
                    }
                    KeyCode::Char('r') => {
                        if producer.is_none() {
                            producer = Some(start_producer(&state, tx.clone()));
                            state.paused = false;
                            state.status = "resuming...".into();
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    if let Some(running) = producer.take() {
        running.stop().await;
    }
    Ok(())
}

fn start_producer(state: &LiveState, tx: mpsc::Sender<SampleBatch>) -> Producer {
    Producer::start(SimulatedSource::new(), state.interval, tx)
}

fn render(f: &mut ratatui::Frame, state: &LiveState) {
    let size = f.area();

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(6),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(size);

    let last = state
        .last_sample
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".into());
    let header = Paragraph::new(format!(
        " billing-dash  ·  {}  ·  every {} ms  ·  last sample {} ",
        state.status,
        state.interval.as_millis(),
        last
    ))
    .block(Block::default().borders(Borders::ALL).title(" Real-Time System Metrics "))
    .style(Style::default().fg(COLOR_HEADER));
    f.render_widget(header, root[0]);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(root[1]);
    render_card(f, cards[0], state, MetricKind::Throughput, " Current Throughput ", COLOR_THROUGHPUT);
    render_card(f, cards[1], state, MetricKind::Latency, " P95 Latency ", COLOR_LATENCY);
    render_card(f, cards[2], state, MetricKind::ErrorRate, " Error Rate ", COLOR_ERRORS);

    render_spark(f, root[2], state, MetricKind::Throughput, " Throughput (events/min) ", COLOR_THROUGHPUT);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(root[3]);
    render_spark(f, bottom[0], state, MetricKind::Latency, " Query Latency (ms) ", COLOR_LATENCY);
    render_spark(f, bottom[1], state, MetricKind::ErrorRate, " Error Rate (%) ", COLOR_ERRORS);

    let footer = Paragraph::new(footer_text(state))
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(COLOR_MUTED));
    f.render_widget(footer, root[4]);
}

fn render_card(
    f: &mut ratatui::Frame,
    area: Rect,
    state: &LiveState,
    kind: MetricKind,
    title: &'static str,
    color: Color,
) {
    let card = Paragraph::new(format!("{} {}", state.headline(kind), kind.unit()))
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD));
    f.render_widget(card, area);
}

fn render_spark(
    f: &mut ratatui::Frame,
    area: Rect,
    state: &LiveState,
    kind: MetricKind,
    title: &'static str,
    color: Color,
) {
    let data = state.spark_data(kind);
    let spark = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(&data)
        .style(Style::default().fg(color));
    f.render_widget(spark, area);
}

fn footer_text(state: &LiveState) -> &'static str {
    if state.paused {
        "r resume | q quit"
    } else {
        "p pause | q quit"
    }
}
