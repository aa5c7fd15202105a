use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::{
    io::{stdout, Stdout},
    time::{Duration, Instant},
};

use blockfall::config::{GameConfig, FOOTER_HEIGHT, SIDE_PANEL_WIDTH};
use blockfall::game::{Command, Game, GameEvent, Phase, Snapshot};
use blockfall::grid::Grid;
use blockfall::piece::{PieceSpec, ShapeKind};

// ============================================================================
// Visual Constants
// ============================================================================

const FRAME_MS: u64 = 16;
const BLOCK_CHAR: &str = "██";
const HIGHLIGHT_COLOR: Color = Color::White;

// ============================================================================
// CLI
// ============================================================================

/// Falling-block puzzle in the terminal.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Grid width in cells
    #[arg(long, default_value_t = blockfall::config::DEFAULT_COLS)]
    cols: usize,
    /// Grid height in cells
    #[arg(long, default_value_t = blockfall::config::DEFAULT_ROWS)]
    rows: usize,
    /// Seed for the piece generator
    #[arg(long)]
    seed: Option<u64>,
    /// Never mirror piece facings
    #[arg(long)]
    no_mirror: bool,
    /// Duration of the row-clear highlight
    #[arg(long, default_value_t = blockfall::config::ROW_ANIMATION_MS)]
    animation_ms: u64,
}

impl Args {
    fn into_config(self) -> GameConfig {
        GameConfig {
            cols: self.cols,
            rows: self.rows,
            seed: self.seed,
            mirroring: !self.no_mirror,
            row_animation_ms: self.animation_ms,
            ..GameConfig::default()
        }
    }
}

// ============================================================================
// Color Mapping
// ============================================================================

fn shape_color(kind: ShapeKind) -> Color {
    match kind {
        ShapeKind::I => Color::Cyan,
        ShapeKind::Square => Color::Yellow,
        ShapeKind::T => Color::Magenta,
        ShapeKind::S => Color::Green,
        ShapeKind::Z => Color::Red,
        ShapeKind::LBackward => Color::Blue,
        ShapeKind::LForward => Color::Rgb(255, 165, 0),
    }
}

fn key_command(code: KeyCode) -> Option<Command> {
    match code {
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Command::MoveLeft),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Command::MoveRight),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Command::SoftDrop),
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Command::Rotate),
        _ => None,
    }
}

fn event_message(event: &GameEvent) -> Option<String> {
    match event {
        GameEvent::LinesCleared(1) => Some("Single".to_string()),
        GameEvent::LinesCleared(2) => Some("Double".to_string()),
        GameEvent::LinesCleared(3) => Some("Triple".to_string()),
        GameEvent::LinesCleared(n) => Some(format!("{n} lines!")),
        GameEvent::LevelUp(level) => Some(format!("Level {level}")),
        GameEvent::GameRestarted => Some("New game".to_string()),
        _ => None,
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render(frame: &mut Frame, game: &Game, status: &str) {
    let area = frame.size();
    let snapshot = game.snapshot();

    let (board_width, board_height) = game.grid().pixel_size();
    let board_width = u16::try_from(board_width).unwrap_or(u16::MAX);
    let board_height = u16::try_from(board_height).unwrap_or(u16::MAX);
    let side_width = SIDE_PANEL_WIDTH as u16;
    let main_area = centered_rect(
        board_width.saturating_add(side_width),
        board_height.saturating_add(FOOTER_HEIGHT as u16),
        area,
    );

    let vertical = Layout::vertical([Constraint::Length(board_height), Constraint::Fill(1)])
        .split(main_area);
    let horizontal = Layout::horizontal([
        Constraint::Length(board_width),
        Constraint::Length(side_width),
    ])
    .split(vertical[0]);

    render_board(frame, game.grid(), &snapshot, horizontal[0]);
    render_info(frame, game, &snapshot, status, horizontal[1]);

    let controls = Paragraph::new(Line::from(
        "←→/AD: Move | ↓/S: Drop | ↑/W: Rotate | R: Restart | Q/ESC: Quit",
    ))
    .alignment(Alignment::Center)
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(controls, vertical[1]);

    if snapshot.phase == Phase::GameOver {
        render_game_over(frame, &snapshot, area);
    }
}

fn render_board(frame: &mut Frame, grid: &Grid, snapshot: &Snapshot, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Blockfall ")
        .title_alignment(Alignment::Center);
    frame.render_widget(block, area);

    let mut cells: Vec<(i32, Style)> = snapshot
        .settled_cells
        .iter()
        .map(|&(index, kind)| (index, Style::default().fg(shape_color(kind))))
        .collect();
    if let Some(kind) = snapshot.active_kind {
        let style = Style::default().fg(shape_color(kind));
        cells.extend(snapshot.active_cells.iter().map(|&index| (index, style)));
    }
    cells.extend(
        snapshot
            .reveals
            .iter()
            .filter(|reveal| reveal.revealed)
            .map(|reveal| (reveal.index, Style::default().fg(HIGHLIGHT_COLOR))),
    );

    let buffer = frame.buffer_mut();
    for (index, style) in cells {
        let Some(origin) = grid.cell_pixel(index) else {
            continue;
        };
        let x = area.x + origin.x as u16;
        let y = area.y + origin.y as u16;
        if x + 1 < area.right() && y < area.bottom() {
            buffer.set_string(x, y, BLOCK_CHAR, style);
        }
    }
}

fn preview_lines(spec: PieceSpec) -> Vec<Line<'static>> {
    let offsets: Vec<(i32, i32)> = std::iter::once((0, 0)).chain(spec.base_offsets()).collect();
    let min_x = offsets.iter().map(|o| o.0).min().unwrap_or(0);
    let max_x = offsets.iter().map(|o| o.0).max().unwrap_or(0);
    let min_y = offsets.iter().map(|o| o.1).min().unwrap_or(0);
    let max_y = offsets.iter().map(|o| o.1).max().unwrap_or(0);
    let style = Style::default().fg(shape_color(spec.kind));

    (min_y..=max_y)
        .map(|y| {
            let spans: Vec<Span> = (min_x..=max_x)
                .map(|x| {
                    if offsets.contains(&(x, y)) {
                        Span::styled(BLOCK_CHAR, style)
                    } else {
                        Span::raw("  ")
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

fn render_info(frame: &mut Frame, game: &Game, snapshot: &Snapshot, status: &str, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Info ")
        .title_alignment(Alignment::Center);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        Line::from(Span::styled("Score", Style::default().fg(Color::Yellow))),
        Line::from(format!("{}", snapshot.score)),
        Line::from(""),
        Line::from(Span::styled("Lines", Style::default().fg(Color::Cyan))),
        Line::from(format!("{}", snapshot.lines_cleared)),
        Line::from(""),
        Line::from(Span::styled("Level", Style::default().fg(Color::Green))),
        Line::from(format!("{}", snapshot.level)),
        Line::from(""),
        Line::from(Span::styled("Next", Style::default().fg(Color::Magenta))),
    ];
    if let Some(&spec) = game.preview_queue().front() {
        lines.extend(preview_lines(spec));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        status.to_string(),
        Style::default().fg(Color::White),
    )));

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

fn render_game_over(frame: &mut Frame, snapshot: &Snapshot, area: Rect) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("GAME OVER", Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(format!("Score: {}", snapshot.score)),
        Line::from(format!("Lines: {}", snapshot.lines_cleared)),
        Line::from(""),
        Line::from(Span::styled(
            "R to restart, ESC to quit",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Game Over ")
            .title_alignment(Alignment::Center)
            .style(Style::default().bg(Color::Black)),
    );

    let popup_area = centered_rect(28, 10, area);
    frame.render_widget(paragraph, popup_area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let horizontal = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Length(width.min(area.width)),
        Constraint::Fill(1),
    ])
    .split(area);

    let vertical = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height.min(area.height)),
        Constraint::Fill(1),
    ])
    .split(horizontal[1]);

    vertical[1]
}

// ============================================================================
// Main Loop
// ============================================================================

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, mut game: Game) -> Result<()> {
    let clock = Instant::now();
    let mut status = String::new();

    loop {
        terminal.draw(|frame| render(frame, &game, &status))?;

        if event::poll(Duration::from_millis(FRAME_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => break,
                        KeyCode::Char('r') | KeyCode::Char('R') => game.restart(),
                        code => {
                            if let Some(command) = key_command(code) {
                                game.apply(command);
                            }
                        }
                    }
                }
            }
        }

        game.tick(clock.elapsed().as_millis() as u64);

        if let Some(message) = game.take_events().iter().rev().find_map(event_message) {
            status = message;
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let config = Args::parse().into_config();
    let game = Game::new(config).context("invalid game configuration")?;

    enable_raw_mode().context("failed to enable raw mode")?;
    stdout()
        .execute(EnterAlternateScreen)
        .context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, game);

    // Always try to restore terminal state.
    let _ = disable_raw_mode();
    let _ = stdout().execute(LeaveAlternateScreen);

    result
}
