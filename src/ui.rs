//! Terminal view shell.
//!
//! Renders the read-only view assembled by the client loop and translates key
//! presses into [`UserEvent`]s. Holds the terminal for the whole session so
//! raw mode and the alternate screen are torn down in one place.

use crate::client::AppView;
use alloy::primitives::{
    U256,
    utils::format_ether,
};
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        self,
        Event,
        KeyCode,
        KeyEventKind,
    },
    execute,
    terminal::{
        EnterAlternateScreen,
        LeaveAlternateScreen,
        disable_raw_mode,
        enable_raw_mode,
    },
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{
        Alignment,
        Constraint,
        Direction,
        Layout,
        Rect,
    },
    style::{
        Color,
        Modifier,
        Style,
    },
    text::{
        Line,
        Span,
    },
    widgets::{
        Block,
        Borders,
        Clear,
        Paragraph,
        Wrap,
    },
};
use std::{
    io::Stdout,
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    Refresh,
    SubmitEntry,
    PickWinner,
    AmountChar(char),
    AmountBackspace,
    Redraw,
}

pub struct UiState {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

pub fn terminal_enter() -> Result<UiState> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(UiState { terminal })
}

pub fn terminal_exit(ui: &mut UiState) -> Result<()> {
    disable_raw_mode()?;
    execute!(ui.terminal.backend_mut(), LeaveAlternateScreen)?;
    ui.terminal.show_cursor()?;
    Ok(())
}

/// Formats wei as ether for display, with trailing zeros trimmed.
pub fn display_ether(wei: U256) -> String {
    let exact = format_ether(wei);
    let trimmed = exact.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        String::from("0")
    } else {
        trimmed.to_string()
    }
}

impl UiState {
    pub fn draw(&mut self, view: &AppView) -> Result<()> {
        self.terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Length(3),
                    Constraint::Length(6),
                    Constraint::Min(5),
                ])
                .split(frame.area());

            let title = Paragraph::new(Line::from(vec![
                Span::styled(
                    "Lottery",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("  [{}]", view.network_label)),
            ]))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
            frame.render_widget(title, chunks[0]);

            let status_style = if view.workflow.busy {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Green)
            };
            let status = Paragraph::new(view.workflow.status.as_str())
                .style(status_style)
                .block(Block::default().borders(Borders::ALL).title("Status"))
                .wrap(Wrap { trim: true });
            frame.render_widget(status, chunks[1]);

            let cursor = if view.workflow.busy { "" } else { "_" };
            let stake = Paragraph::new(format!("{}{}", view.workflow.entry_amount, cursor))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Your stake (ether)"),
                );
            frame.render_widget(stake, chunks[2]);

            let stats = Paragraph::new(vec![
                Line::from(format!("Manager: {}", view.snapshot.manager)),
                Line::from(format!(
                    "There are currently {} people entered, competing to win {} ether!",
                    view.snapshot.players.len(),
                    display_ether(view.snapshot.balance),
                )),
                Line::from("The minimum entry is 0.0001 ether."),
            ])
            .block(Block::default().borders(Borders::ALL).title("Round"))
            .wrap(Wrap { trim: true });
            frame.render_widget(stats, chunks[3]);

            let help = Paragraph::new(vec![
                Line::from(format!("Contract: {}", view.contract_address)),
                Line::from(""),
                Line::from("type / backspace  edit stake"),
                Line::from("enter             submit entry"),
                Line::from("w                 pick winner (manager only)"),
                Line::from("r                 refresh state"),
                Line::from("q                 quit"),
            ])
            .block(Block::default().borders(Borders::ALL).title("Keys"))
            .wrap(Wrap { trim: true });
            frame.render_widget(help, chunks[4]);
        })?;
        Ok(())
    }

    /// Blocking overlay for a session that failed the startup availability
    /// gate. There is no recovery path; only quitting works.
    pub fn draw_unavailable(&mut self, reason: &str) -> Result<()> {
        self.terminal.draw(|frame| {
            let area = centered_rect(60, 30, frame.area());
            frame.render_widget(Clear, area);
            let message = Paragraph::new(vec![
                Line::from(Span::styled(
                    "Wallet not found",
                    Style::default()
                        .fg(Color::Red)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(reason.to_string()),
                Line::from(""),
                Line::from("Press q to quit."),
            ])
            .block(Block::default().borders(Borders::ALL).title("Unavailable"))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            frame.render_widget(message, area);
        })?;
        Ok(())
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

/// Polls for the next key press without blocking the event loop.
pub async fn next_event() -> Result<UserEvent> {
    loop {
        if event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => return Ok(UserEvent::Quit),
                        KeyCode::Char('r') => return Ok(UserEvent::Refresh),
                        KeyCode::Char('w') => return Ok(UserEvent::PickWinner),
                        KeyCode::Enter => return Ok(UserEvent::SubmitEntry),
                        KeyCode::Backspace => return Ok(UserEvent::AmountBackspace),
                        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                            return Ok(UserEvent::AmountChar(c));
                        }
                        _ => {}
                    }
                }
                Event::Resize(_, _) => return Ok(UserEvent::Redraw),
                _ => {}
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_ether__trims_trailing_zeros() {
        assert_eq!(display_ether(U256::ZERO), "0");
        assert_eq!(
            display_ether(U256::from(500_000_000_000_000_000u64)),
            "0.5"
        );
        assert_eq!(
            display_ether(U256::from(10).pow(U256::from(18))),
            "1"
        );
    }
}
