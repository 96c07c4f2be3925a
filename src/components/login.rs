//! Login component for CareDesk.

use crate::app::SelectedApp;
use crate::components::widgets::{
    self, centered_rect, ACCENT, DANGER, MUTED, SUCCESS, TEXT, TITLE, WARNING,
};
use crate::components::Component;
use crate::config::{APP_NAME, APP_VERSION};
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Clear, Paragraph},
};
use std::time::{Duration, Instant};

const USERNAME: usize = 0;
const PASSWORD: usize = 1;
const REGISTER: usize = 2;
const EXIT: usize = 3;
const ITEMS: usize = 4;

const BANNER: [&str; 5] = [
    r"  ____               ____            _    ",
    r" / ___|__ _ _ __ ___|  _ \  ___  ___| | __",
    r"| |   / _` | '__/ _ \ | | |/ _ \/ __| |/ /",
    r"| |__| (_| | | |  __/ |_| |  __/\__ \   < ",
    r" \____\__,_|_|  \___|____/ \___||___/_|\_\",
];

/// Represents the login UI component.
#[derive(Debug, Default)]
pub struct Login {
    pub username: String,
    pub password: String,
    /// Current selection (0: Username, 1: Password, 2: Register, 3: Exit)
    pub selected_index: usize,
    pub show_exit_dialog: bool,
    /// Selected option in the exit dialog (0: Yes, 1: No)
    pub exit_dialog_selected: usize,
    error_message: Option<String>,
    error_message_time: Option<Instant>,
    success_message: Option<String>,
}

impl Login {
    pub fn new() -> Self {
        Self::default()
    }

    fn clear_error_message(&mut self) {
        self.error_message = None;
        self.error_message_time = None;
    }

    pub fn set_error_message(&mut self, message: String) {
        self.error_message = Some(message);
        self.error_message_time = Some(Instant::now());
        self.success_message = None;
    }

    pub fn set_success_message(&mut self, message: String) {
        self.success_message = Some(message);
        self.clear_error_message();
    }

    /// Hides the error message after five seconds.
    pub fn check_error_timeout(&mut self) {
        if let Some(time) = self.error_message_time {
            if time.elapsed() >= Duration::from_secs(5) {
                self.clear_error_message();
            }
        }
    }

    fn handle_exit_dialog_input(&mut self, key: KeyEvent) -> Option<SelectedApp> {
        match key.code {
            KeyCode::Left | KeyCode::Right => {
                self.exit_dialog_selected = 1 - self.exit_dialog_selected;
            }
            KeyCode::Enter => {
                if self.exit_dialog_selected == 0 {
                    return Some(SelectedApp::Quit);
                }
                self.show_exit_dialog = false;
            }
            KeyCode::Esc => self.show_exit_dialog = false,
            _ => {}
        }
        None
    }
}

impl Component for Login {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        self.check_error_timeout();

        if self.show_exit_dialog {
            return Ok(self.handle_exit_dialog_input(event));
        }

        match event.code {
            KeyCode::Char(c) => {
                match self.selected_index {
                    USERNAME => self.username.push(c),
                    PASSWORD => self.password.push(c),
                    _ => {}
                }
                self.clear_error_message();
            }
            KeyCode::Backspace => {
                match self.selected_index {
                    USERNAME => {
                        self.username.pop();
                    }
                    PASSWORD => {
                        self.password.pop();
                    }
                    _ => {}
                }
                self.clear_error_message();
            }
            KeyCode::Tab | KeyCode::Down => {
                self.selected_index = (self.selected_index + 1) % ITEMS;
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.selected_index = (self.selected_index + ITEMS - 1) % ITEMS;
            }
            KeyCode::Enter => match self.selected_index {
                REGISTER => return Ok(Some(SelectedApp::Register)),
                EXIT => {
                    self.show_exit_dialog = true;
                    self.exit_dialog_selected = 1;
                }
                _ => {
                    if self.username.trim().is_empty() {
                        self.set_error_message("Username cannot be empty.".to_string());
                        return Ok(None);
                    }
                    if self.password.is_empty() {
                        self.set_error_message("Password cannot be empty.".to_string());
                        return Ok(None);
                    }
                    // Signal login attempt
                    return Ok(Some(SelectedApp::None));
                }
            },
            KeyCode::Esc => {
                self.show_exit_dialog = true;
                self.exit_dialog_selected = 1;
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let vertical_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6), // Banner
                Constraint::Length(1), // Slogan
                Constraint::Length(2),
                Constraint::Length(1), // "Login to CareDesk"
                Constraint::Length(1),
                Constraint::Length(3), // Username
                Constraint::Length(3), // Password
                Constraint::Length(3), // Messages
                Constraint::Length(1), // Register link
                Constraint::Length(1),
                Constraint::Length(1), // Exit
                Constraint::Min(0),
            ])
            .margin(1)
            .split(area);

        let banner = Paragraph::new(Text::from(
            BANNER.iter().map(|line| Line::from(*line)).collect::<Vec<_>>(),
        ))
        .alignment(Alignment::Center)
        .style(Style::default().fg(ACCENT));
        frame.render_widget(banner, vertical_layout[0]);

        let slogan = Paragraph::new(Span::styled(
            format!("Hospital operations at your desk · v{APP_VERSION}"),
            Style::default()
                .fg(MUTED)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(slogan, vertical_layout[1]);

        let subtitle = Paragraph::new(Span::styled(
            format!("Login to {APP_NAME}"),
            Style::default().fg(TITLE).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center);
        frame.render_widget(subtitle, vertical_layout[3]);

        frame.render_widget(
            widgets::input(
                " Username (press `TAB` or `Arrow Keys` to switch) ".to_string(),
                self.username.clone(),
                self.selected_index == USERNAME,
            ),
            vertical_layout[5].inner(Margin::new(1, 0)),
        );
        frame.render_widget(
            widgets::input(
                " Password ".to_string(),
                "•".repeat(self.password.chars().count()),
                self.selected_index == PASSWORD,
            ),
            vertical_layout[6].inner(Margin::new(1, 0)),
        );

        if let Some(error) = &self.error_message {
            let error_paragraph = Paragraph::new(error.as_str())
                .style(Style::default().fg(DANGER))
                .alignment(Alignment::Center);
            frame.render_widget(error_paragraph, vertical_layout[7]);
        } else if let Some(success) = &self.success_message {
            let success_paragraph = Paragraph::new(success.as_str())
                .style(Style::default().fg(SUCCESS))
                .alignment(Alignment::Center);
            frame.render_widget(success_paragraph, vertical_layout[7]);
        }

        let link = |text: &'static str, index: usize, color: Color| {
            Paragraph::new(Span::styled(
                text,
                Style::default()
                    .fg(if self.selected_index == index {
                        color
                    } else {
                        MUTED
                    })
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
        };
        frame.render_widget(
            link("New patient? Create an account", REGISTER, ACCENT),
            vertical_layout[8],
        );
        frame.render_widget(link("Exit", EXIT, WARNING), vertical_layout[10]);

        if self.show_exit_dialog {
            let dialog_area = centered_rect(60, 20, area);
            let choice = |label: &'static str, selected: bool, color: Color| {
                Span::styled(
                    label,
                    Style::default().fg(if selected { color } else { MUTED }),
                )
            };
            let text = vec![
                Line::from(Span::styled(
                    "Are you sure you want to quit?",
                    Style::default().fg(TEXT),
                )),
                Line::from(""),
                Line::from(vec![
                    choice(" Yes ", self.exit_dialog_selected == 0, SUCCESS),
                    Span::raw("  "),
                    choice(" No ", self.exit_dialog_selected == 1, DANGER),
                ]),
            ];

            frame.render_widget(Clear, dialog_area);
            frame.render_widget(
                Paragraph::new(text)
                    .block(widgets::panel("Confirm Exit", true))
                    .alignment(Alignment::Center),
                dialog_area,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(login: &mut Login, code: KeyCode) -> Option<SelectedApp> {
        login
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn empty_fields_do_not_attempt_login() {
        let mut login = Login::new();
        assert_eq!(press(&mut login, KeyCode::Enter), None);
        assert!(login.error_message.is_some());
    }

    #[test]
    fn filled_form_signals_login_attempt() {
        let mut login = Login::new();
        press(&mut login, KeyCode::Char('a'));
        press(&mut login, KeyCode::Tab);
        press(&mut login, KeyCode::Char('p'));
        assert_eq!(login.username, "a");
        assert_eq!(login.password, "p");
        assert_eq!(press(&mut login, KeyCode::Enter), Some(SelectedApp::None));
    }

    #[test]
    fn register_link_and_exit_dialog() {
        let mut login = Login::new();
        press(&mut login, KeyCode::Up);
        press(&mut login, KeyCode::Up);
        assert_eq!(press(&mut login, KeyCode::Enter), Some(SelectedApp::Register));

        press(&mut login, KeyCode::Esc);
        assert!(login.show_exit_dialog);
        press(&mut login, KeyCode::Left);
        assert_eq!(press(&mut login, KeyCode::Enter), Some(SelectedApp::Quit));
    }
}
