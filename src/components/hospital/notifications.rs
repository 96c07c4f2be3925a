use crate::app::SelectedApp;
use crate::components::hospital::Context;
use crate::components::widgets::{self, Flash, ACCENT, FOCUS, MUTED, SUCCESS, TEXT, TITLE, WARNING};
use crate::components::Component;
use crate::models::{Notification, NotificationKind};
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

pub struct NotificationsScreen {
    ctx: Context,
    notifications: Vec<Notification>,
    unread_only: bool,
    state: TableState,
    flash: Flash,
}

fn kind_color(kind: NotificationKind) -> Color {
    match kind {
        NotificationKind::Appointment => ACCENT,
        NotificationKind::Billing => SUCCESS,
        NotificationKind::Inventory => WARNING,
        NotificationKind::Admission => TITLE,
        NotificationKind::System => MUTED,
    }
}

impl NotificationsScreen {
    pub fn new(ctx: Context) -> Self {
        let mut screen = Self {
            ctx,
            notifications: Vec::new(),
            unread_only: false,
            state: TableState::default(),
            flash: Flash::default(),
        };
        screen.fetch();
        screen
    }

    fn fetch(&mut self) {
        match self.ctx.hospital.notifications_for(&self.ctx.session) {
            Ok(list) => self.notifications = list,
            Err(e) => {
                tracing::error!("Failed to load notifications: {e}");
                self.flash.error(e.to_string());
            }
        }
        let len = self.visible().len();
        widgets::clamp_selection(&mut self.state, len);
    }

    fn visible(&self) -> Vec<&Notification> {
        self.notifications
            .iter()
            .filter(|n| !self.unread_only || !n.read)
            .collect()
    }

    fn unread(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    fn selected(&self) -> Option<&Notification> {
        self.state
            .selected()
            .and_then(|i| self.visible().get(i).copied())
    }

    fn mark_selected(&mut self) {
        let Some(id) = self.selected().filter(|n| !n.read).map(|n| n.id) else {
            return;
        };
        match self.ctx.hospital.mark_read(&self.ctx.session, id) {
            Ok(()) => self.fetch(),
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn mark_all(&mut self) {
        match self.ctx.hospital.mark_all_read(&self.ctx.session) {
            Ok(0) => self.flash.success("Nothing new"),
            Ok(count) => {
                self.flash.success(format!("Marked {count} as read"));
                self.fetch();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }
}

impl Component for NotificationsScreen {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<SelectedApp>> {
        self.flash.check_timeout();
        match key.code {
            KeyCode::Esc => return Ok(Some(SelectedApp::None)),
            KeyCode::Down => {
                let len = self.visible().len();
                widgets::select_next(&mut self.state, len);
            }
            KeyCode::Up => {
                let len = self.visible().len();
                widgets::select_previous(&mut self.state, len);
            }
            KeyCode::Enter | KeyCode::Char('m') => self.mark_selected(),
            KeyCode::Char('A') => self.mark_all(),
            KeyCode::Char('u') => {
                self.unread_only = !self.unread_only;
                let len = self.visible().len();
                widgets::clamp_selection(&mut self.state, len);
            }
            KeyCode::Char('r') => self.fetch(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        widgets::render_header(frame, layout[0], "🔔 Notifications");

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .spacing(1)
            .split(layout[1]);

        let rows: Vec<Row> = self
            .visible()
            .into_iter()
            .map(|n| {
                let weight = if n.read {
                    Style::default().fg(MUTED)
                } else {
                    Style::default().fg(TEXT).add_modifier(Modifier::BOLD)
                };
                Row::new(vec![
                    Cell::from(if n.read { " " } else { "●" }).style(Style::default().fg(ACCENT)),
                    Cell::from(n.kind.as_str()).style(Style::default().fg(kind_color(n.kind))),
                    Cell::from(n.title.clone()).style(weight),
                    Cell::from(utils::format_datetime(n.created_at)).style(weight),
                ])
            })
            .collect();

        let title = format!(
            "{} unread of {}{}",
            self.unread(),
            self.notifications.len(),
            if self.unread_only { " (unread only)" } else { "" }
        );
        let table = Table::new(
            rows,
            [
                Constraint::Length(2),
                Constraint::Length(12),
                Constraint::Min(20),
                Constraint::Length(17),
            ],
        )
        .header(widgets::table_header(&["", "Kind", "Title", "When"]))
        .block(widgets::panel(&title, true))
        .row_highlight_style(widgets::row_highlight(true))
        .highlight_symbol("► ");
        let mut state = self.state.clone();
        frame.render_stateful_widget(table, body[0], &mut state);

        let detail = match self.selected() {
            Some(n) => vec![
                Line::from(Span::styled(
                    n.title.clone(),
                    Style::default().fg(TITLE).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    utils::format_datetime(n.created_at),
                    Style::default().fg(MUTED),
                )),
                Line::from(""),
                Line::from(Span::styled(n.message.clone(), Style::default().fg(TEXT))),
            ],
            None => vec![Line::from(Span::styled(
                "No notifications",
                Style::default().fg(MUTED),
            ))],
        };
        frame.render_widget(
            Paragraph::new(detail)
                .block(widgets::panel("Message", false))
                .wrap(Wrap { trim: true }),
            body[1],
        );

        self.flash.render(frame, layout[2]);
        frame.render_widget(
            Paragraph::new("↑↓: Select | Enter/m: Mark read | A: Mark all read | u: Unread only | r: Refresh | Esc: Back")
                .style(Style::default().fg(FOCUS))
                .alignment(Alignment::Center),
            layout[3],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crate::service::Admission;
    use crossterm::event::KeyModifiers;

    fn press(screen: &mut NotificationsScreen, code: KeyCode) {
        screen
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    /// Admitting a patient notifies every nurse, carla included.
    fn nurse_with_news() -> Context {
        let ctx = demo_context("carla");
        let linus = ctx
            .hospital
            .patients(&ctx.session)
            .unwrap()
            .into_iter()
            .find(|p| p.last_name == "Torvalds")
            .unwrap();
        let bed = ctx
            .hospital
            .beds(&ctx.session)
            .unwrap()
            .into_iter()
            .find(|b| b.bed_number == "G-101")
            .unwrap();
        let doctor_id = ctx.hospital.doctors(&ctx.session).unwrap()[0].id;
        ctx.hospital
            .admit_patient(
                &ctx.session,
                &Admission {
                    patient_id: linus.id,
                    doctor_id,
                    bed_id: bed.id,
                    symptoms: None,
                    diagnosis: "Observation".into(),
                },
            )
            .unwrap();
        ctx
    }

    #[test]
    fn marks_the_selected_notification_read() {
        let mut screen = NotificationsScreen::new(nurse_with_news());
        assert!(screen.unread() > 0);
        let before = screen.unread();
        press(&mut screen, KeyCode::Enter);
        assert_eq!(screen.unread(), before - 1);
        assert!(screen.notifications.iter().any(|n| n.read));
    }

    #[test]
    fn mark_all_and_unread_filter() {
        let mut screen = NotificationsScreen::new(nurse_with_news());
        press(&mut screen, KeyCode::Char('u'));
        assert!(!screen.visible().is_empty());
        press(&mut screen, KeyCode::Char('A'));
        assert_eq!(screen.unread(), 0);
        assert!(screen.visible().is_empty());
        assert_eq!(screen.ctx.hospital.unread_count(&screen.ctx.session).unwrap(), 0);

        press(&mut screen, KeyCode::Char('A'));
        assert_eq!(screen.flash.success_message(), Some("Nothing new"));
    }

    #[test]
    fn empty_inbox_renders_nothing_selected() {
        let mut screen = NotificationsScreen::new(demo_context("house"));
        assert!(screen.selected().is_none());
        press(&mut screen, KeyCode::Enter);
        assert!(screen.flash.error_message().is_none());
    }
}
