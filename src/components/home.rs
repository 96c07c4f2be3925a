//! The home screen: role-specific KPI tiles and the feature menu.

use crate::analytics::{self, DashboardKpis, Feature, KpiTile};
use crate::app::SelectedApp;
use crate::auth::{Permission, Session};
use crate::components::widgets::{
    self, ACCENT, BORDER_IDLE, DANGER, FOCUS, HIGHLIGHT_BG, MUTED, PANEL, SUCCESS, TEXT, TITLE,
};
use crate::components::Component;
use crate::config::APP_NAME;
use crate::service::Hospital;
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Padding, Paragraph},
};
use std::rc::Rc;
use std::time::{Duration, Instant};

const KPI_REFRESH: Duration = Duration::from_secs(30);

/// A submenu entry and the screen it opens.
struct MenuOption {
    label: &'static str,
    target: SelectedApp,
}

struct MenuEntry {
    feature: Feature,
    options: Vec<MenuOption>,
}

fn feature_icon(feature: Feature) -> &'static str {
    match feature {
        Feature::Patients => "👤",
        Feature::Staff => "👥",
        Feature::Appointments => "📅",
        Feature::Records => "📋",
        Feature::Billing => "💰",
        Feature::Wards => "🛏",
        Feature::Inventory => "📦",
        Feature::Reports => "📊",
        Feature::Notifications => "🔔",
    }
}

/// Submenu entries of a feature the session is allowed to open.
fn options_for(feature: Feature, session: &Session) -> Vec<MenuOption> {
    let self_service = session.can(Permission::SelfService);
    let candidates: Vec<(&'static str, SelectedApp, bool)> = match feature {
        Feature::Patients => vec![
            ("List Patients", SelectedApp::PatientList, session.can(Permission::ReadPatients)),
            ("Add Patient", SelectedApp::PatientAdd, session.can(Permission::WritePatients)),
        ],
        Feature::Staff => {
            let manage = session.can(Permission::ManageStaff);
            vec![
                ("List Staff", SelectedApp::StaffList, manage),
                ("Add Staff", SelectedApp::StaffAdd, manage),
                ("Assign Shift", SelectedApp::StaffAssign, manage),
            ]
        }
        Feature::Appointments => vec![
            (
                "Book Appointment",
                SelectedApp::AppointmentBook,
                session.can(Permission::BookAppointments) || self_service,
            ),
            (
                "View Appointments",
                SelectedApp::AppointmentList,
                session.can(Permission::ReadAppointments) || self_service,
            ),
        ],
        Feature::Records => vec![
            ("Visit History", SelectedApp::RecordList, session.can(Permission::ReadPatients)),
            ("Record Visit", SelectedApp::RecordStore, session.can(Permission::RecordVisits)),
        ],
        Feature::Billing => {
            let billing = session.can(Permission::ManageBilling);
            vec![
                ("New Invoice", SelectedApp::BillingInvoice, billing),
                ("Invoices", SelectedApp::BillingView, billing || self_service),
            ]
        }
        Feature::Wards => vec![(
            "Beds & Admissions",
            SelectedApp::Wards,
            session.can(Permission::ManageAdmissions) || session.can(Permission::ManageBeds),
        )],
        Feature::Inventory => vec![(
            "Stock Levels",
            SelectedApp::Inventory,
            session.can(Permission::ManageInventory),
        )],
        Feature::Reports => vec![(
            "Generate Report",
            SelectedApp::Reports,
            session.can(Permission::ViewReports),
        )],
        Feature::Notifications => vec![("Inbox", SelectedApp::Notifications, true)],
    };
    candidates
        .into_iter()
        .filter(|(_, _, allowed)| *allowed)
        .map(|(label, target, _)| MenuOption { label, target })
        .collect()
}

pub struct Home {
    hospital: Rc<Hospital>,
    session: Session,
    tiles: &'static [KpiTile],
    kpis: DashboardKpis,
    unread: i64,
    refreshed_at: Instant,
    menu: Vec<MenuEntry>,
    /// 0: menu panels, 1: the logout button
    selection_mode: usize,
    show_logout_dialog: bool,
    /// 0: Yes, 1: No
    logout_dialog_selected: usize,
    /// 0: features, 1: submenu
    active_panel: usize,
    selected_feature_index: usize,
    submenu_states: Vec<ListState>,
}

impl Home {
    pub fn new(hospital: Rc<Hospital>, session: Session) -> Self {
        let layout = analytics::dashboard_for(session.role);
        let menu: Vec<MenuEntry> = layout
            .features
            .iter()
            .map(|&feature| MenuEntry {
                feature,
                options: options_for(feature, &session),
            })
            .filter(|entry| !entry.options.is_empty())
            .collect();

        let submenu_states = menu
            .iter()
            .map(|_| {
                let mut state = ListState::default();
                state.select(Some(0));
                state
            })
            .collect();

        let mut home = Self {
            hospital,
            session,
            tiles: layout.tiles,
            kpis: DashboardKpis::default(),
            unread: 0,
            refreshed_at: Instant::now(),
            menu,
            selection_mode: 0,
            show_logout_dialog: false,
            logout_dialog_selected: 1,
            active_panel: 0,
            selected_feature_index: 0,
            submenu_states,
        };
        home.refresh();
        home
    }

    /// Reloads the dashboard figures and the unread count.
    pub fn refresh(&mut self) {
        match self.hospital.dashboard(&self.session, utils::today()) {
            Ok(kpis) => self.kpis = kpis,
            Err(e) => tracing::error!("Failed to compute dashboard: {e}"),
        }
        match self.hospital.unread_count(&self.session) {
            Ok(count) => self.unread = count,
            Err(e) => tracing::error!("Failed to count notifications: {e}"),
        }
        self.refreshed_at = Instant::now();
    }

    pub fn tick(&mut self) {
        if self.refreshed_at.elapsed() >= KPI_REFRESH {
            self.refresh();
        }
    }

    fn submenu_len(&self) -> usize {
        self.menu
            .get(self.selected_feature_index)
            .map_or(0, |entry| entry.options.len())
    }

    fn selected_target(&self) -> Option<SelectedApp> {
        let entry = self.menu.get(self.selected_feature_index)?;
        let index = self.submenu_states[self.selected_feature_index]
            .selected()
            .unwrap_or(0);
        entry.options.get(index).map(|option| option.target)
    }

    fn open_logout_dialog(&mut self) {
        self.show_logout_dialog = true;
        self.logout_dialog_selected = 1;
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<SelectedApp>> {
        if self.show_logout_dialog {
            return Ok(self.handle_logout_dialog_input(key));
        }

        match key.code {
            KeyCode::Tab => {
                self.selection_mode = (self.selection_mode + 1) % 2;
            }
            KeyCode::Left => {
                if self.selection_mode == 0 && self.active_panel == 1 {
                    self.active_panel = 0;
                }
            }
            KeyCode::Right => {
                if self.selection_mode == 0 && self.active_panel == 0 && !self.menu.is_empty() {
                    self.active_panel = 1;
                }
            }
            KeyCode::Up if self.selection_mode == 0 && !self.menu.is_empty() => {
                if self.active_panel == 0 {
                    self.selected_feature_index = self
                        .selected_feature_index
                        .checked_sub(1)
                        .unwrap_or(self.menu.len() - 1);
                } else {
                    let len = self.submenu_len();
                    let state = &mut self.submenu_states[self.selected_feature_index];
                    if let Some(i) = state.selected() {
                        state.select(Some(if i > 0 { i - 1 } else { len.saturating_sub(1) }));
                    }
                }
            }
            KeyCode::Down if self.selection_mode == 0 && !self.menu.is_empty() => {
                if self.active_panel == 0 {
                    self.selected_feature_index = (self.selected_feature_index + 1) % self.menu.len();
                } else {
                    let len = self.submenu_len().max(1);
                    let state = &mut self.submenu_states[self.selected_feature_index];
                    if let Some(i) = state.selected() {
                        state.select(Some((i + 1) % len));
                    }
                }
            }
            KeyCode::Enter => {
                if self.selection_mode == 1 {
                    self.open_logout_dialog();
                } else if self.active_panel == 1 {
                    return Ok(self.selected_target());
                } else if !self.menu.is_empty() {
                    self.active_panel = 1;
                }
            }
            KeyCode::Char('r') => self.refresh(),
            KeyCode::Esc => {
                if self.active_panel == 1 {
                    self.active_panel = 0;
                } else {
                    self.open_logout_dialog();
                }
            }
            _ => {}
        }

        Ok(None)
    }

    fn handle_logout_dialog_input(&mut self, key: KeyEvent) -> Option<SelectedApp> {
        match key.code {
            KeyCode::Left | KeyCode::Right => {
                self.logout_dialog_selected = 1 - self.logout_dialog_selected;
            }
            KeyCode::Enter => {
                self.show_logout_dialog = false;
                if self.logout_dialog_selected == 0 {
                    return Some(SelectedApp::None);
                }
            }
            KeyCode::Esc => {
                self.show_logout_dialog = false;
            }
            _ => {}
        }
        None
    }

    fn render_tiles(&self, frame: &mut Frame, area: Rect) {
        let currency = self.hospital.config().currency.as_str();
        let mut tiles: Vec<(&str, String, Color)> = self
            .tiles
            .iter()
            .map(|tile| {
                let color = match tile {
                    KpiTile::LowStock if self.kpis.low_stock > 0 => DANGER,
                    KpiTile::Outstanding => widgets::WARNING,
                    KpiTile::RevenueToday | KpiTile::RevenueMonth => SUCCESS,
                    _ => ACCENT,
                };
                (tile.label(), tile.value(&self.kpis, currency), color)
            })
            .collect();
        tiles.push(("Unread notifications", self.unread.to_string(), TITLE));

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, tiles.len() as u32); tiles.len()])
            .spacing(1)
            .split(area);

        for ((label, value, color), column) in tiles.into_iter().zip(columns.iter()) {
            let tile = Paragraph::new(vec![
                Line::from(Span::styled(
                    value,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(label, Style::default().fg(MUTED))),
            ])
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(Style::default().fg(BORDER_IDLE))
                    .style(Style::default().bg(PANEL)),
            );
            frame.render_widget(tile, *column);
        }
    }

    fn render_logout_dialog(&self, frame: &mut Frame, area: Rect) {
        let dialog_width = 40;
        let dialog_height = 8;

        let dialog_area = Rect::new(
            (area.width.saturating_sub(dialog_width)) / 2,
            (area.height.saturating_sub(dialog_height)) / 2,
            dialog_width.min(area.width),
            dialog_height.min(area.height),
        );

        frame.render_widget(Clear, dialog_area);

        let dialog_block = widgets::panel("Confirm Logout", true);
        let inner_area = dialog_block.inner(dialog_area);
        frame.render_widget(dialog_block, dialog_area);

        let content_layout = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(inner_area);

        frame.render_widget(
            Paragraph::new("Are you sure you want to logout?")
                .style(Style::default().fg(TEXT).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center),
            content_layout[0],
        );

        let buttons_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(content_layout[1]);

        let choice = |label: &str, selected: bool, color: Color| {
            let (text, style) = if selected {
                (
                    format!("► {label} ◄"),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )
            } else {
                (format!("  {label}  "), Style::default().fg(MUTED))
            };
            Paragraph::new(text).style(style).alignment(Alignment::Center)
        };

        frame.render_widget(
            choice("Yes", self.logout_dialog_selected == 0, SUCCESS),
            buttons_layout[0],
        );
        frame.render_widget(
            choice("No", self.logout_dialog_selected == 1, DANGER),
            buttons_layout[1],
        );
    }
}

impl Component for Home {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        self.handle_input(event)
    }

    fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);

        let main_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(3),
            ])
            .split(area);

        let welcome_text = Line::from(vec![
            Span::styled(
                format!("Welcome to {APP_NAME}, "),
                Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.session.username.clone(),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  ({})", self.session.role.as_str()),
                Style::default().fg(MUTED),
            ),
        ]);
        frame.render_widget(
            Paragraph::new(welcome_text)
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .border_style(Style::default().fg(BORDER_IDLE))
                        .style(Style::default().bg(PANEL)),
                ),
            main_layout[0],
        );

        self.render_tiles(frame, main_layout[1]);

        let content_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .spacing(2)
            .margin(1)
            .split(main_layout[2]);

        let menu_focused = self.selection_mode == 0;
        let left_block = widgets::panel("🏥 Hospital Management", menu_focused && self.active_panel == 0);
        let left_inner = left_block.inner(content_layout[0]);
        frame.render_widget(left_block, content_layout[0]);

        let feature_items: Vec<ListItem> = self
            .menu
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let selected = idx == self.selected_feature_index;
                let style = match (selected, menu_focused && self.active_panel == 0) {
                    (true, true) => Style::default().fg(FOCUS).add_modifier(Modifier::BOLD),
                    (true, false) => Style::default().fg(SUCCESS).add_modifier(Modifier::BOLD),
                    _ => Style::default().fg(TEXT),
                };
                let prefix = if selected { " ► " } else { "   " };
                ListItem::new(format!(
                    "{prefix}{} {}",
                    feature_icon(entry.feature),
                    entry.feature.title()
                ))
                .style(style)
            })
            .collect();
        frame.render_widget(
            List::new(feature_items).block(Block::default().padding(Padding::new(0, 0, 1, 0))),
            left_inner,
        );

        let right_block = widgets::panel("Sub menu", menu_focused && self.active_panel == 1);
        let right_inner = right_block.inner(content_layout[1]);
        frame.render_widget(right_block, content_layout[1]);

        if let Some(entry) = self.menu.get(self.selected_feature_index) {
            let state = &self.submenu_states[self.selected_feature_index];
            let mut lines: Vec<ListItem> = vec![
                ListItem::new(entry.feature.description()).style(Style::default().fg(MUTED)),
                ListItem::new(""),
            ];
            lines.extend(entry.options.iter().enumerate().map(|(idx, option)| {
                let selected = state.selected() == Some(idx);
                let style = match (selected, menu_focused && self.active_panel == 1) {
                    (true, true) => Style::default()
                        .fg(FOCUS)
                        .bg(HIGHLIGHT_BG)
                        .add_modifier(Modifier::BOLD),
                    (true, false) => Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                    _ => Style::default().fg(TEXT),
                };
                let prefix = if selected { " ► " } else { "   " };
                ListItem::new(format!("{prefix}{}", option.label)).style(style)
            }));
            frame.render_widget(
                List::new(lines).block(Block::default().padding(Padding::new(2, 0, 1, 0))),
                right_inner,
            );
        }

        frame.render_widget(
            widgets::help_line(
                "←→: Switch panels | ↑↓: Navigate | Enter: Select | r: Refresh | Tab: Logout | Esc: Back",
            ),
            main_layout[3],
        );

        frame.render_widget(
            widgets::button("Logout", self.selection_mode == 1, DANGER),
            main_layout[4],
        );

        if self.show_logout_dialog {
            self.render_logout_dialog(frame, area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crossterm::event::KeyModifiers;

    fn home_for(username: &str) -> Home {
        let ctx = demo_context(username);
        Home::new(ctx.hospital, ctx.session)
    }

    fn press(home: &mut Home, code: KeyCode) -> Option<SelectedApp> {
        home.handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    fn features(home: &Home) -> Vec<Feature> {
        home.menu.iter().map(|entry| entry.feature).collect()
    }

    #[test]
    fn admin_sees_every_feature_and_figures() {
        let home = home_for("root");
        assert_eq!(features(&home).len(), 9);
        assert_eq!(home.kpis.todays_appointments, 3);
        assert!(home.kpis.low_stock > 0);
    }

    #[test]
    fn menus_follow_role_permissions() {
        let nurse = home_for("carla");
        assert_eq!(
            features(&nurse),
            vec![Feature::Wards, Feature::Records, Feature::Patients, Feature::Notifications]
        );
        let patients = nurse
            .menu
            .iter()
            .find(|entry| entry.feature == Feature::Patients)
            .unwrap();
        let labels: Vec<&str> = patients.options.iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!["List Patients"]);

        let patient = home_for("ada");
        assert_eq!(
            features(&patient),
            vec![Feature::Appointments, Feature::Billing, Feature::Notifications]
        );
        let billing = &patient.menu[1];
        assert_eq!(billing.options.len(), 1);
        assert_eq!(billing.options[0].target, SelectedApp::BillingView);
    }

    #[test]
    fn enter_opens_the_selected_submenu_entry() {
        let mut home = home_for("pam");
        assert_eq!(press(&mut home, KeyCode::Enter), None);
        assert_eq!(press(&mut home, KeyCode::Down), None);
        assert_eq!(press(&mut home, KeyCode::Enter), Some(SelectedApp::PatientAdd));

        press(&mut home, KeyCode::Left);
        press(&mut home, KeyCode::Down);
        press(&mut home, KeyCode::Right);
        assert_eq!(
            press(&mut home, KeyCode::Enter),
            Some(SelectedApp::AppointmentBook)
        );
    }

    #[test]
    fn logout_needs_confirmation() {
        let mut home = home_for("house");
        assert_eq!(press(&mut home, KeyCode::Esc), None);
        assert!(home.show_logout_dialog);
        // "No" is preselected.
        assert_eq!(press(&mut home, KeyCode::Enter), None);
        assert!(!home.show_logout_dialog);

        press(&mut home, KeyCode::Tab);
        press(&mut home, KeyCode::Enter);
        press(&mut home, KeyCode::Left);
        assert_eq!(press(&mut home, KeyCode::Enter), Some(SelectedApp::None));
    }
}
