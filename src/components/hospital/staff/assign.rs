//! Shift assignment screen.
//!
//! Pick a staff member, move through the calendar to a day, choose the
//! shift and confirm. Days that already have a shift are coloured by shift.

use crate::components::hospital::staff::StaffAction;
use crate::components::hospital::Context;
use crate::components::widgets::{
    self, Confirm, ConfirmOutcome, DatePicker, Flash, ACCENT, FOCUS, MUTED, TEXT,
};
use crate::models::{Shift, ShiftAssignment, StaffMember, StaffStatus};
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

const STAFF_LIST: usize = 0;
const CALENDAR: usize = 1;
const SHIFT_CHOICE: usize = 2;

fn shift_style(shift: Shift) -> Style {
    let bg = match shift {
        Shift::Morning => Color::Rgb(180, 140, 30),
        Shift::Afternoon => Color::Rgb(180, 70, 40),
        Shift::Night => Color::Rgb(50, 60, 150),
    };
    Style::default().fg(Color::Rgb(250, 250, 250)).bg(bg)
}

pub struct AssignShift {
    ctx: Context,
    staff: Vec<StaffMember>,
    state: TableState,
    assignments: Vec<ShiftAssignment>,
    picker: DatePicker,
    shift: usize,
    focus: usize,
    confirm: Confirm,
    flash: Flash,
}

impl AssignShift {
    pub fn new(ctx: Context) -> Self {
        let today = utils::today();
        let mut screen = Self {
            ctx,
            staff: Vec::new(),
            state: TableState::default(),
            assignments: Vec::new(),
            picker: DatePicker::new(today).not_before(today),
            shift: 0,
            focus: STAFF_LIST,
            confirm: Confirm::default(),
            flash: Flash::default(),
        };
        screen.fetch_staff();
        screen
    }

    fn fetch_staff(&mut self) {
        match self.ctx.hospital.staff(&self.ctx.session) {
            Ok(staff) => {
                self.staff = staff
                    .into_iter()
                    .filter(|member| member.status != StaffStatus::Inactive)
                    .collect();
                widgets::clamp_selection(&mut self.state, self.staff.len());
                self.load_assignments();
            }
            Err(e) => self.flash.error(format!("Failed to fetch staff: {e}")),
        }
    }

    fn selected(&self) -> Option<&StaffMember> {
        self.state.selected().and_then(|i| self.staff.get(i))
    }

    fn load_assignments(&mut self) {
        let Some(staff_id) = self.selected().map(|member| member.id) else {
            self.assignments.clear();
            return;
        };
        match self.ctx.hospital.shifts_for(&self.ctx.session, staff_id) {
            Ok(assignments) => self.assignments = assignments,
            Err(e) => {
                self.assignments.clear();
                self.flash.error(format!("Failed to load shifts: {e}"));
            }
        }
    }

    fn chosen_shift(&self) -> Shift {
        Shift::ALL.get(self.shift).copied().unwrap_or(Shift::Morning)
    }

    fn assign(&mut self) {
        let Some((staff_id, name)) = self.selected().map(|m| (m.id, m.name.clone())) else {
            return;
        };
        let (date, shift) = (self.picker.selected, self.chosen_shift());
        match self
            .ctx
            .hospital
            .assign_shift(&self.ctx.session, staff_id, date, shift)
        {
            Ok(()) => {
                self.flash.success(format!(
                    "{name}: {shift} shift on {}",
                    utils::format_date(date)
                ));
                self.load_assignments();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<StaffAction>> {
        self.tick();
        if self.confirm.open {
            if let Some(ConfirmOutcome::Yes) = self.confirm.handle_key(key.code) {
                self.assign();
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Tab => self.focus = (self.focus + 1) % 3,
            KeyCode::BackTab => self.focus = (self.focus + 2) % 3,
            KeyCode::Esc => return Ok(Some(StaffAction::BackToHome)),
            KeyCode::Enter => {
                if self.focus == STAFF_LIST {
                    self.focus = CALENDAR;
                } else if let Some(member) = self.selected() {
                    let message = format!(
                        "Assign {} the {} shift on {}?",
                        member.name,
                        self.chosen_shift(),
                        utils::format_date(self.picker.selected)
                    );
                    self.confirm.ask(message);
                }
            }
            code => match self.focus {
                STAFF_LIST => match code {
                    KeyCode::Down => {
                        widgets::select_next(&mut self.state, self.staff.len());
                        self.load_assignments();
                    }
                    KeyCode::Up => {
                        widgets::select_previous(&mut self.state, self.staff.len());
                        self.load_assignments();
                    }
                    _ => {}
                },
                CALENDAR => {
                    self.picker.handle_key(code);
                }
                _ => match code {
                    KeyCode::Left | KeyCode::Up => {
                        self.shift = (self.shift + Shift::ALL.len() - 1) % Shift::ALL.len()
                    }
                    KeyCode::Right | KeyCode::Down => {
                        self.shift = (self.shift + 1) % Shift::ALL.len()
                    }
                    _ => {}
                },
            },
        }
        Ok(None)
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(14),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        widgets::render_header(frame, layout[0], "🗓 Assign Shifts");

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .spacing(1)
            .split(layout[1]);

        let rows = self.staff.iter().map(|member| {
            Row::new(vec![
                Cell::from(member.employee_code.clone()),
                Cell::from(member.name.clone()),
                Cell::from(member.role.as_str()),
            ])
            .style(Style::default().fg(TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Percentage(30),
                Constraint::Percentage(45),
                Constraint::Percentage(25),
            ],
        )
        .header(widgets::table_header(&["Code", "Name", "Role"]))
        .block(widgets::panel("Staff", self.focus == STAFF_LIST))
        .row_highlight_style(widgets::row_highlight(self.focus == STAFF_LIST))
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, columns[0], &mut self.state.clone());

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(10),
                Constraint::Length(3),
                Constraint::Min(3),
            ])
            .split(columns[1]);

        let marks: Vec<_> = self
            .assignments
            .iter()
            .map(|a| (a.date, shift_style(a.shift)))
            .collect();
        self.picker
            .render(frame, right[0], self.focus == CALENDAR, &marks);

        let shifts: Vec<Span> = Shift::ALL
            .iter()
            .enumerate()
            .flat_map(|(i, shift)| {
                let style = if i == self.shift {
                    shift_style(*shift).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(MUTED)
                };
                [Span::styled(format!(" {shift} "), style), Span::raw("  ")]
            })
            .collect();
        frame.render_widget(
            Paragraph::new(Line::from(shifts))
                .alignment(Alignment::Center)
                .block(widgets::panel("Shift", self.focus == SHIFT_CHOICE)),
            right[1],
        );

        let today = utils::today();
        let upcoming: Vec<Line> = self
            .assignments
            .iter()
            .filter(|a| a.date >= today)
            .take(right[2].height.saturating_sub(2) as usize)
            .map(|a| {
                Line::from(vec![
                    Span::styled(utils::format_date(a.date), Style::default().fg(ACCENT)),
                    Span::raw("  "),
                    Span::styled(a.shift.to_string(), shift_style(a.shift)),
                ])
            })
            .collect();
        let title = self
            .selected()
            .map(|m| format!("Upcoming shifts for {}", m.name))
            .unwrap_or_else(|| "Upcoming shifts".to_string());
        frame.render_widget(
            Paragraph::new(upcoming).block(widgets::panel(&title, false)),
            right[2],
        );

        self.flash.render(frame, layout[2]);
        frame.render_widget(
            Paragraph::new(
                "Tab: Switch panel | ↑↓←→: Move | PgUp/PgDn: Month | Enter: Assign | Esc: Back",
            )
            .style(Style::default().fg(FOCUS))
            .alignment(Alignment::Center),
            layout[3],
        );
        self.confirm.render(frame, "Confirm Shift");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crossterm::event::KeyModifiers;

    fn press(screen: &mut AssignShift, code: KeyCode) {
        screen
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    #[test]
    fn assigns_the_chosen_shift_after_confirmation() {
        let mut screen = AssignShift::new(demo_context("root"));
        let before = screen.assignments.len();
        press(&mut screen, KeyCode::Enter); // to calendar
        press(&mut screen, KeyCode::Down); // a week ahead
        press(&mut screen, KeyCode::Tab);
        press(&mut screen, KeyCode::Right); // afternoon
        press(&mut screen, KeyCode::Enter);
        assert!(screen.confirm.open);
        press(&mut screen, KeyCode::Char('y'));

        assert_eq!(screen.assignments.len(), before + 1);
        let added = screen
            .assignments
            .iter()
            .find(|a| a.date == screen.picker.selected)
            .unwrap();
        assert_eq!(added.shift, Shift::Afternoon);
    }
}
