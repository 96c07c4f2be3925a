//! Appointment booking and the appointment book.

use crate::app::SelectedApp;
use crate::components::hospital::Context;
use crate::components::Component;
use crate::models::Appointment;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;

pub mod book;
pub mod list;

use book::BookAppointment;
use list::ListAppointments;

#[derive(Debug, Clone, PartialEq)]
pub enum AppointmentAction {
    BackToHome,
    BackToList,
    Book,
    Reschedule(Appointment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentsState {
    Book,
    List,
}

pub struct Appointments {
    ctx: Context,
    pub state: AppointmentsState,
    list: Option<ListAppointments>,
    book: Option<BookAppointment>,
    started_on_list: bool,
}

impl Appointments {
    pub fn new(ctx: Context, state: AppointmentsState) -> Self {
        let mut appointments = Self {
            ctx,
            state,
            list: None,
            book: None,
            started_on_list: state == AppointmentsState::List,
        };
        match state {
            AppointmentsState::List => {
                appointments.list = Some(ListAppointments::new(appointments.ctx.clone()))
            }
            AppointmentsState::Book => {
                appointments.book = Some(BookAppointment::new(appointments.ctx.clone()))
            }
        }
        appointments
    }

    fn show_list(&mut self) {
        self.book = None;
        self.state = AppointmentsState::List;
        match self.list.as_mut() {
            Some(list) => list.fetch_appointments(),
            None => self.list = Some(ListAppointments::new(self.ctx.clone())),
        }
    }
}

impl Component for Appointments {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        let action = match self.state {
            AppointmentsState::List => match self.list.as_mut() {
                Some(list) => list.handle_input(event)?,
                None => Some(AppointmentAction::BackToHome),
            },
            AppointmentsState::Book => match self.book.as_mut() {
                Some(book) => book.handle_input(event)?,
                None => Some(AppointmentAction::BackToHome),
            },
        };

        match action {
            Some(AppointmentAction::BackToHome) => return Ok(Some(SelectedApp::None)),
            Some(AppointmentAction::BackToList) => {
                if !self.started_on_list {
                    return Ok(Some(SelectedApp::None));
                }
                self.show_list();
            }
            Some(AppointmentAction::Book) => {
                self.book = Some(BookAppointment::new(self.ctx.clone()));
                self.state = AppointmentsState::Book;
            }
            Some(AppointmentAction::Reschedule(appointment)) => {
                self.book = Some(BookAppointment::reschedule(self.ctx.clone(), appointment));
                self.state = AppointmentsState::Book;
            }
            None => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        match self.state {
            AppointmentsState::List => {
                if let Some(list) = &self.list {
                    list.render(frame);
                }
            }
            AppointmentsState::Book => {
                if let Some(book) = &self.book {
                    book.render(frame);
                }
            }
        }
    }

    fn tick(&mut self) {
        match self.state {
            AppointmentsState::List => {
                if let Some(list) = self.list.as_mut() {
                    list.tick();
                }
            }
            AppointmentsState::Book => {
                if let Some(book) = self.book.as_mut() {
                    book.tick();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn booking_from_the_list_returns_to_it() {
        let mut screen = Appointments::new(demo_context("pam"), AppointmentsState::List);
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        screen.handle_input(key(KeyCode::Char('b'))).unwrap();
        assert_eq!(screen.state, AppointmentsState::Book);
        assert_eq!(screen.handle_input(key(KeyCode::Esc)).unwrap(), None);
        assert_eq!(screen.state, AppointmentsState::List);
        assert_eq!(
            screen.handle_input(key(KeyCode::Esc)).unwrap(),
            Some(SelectedApp::None)
        );
    }
}
