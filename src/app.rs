//! The main application state and logic for CareDesk.
//!
//! This module owns the signed-in session and switches between the login,
//! registration, home and feature screens.

use crate::auth::{Credentials, Session};
use crate::components::hospital::HospitalApp;
use crate::components::{home::Home, login::Login, register::Register, Component};
use crate::service::Hospital;
use crate::tui::{self, Tui};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::rc::Rc;

/// Enum representing the different views reachable from the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectedApp {
    PatientList,
    PatientAdd,
    StaffList,
    StaffAdd,
    StaffAssign,
    AppointmentBook,
    AppointmentList,
    RecordList,
    RecordStore,
    BillingInvoice,
    BillingView,
    Wards,
    Inventory,
    Reports,
    Notifications,
    /// The self-registration screen, reachable from login.
    Register,
    /// Leave the current view (back, logout, or a login attempt on the login screen).
    None,
    Quit,
}

/// Enum representing the possible states of the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Init,
    Login,
    Register,
    Home,
    Running(SelectedApp),
}

pub struct App {
    hospital: Rc<Hospital>,
    pub state: AppState,
    pub should_quit: bool,
    session: Option<Session>,
    home: Option<Home>,
    login: Login,
    register: Register,
    /// The feature screen, only present while one is open.
    screen: Option<HospitalApp>,
}

impl App {
    pub fn new(hospital: Rc<Hospital>) -> Self {
        Self {
            register: Register::new(Rc::clone(&hospital)),
            hospital,
            state: AppState::Init,
            should_quit: false,
            session: None,
            home: None,
            login: Login::new(),
            screen: None,
        }
    }

    /// Runs the draw/input loop until the user quits.
    pub fn run(&mut self, tui: &mut Tui) -> Result<()> {
        self.state = AppState::Login;

        while !self.should_quit {
            tui.draw(|frame| self.render_ui(frame))?;
            self.handle_event(tui)?;
        }
        Ok(())
    }

    fn handle_event(&mut self, tui: &mut Tui) -> Result<()> {
        match tui.next_event()? {
            tui::Event::Input(crossterm::event::Event::Key(key)) => {
                // Some terminals report releases and repeats as separate events.
                if key.kind != KeyEventKind::Press {
                    return Ok(());
                }
                if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL)
                {
                    self.should_quit = true;
                    return Ok(());
                }
                self.handle_key(key)?;
            }
            tui::Event::Input(_) => {}
            tui::Event::Tick => self.tick(),
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.state {
            AppState::Init => self.state = AppState::Login,
            AppState::Login => match self.login.handle_input(key)? {
                Some(SelectedApp::Quit) => self.should_quit = true,
                Some(SelectedApp::Register) => {
                    self.register.reset();
                    self.state = AppState::Register;
                }
                Some(SelectedApp::None) => self.attempt_login()?,
                Some(_) => self.login.set_error_message("Please log in first.".to_string()),
                None => {}
            },
            AppState::Register => {
                if self.register.handle_input(key)?.is_some() {
                    self.state = AppState::Login;
                    if self.register.registration_success {
                        self.login.username = self.register.username().to_string();
                        self.login.password.clear();
                        self.login
                            .set_success_message("Registration successful! Please log in.".to_string());
                    }
                }
            }
            AppState::Home => {
                let Some(home) = self.home.as_mut() else {
                    self.state = AppState::Login;
                    return Ok(());
                };
                match home.handle_input(key)? {
                    Some(SelectedApp::Quit) => self.should_quit = true,
                    Some(SelectedApp::None) => self.logout(),
                    Some(SelectedApp::Register) | None => {}
                    Some(selected) => self.open(selected)?,
                }
            }
            AppState::Running(_) => {
                let Some(screen) = self.screen.as_mut() else {
                    self.state = AppState::Home;
                    return Ok(());
                };
                if let Some(SelectedApp::None) = screen.handle_input(key)? {
                    self.screen = None;
                    self.state = AppState::Home;
                    if let Some(home) = self.home.as_mut() {
                        home.refresh();
                    }
                }
            }
        }
        Ok(())
    }

    fn attempt_login(&mut self) -> Result<()> {
        let credentials = Credentials {
            username: self.login.username.trim().to_string(),
            password: self.login.password.clone(),
        };
        match self.hospital.login(&credentials) {
            Ok(session) => {
                self.login.password.clear();
                self.home = Some(Home::new(Rc::clone(&self.hospital), session.clone()));
                self.session = Some(session);
                self.state = AppState::Home;
            }
            Err(err) => {
                tracing::warn!(user = %credentials.username, "Login failed: {err}");
                self.login.set_error_message(err.to_string());
            }
        }
        Ok(())
    }

    fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(user = %session.username, "User logged out");
        }
        self.home = None;
        self.screen = None;
        self.login = Login::new();
        self.state = AppState::Login;
    }

    fn open(&mut self, selected: SelectedApp) -> Result<()> {
        let Some(session) = self.session.clone() else {
            self.state = AppState::Login;
            return Ok(());
        };
        self.screen = Some(HospitalApp::open(
            Rc::clone(&self.hospital),
            session,
            selected,
        )?);
        self.state = AppState::Running(selected);
        Ok(())
    }

    fn tick(&mut self) {
        match self.state {
            AppState::Login => self.login.check_error_timeout(),
            AppState::Register => self.register.tick(),
            AppState::Home => {
                if let Some(home) = self.home.as_mut() {
                    home.tick();
                }
            }
            AppState::Running(_) => {
                if let Some(screen) = self.screen.as_mut() {
                    screen.tick();
                }
            }
            AppState::Init => {}
        }
    }

    fn render_ui(&self, frame: &mut crate::tui::Frame<'_>) {
        match self.state {
            AppState::Init => {}
            AppState::Login => self.login.render(frame),
            AppState::Register => self.register.render(frame),
            AppState::Home => {
                if let Some(home) = &self.home {
                    home.render(frame);
                }
            }
            AppState::Running(_) => {
                if let Some(screen) = &self.screen {
                    screen.render(frame);
                }
            }
        }
    }
}
