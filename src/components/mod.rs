use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;

pub mod form;
pub mod home;
pub mod hospital;
pub mod login;
pub mod register;
pub mod widgets;

pub trait Component {
    /// Returns `Some` when the screen wants the application to switch views.
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<crate::app::SelectedApp>>;
    fn render(&self, frame: &mut Frame);
    /// Called on every idle tick; used to expire timed messages.
    fn tick(&mut self) {}
}
