//! Medical records: visit history and the consultation form.
//!
//! `Records` switches between the history list and the form used to record
//! or amend an outpatient visit. Admissions show up in the history too but are
//! created from the ward screen.

use crate::app::SelectedApp;
use crate::components::hospital::Context;
use crate::components::Component;
use crate::models::Visit;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;

pub mod list;
pub mod store;

use list::ListRecords;
use store::StoreRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordAction {
    BackToHome,
    /// Leave the form; goes home when the form was opened from the menu.
    BackToList,
    Store,
    Edit(Visit),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordsState {
    List,
    Store,
}

pub struct Records {
    ctx: Context,
    list: ListRecords,
    /// The open form, if any.
    form: Option<StoreRecord>,
    started_on_list: bool,
}

impl Records {
    pub fn new(ctx: Context, state: RecordsState) -> Self {
        let list = ListRecords::new(ctx.clone());
        let form = match state {
            RecordsState::Store => Some(StoreRecord::new(ctx.clone())),
            RecordsState::List => None,
        };
        Self {
            ctx,
            list,
            form,
            started_on_list: state == RecordsState::List,
        }
    }

    #[cfg(test)]
    fn state(&self) -> RecordsState {
        if self.form.is_some() {
            RecordsState::Store
        } else {
            RecordsState::List
        }
    }
}

impl Component for Records {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        let action = match self.form.as_mut() {
            Some(form) => form.handle_input(event)?,
            None => self.list.handle_input(event)?,
        };

        match action {
            Some(RecordAction::BackToHome) => return Ok(Some(SelectedApp::None)),
            Some(RecordAction::BackToList) => {
                if !self.started_on_list {
                    return Ok(Some(SelectedApp::None));
                }
                self.form = None;
                self.list.fetch_visits();
            }
            Some(RecordAction::Store) => self.form = Some(StoreRecord::new(self.ctx.clone())),
            Some(RecordAction::Edit(visit)) => {
                self.form = Some(StoreRecord::edit(self.ctx.clone(), visit))
            }
            None => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        match &self.form {
            Some(form) => form.render(frame),
            None => self.list.render(frame),
        }
    }

    fn tick(&mut self) {
        match self.form.as_mut() {
            Some(form) => form.tick(),
            None => self.list.tick(),
        }
    }
}
