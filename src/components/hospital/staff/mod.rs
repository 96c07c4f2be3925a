//! Staff management: directory, hiring and shift planning.

use crate::app::SelectedApp;
use crate::components::hospital::Context;
use crate::components::Component;
use crate::tui::Frame;
use anyhow::Result;
use crate::models::StaffMember;
use crossterm::event::KeyEvent;

pub mod add;
pub mod assign;
pub mod list;

use add::AddStaff;
use assign::AssignShift;
use list::ListStaff;

#[derive(Debug, Clone, PartialEq)]
pub enum StaffAction {
    BackToHome,
    BackToList,
    Add,
    Edit(StaffMember),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffState {
    ListStaff,
    AddStaff,
    AssignShift,
}

pub struct Staff {
    ctx: Context,
    pub state: StaffState,
    list_staff: Option<ListStaff>,
    add_staff: Option<AddStaff>,
    assign_shift: Option<AssignShift>,
    started_on_list: bool,
}

impl Staff {
    pub fn new(ctx: Context, state: StaffState) -> Self {
        let mut staff = Self {
            ctx,
            state,
            list_staff: None,
            add_staff: None,
            assign_shift: None,
            started_on_list: state == StaffState::ListStaff,
        };
        staff.set_state(state);
        staff
    }

    /// Switches views, creating the target component fresh.
    pub fn set_state(&mut self, state: StaffState) {
        self.state = state;
        match state {
            StaffState::ListStaff => match self.list_staff.as_mut() {
                Some(list) => list.fetch_staff(),
                None => self.list_staff = Some(ListStaff::new(self.ctx.clone())),
            },
            StaffState::AddStaff => self.add_staff = Some(AddStaff::new(self.ctx.clone())),
            StaffState::AssignShift => {
                self.assign_shift = Some(AssignShift::new(self.ctx.clone()))
            }
        }
    }
}

impl Component for Staff {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        let action = match self.state {
            StaffState::ListStaff => match self.list_staff.as_mut() {
                Some(list) => list.handle_input(event)?,
                None => Some(StaffAction::BackToHome),
            },
            StaffState::AddStaff => match self.add_staff.as_mut() {
                Some(add) => add.handle_input(event)?,
                None => Some(StaffAction::BackToHome),
            },
            StaffState::AssignShift => match self.assign_shift.as_mut() {
                Some(assign) => assign.handle_input(event)?,
                None => Some(StaffAction::BackToHome),
            },
        };

        match action {
            Some(StaffAction::BackToHome) => return Ok(Some(SelectedApp::None)),
            Some(StaffAction::BackToList) => {
                if !self.started_on_list {
                    return Ok(Some(SelectedApp::None));
                }
                self.add_staff = None;
                self.set_state(StaffState::ListStaff);
            }
            Some(StaffAction::Add) => self.set_state(StaffState::AddStaff),
            Some(StaffAction::Edit(member)) => {
                self.add_staff = Some(AddStaff::edit(self.ctx.clone(), member));
                self.state = StaffState::AddStaff;
            }
            None => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        match self.state {
            StaffState::ListStaff => {
                if let Some(list) = &self.list_staff {
                    list.render(frame);
                }
            }
            StaffState::AddStaff => {
                if let Some(add) = &self.add_staff {
                    add.render(frame);
                }
            }
            StaffState::AssignShift => {
                if let Some(assign) = &self.assign_shift {
                    assign.render(frame);
                }
            }
        }
    }

    fn tick(&mut self) {
        match self.state {
            StaffState::ListStaff => {
                if let Some(list) = self.list_staff.as_mut() {
                    list.tick();
                }
            }
            StaffState::AddStaff => {
                if let Some(add) = self.add_staff.as_mut() {
                    add.tick();
                }
            }
            StaffState::AssignShift => {
                if let Some(assign) = self.assign_shift.as_mut() {
                    assign.tick();
                }
            }
        }
    }
}
