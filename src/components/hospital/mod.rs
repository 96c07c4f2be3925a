//! Hospital feature screens.
//!
//! Every screen talks to the database through the shared [`Hospital`]
//! service on behalf of the signed-in session.

use crate::app::SelectedApp;
use crate::auth::Session;
use crate::components::Component;
use crate::service::Hospital;
use crate::tui::Frame;
use anyhow::{bail, Result};
use crossterm::event::KeyEvent;
use std::rc::Rc;

pub mod appointments;
pub mod finance;
pub mod inventory;
pub mod notifications;
pub mod patients;
pub mod records;
pub mod reports;
pub mod staff;
pub mod wards;

/// What every screen needs: the service and who is using it.
#[derive(Clone)]
pub struct Context {
    pub hospital: Rc<Hospital>,
    pub session: Session,
}

impl Context {
    pub fn money(&self, amount: f64) -> String {
        self.hospital.format_money(amount)
    }
}

/// The feature screen currently open on top of the home screen.
pub struct HospitalApp {
    screen: Box<dyn Component>,
}

impl HospitalApp {
    pub fn open(hospital: Rc<Hospital>, session: Session, selected: SelectedApp) -> Result<Self> {
        let ctx = Context { hospital, session };
        let screen: Box<dyn Component> = match selected {
            SelectedApp::PatientList => Box::new(patients::Patients::new(
                ctx,
                patients::PatientsState::ListPatients,
            )),
            SelectedApp::PatientAdd => Box::new(patients::Patients::new(
                ctx,
                patients::PatientsState::AddPatient,
            )),
            SelectedApp::StaffList => Box::new(staff::Staff::new(ctx, staff::StaffState::ListStaff)),
            SelectedApp::StaffAdd => Box::new(staff::Staff::new(ctx, staff::StaffState::AddStaff)),
            SelectedApp::StaffAssign => {
                Box::new(staff::Staff::new(ctx, staff::StaffState::AssignShift))
            }
            SelectedApp::AppointmentBook => Box::new(appointments::Appointments::new(
                ctx,
                appointments::AppointmentsState::Book,
            )),
            SelectedApp::AppointmentList => Box::new(appointments::Appointments::new(
                ctx,
                appointments::AppointmentsState::List,
            )),
            SelectedApp::RecordList => {
                Box::new(records::Records::new(ctx, records::RecordsState::List))
            }
            SelectedApp::RecordStore => {
                Box::new(records::Records::new(ctx, records::RecordsState::Store))
            }
            SelectedApp::BillingInvoice => {
                Box::new(finance::Finance::new(ctx, finance::FinanceState::Invoice))
            }
            SelectedApp::BillingView => {
                Box::new(finance::Finance::new(ctx, finance::FinanceState::View))
            }
            SelectedApp::Wards => Box::new(wards::Wards::new(ctx)),
            SelectedApp::Inventory => Box::new(inventory::InventoryScreen::new(ctx)),
            SelectedApp::Reports => Box::new(reports::ReportsScreen::new(ctx)),
            SelectedApp::Notifications => Box::new(notifications::NotificationsScreen::new(ctx)),
            SelectedApp::Register | SelectedApp::None | SelectedApp::Quit => {
                bail!("{selected:?} is not a hospital screen")
            }
        };
        tracing::debug!(screen = ?selected, "Opened screen");
        Ok(Self { screen })
    }
}

impl Component for HospitalApp {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        self.screen.handle_input(event)
    }

    fn render(&self, frame: &mut Frame) {
        self.screen.render(frame);
    }

    fn tick(&mut self) {
        self.screen.tick();
    }
}
