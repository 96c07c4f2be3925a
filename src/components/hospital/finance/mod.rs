//! Billing: invoice creation and the invoice ledger with payments.

use crate::app::SelectedApp;
use crate::components::hospital::Context;
use crate::components::Component;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::KeyEvent;

pub mod invoice;
pub mod view;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinanceAction {
    BackToHome,
    BackToList,
    NewInvoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinanceState {
    Invoice,
    View,
}

pub struct Finance {
    ctx: Context,
    pub state: FinanceState,
    invoice: Option<invoice::InvoiceComponent>,
    view_invoices: Option<view::ViewInvoices>,
    started_on_view: bool,
}

impl Finance {
    pub fn new(ctx: Context, state: FinanceState) -> Self {
        let mut finance = Self {
            ctx,
            state,
            invoice: None,
            view_invoices: None,
            started_on_view: state == FinanceState::View,
        };
        finance.set_finance_state(state);
        finance
    }

    pub fn set_finance_state(&mut self, state: FinanceState) {
        self.state = state;
        match state {
            FinanceState::Invoice => match self.invoice.as_mut() {
                Some(invoice) => invoice.load_patients(),
                None => self.invoice = Some(invoice::InvoiceComponent::new(self.ctx.clone())),
            },
            FinanceState::View => match self.view_invoices.as_mut() {
                Some(view) => view.fetch_invoices(),
                None => self.view_invoices = Some(view::ViewInvoices::new(self.ctx.clone())),
            },
        }
    }
}

impl Component for Finance {
    fn handle_input(&mut self, event: KeyEvent) -> Result<Option<SelectedApp>> {
        let action = match self.state {
            FinanceState::Invoice => match self.invoice.as_mut() {
                Some(invoice) => invoice.handle_input(event)?,
                None => Some(FinanceAction::BackToHome),
            },
            FinanceState::View => match self.view_invoices.as_mut() {
                Some(view) => view.handle_input(event)?,
                None => Some(FinanceAction::BackToHome),
            },
        };

        match action {
            Some(FinanceAction::BackToHome) => return Ok(Some(SelectedApp::None)),
            Some(FinanceAction::BackToList) => {
                if !self.started_on_view {
                    return Ok(Some(SelectedApp::None));
                }
                self.invoice = None;
                self.set_finance_state(FinanceState::View);
            }
            Some(FinanceAction::NewInvoice) => self.set_finance_state(FinanceState::Invoice),
            None => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        match self.state {
            FinanceState::Invoice => {
                if let Some(invoice) = &self.invoice {
                    invoice.render(frame);
                }
            }
            FinanceState::View => {
                if let Some(view) = &self.view_invoices {
                    view.render(frame);
                }
            }
        }
    }

    fn tick(&mut self) {
        match self.state {
            FinanceState::Invoice => {
                if let Some(invoice) = self.invoice.as_mut() {
                    invoice.tick();
                }
            }
            FinanceState::View => {
                if let Some(view) = self.view_invoices.as_mut() {
                    view.tick();
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
    fn new_invoice_from_the_ledger_returns_to_it() {
        let mut finance = Finance::new(demo_context("pam"), FinanceState::View);
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        finance.handle_input(key(KeyCode::Char('n'))).unwrap();
        assert_eq!(finance.state, FinanceState::Invoice);
        assert_eq!(finance.handle_input(key(KeyCode::Esc)).unwrap(), None);
        assert_eq!(finance.state, FinanceState::View);
    }
}
