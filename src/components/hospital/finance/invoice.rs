//! Invoice builder.
//!
//! First a patient is picked from a searchable table, then line items are
//! added one by one while the totals update live.

use crate::billing::InvoiceTotals;
use crate::components::hospital::finance::FinanceAction;
use crate::components::hospital::Context;
use crate::components::widgets::{
    self, Flash, ACCENT, DANGER, FOCUS, MUTED, SUCCESS, TEXT, TITLE,
};
use crate::models::{InvoiceItem, Patient};
use crate::service::NewInvoice;
use crate::tui::Frame;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStage {
    SelectingPatient,
    EnteringDetails,
}

const DESCRIPTION: usize = 0;
const QUANTITY: usize = 1;
const UNIT_PRICE: usize = 2;
const ADD_ITEM: usize = 3;
const ITEMS: usize = 4;
const DISCOUNT: usize = 5;
const TAX: usize = 6;
const VISIT: usize = 7;
const CREATE: usize = 8;
const BACK: usize = 9;
const FOCUS_COUNT: usize = 10;

const INPUT_LABELS: [&str; 8] = [
    " Item description ",
    " Quantity ",
    " Unit price ",
    "",
    "",
    " Discount % ",
    " Tax % ",
    " Visit ID (optional) ",
];

pub struct InvoiceComponent {
    ctx: Context,
    patients: Vec<Patient>,
    filtered: Vec<Patient>,
    search: String,
    table_state: TableState,
    patient: Option<Patient>,
    stage: InvoiceStage,
    /// Text inputs, indexed like the focus positions.
    inputs: [String; 8],
    items: Vec<InvoiceItem>,
    item_state: TableState,
    focus: usize,
    flash: Flash,
}

impl InvoiceComponent {
    pub fn new(ctx: Context) -> Self {
        let mut screen = Self {
            ctx,
            patients: Vec::new(),
            filtered: Vec::new(),
            search: String::new(),
            table_state: TableState::default(),
            patient: None,
            stage: InvoiceStage::SelectingPatient,
            inputs: Default::default(),
            items: Vec::new(),
            item_state: TableState::default(),
            focus: DESCRIPTION,
            flash: Flash::default(),
        };
        screen.reset_details();
        screen.load_patients();
        screen
    }

    pub fn load_patients(&mut self) {
        match self.ctx.hospital.patients(&self.ctx.session) {
            Ok(patients) => {
                self.patients = patients;
                self.filter_patients();
            }
            Err(e) => self.flash.error(format!("Failed to load patients: {e}")),
        }
    }

    fn filter_patients(&mut self) {
        let term = self.search.to_lowercase();
        self.filtered = self
            .patients
            .iter()
            .filter(|p| {
                term.is_empty()
                    || p.full_name().to_lowercase().contains(&term)
                    || p.id.to_string() == term
            })
            .cloned()
            .collect();
        self.table_state
            .select(if self.filtered.is_empty() { None } else { Some(0) });
    }

    fn reset_details(&mut self) {
        self.inputs = Default::default();
        self.inputs[QUANTITY] = "1".to_string();
        self.inputs[DISCOUNT] = "0".to_string();
        self.inputs[TAX] = "0".to_string();
        self.items.clear();
        self.item_state.select(None);
        self.focus = DESCRIPTION;
    }

    fn percent(&self, index: usize) -> f64 {
        self.inputs[index].trim().parse().unwrap_or(0.0)
    }

    pub fn totals(&self) -> InvoiceTotals {
        InvoiceTotals::compute(&self.items, self.percent(DISCOUNT), self.percent(TAX))
    }

    fn add_item(&mut self) {
        let description = self.inputs[DESCRIPTION].trim().to_string();
        if description.is_empty() {
            self.flash.error("Item description cannot be empty");
            return;
        }
        let Ok(quantity) = self.inputs[QUANTITY].trim().parse::<u32>() else {
            self.flash.error("Quantity must be a whole number");
            return;
        };
        let Ok(unit_price) = self.inputs[UNIT_PRICE].trim().parse::<f64>() else {
            self.flash.error("Unit price must be a number");
            return;
        };
        if quantity == 0 || !unit_price.is_finite() || unit_price < 0.0 {
            self.flash
                .error("Quantity must be positive and the price not negative");
            return;
        }
        self.items.push(InvoiceItem {
            description,
            quantity,
            unit_price,
        });
        self.item_state.select(Some(self.items.len() - 1));
        self.inputs[DESCRIPTION].clear();
        self.inputs[QUANTITY] = "1".to_string();
        self.inputs[UNIT_PRICE].clear();
        self.focus = DESCRIPTION;
        self.flash.clear();
    }

    fn remove_item(&mut self) {
        if let Some(i) = self.item_state.selected() {
            if i < self.items.len() {
                self.items.remove(i);
            }
            widgets::clamp_selection(&mut self.item_state, self.items.len());
        }
    }

    fn create(&mut self) {
        let Some(patient) = self.patient.clone() else {
            self.stage = InvoiceStage::SelectingPatient;
            return;
        };
        let (Ok(discount_percent), Ok(tax_percent)) = (
            self.inputs[DISCOUNT].trim().parse::<f64>(),
            self.inputs[TAX].trim().parse::<f64>(),
        ) else {
            self.flash.error("Discount and tax must be numbers");
            return;
        };
        let visit_id = match self.inputs[VISIT].trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    self.flash.error("Visit ID must be a number");
                    return;
                }
            },
        };
        let request = NewInvoice {
            patient_id: patient.id,
            visit_id,
            items: self.items.clone(),
            discount_percent,
            tax_percent,
        };
        match self.ctx.hospital.create_invoice(&self.ctx.session, &request) {
            Ok(invoice) => {
                self.flash.success(format!(
                    "Invoice {} issued to {} for {}",
                    invoice.invoice_number,
                    patient.full_name(),
                    self.ctx.money(invoice.total)
                ));
                self.reset_details();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    fn handle_patient_selection(&mut self, key: KeyEvent) -> Option<FinanceAction> {
        match key.code {
            KeyCode::Esc => return Some(FinanceAction::BackToList),
            KeyCode::Down => widgets::select_next(&mut self.table_state, self.filtered.len()),
            KeyCode::Up => widgets::select_previous(&mut self.table_state, self.filtered.len()),
            KeyCode::Enter => {
                if let Some(patient) = self
                    .table_state
                    .selected()
                    .and_then(|i| self.filtered.get(i))
                {
                    self.patient = Some(patient.clone());
                    self.stage = InvoiceStage::EnteringDetails;
                    self.reset_details();
                }
            }
            KeyCode::Char(c) => {
                self.search.push(c);
                self.filter_patients();
            }
            KeyCode::Backspace => {
                self.search.pop();
                self.filter_patients();
            }
            _ => {}
        }
        None
    }

    fn handle_details(&mut self, key: KeyEvent) -> Option<FinanceAction> {
        match key.code {
            KeyCode::Esc => {
                self.stage = InvoiceStage::SelectingPatient;
                return None;
            }
            KeyCode::Tab => {
                self.focus = (self.focus + 1) % FOCUS_COUNT;
                return None;
            }
            KeyCode::BackTab => {
                self.focus = (self.focus + FOCUS_COUNT - 1) % FOCUS_COUNT;
                return None;
            }
            _ => {}
        }

        match self.focus {
            ITEMS => match key.code {
                KeyCode::Down => widgets::select_next(&mut self.item_state, self.items.len()),
                KeyCode::Up => widgets::select_previous(&mut self.item_state, self.items.len()),
                KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('d') => self.remove_item(),
                KeyCode::Enter => self.focus = DISCOUNT,
                _ => {}
            },
            ADD_ITEM | CREATE | BACK => match key.code {
                KeyCode::Enter => match self.focus {
                    ADD_ITEM => self.add_item(),
                    CREATE => self.create(),
                    _ => self.stage = InvoiceStage::SelectingPatient,
                },
                KeyCode::Down => self.focus = (self.focus + 1) % FOCUS_COUNT,
                KeyCode::Up => self.focus = (self.focus + FOCUS_COUNT - 1) % FOCUS_COUNT,
                _ => {}
            },
            field => match key.code {
                KeyCode::Char(c) => self.inputs[field].push(c),
                KeyCode::Backspace => {
                    self.inputs[field].pop();
                }
                KeyCode::Enter | KeyCode::Down => self.focus = (self.focus + 1) % FOCUS_COUNT,
                KeyCode::Up => self.focus = (self.focus + FOCUS_COUNT - 1) % FOCUS_COUNT,
                _ => {}
            },
        }
        None
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<FinanceAction>> {
        self.tick();
        Ok(match self.stage {
            InvoiceStage::SelectingPatient => self.handle_patient_selection(key),
            InvoiceStage::EnteringDetails => self.handle_details(key),
        })
    }

    fn render_patient_selection(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(5)])
            .split(area);
        frame.render_widget(
            widgets::input(" Search patient ".to_string(), self.search.clone(), true),
            layout[0],
        );
        let rows = self.filtered.iter().map(|p| {
            Row::new(vec![
                Cell::from(p.id.to_string()),
                Cell::from(p.full_name()),
                Cell::from(p.phone_number.clone()),
                Cell::from(p.email.clone().unwrap_or_default()),
            ])
            .style(Style::default().fg(TEXT))
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Percentage(35),
                Constraint::Percentage(25),
                Constraint::Min(10),
            ],
        )
        .header(widgets::table_header(&["ID", "Name", "Phone", "Email"]))
        .block(widgets::panel("Bill to", true))
        .row_highlight_style(widgets::row_highlight(true))
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, layout[1], &mut self.table_state.clone());
    }

    fn render_details(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .spacing(1)
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
            ])
            .split(columns[0]);

        frame.render_widget(
            widgets::input(
                INPUT_LABELS[DESCRIPTION].to_string(),
                self.inputs[DESCRIPTION].clone(),
                self.focus == DESCRIPTION,
            ),
            left[0],
        );
        let entry = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Percentage(40),
                Constraint::Percentage(30),
            ])
            .spacing(1)
            .split(left[1]);
        for (slot, index) in [(0, QUANTITY), (1, UNIT_PRICE)] {
            frame.render_widget(
                widgets::input(
                    INPUT_LABELS[index].to_string(),
                    self.inputs[index].clone(),
                    self.focus == index,
                ),
                entry[slot],
            );
        }
        frame.render_widget(
            widgets::button("+ Add Item", self.focus == ADD_ITEM, SUCCESS),
            entry[2],
        );

        let adjust = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(30),
                Constraint::Percentage(30),
                Constraint::Percentage(40),
            ])
            .spacing(1)
            .split(left[2]);
        for (slot, index) in [(0, DISCOUNT), (1, TAX), (2, VISIT)] {
            frame.render_widget(
                widgets::input(
                    INPUT_LABELS[index].to_string(),
                    self.inputs[index].clone(),
                    self.focus == index,
                ),
                adjust[slot],
            );
        }

        let rows = self.items.iter().map(|item| {
            Row::new(vec![
                Cell::from(item.description.clone()),
                Cell::from(item.quantity.to_string()),
                Cell::from(self.ctx.money(item.unit_price)),
                Cell::from(self.ctx.money(item.line_total())),
            ])
            .style(Style::default().fg(TEXT))
        });
        let items = Table::new(
            rows,
            [
                Constraint::Min(12),
                Constraint::Length(5),
                Constraint::Length(12),
                Constraint::Length(12),
            ],
        )
        .header(widgets::table_header(&["Item", "Qty", "Unit", "Line total"]))
        .block(widgets::panel(
            &format!("Items ({})", self.items.len()),
            self.focus == ITEMS,
        ))
        .row_highlight_style(widgets::row_highlight(self.focus == ITEMS))
        .highlight_symbol("► ");
        frame.render_stateful_widget(items, left[3], &mut self.item_state.clone());

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(9),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(columns[1]);

        let totals = self.totals();
        let line = |label: &'static str, amount: String, color: Color| {
            Line::from(vec![
                Span::styled(format!("{label:<12}"), Style::default().fg(MUTED)),
                Span::styled(amount, Style::default().fg(color)),
            ])
        };
        let patient = self
            .patient
            .as_ref()
            .map(Patient::full_name)
            .unwrap_or_default();
        let summary = vec![
            Line::from(Span::styled(
                patient,
                Style::default().fg(TITLE).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            line("Subtotal", self.ctx.money(totals.subtotal), TEXT),
            line(
                "Discount",
                format!("-{}", self.ctx.money(totals.discount_amount)),
                DANGER,
            ),
            line("Taxable", self.ctx.money(totals.taxable), TEXT),
            line("Tax", self.ctx.money(totals.tax_amount), TEXT),
            Line::from(Span::styled("─".repeat(24), Style::default().fg(MUTED))),
            Line::from(vec![
                Span::styled(format!("{:<12}", "Total"), Style::default().fg(ACCENT)),
                Span::styled(
                    self.ctx.money(totals.total),
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ),
            ]),
        ];
        frame.render_widget(
            Paragraph::new(summary).block(widgets::panel("Summary", false)),
            right[0],
        );
        frame.render_widget(
            widgets::button("Create Invoice", self.focus == CREATE, ACCENT),
            right[1],
        );
        frame.render_widget(
            widgets::button("Change Patient", self.focus == BACK, DANGER),
            right[2],
        );
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(16),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        widgets::render_header(frame, layout[0], "💰 New Invoice");
        let help = match self.stage {
            InvoiceStage::SelectingPatient => {
                self.render_patient_selection(frame, layout[1]);
                "Type to search | ↑↓: Select | Enter: Bill this patient | Esc: Back"
            }
            InvoiceStage::EnteringDetails => {
                self.render_details(frame, layout[1]);
                "Tab/↑↓: Move | Enter: Next/Activate | d: Remove item | Esc: Change patient"
            }
        };
        self.flash.render(frame, layout[2]);
        frame.render_widget(
            Paragraph::new(help)
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
    use crossterm::event::KeyModifiers;

    fn press(screen: &mut InvoiceComponent, code: KeyCode) -> Option<FinanceAction> {
        screen
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    fn type_text(screen: &mut InvoiceComponent, text: &str) {
        for c in text.chars() {
            press(screen, KeyCode::Char(c));
        }
    }

    #[test]
    fn builds_and_issues_an_invoice() {
        let ctx = demo_context("pam");
        let mut screen = InvoiceComponent::new(ctx.clone());
        type_text(&mut screen, "turing");
        assert_eq!(screen.filtered.len(), 1);
        press(&mut screen, KeyCode::Enter);
        assert_eq!(screen.stage, InvoiceStage::EnteringDetails);

        type_text(&mut screen, "Consultation");
        press(&mut screen, KeyCode::Enter);
        press(&mut screen, KeyCode::Backspace);
        type_text(&mut screen, "2");
        press(&mut screen, KeyCode::Enter);
        type_text(&mut screen, "50");
        press(&mut screen, KeyCode::Enter);
        press(&mut screen, KeyCode::Enter); // add item
        assert_eq!(screen.items.len(), 1);
        assert_eq!(screen.items[0].line_total(), 100.0);

        screen.inputs[DISCOUNT] = "10".into();
        screen.inputs[TAX] = "5".into();
        let totals = screen.totals();
        assert!((totals.total - 94.5).abs() < 1e-9);

        let patient_id = screen.patient.as_ref().unwrap().id;
        let before = ctx
            .hospital
            .invoices_for_patient(&ctx.session, patient_id)
            .unwrap()
            .len();
        screen.focus = CREATE;
        press(&mut screen, KeyCode::Enter);
        assert!(screen.flash.error_message().is_none(), "{:?}", screen.flash.error_message());
        assert!(screen.items.is_empty());
        let after = ctx.hospital.invoices_for_patient(&ctx.session, patient_id).unwrap();
        assert_eq!(after.len(), before + 1);
    }

    #[test]
    fn empty_invoices_are_refused() {
        let mut screen = InvoiceComponent::new(demo_context("pam"));
        press(&mut screen, KeyCode::Enter);
        screen.focus = CREATE;
        press(&mut screen, KeyCode::Enter);
        assert!(screen.flash.error_message().is_some());
    }

    #[test]
    fn bad_item_input_is_reported() {
        let mut screen = InvoiceComponent::new(demo_context("pam"));
        press(&mut screen, KeyCode::Enter);
        screen.inputs[DESCRIPTION] = "X-ray".into();
        screen.inputs[UNIT_PRICE] = "cheap".into();
        screen.focus = ADD_ITEM;
        press(&mut screen, KeyCode::Enter);
        assert!(screen.items.is_empty());
        assert!(screen.flash.error_message().is_some());
    }

    #[test]
    fn removes_the_selected_item() {
        let mut screen = InvoiceComponent::new(demo_context("pam"));
        press(&mut screen, KeyCode::Enter);
        for name in ["A", "B"] {
            screen.inputs[DESCRIPTION] = name.into();
            screen.inputs[UNIT_PRICE] = "1".into();
            screen.add_item();
        }
        screen.focus = ITEMS;
        press(&mut screen, KeyCode::Char('d'));
        assert_eq!(screen.items.len(), 1);
        assert_eq!(screen.items[0].description, "A");
    }
}
