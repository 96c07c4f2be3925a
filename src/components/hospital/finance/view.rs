use crate::auth::Permission;
use crate::components::hospital::finance::FinanceAction;
use crate::components::hospital::Context;
use crate::components::widgets::{
    self, Flash, ACCENT, BORDER, DANGER, FOCUS, INPUT_BG, MUTED, PANEL, SUCCESS, TEXT, TITLE,
    WARNING,
};
use crate::models::{Invoice, InvoiceStatus, Payment, PaymentMethod, UserRole};
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use std::collections::HashMap;

fn status_color(status: InvoiceStatus) -> Color {
    match status {
        InvoiceStatus::Paid => SUCCESS,
        InvoiceStatus::Pending => WARNING,
        InvoiceStatus::Overdue => DANGER,
    }
}

/// Amount and method entry for a payment against the selected invoice.
#[derive(Debug, Default)]
struct PaymentDialog {
    open: bool,
    amount: String,
    method: usize,
    on_method: bool,
}

impl PaymentDialog {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::ALL
            .get(self.method)
            .copied()
            .unwrap_or(PaymentMethod::Cash)
    }
}

pub struct ViewInvoices {
    ctx: Context,
    invoices: Vec<Invoice>,
    filtered: Vec<Invoice>,
    patient_names: HashMap<i64, String>,
    payments: Vec<Payment>,
    search: String,
    searching: bool,
    state: TableState,
    dialog: PaymentDialog,
    flash: Flash,
}

impl ViewInvoices {
    pub fn new(ctx: Context) -> Self {
        if let Err(e) = ctx.hospital.refresh_overdue(utils::today()) {
            tracing::warn!("Could not refresh overdue invoices: {e}");
        }
        let mut view = Self {
            ctx,
            invoices: Vec::new(),
            filtered: Vec::new(),
            patient_names: HashMap::new(),
            payments: Vec::new(),
            search: String::new(),
            searching: false,
            state: TableState::default(),
            dialog: PaymentDialog::default(),
            flash: Flash::default(),
        };
        view.fetch_invoices();
        view
    }

    fn can_bill(&self) -> bool {
        self.ctx.session.can(Permission::ManageBilling)
    }

    pub fn fetch_invoices(&mut self) {
        let hospital = &self.ctx.hospital;
        let session = &self.ctx.session;
        let own = session.patient_id.filter(|_| session.role == UserRole::Patient);
        let (invoices, patients) = match own {
            Some(own) => (
                hospital.invoices_for_patient(session, own),
                hospital.patient(session, own).map(|p| vec![p]),
            ),
            None => (hospital.invoices(session), hospital.patients(session)),
        };
        if let Ok(patients) = patients {
            self.patient_names = patients.into_iter().map(|p| (p.id, p.full_name())).collect();
        }
        match invoices {
            Ok(invoices) => {
                self.invoices = invoices;
                self.filter_invoices();
            }
            Err(e) => self.flash.error(format!("Failed to fetch invoices: {e}")),
        }
    }

    fn patient_name(&self, id: i64) -> String {
        self.patient_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Patient #{id}"))
    }

    fn filter_invoices(&mut self) {
        let term = self.search.to_lowercase();
        self.filtered = self
            .invoices
            .iter()
            .filter(|invoice| {
                term.is_empty()
                    || invoice.invoice_number.to_lowercase().contains(&term)
                    || invoice.status.as_str().contains(&term)
                    || self
                        .patient_names
                        .get(&invoice.patient_id)
                        .is_some_and(|name| name.to_lowercase().contains(&term))
            })
            .cloned()
            .collect();
        widgets::clamp_selection(&mut self.state, self.filtered.len());
        self.load_payments();
    }

    fn selected(&self) -> Option<&Invoice> {
        self.state.selected().and_then(|i| self.filtered.get(i))
    }

    fn load_payments(&mut self) {
        let Some(invoice_id) = self.selected().map(|i| i.id) else {
            self.payments.clear();
            return;
        };
        match self.ctx.hospital.payments_for(&self.ctx.session, invoice_id) {
            Ok(payments) => self.payments = payments,
            Err(e) => {
                self.payments.clear();
                self.flash.error(format!("Failed to load payments: {e}"));
            }
        }
    }

    fn open_payment(&mut self) {
        match self.selected() {
            Some(invoice) if invoice.status != InvoiceStatus::Paid => {
                self.dialog = PaymentDialog {
                    open: true,
                    amount: format!("{:.2}", invoice.balance),
                    ..PaymentDialog::default()
                };
            }
            Some(invoice) => {
                let message = format!("Invoice {} is already paid", invoice.invoice_number);
                self.flash.error(message);
            }
            None => {}
        }
    }

    fn pay(&mut self) {
        let Some(invoice_id) = self.selected().map(|i| i.id) else {
            return;
        };
        let Ok(amount) = self.dialog.amount.trim().parse::<f64>() else {
            self.flash.error("Amount must be a number");
            return;
        };
        let method = self.dialog.method();
        match self
            .ctx
            .hospital
            .record_payment(&self.ctx.session, invoice_id, amount, method)
        {
            Ok(invoice) => {
                self.dialog.open = false;
                self.flash.success(format!(
                    "{} received by {method}, balance {}",
                    self.ctx.money(amount),
                    self.ctx.money(invoice.balance.max(0.0))
                ));
                self.fetch_invoices();
            }
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    pub fn tick(&mut self) {
        self.flash.check_timeout();
    }

    fn handle_dialog(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.dialog.open = false,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.dialog.on_method = !self.dialog.on_method
            }
            KeyCode::Enter => self.pay(),
            KeyCode::Left if self.dialog.on_method => {
                let len = PaymentMethod::ALL.len();
                self.dialog.method = (self.dialog.method + len - 1) % len;
            }
            KeyCode::Right if self.dialog.on_method => {
                self.dialog.method = (self.dialog.method + 1) % PaymentMethod::ALL.len();
            }
            KeyCode::Char(c) if !self.dialog.on_method && (c.is_ascii_digit() || c == '.') => {
                self.dialog.amount.push(c)
            }
            KeyCode::Backspace if !self.dialog.on_method => {
                self.dialog.amount.pop();
            }
            _ => {}
        }
    }

    pub fn handle_input(&mut self, key: KeyEvent) -> Result<Option<FinanceAction>> {
        self.tick();
        if self.dialog.open {
            self.handle_dialog(key);
            return Ok(None);
        }
        if self.searching {
            match key.code {
                KeyCode::Char(c) => {
                    self.search.push(c);
                    self.filter_invoices();
                }
                KeyCode::Backspace => {
                    self.search.pop();
                    self.filter_invoices();
                }
                KeyCode::Enter | KeyCode::Esc | KeyCode::Down => self.searching = false,
                _ => {}
            }
            return Ok(None);
        }

        match key.code {
            KeyCode::Esc if !self.search.is_empty() => {
                self.search.clear();
                self.filter_invoices();
            }
            KeyCode::Esc => return Ok(Some(FinanceAction::BackToHome)),
            KeyCode::Down => {
                widgets::select_next(&mut self.state, self.filtered.len());
                self.load_payments();
            }
            KeyCode::Up => {
                widgets::select_previous(&mut self.state, self.filtered.len());
                self.load_payments();
            }
            KeyCode::Char('/') | KeyCode::Char('s') => self.searching = true,
            KeyCode::Char('r') => self.fetch_invoices(),
            KeyCode::Char('n') if self.can_bill() => return Ok(Some(FinanceAction::NewInvoice)),
            KeyCode::Char('p') if self.can_bill() => self.open_payment(),
            _ => {}
        }
        Ok(None)
    }

    fn detail_lines(&self, invoice: &Invoice) -> Vec<Line<'static>> {
        let muted = Style::default().fg(MUTED);
        let text = Style::default().fg(TEXT);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Patient: ", muted),
                Span::styled(self.patient_name(invoice.patient_id), text),
            ]),
            Line::from(vec![
                Span::styled("Issued: ", muted),
                Span::styled(utils::format_date(invoice.issued_on), text),
                Span::styled("  Due: ", muted),
                Span::styled(
                    utils::format_date(invoice.due_date),
                    Style::default().fg(status_color(invoice.status)),
                ),
            ]),
            Line::from(""),
        ];
        for item in &invoice.items {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("{} x{} ", item.description, item.quantity),
                    text,
                ),
                Span::styled(self.ctx.money(item.line_total()), muted),
            ]));
        }
        lines.push(Line::from(""));
        let amount = |label: &'static str, value: f64| {
            Line::from(vec![
                Span::styled(format!("{label:<10}"), muted),
                Span::styled(self.ctx.money(value), text),
            ])
        };
        lines.push(amount("Subtotal", invoice.subtotal));
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", "Discount"), muted),
            Span::styled(
                format!(
                    "-{} ({}%)",
                    self.ctx.money(invoice.discount_amount),
                    invoice.discount_percent
                ),
                text,
            ),
        ]));
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", "Tax"), muted),
            Span::styled(
                format!(
                    "{} ({}%)",
                    self.ctx.money(invoice.tax_amount),
                    invoice.tax_percent
                ),
                text,
            ),
        ]));
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", "Total"), Style::default().fg(ACCENT)),
            Span::styled(
                self.ctx.money(invoice.total),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
        ]));
        lines.push(amount("Paid", invoice.amount_paid));
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", "Balance"), muted),
            Span::styled(
                self.ctx.money(invoice.balance.max(0.0)),
                Style::default()
                    .fg(status_color(invoice.status))
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Payments", muted)));
        if self.payments.is_empty() {
            lines.push(Line::from(Span::styled("  none yet", text)));
        }
        for payment in &self.payments {
            lines.push(Line::from(Span::styled(
                format!(
                    "  {}  {}  {}",
                    utils::format_date(payment.paid_on),
                    self.ctx.money(payment.amount),
                    payment.method
                ),
                text,
            )));
        }
        lines
    }

    fn render_dialog(&self, frame: &mut Frame) {
        let Some(invoice) = self.selected() else {
            return;
        };
        let area = widgets::centered_rect(50, 40, frame.area());
        frame.render_widget(Clear, area);
        let block = Block::default()
            .title(format!(" Payment for {} ", invoice.invoice_number))
            .title_style(Style::default().fg(TITLE).add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(BORDER))
            .style(Style::default().bg(PANEL));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
            ])
            .margin(1)
            .split(inner);
        frame.render_widget(
            Paragraph::new(format!(
                "Outstanding: {}",
                self.ctx.money(invoice.balance)
            ))
            .style(Style::default().fg(TEXT).bg(PANEL))
            .alignment(Alignment::Center),
            rows[0],
        );
        frame.render_widget(
            widgets::input(
                " Amount ".to_string(),
                self.dialog.amount.clone(),
                !self.dialog.on_method,
            ),
            rows[1],
        );
        let methods: Vec<Span> = PaymentMethod::ALL
            .iter()
            .enumerate()
            .flat_map(|(i, method)| {
                let style = if i == self.dialog.method {
                    Style::default()
                        .fg(Color::Rgb(20, 20, 50))
                        .bg(ACCENT)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(MUTED)
                };
                [Span::styled(format!(" {method} "), style), Span::raw(" ")]
            })
            .collect();
        frame.render_widget(
            Paragraph::new(Line::from(methods))
                .alignment(Alignment::Center)
                .style(Style::default().bg(INPUT_BG))
                .block(widgets::panel("Method", self.dialog.on_method)),
            rows[2],
        );
        frame.render_widget(
            widgets::help_line("Tab: Switch | ←→: Method | Enter: Record | Esc: Cancel"),
            rows[3],
        );
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        widgets::render_header(frame, layout[0], "💰 Invoices");
        frame.render_widget(
            widgets::input(
                " Search number, patient or status (/) ".to_string(),
                self.search.clone(),
                self.searching,
            ),
            layout[1],
        );

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .spacing(1)
            .split(layout[2]);

        let rows = self.filtered.iter().map(|invoice| {
            Row::new(vec![
                Cell::from(invoice.invoice_number.clone()),
                Cell::from(self.patient_name(invoice.patient_id)),
                Cell::from(utils::format_date(invoice.issued_on)),
                Cell::from(self.ctx.money(invoice.total)),
                Cell::from(self.ctx.money(invoice.balance.max(0.0))),
                Cell::from(invoice.status.as_str())
                    .style(Style::default().fg(status_color(invoice.status))),
            ])
            .style(Style::default().fg(TEXT))
        });
        let outstanding: f64 = self
            .filtered
            .iter()
            .filter(|i| i.status != InvoiceStatus::Paid)
            .map(|i| i.balance)
            .sum();
        let title = format!(
            "Invoices ({}) | outstanding {}",
            self.filtered.len(),
            self.ctx.money(outstanding)
        );
        let table = Table::new(
            rows,
            [
                Constraint::Length(22),
                Constraint::Percentage(25),
                Constraint::Length(11),
                Constraint::Length(12),
                Constraint::Length(12),
                Constraint::Length(8),
            ],
        )
        .header(widgets::table_header(&[
            "Number", "Patient", "Issued", "Total", "Balance", "Status",
        ]))
        .block(widgets::panel(&title, !self.searching))
        .row_highlight_style(widgets::row_highlight(!self.searching))
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, columns[0], &mut self.state.clone());

        let details = match self.selected() {
            Some(invoice) => self.detail_lines(invoice),
            None => vec![Line::from(Span::styled(
                "No invoices",
                Style::default().fg(MUTED),
            ))],
        };
        frame.render_widget(
            Paragraph::new(details)
                .block(widgets::panel("Invoice", false))
                .wrap(Wrap { trim: false }),
            columns[1],
        );

        self.flash.render(frame, layout[3]);
        let help = if self.can_bill() {
            "↑↓: Select | /: Search | p: Record payment | n: New invoice | r: Refresh | Esc: Back"
        } else {
            "↑↓: Select | /: Search | r: Refresh | Esc: Back"
        };
        frame.render_widget(
            Paragraph::new(help)
                .style(Style::default().fg(FOCUS))
                .alignment(Alignment::Center),
            layout[4],
        );
        if self.dialog.open {
            self.render_dialog(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crossterm::event::KeyModifiers;

    fn press(view: &mut ViewInvoices, code: KeyCode) -> Option<FinanceAction> {
        view.handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn partial_then_full_payment_settles_the_invoice() {
        let mut view = ViewInvoices::new(demo_context("pam"));
        let invoice = view.selected().unwrap().clone();
        assert_ne!(invoice.status, InvoiceStatus::Paid);

        press(&mut view, KeyCode::Char('p'));
        assert!(view.dialog.open);
        view.dialog.amount = "10".into();
        press(&mut view, KeyCode::Tab);
        press(&mut view, KeyCode::Right); // card
        press(&mut view, KeyCode::Enter);
        assert!(!view.dialog.open);
        assert_eq!(view.payments.last().unwrap().method, PaymentMethod::Card);
        let after = view.selected().unwrap().clone();
        assert!((after.balance - (invoice.balance - 10.0)).abs() < 1e-6);

        press(&mut view, KeyCode::Char('p'));
        press(&mut view, KeyCode::Enter);
        assert_eq!(view.selected().unwrap().status, InvoiceStatus::Paid);
    }

    #[test]
    fn overpayment_keeps_the_dialog_open() {
        let mut view = ViewInvoices::new(demo_context("pam"));
        press(&mut view, KeyCode::Char('p'));
        view.dialog.amount = "999999".into();
        press(&mut view, KeyCode::Enter);
        assert!(view.dialog.open);
        assert!(view.flash.error_message().is_some());
    }

    #[test]
    fn patients_see_their_invoices_read_only() {
        let ctx = demo_context("ada");
        let own = ctx.session.patient_id.unwrap();
        let mut view = ViewInvoices::new(ctx);
        assert!(view.invoices.iter().all(|i| i.patient_id == own));
        assert_eq!(press(&mut view, KeyCode::Char('n')), None);
        press(&mut view, KeyCode::Char('p'));
        assert!(!view.dialog.open);
    }

    #[test]
    fn search_matches_patient_names() {
        let mut view = ViewInvoices::new(demo_context("pam"));
        view.search = "nobody".into();
        view.filter_invoices();
        assert!(view.filtered.is_empty());
        view.search = "turing".into();
        view.filter_invoices();
        assert!(!view.filtered.is_empty());
    }
}
