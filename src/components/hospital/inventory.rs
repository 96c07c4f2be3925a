//! Pharmacy and supplies stock.

use crate::app::SelectedApp;
use crate::components::form::{Field, Form, FormEvent};
use crate::components::hospital::Context;
use crate::components::widgets::{
    self, centered_rect, Flash, DANGER, FOCUS, MUTED, SUCCESS, TEXT, WARNING,
};
use crate::components::Component;
use crate::inventory::{self, StockLevel};
use crate::models::InventoryItem;
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};

/// Items expiring within this many days are listed separately.
const EXPIRY_WINDOW_DAYS: i64 = 30;

fn level_color(level: StockLevel) -> Color {
    match level {
        StockLevel::OutOfStock => DANGER,
        StockLevel::Low => WARNING,
        StockLevel::Ok => SUCCESS,
    }
}

enum Overlay {
    /// Signed quantity change for the item with this ID.
    Adjust(i64, Form),
    AddItem(Form),
}

pub struct InventoryScreen {
    ctx: Context,
    items: Vec<InventoryItem>,
    low_only: bool,
    state: TableState,
    overlay: Option<Overlay>,
    flash: Flash,
}

impl InventoryScreen {
    pub fn new(ctx: Context) -> Self {
        let mut screen = Self {
            ctx,
            items: Vec::new(),
            low_only: false,
            state: TableState::default(),
            overlay: None,
            flash: Flash::default(),
        };
        screen.fetch_items();
        screen
    }

    fn fetch_items(&mut self) {
        match self.ctx.hospital.inventory(&self.ctx.session) {
            Ok(items) => {
                self.items = items;
                let len = self.visible().len();
                widgets::clamp_selection(&mut self.state, len);
            }
            Err(e) => self.flash.error(format!("Failed to load inventory: {e}")),
        }
    }

    fn visible(&self) -> Vec<&InventoryItem> {
        self.items
            .iter()
            .filter(|item| !self.low_only || inventory::is_low_stock(item))
            .collect()
    }

    fn selected(&self) -> Option<InventoryItem> {
        self.state
            .selected()
            .and_then(|i| self.visible().get(i).map(|item| (*item).clone()))
    }

    fn adjust(&mut self, item_id: i64, delta: i64) -> bool {
        match self
            .ctx
            .hospital
            .adjust_stock(&self.ctx.session, item_id, delta)
        {
            Ok(item) => {
                let level = inventory::stock_level(&item);
                let message = format!(
                    "{}: {} {} ({})",
                    item.name,
                    item.quantity,
                    item.unit,
                    level.label()
                );
                if level == StockLevel::Ok {
                    self.flash.success(message);
                } else {
                    self.flash.error(message);
                }
                self.fetch_items();
                true
            }
            Err(e) => {
                self.flash.error(e.to_string());
                false
            }
        }
    }

    fn submit_adjustment(&mut self, item_id: i64, form: &Form) -> bool {
        match form.value(0).parse::<i64>() {
            Ok(0) => true,
            Ok(delta) => self.adjust(item_id, delta),
            Err(_) => {
                self.flash
                    .error("Enter a whole number, negative to take stock out");
                false
            }
        }
    }

    fn add_item(&mut self, form: &Form) -> bool {
        if let Some(label) = form.missing_required() {
            self.flash.error(format!("{label} cannot be empty"));
            return false;
        }
        let (Ok(quantity), Ok(reorder_level), Ok(unit_price)) = (
            form.value(3).parse::<u32>(),
            form.value(4).parse::<u32>(),
            form.value(5).parse::<f64>(),
        ) else {
            self.flash
                .error("Quantity, reorder level and price must be numbers");
            return false;
        };
        let expiry_date = match form.optional(6) {
            Some(raw) => match utils::parse_date(&raw) {
                Some(date) => Some(date),
                None => {
                    self.flash.error("Expiry date must be YYYY-MM-DD");
                    return false;
                }
            },
            None => None,
        };
        let item = InventoryItem {
            id: 0,
            name: form.value(0).to_string(),
            category: form.value(1).to_lowercase(),
            unit: form.value(2).to_string(),
            quantity,
            reorder_level,
            unit_price,
            expiry_date,
        };
        match self.ctx.hospital.add_item(&self.ctx.session, &item) {
            Ok(_) => {
                self.flash.success(format!("{} added to stock", item.name));
                self.fetch_items();
                true
            }
            Err(e) => {
                self.flash.error(e.to_string());
                false
            }
        }
    }

    fn handle_overlay(&mut self, overlay: Overlay, key: KeyEvent) {
        self.overlay = match overlay {
            Overlay::Adjust(item_id, mut form) => {
                let done = match form.handle_key(key) {
                    Some(FormEvent::Back) => true,
                    Some(FormEvent::Submit) => self.submit_adjustment(item_id, &form),
                    None => false,
                };
                (!done).then_some(Overlay::Adjust(item_id, form))
            }
            Overlay::AddItem(mut form) => {
                let done = match form.handle_key(key) {
                    Some(FormEvent::Back) => true,
                    Some(FormEvent::Submit) => self.add_item(&form),
                    None => false,
                };
                (!done).then_some(Overlay::AddItem(form))
            }
        };
    }
}

impl Component for InventoryScreen {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<SelectedApp>> {
        self.flash.check_timeout();
        if let Some(overlay) = self.overlay.take() {
            self.handle_overlay(overlay, key);
            return Ok(None);
        }

        let len = self.visible().len();
        match key.code {
            KeyCode::Esc => return Ok(Some(SelectedApp::None)),
            KeyCode::Down => widgets::select_next(&mut self.state, len),
            KeyCode::Up => widgets::select_previous(&mut self.state, len),
            KeyCode::Char('+') | KeyCode::Right => {
                if let Some(item) = self.selected() {
                    self.adjust(item.id, 1);
                }
            }
            KeyCode::Char('-') | KeyCode::Left => {
                if let Some(item) = self.selected() {
                    self.adjust(item.id, -1);
                }
            }
            KeyCode::Enter | KeyCode::Char('j') => {
                if let Some(item) = self.selected() {
                    self.overlay = Some(Overlay::Adjust(
                        item.id,
                        Form::new(vec![Field::text("Change (e.g. 50 or -20)").required()]),
                    ));
                }
            }
            KeyCode::Char('n') => {
                self.overlay = Some(Overlay::AddItem(Form::new(vec![
                    Field::text("Name").required(),
                    Field::text("Category").required().with_value("medicine"),
                    Field::text("Unit").required(),
                    Field::text("Quantity").required().with_value("0"),
                    Field::text("Reorder Level").required().with_value("10"),
                    Field::text("Unit Price").required(),
                    Field::text("Expiry (YYYY-MM-DD)"),
                ])))
            }
            KeyCode::Char('l') => {
                self.low_only = !self.low_only;
                self.state.select(None);
                let len = self.visible().len();
                widgets::clamp_selection(&mut self.state, len);
            }
            KeyCode::Char('r') => self.fetch_items(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
        let area = widgets::paint_background(frame);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .margin(1)
            .split(area);

        widgets::render_header(frame, layout[0], "💊 Inventory");

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .spacing(1)
            .split(layout[1]);

        let today = utils::today();
        let visible = self.visible();
        let rows = visible.iter().map(|item| {
            let level = inventory::stock_level(item);
            let expiry = item
                .expiry_date
                .map(utils::format_date)
                .unwrap_or_else(|| "-".to_string());
            let expiry_style = match item.expiry_date {
                Some(date) if date < today => Style::default().fg(DANGER),
                Some(date) if (date - today).whole_days() <= EXPIRY_WINDOW_DAYS => {
                    Style::default().fg(WARNING)
                }
                _ => Style::default().fg(TEXT),
            };
            Row::new(vec![
                Cell::from(item.name.clone()),
                Cell::from(item.category.clone()).style(Style::default().fg(MUTED)),
                Cell::from(format!("{} {}", item.quantity, item.unit)),
                Cell::from(item.reorder_level.to_string()),
                Cell::from(self.ctx.money(item.unit_price)),
                Cell::from(expiry).style(expiry_style),
                Cell::from(level.label()).style(Style::default().fg(level_color(level))),
            ])
            .style(Style::default().fg(TEXT))
        });
        let title = if self.low_only {
            format!("Low stock ({})", visible.len())
        } else {
            format!("All items ({})", visible.len())
        };
        let table = Table::new(
            rows,
            [
                Constraint::Min(16),
                Constraint::Length(11),
                Constraint::Length(14),
                Constraint::Length(8),
                Constraint::Length(10),
                Constraint::Length(11),
                Constraint::Length(13),
            ],
        )
        .header(widgets::table_header(&[
            "Item", "Category", "In stock", "Reorder", "Unit", "Expiry", "Level",
        ]))
        .block(widgets::panel(&title, true))
        .row_highlight_style(widgets::row_highlight(true))
        .highlight_symbol("► ");
        frame.render_stateful_widget(table, columns[0], &mut self.state.clone());

        let expiring: Vec<Line> = inventory::expiring_within(&self.items, today, EXPIRY_WINDOW_DAYS)
            .into_iter()
            .map(|item| {
                let (when, color) = match item.expiry_date {
                    Some(date) if date < today => ("expired".to_string(), DANGER),
                    Some(date) => (utils::format_date(date), WARNING),
                    None => (String::new(), MUTED),
                };
                Line::from(vec![
                    Span::styled(format!("{when:<11}"), Style::default().fg(color)),
                    Span::styled(item.name.clone(), Style::default().fg(TEXT)),
                ])
            })
            .collect();
        let expiring = if expiring.is_empty() {
            vec![Line::from(Span::styled(
                "Nothing expires soon",
                Style::default().fg(MUTED),
            ))]
        } else {
            expiring
        };
        frame.render_widget(
            Paragraph::new(expiring)
                .block(widgets::panel(
                    &format!("Expiring within {EXPIRY_WINDOW_DAYS} days"),
                    false,
                ))
                .wrap(Wrap { trim: true }),
            columns[1],
        );

        self.flash.render(frame, layout[2]);
        frame.render_widget(
            Paragraph::new(
                "↑↓: Select | +/-: One unit | Enter: Adjust | n: New item | l: Low stock only | r: Refresh | Esc: Back",
            )
            .style(Style::default().fg(FOCUS))
            .alignment(Alignment::Center),
            layout[3],
        );

        let (title, form, submit) = match &self.overlay {
            Some(Overlay::Adjust(_, form)) => ("Adjust Stock", form, "Apply"),
            Some(Overlay::AddItem(form)) => ("New Stock Item", form, "Add Item"),
            None => return,
        };
        let popup = centered_rect(50, 60, area);
        frame.render_widget(Clear, popup);
        let block = widgets::panel(title, true);
        let inner = block.inner(popup);
        frame.render_widget(block, popup);
        form.render(frame, inner.inner(Margin::new(1, 1)), submit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::hospital::tests::demo_context;
    use crossterm::event::KeyModifiers;

    fn press(screen: &mut InventoryScreen, code: KeyCode) {
        screen
            .handle_input(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
    }

    fn select(screen: &mut InventoryScreen, name: &str) {
        let index = screen
            .visible()
            .iter()
            .position(|item| item.name == name)
            .unwrap();
        screen.state.select(Some(index));
    }

    fn quantity(screen: &InventoryScreen, name: &str) -> u32 {
        screen
            .items
            .iter()
            .find(|item| item.name == name)
            .unwrap()
            .quantity
    }

    #[test]
    fn plus_and_minus_move_one_unit() {
        let mut screen = InventoryScreen::new(demo_context("root"));
        select(&mut screen, "Gauze Pads");
        press(&mut screen, KeyCode::Char('+'));
        assert_eq!(quantity(&screen, "Gauze Pads"), 501);
        select(&mut screen, "Gauze Pads");
        press(&mut screen, KeyCode::Char('-'));
        assert_eq!(quantity(&screen, "Gauze Pads"), 500);
    }

    #[test]
    fn stock_cannot_go_negative() {
        let mut screen = InventoryScreen::new(demo_context("root"));
        select(&mut screen, "Surgical Gloves");
        press(&mut screen, KeyCode::Char('-'));
        assert_eq!(quantity(&screen, "Surgical Gloves"), 0);
        assert!(screen.flash.error_message().is_some());
    }

    #[test]
    fn bulk_adjustment_through_the_dialog() {
        let mut screen = InventoryScreen::new(demo_context("root"));
        select(&mut screen, "Saline 0.9% 1L");
        press(&mut screen, KeyCode::Enter);
        for c in "-15".chars() {
            press(&mut screen, KeyCode::Char(c));
        }
        press(&mut screen, KeyCode::Enter); // to the apply button
        press(&mut screen, KeyCode::Enter);
        assert!(screen.overlay.is_none());
        assert_eq!(quantity(&screen, "Saline 0.9% 1L"), 45);
    }

    #[test]
    fn low_stock_filter() {
        let mut screen = InventoryScreen::new(demo_context("root"));
        press(&mut screen, KeyCode::Char('l'));
        let names: Vec<&str> = screen.visible().iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"Surgical Gloves"));
        assert!(names.contains(&"Amoxicillin 250mg"));
        assert!(!names.contains(&"Gauze Pads"));
    }

    #[test]
    fn only_admins_manage_stock() {
        let screen = InventoryScreen::new(demo_context("carla"));
        assert!(screen.items.is_empty());
        assert!(screen.flash.error_message().is_some());
    }

    #[test]
    fn adds_an_item() {
        let mut screen = InventoryScreen::new(demo_context("root"));
        press(&mut screen, KeyCode::Char('n'));
        if let Some(Overlay::AddItem(form)) = screen.overlay.as_mut() {
            form.set_value(0, "Ibuprofen 400mg");
            form.set_value(2, "tablets");
            form.set_value(3, "100");
            form.set_value(5, "0.2");
            form.set_value(6, "2030-01-31");
            form.focus = form.fields.len();
        }
        press(&mut screen, KeyCode::Enter);
        assert!(screen.overlay.is_none(), "{:?}", screen.flash.error_message());
        assert_eq!(quantity(&screen, "Ibuprofen 400mg"), 100);
    }
}
