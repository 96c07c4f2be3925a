//! Report builder: pick a kind and a date range, view the figures and
//! export them as JSON.

use crate::app::SelectedApp;
use crate::components::hospital::Context;
use crate::components::widgets::{
    self, Flash, ACCENT, FOCUS, INPUT_BG, MUTED, SUCCESS, TEXT, TITLE,
};
use crate::components::Component;
use crate::reports::{DateRange, Report, ReportKind};
use crate::tui::Frame;
use crate::utils;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{prelude::*, widgets::*};
use time::Duration;

const KIND: usize = 0;
const FROM: usize = 1;
const TO: usize = 2;
const GENERATE: usize = 3;
const EXPORT: usize = 4;
const FOCUS_COUNT: usize = 5;

/// Default range covers the last 30 days.
const DEFAULT_RANGE_DAYS: i64 = 29;

pub struct ReportsScreen {
    ctx: Context,
    kind: usize,
    from: String,
    to: String,
    focus: usize,
    report: Option<Report>,
    flash: Flash,
}

impl ReportsScreen {
    pub fn new(ctx: Context) -> Self {
        let today = utils::today();
        let mut screen = Self {
            ctx,
            kind: 0,
            from: utils::format_date(today.saturating_sub(Duration::days(DEFAULT_RANGE_DAYS))),
            to: utils::format_date(today),
            focus: KIND,
            report: None,
            flash: Flash::default(),
        };
        screen.generate();
        screen
    }

    fn kind(&self) -> ReportKind {
        ReportKind::ALL[self.kind % ReportKind::ALL.len()]
    }

    fn range(&self) -> std::result::Result<DateRange, String> {
        let from = utils::parse_date(&self.from).ok_or("From must be YYYY-MM-DD")?;
        let to = utils::parse_date(&self.to).ok_or("To must be YYYY-MM-DD")?;
        DateRange::new(from, to).map_err(|e| e.to_string())
    }

    fn generate(&mut self) {
        let range = match self.range() {
            Ok(range) => range,
            Err(message) => {
                self.flash.error(message);
                return;
            }
        };
        match self
            .ctx
            .hospital
            .generate_report(&self.ctx.session, self.kind(), range)
        {
            Ok(report) => {
                self.report = Some(report);
                self.flash.clear();
            }
            Err(e) => {
                self.report = None;
                self.flash.error(e.to_string());
            }
        }
    }

    fn export(&mut self) {
        let Some(report) = &self.report else {
            self.flash.error("Generate a report first");
            return;
        };
        match self.ctx.hospital.export_report(&self.ctx.session, report) {
            Ok(path) => self
                .flash
                .success(format!("Exported to {}", path.display())),
            Err(e) => self.flash.error(e.to_string()),
        }
    }

    fn format_value(&self, label: &str, value: f64) -> String {
        let kind = self.report.as_ref().map(|r| r.kind);
        let money = match kind {
            Some(ReportKind::Revenue) => !label.starts_with("Payments"),
            Some(ReportKind::Inventory) => label == "Stock value",
            _ => false,
        };
        match () {
            _ if money => self.ctx.money(value),
            // Occupancy rows are per-ward rates labelled "Ward (occupied/total)".
            _ if label.contains('%')
                || (kind == Some(ReportKind::Occupancy) && label.ends_with(')')) =>
            {
                format!("{value:.1}%")
            }
            _ if value.fract() == 0.0 => format!("{value:.0}"),
            _ => format!("{value:.2}"),
        }
    }

    fn edit(&mut self, key: KeyCode) {
        let target = match self.focus {
            FROM => &mut self.from,
            TO => &mut self.to,
            _ => return,
        };
        match key {
            KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => target.push(c),
            KeyCode::Backspace => {
                target.pop();
            }
            _ => {}
        }
    }
}

impl Component for ReportsScreen {
    fn handle_input(&mut self, key: KeyEvent) -> Result<Option<SelectedApp>> {
        self.flash.check_timeout();
        match key.code {
            KeyCode::Esc => return Ok(Some(SelectedApp::None)),
            KeyCode::Tab | KeyCode::Down => self.focus = (self.focus + 1) % FOCUS_COUNT,
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + FOCUS_COUNT - 1) % FOCUS_COUNT
            }
            KeyCode::Left if self.focus == KIND => {
                self.kind = (self.kind + ReportKind::ALL.len() - 1) % ReportKind::ALL.len();
                self.generate();
            }
            KeyCode::Right if self.focus == KIND => {
                self.kind = (self.kind + 1) % ReportKind::ALL.len();
                self.generate();
            }
            KeyCode::Enter => match self.focus {
                EXPORT => self.export(),
                FROM | TO | GENERATE => self.generate(),
                _ => self.focus = FROM,
            },
            KeyCode::Char('e') if self.focus != FROM && self.focus != TO => self.export(),
            code => self.edit(code),
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame) {
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

        widgets::render_header(frame, layout[0], "📊 Reports");

        let controls = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(28),
                Constraint::Percentage(18),
                Constraint::Percentage(18),
                Constraint::Percentage(18),
                Constraint::Percentage(18),
            ])
            .spacing(1)
            .split(layout[1]);

        frame.render_widget(
            Paragraph::new(format!("◄ {} ►", self.kind().title()))
                .style(Style::default().fg(TEXT).bg(INPUT_BG))
                .alignment(Alignment::Center)
                .block(widgets::panel("Report", self.focus == KIND)),
            controls[0],
        );
        frame.render_widget(
            widgets::input(" From ".to_string(), self.from.clone(), self.focus == FROM),
            controls[1],
        );
        frame.render_widget(
            widgets::input(" To ".to_string(), self.to.clone(), self.focus == TO),
            controls[2],
        );
        frame.render_widget(
            widgets::button("Generate", self.focus == GENERATE, SUCCESS),
            controls[3],
        );
        frame.render_widget(
            widgets::button("Export JSON", self.focus == EXPORT, ACCENT),
            controls[4],
        );

        match &self.report {
            Some(report) => {
                let body = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                    .spacing(1)
                    .split(layout[2]);

                let max = report
                    .rows
                    .iter()
                    .map(|row| row.value)
                    .fold(0.0_f64, f64::max);
                let bar_width = usize::from(body[0].width.saturating_sub(40)).max(4);
                let label_width = report
                    .rows
                    .iter()
                    .map(|row| row.label.chars().count())
                    .max()
                    .unwrap_or(0)
                    .min(22);
                let rows: Vec<Line> = report
                    .rows
                    .iter()
                    .map(|row| {
                        Line::from(vec![
                            Span::styled(
                                format!("{:<label_width$} ", row.label),
                                Style::default().fg(TEXT),
                            ),
                            Span::styled(
                                format!("{:>12} ", self.format_value(&row.label, row.value)),
                                Style::default().fg(TITLE),
                            ),
                            Span::styled(
                                widgets::bar(row.value, max, bar_width),
                                Style::default().fg(ACCENT),
                            ),
                        ])
                    })
                    .collect();
                let title = format!(
                    "{} | {} to {}",
                    report.title,
                    utils::format_date(report.range.from),
                    utils::format_date(report.range.to)
                );
                frame.render_widget(
                    Paragraph::new(rows).block(widgets::panel(&title, false)),
                    body[0],
                );

                let mut summary: Vec<Line> = report
                    .summary
                    .iter()
                    .map(|row| {
                        Line::from(vec![
                            Span::styled(format!("{}: ", row.label), Style::default().fg(MUTED)),
                            Span::styled(
                                self.format_value(&row.label, row.value),
                                Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
                            ),
                        ])
                    })
                    .collect();
                summary.push(Line::from(""));
                summary.push(Line::from(Span::styled(
                    format!("Generated {}", utils::format_datetime(report.generated_at)),
                    Style::default().fg(MUTED),
                )));
                frame.render_widget(
                    Paragraph::new(summary)
                        .block(widgets::panel("Summary", false))
                        .wrap(Wrap { trim: true }),
                    body[1],
                );
            }
            None => frame.render_widget(
                Paragraph::new("No report generated")
                    .style(Style::default().fg(MUTED))
                    .block(widgets::panel("Report", false)),
                layout[2],
            ),
        }

        self.flash.render(frame, layout[3]);
        frame.render_widget(
            Paragraph::new(
                "Tab/↑↓: Move | ←→: Report kind | Enter: Generate/Export | e: Export | Esc: Back",
            )
            .style(Style::default().fg(FOCUS))
            .alignment(Alignment::Center),
            layout[4],
        );
    }
}
