//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────────┐
//! │  ENDURANCE   [ship_status] life_support ...  14:02│
//! ├──────────────────────────┬───────────────────────┤
//! │  Channels                │  Controls             │
//! │  oxygen    95.00 %  OK   │  ▸ oxygen      95.00  │
//! │  scrubber  ON            │    scrubber    ON     │
//! │  ...                     ├───────────────────────┤
//! │                          │  ╭ oxygen trend       │
//! │                          │  ╰──────────────────  │
//! ├──────────────────────────┴───────────────────────┤
//! │  Mission log  [Купър] ...                        │
//! ├──────────────────────────────────────────────────┤
//! │  ↑↓ select   ←→ adjust   space: toggle   q: quit │
//! └──────────────────────────────────────────────────┘

use super::app::App;
use crate::commands::format_reading;
use endurance_core::{PanelSnapshot, Tier};
use ratatui::{prelude::*, widgets::*};

pub fn draw(f: &mut Frame, app: &App) {
    let snap = app.snapshot();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(10),   // main
            Constraint::Length(5), // log
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app, &snap);
    draw_main(f, rows[1], app, &snap);
    draw_log(f, rows[2], app, &snap);
    draw_keys(f, rows[3]);
}

fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::Operational => Color::Green,
        Tier::Warning => Color::Yellow,
        Tier::Critical => Color::Red,
    }
}

fn draw_title(f: &mut Frame, area: Rect, app: &App, snap: &PanelSnapshot) {
    let mut spans = vec![Span::styled(
        " ENDURANCE ",
        Style::default().bold().fg(Color::Cyan),
    )];
    for (i, name) in app.panel_names().into_iter().enumerate() {
        if i == app.active() {
            spans.push(Span::styled(
                format!(" [{name}] "),
                Style::default().bold().fg(Color::Yellow),
            ));
        } else {
            spans.push(Span::styled(
                format!("  {name}  "),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    spans.push(Span::styled(
        format!(
            "  {}  {:.2}s ",
            endurance_core::format_time_of_day(snap.taken_at),
            app.refresh_rate_secs()
        ),
        Style::default().fg(Color::DarkGray),
    ));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(spans));
    let body = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {}", snap.title), Style::default().bold()),
        Span::styled(
            format!("   session {}", &snap.session_id[..8.min(snap.session_id.len())]),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(block);

    f.render_widget(body, area);
}

fn draw_main(f: &mut Frame, area: Rect, app: &App, snap: &PanelSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    draw_channels(f, cols[0], snap);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(cols[1]);

    draw_controls(f, right[0], app, snap);
    draw_chart(f, right[1], app, snap);
}

fn draw_channels(f: &mut Frame, area: Rect, snap: &PanelSnapshot) {
    let mut rows: Vec<Row> = snap
        .channels
        .iter()
        .map(|ch| {
            let display = snap.display(&ch.id);
            let (status, style) = match display {
                Some(d) => (d.tier.label().to_string(), Style::default().fg(tier_color(d.tier))),
                None => (String::new(), Style::default().fg(Color::White)),
            };
            let fill = display
                .map(|d| format!("{:>3.0}%", d.percentage))
                .unwrap_or_default();
            let lock = if ch.locked { "⏸" } else { " " };

            Row::new(vec![
                ch.label.clone(),
                format_reading(ch),
                fill,
                lock.to_string(),
                status,
            ])
            .style(style)
        })
        .collect();

    for c in &snap.composites {
        rows.push(
            Row::new(vec![
                c.label.clone(),
                String::new(),
                format!("{:>3.0}%", c.percentage),
                String::new(),
                c.tier.label().to_string(),
            ])
            .style(Style::default().bold().fg(tier_color(c.tier))),
        );
    }

    let table = Table::new(
        rows,
        [
            Constraint::Min(18),    // label
            Constraint::Length(14), // value
            Constraint::Length(5),  // fill
            Constraint::Length(2),  // locked
            Constraint::Length(11), // tier
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(" Channels "));

    f.render_widget(table, area);
}

fn draw_controls(f: &mut Frame, area: Rect, app: &App, snap: &PanelSnapshot) {
    let rows: Vec<Row> = snap
        .controls
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let is_cursor = i == app.cursor();
            let pointer = if is_cursor { "▸" } else { " " };

            let state = match c.kind {
                "continuous" => format!("{:.2}", c.value),
                _ if c.active => match c.resets_at_ms {
                    Some(at) => {
                        let left = at.saturating_sub(snap.taken_at) as f64 / 1000.0;
                        format!("ON {left:.1}s")
                    }
                    None => "ON".into(),
                },
                _ => "OFF".into(),
            };
            let held = if c.held { "✋" } else { " " };

            let style = if is_cursor {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else if c.active && c.kind != "continuous" {
                Style::default().fg(Color::Yellow).bold()
            } else {
                Style::default()
            };

            Row::new(vec![
                pointer.to_string(),
                c.label.clone(),
                state,
                held.to_string(),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(2),  // pointer
            Constraint::Min(16),    // label
            Constraint::Length(10), // state
            Constraint::Length(2),  // held
        ],
    )
    .block(Block::default().borders(Borders::ALL).title(" Controls "));

    f.render_widget(table, area);
}

fn draw_chart(f: &mut Frame, area: Rect, app: &App, snap: &PanelSnapshot) {
    let Some(channel) = app.chart_channel() else {
        let block = Block::default().borders(Borders::ALL).title(" Trend ");
        let p = Paragraph::new("No drifting channels on this panel")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    };
    let history = app.history(&channel);
    let reading = snap.channel(&channel);
    let label = reading.map(|r| r.label.as_str()).unwrap_or(channel.as_str());

    let data: Vec<(f64, f64)> = history
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect();

    let latest = history.last().copied().unwrap_or(0.0);
    let min_val = history.iter().copied().fold(f64::MAX, f64::min);
    let max_val = history.iter().copied().fold(f64::MIN, f64::max);
    let pad = ((max_val - min_val) * 0.1).max(0.5);

    // never zoom out past the channel's own bounds
    let (lo, hi) = reading.map(|r| (r.min, r.max)).unwrap_or((f64::MIN, f64::MAX));
    let y_min = (min_val - pad).max(lo);
    let y_max = (max_val + pad).min(hi);

    let color = snap
        .display(&channel)
        .map(|d| tier_color(d.tier))
        .unwrap_or(Color::Cyan);

    let datasets = vec![
        Dataset::default()
            .name(format!("{latest:.2}"))
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(color))
            .data(&data),
    ];

    let x_max = (history.len() as f64).max(10.0);

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {label}  {latest:.2} ")),
        )
        .x_axis(Axis::default().bounds([0.0, x_max]).labels(vec![
            Line::from("0"),
            Line::from(format!("{}", history.len())),
        ]))
        .y_axis(Axis::default().bounds([y_min, y_max]).labels(vec![
            Line::from(format!("{y_min:.1}")),
            Line::from(format!("{y_max:.1}")),
        ]));

    f.render_widget(chart, area);
}

fn draw_log(f: &mut Frame, area: Rect, app: &App, snap: &PanelSnapshot) {
    let mut lines: Vec<Line> = snap
        .log
        .iter()
        .take(area.height.saturating_sub(3) as usize)
        .map(|e| {
            Line::from(vec![
                Span::styled(format!(" {} ", e.date), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("[{}] ", e.author), Style::default().fg(Color::Cyan)),
                Span::raw(e.content.clone()),
            ])
        })
        .collect();
    if let Some(status) = app.status() {
        lines.push(Line::from(Span::styled(
            format!(" » {status}"),
            Style::default().fg(Color::Yellow),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Mission log ({}) ", app.log_len()));
    let p = Paragraph::new(lines).block(block);
    f.render_widget(p, area);
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(
        " ↑↓ select   ←→ adjust   space: toggle/activate   tab: next panel   +/-: speed   q: quit",
    )
    .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}
