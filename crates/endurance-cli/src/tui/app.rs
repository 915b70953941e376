//! TUI application state and event loop.
//!
//! Design: every preset panel is live at once and shares one mission log.
//! Tab switches the visible panel; the others keep pumping in the background
//! so their readings are current when you switch back. All work happens on
//! the event-loop thread, so panels never see interleaved operations.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use endurance_core::{
    ControlBinding, ControlKind, EngineConfig, EngineError, PRESET_NAMES, Panel, PanelSnapshot,
    SharedLogStore, SystemClock, preset,
};

/// Readings kept per channel for the trend chart.
const HISTORY_LEN: usize = 120;

/// A slider is released this long after the last ←/→ press.
const HOLD_RELEASE: Duration = Duration::from_millis(1200);

/// Slider step as a fraction of the channel range.
pub fn slider_step(min: f64, max: f64) -> f64 {
    ((max - min) / 100.0).max(f64::EPSILON)
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    panels: Vec<Panel>,
    log: SharedLogStore,
    active: usize,
    cursor: usize,
    refresh_rate: Duration,
    running: bool,
    /// "panel/channel" -> recent values
    history: HashMap<String, VecDeque<f64>>,
    /// Slider currently held by the operator and when it was last nudged.
    held: Option<(String, Instant)>,
    /// Last operator-facing message (errors included).
    status: Option<String>,
}

impl App {
    pub fn new(
        config: &EngineConfig,
        first_panel: &str,
        refresh_secs: f64,
        log: SharedLogStore,
    ) -> Result<Self, EngineError> {
        let active = PRESET_NAMES
            .iter()
            .position(|n| *n == first_panel)
            .ok_or_else(|| EngineError::UnknownPanel {
                panel: first_panel.to_string(),
            })?;

        let mut panels = Vec::with_capacity(PRESET_NAMES.len());
        for name in PRESET_NAMES {
            panels.push(preset(
                name,
                Arc::new(SystemClock),
                config.seed,
                Some(log.clone()),
            )?);
        }

        let mut app = Self {
            panels,
            log,
            active,
            cursor: 0,
            refresh_rate: Duration::from_secs_f64(refresh_secs.clamp(0.05, 10.0)),
            running: true,
            history: HashMap::new(),
            held: None,
            status: None,
        };
        app.record_history();
        Ok(app)
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        // Always restore terminal, even if the loop returned an error.
        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        for panel in &mut self.panels {
            panel.dispose();
        }
        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        let mut last_tick = Instant::now();

        while self.running {
            terminal.draw(|f| super::ui::draw(f, self))?;

            if event::poll(Duration::from_millis(50))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code);
            }

            if last_tick.elapsed() >= self.refresh_rate {
                self.refresh();
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    /// Pump every panel, release idle sliders, sample history.
    fn refresh(&mut self) {
        if let Some((control, since)) = &self.held
            && since.elapsed() >= HOLD_RELEASE
        {
            let control = control.clone();
            let _ = self.panels[self.active].release(&control);
            self.held = None;
        }

        for panel in &mut self.panels {
            let report = panel.pump();
            if panel.name() == PRESET_NAMES[self.active] {
                for id in report.resets {
                    self.status = Some(format!("{id}: завършено"));
                }
            }
        }
        self.record_history();
    }

    fn record_history(&mut self) {
        for panel in &self.panels {
            for ch in panel.channels().iter().filter(|c| c.drift_amplitude() > 0.0) {
                let buf = self
                    .history
                    .entry(format!("{}/{}", panel.name(), ch.id()))
                    .or_default();
                buf.push_back(ch.value());
                while buf.len() > HISTORY_LEN {
                    buf.pop_front();
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Up | KeyCode::Char('k') => {
                if self.cursor > 0 {
                    self.select(self.cursor - 1);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.cursor < self.control_count().saturating_sub(1) {
                    self.select(self.cursor + 1);
                }
            }
            KeyCode::Left | KeyCode::Char('h') => self.nudge(-1.0),
            KeyCode::Right | KeyCode::Char('l') => self.nudge(1.0),
            KeyCode::Char(' ') | KeyCode::Enter => self.press(),
            KeyCode::Tab => {
                self.release_held();
                self.active = (self.active + 1) % self.panels.len();
                self.select(0);
                self.status = None;
            }
            KeyCode::BackTab => {
                self.release_held();
                self.active = (self.active + self.panels.len() - 1) % self.panels.len();
                self.select(0);
                self.status = None;
            }
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char(']') => {
                let secs = (self.refresh_rate.as_secs_f64() / 2.0).max(0.05);
                self.refresh_rate = Duration::from_secs_f64(secs);
            }
            KeyCode::Char('-') | KeyCode::Char('[') => {
                let secs = (self.refresh_rate.as_secs_f64() * 2.0).min(10.0);
                self.refresh_rate = Duration::from_secs_f64(secs);
            }
            _ => {}
        }
    }

    fn select(&mut self, idx: usize) {
        if self.cursor != idx {
            self.release_held();
        }
        self.cursor = idx;
    }

    fn release_held(&mut self) {
        if let Some((control, _)) = self.held.take() {
            let _ = self.panels[self.active].release(&control);
        }
    }

    /// ←/→ on a slider: hold it and step by 1% of its range.
    fn nudge(&mut self, direction: f64) {
        let (id, channel) = match self.selected_binding() {
            Some(ControlBinding {
                id,
                kind: ControlKind::Continuous { channel },
                ..
            }) => (id.clone(), channel.clone()),
            _ => return,
        };
        let panel = &mut self.panels[self.active];
        let Ok(ch) = panel.channel(&channel) else {
            return;
        };
        let target = ch.value() + direction * slider_step(ch.min(), ch.max());

        if self.held.as_ref().is_none_or(|(held, _)| *held != id)
            && let Err(e) = panel.hold(&id)
        {
            self.status = Some(e.to_string());
            return;
        }
        match panel.write(&id, target) {
            Ok(Some(v)) => self.status = Some(format!("{id} = {v:.2}")),
            Ok(None) => {}
            Err(e) => self.status = Some(e.to_string()),
        }
        self.held = Some((id, Instant::now()));
    }

    /// Space on a toggle flips it; on a momentary it fires.
    fn press(&mut self) {
        let Some(binding) = self.selected_binding() else {
            return;
        };
        let id = binding.id.clone();
        let kind = binding.kind.clone();
        let panel = &mut self.panels[self.active];

        let result = match &kind {
            ControlKind::Toggle { channel } => {
                let on = !panel.channel(channel).map(|c| c.is_on()).unwrap_or(false);
                panel
                    .toggle(&id, on)
                    .map(|()| format!("{id}: {}", if on { "ВКЛ" } else { "ИЗКЛ" }))
            }
            ControlKind::Momentary { duration, .. } => panel.activate(&id).map(|fired| {
                if fired {
                    format!("{id}: активирано за {}s", duration.as_secs_f64())
                } else {
                    format!("{id}: вече активно")
                }
            }),
            ControlKind::Continuous { .. } => Ok(format!("{id}: use ←/→")),
        };
        self.status = Some(result.unwrap_or_else(|e| e.to_string()));
    }

    fn selected_binding(&self) -> Option<&ControlBinding> {
        self.panels[self.active].bindings().get(self.cursor)
    }

    fn control_count(&self) -> usize {
        self.panels[self.active].bindings().len()
    }

    // -- accessors for ui --

    pub fn snapshot(&self) -> PanelSnapshot {
        self.panels[self.active].snapshot()
    }

    pub fn panel_names(&self) -> Vec<&str> {
        self.panels.iter().map(Panel::name).collect()
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn refresh_rate_secs(&self) -> f64 {
        self.refresh_rate.as_secs_f64()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn held(&self) -> Option<&str> {
        self.held.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn log_len(&self) -> usize {
        self.log.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Channel shown in the trend chart: the selected slider's target, or the
    /// first drifting channel of the panel.
    pub fn chart_channel(&self) -> Option<String> {
        let panel = &self.panels[self.active];
        if let Some(b) = self.selected_binding()
            && let ControlKind::Continuous { channel } = &b.kind
            && panel.channel(channel).is_ok_and(|c| c.drift_amplitude() > 0.0)
        {
            return Some(channel.clone());
        }
        panel
            .channels()
            .iter()
            .find(|c| c.drift_amplitude() > 0.0)
            .map(|c| c.id().to_string())
    }

    pub fn history(&self, channel: &str) -> Vec<f64> {
        let key = format!("{}/{channel}", self.panels[self.active].name());
        self.history
            .get(&key)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }
}
