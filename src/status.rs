use crate::progress::{ProgressEvent, Stage};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub slot: usize,
    pub file: Option<String>,
    pub stage: Stage,
}

impl StatusLine {
    fn from_event(event: &ProgressEvent) -> Self {
        let file = event
            .source
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned());
        Self {
            slot: event.slot,
            file,
            stage: event.stage,
        }
    }

    pub fn activity(&self) -> String {
        match (&self.file, self.stage) {
            (_, Stage::Idle) | (None, _) => "Idle".to_string(),
            (Some(file), stage) => format!("{file:<60} {:>15}", stage.label()),
        }
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>2}: {}", self.slot, self.activity())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusView {
    pub errors: Vec<String>,
    pub lines: Vec<StatusLine>,
}

impl StatusView {
    pub fn render(&self) -> Vec<String> {
        self.errors
            .iter()
            .cloned()
            .chain(self.lines.iter().map(ToString::to_string))
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct StatusBoard {
    slots: BTreeMap<usize, ProgressEvent>,
    errors: Vec<String>,
    converted: usize,
    failed: usize,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: ProgressEvent) {
        if let Some(message) = event.error_message() {
            self.errors.push(message);
            self.failed += 1;
        } else if event.stage == Stage::Done {
            self.converted += 1;
        }
        self.slots.insert(event.slot, event);
    }

    pub fn view(&self) -> StatusView {
        StatusView {
            errors: self.errors.clone(),
            lines: self.slots.values().map(StatusLine::from_event).collect(),
        }
    }

    pub fn converted(&self) -> usize {
        self.converted
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

pub trait StatusSurface {
    fn draw(&mut self, view: &StatusView);

    fn finish(&mut self) {}
}

pub struct TerminalSurface {
    multi: MultiProgress,
    bars: Vec<ProgressBar>,
    style: ProgressStyle,
    printed_errors: usize,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stdout())
    }

    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            bars: Vec::new(),
            style: ProgressStyle::with_template("{prefix:>2.dim}: {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            printed_errors: 0,
        }
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSurface for TerminalSurface {
    fn draw(&mut self, view: &StatusView) {
        for error in view.errors.iter().skip(self.printed_errors) {
            if let Err(err) = self.multi.println(error) {
                tracing::warn!(error = %err, line = %error, "failed to print error line");
            }
        }
        self.printed_errors = view.errors.len();

        while self.bars.len() < view.lines.len() {
            let bar = self.multi.add(ProgressBar::new_spinner());
            bar.set_style(self.style.clone());
            self.bars.push(bar);
        }
        for (bar, line) in self.bars.iter().zip(&view.lines) {
            bar.set_prefix(line.slot.to_string());
            bar.set_message(line.activity());
        }
    }

    fn finish(&mut self) {
        for bar in &self.bars {
            bar.finish();
        }
    }
}

/// Used when stdout is not a terminal: every change becomes a log event.
#[derive(Debug, Default)]
pub struct LogSurface {
    last: BTreeMap<usize, StatusLine>,
    logged_errors: usize,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusSurface for LogSurface {
    fn draw(&mut self, view: &StatusView) {
        for error in view.errors.iter().skip(self.logged_errors) {
            tracing::error!("{error}");
        }
        self.logged_errors = view.errors.len();

        for line in &view.lines {
            if self.last.get(&line.slot) == Some(line) {
                continue;
            }
            if line.stage != Stage::Idle {
                tracing::info!(
                    slot = line.slot,
                    file = line.file.as_deref().unwrap_or_default(),
                    stage = line.stage.label(),
                    "progress"
                );
            }
            self.last.insert(line.slot, line.clone());
        }
    }
}
