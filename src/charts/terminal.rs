//! Text render target: draws each chart to a writer as it is created.
//!
//! Bar charts become horizontal bars scaled to the largest value; pie and
//! doughnut charts become a colored legend with each slice's share.

use std::collections::HashMap;
use std::io::{self, Stdout, Write};

use colored::Colorize;

use super::{ChartHandle, ChartKind, ChartSpec, RenderTarget};
use crate::error::{DashboardError, Result};

/// Width of the longest bar, in cells.
const BAR_WIDTH: usize = 36;

pub struct TerminalSurface<W: Write> {
    out: W,
    slots: Vec<String>,
    next_handle: u64,
    live: HashMap<ChartHandle, String>,
}

impl TerminalSurface<Stdout> {
    pub fn stdout<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(io::stdout(), slots)
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new<I, S>(out: W, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            out,
            slots: slots.into_iter().map(Into::into).collect(),
            next_handle: 0,
            live: HashMap::new(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RenderTarget for TerminalSurface<W> {
    fn has_slot(&self, slot: &str) -> bool {
        self.slots.iter().any(|s| s == slot)
    }

    fn create_chart(&mut self, slot: &str, spec: &ChartSpec) -> Result<ChartHandle> {
        if !self.has_slot(slot) {
            return Err(DashboardError::MissingRenderTarget(slot.to_string()));
        }
        self.next_handle += 1;
        let handle = ChartHandle(self.next_handle);
        self.live.insert(handle, slot.to_string());

        // Terminal output is best-effort; a closed pipe must not fail a refresh.
        let _ = self.out.write_all(draw_chart(spec).as_bytes());
        let _ = self.out.flush();
        Ok(handle)
    }

    fn destroy_chart(&mut self, handle: ChartHandle) {
        self.live.remove(&handle);
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// Render a chart spec as text.
pub fn draw_chart(spec: &ChartSpec) -> String {
    let mut text = format!("{}\n", spec.title().bold().cyan());

    let Some(dataset) = spec.data.datasets.first() else {
        return text;
    };
    if dataset.data.is_empty() {
        text.push_str(&format!("  {}\n\n", "(no data)".dimmed()));
        return text;
    }

    let label_width = spec
        .data
        .labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0);

    match spec.kind {
        ChartKind::Bar => {
            let max = dataset.data.iter().cloned().fold(0.0_f64, f64::max);
            for (i, value) in dataset.data.iter().enumerate() {
                let label = spec.data.labels.get(i).map(String::as_str).unwrap_or("");
                let cells = if max > 0.0 {
                    ((value / max) * BAR_WIDTH as f64).round() as usize
                } else {
                    0
                };
                let bar = paint(&"█".repeat(cells), dataset.background_color.get(i));
                text.push_str(&format!(
                    "  {label:<label_width$}  {bar} {}\n",
                    format_value(*value)
                ));
            }
        }
        ChartKind::Pie | ChartKind::Doughnut => {
            let total: f64 = dataset.data.iter().sum();
            let marker = if spec.kind == ChartKind::Pie { "●" } else { "◍" };
            for (i, value) in dataset.data.iter().enumerate() {
                let label = spec.data.labels.get(i).map(String::as_str).unwrap_or("");
                let share = if total > 0.0 { value / total * 100.0 } else { 0.0 };
                text.push_str(&format!(
                    "  {} {label:<label_width$}  {} ({share:.1}%)\n",
                    paint(marker, dataset.background_color.get(i)),
                    format_value(*value),
                ));
            }
        }
    }

    text.push('\n');
    text
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn paint(text: &str, color: Option<&String>) -> String {
    match color.and_then(|c| hex_rgb(c)) {
        Some((r, g, b)) => text.truecolor(r, g, b).to_string(),
        None => text.to_string(),
    }
}

/// Parse `#rrggbb`.
fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}
