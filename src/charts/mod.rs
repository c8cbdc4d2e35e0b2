//! Chart registry: owns the live chart instance for every dashboard slot.
//!
//! The charting engine itself sits behind [`RenderTarget`]: something that
//! knows which slots exist, can create a chart bound to a slot and can
//! destroy one. [`ChartRegistry`] keeps at most one live instance per slot
//! id and always destroys the previous instance before creating its
//! replacement, so repeated refreshes never leave orphaned or doubled
//! charts behind.
//!
//! Two surfaces ship with the crate:
//!
//! - [`memory::MemorySurface`]: headless, records every create/destroy.
//! - [`terminal::TerminalSurface`]: draws text charts to a writer.

pub mod memory;
pub mod terminal;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::{DashboardError, Result};

/// Fixed categorical palette, applied positionally and cycling.
pub const PALETTE: [&str; 5] = ["#667eea", "#764ba2", "#4fd1c5", "#f6ad55", "#fc8181"];

// ---------------------------------------------------------------------------
// Chart description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Doughnut,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bar => write!(f, "bar"),
            Self::Pie => write!(f, "pie"),
            Self::Doughnut => write!(f, "doughnut"),
        }
    }
}

/// Everything a surface needs to draw one chart.
///
/// Serializes to the chart-config shape web charting engines expect:
/// `{type, data: {labels, datasets: [{label, data, backgroundColor}]}, options}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
    pub background_color: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOptions {
    pub responsive: bool,
    pub plugins: ChartPlugins,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPlugins {
    pub legend: Legend,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub display: bool,
}

impl ChartSpec {
    /// Single-dataset chart with the dashboard palette. Bar charts hide the
    /// legend; pie and doughnut charts show it.
    pub fn new(kind: ChartKind, labels: Vec<String>, values: Vec<f64>, title: &str) -> Self {
        let background_color = palette(values.len());
        Self {
            kind,
            data: ChartData {
                labels,
                datasets: vec![Dataset {
                    label: title.to_string(),
                    data: values,
                    background_color,
                }],
            },
            options: ChartOptions {
                responsive: true,
                plugins: ChartPlugins {
                    legend: Legend {
                        display: kind != ChartKind::Bar,
                    },
                },
            },
        }
    }

    /// Title of the first dataset.
    pub fn title(&self) -> &str {
        self.data
            .datasets
            .first()
            .map(|d| d.label.as_str())
            .unwrap_or("")
    }
}

/// Palette colors for `n` data points.
pub fn palette(n: usize) -> Vec<String> {
    PALETTE.iter().cycle().take(n).map(|c| c.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Render target capability
// ---------------------------------------------------------------------------

/// Opaque handle to a live chart, issued by a [`RenderTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChartHandle(pub u64);

/// A place charts can be drawn.
pub trait RenderTarget {
    /// Whether a slot with this id exists on the surface.
    fn has_slot(&self, slot: &str) -> bool;

    /// Draw a chart bound to `slot` and return its handle.
    fn create_chart(&mut self, slot: &str, spec: &ChartSpec) -> Result<ChartHandle>;

    /// Release a chart previously returned by [`create_chart`](Self::create_chart).
    fn destroy_chart(&mut self, handle: ChartHandle);
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry entry for one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartEntry {
    pub id: String,
    pub kind: ChartKind,
    /// `None` only if creating the replacement failed after the old
    /// instance was destroyed.
    pub instance: Option<ChartHandle>,
}

/// Maps slot ids to their single live chart instance.
#[derive(Debug)]
pub struct ChartRegistry<T: RenderTarget> {
    target: T,
    entries: HashMap<String, ChartEntry>,
}

impl<T: RenderTarget> ChartRegistry<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            entries: HashMap::new(),
        }
    }

    /// Render (or re-render) the chart for slot `id`.
    ///
    /// Any live instance for `id` is destroyed before the replacement is
    /// created. Fails with [`DashboardError::MissingRenderTarget`] if the
    /// surface has no such slot.
    pub fn render(
        &mut self,
        id: &str,
        kind: ChartKind,
        labels: Vec<String>,
        values: Vec<f64>,
        title: &str,
    ) -> Result<ChartHandle> {
        if !self.target.has_slot(id) {
            return Err(DashboardError::MissingRenderTarget(id.to_string()));
        }

        let spec = ChartSpec::new(kind, labels, values, title);
        let entry = self
            .entries
            .entry(id.to_string())
            .or_insert_with(|| ChartEntry {
                id: id.to_string(),
                kind,
                instance: None,
            });

        if let Some(previous) = entry.instance.take() {
            self.target.destroy_chart(previous);
        }

        entry.kind = kind;
        let handle = self.target.create_chart(id, &spec)?;
        entry.instance = Some(handle);
        Ok(handle)
    }

    /// Destroy every live instance. Entries are kept so a later render
    /// reuses them.
    pub fn teardown(&mut self) {
        for entry in self.entries.values_mut() {
            if let Some(handle) = entry.instance.take() {
                self.target.destroy_chart(handle);
            }
        }
    }

    pub fn entry(&self, id: &str) -> Option<&ChartEntry> {
        self.entries.get(id)
    }

    /// Number of slots that currently hold a live instance.
    pub fn live_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.instance.is_some())
            .count()
    }

    /// Read-only access to the surface, e.g. for inspection or output.
    pub fn target(&self) -> &T {
        &self.target
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_cycles() {
        let colors = palette(7);
        assert_eq!(colors.len(), 7);
        assert_eq!(colors[0], "#667eea");
        assert_eq!(colors[5], "#667eea");
        assert_eq!(colors[6], "#764ba2");
    }

    #[test]
    fn test_legend_hidden_for_bar_only() {
        let bar = ChartSpec::new(ChartKind::Bar, vec![], vec![], "t");
        let pie = ChartSpec::new(ChartKind::Pie, vec![], vec![], "t");
        let doughnut = ChartSpec::new(ChartKind::Doughnut, vec![], vec![], "t");
        assert!(!bar.options.plugins.legend.display);
        assert!(pie.options.plugins.legend.display);
        assert!(doughnut.options.plugins.legend.display);
    }

    #[test]
    fn test_spec_serializes_to_chart_config_shape() {
        let spec = ChartSpec::new(
            ChartKind::Doughnut,
            vec!["High (>90%)".to_string()],
            vec![3.0],
            "Confidence Distribution",
        );
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["type"], "doughnut");
        assert_eq!(value["data"]["labels"][0], "High (>90%)");
        assert_eq!(value["data"]["datasets"][0]["label"], "Confidence Distribution");
        assert_eq!(value["data"]["datasets"][0]["backgroundColor"][0], "#667eea");
        assert_eq!(value["options"]["responsive"], true);
        assert_eq!(value["options"]["plugins"]["legend"]["display"], true);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ChartKind::Doughnut.to_string(), "doughnut");
    }
}
