//! Headless render target that keeps live charts in memory.
//!
//! Used for JSON output and tests. Every create/destroy call is recorded in
//! order so callers can check lifecycle sequencing.

use std::collections::BTreeMap;

use super::{ChartHandle, ChartSpec, RenderTarget};
use crate::error::{DashboardError, Result};

/// One lifecycle call observed by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    Created { slot: String, handle: ChartHandle },
    Destroyed { slot: String, handle: ChartHandle },
}

#[derive(Debug, Clone)]
struct LiveChart {
    slot: String,
    spec: ChartSpec,
}

#[derive(Debug, Default)]
pub struct MemorySurface {
    slots: Vec<String>,
    next_handle: u64,
    live: BTreeMap<ChartHandle, LiveChart>,
    ops: Vec<SurfaceOp>,
}

impl MemorySurface {
    pub fn with_slots<I, S>(slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slots: slots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Number of live charts bound to `slot`.
    pub fn live_on(&self, slot: &str) -> usize {
        self.live.values().filter(|c| c.slot == slot).count()
    }

    /// Spec of the live chart bound to `slot`, if any.
    pub fn chart_on(&self, slot: &str) -> Option<&ChartSpec> {
        self.live
            .values()
            .find(|c| c.slot == slot)
            .map(|c| &c.spec)
    }

    /// Live charts in slot declaration order.
    pub fn charts(&self) -> Vec<(&str, &ChartSpec)> {
        self.slots
            .iter()
            .filter_map(|slot| self.chart_on(slot).map(|spec| (slot.as_str(), spec)))
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }
}

impl RenderTarget for MemorySurface {
    fn has_slot(&self, slot: &str) -> bool {
        self.slots.iter().any(|s| s == slot)
    }

    fn create_chart(&mut self, slot: &str, spec: &ChartSpec) -> Result<ChartHandle> {
        if !self.has_slot(slot) {
            return Err(DashboardError::MissingRenderTarget(slot.to_string()));
        }
        self.next_handle += 1;
        let handle = ChartHandle(self.next_handle);
        self.live.insert(
            handle,
            LiveChart {
                slot: slot.to_string(),
                spec: spec.clone(),
            },
        );
        self.ops.push(SurfaceOp::Created {
            slot: slot.to_string(),
            handle,
        });
        Ok(handle)
    }

    fn destroy_chart(&mut self, handle: ChartHandle) {
        if let Some(chart) = self.live.remove(&handle) {
            self.ops.push(SurfaceOp::Destroyed {
                slot: chart.slot,
                handle,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::ChartKind;

    #[test]
    fn test_create_and_destroy_are_recorded() {
        let mut surface = MemorySurface::with_slots(["a"]);
        let spec = ChartSpec::new(ChartKind::Bar, vec!["x".into()], vec![1.0], "t");
        let h = surface.create_chart("a", &spec).unwrap();
        assert_eq!(surface.live_on("a"), 1);
        surface.destroy_chart(h);
        assert_eq!(surface.live_on("a"), 0);
        assert_eq!(surface.ops().len(), 2);
    }

    #[test]
    fn test_unknown_slot_is_rejected() {
        let mut surface = MemorySurface::with_slots(["a"]);
        let spec = ChartSpec::new(ChartKind::Pie, vec![], vec![], "t");
        assert_eq!(
            surface.create_chart("b", &spec),
            Err(DashboardError::MissingRenderTarget("b".to_string()))
        );
    }

    #[test]
    fn test_destroying_unknown_handle_is_ignored() {
        let mut surface = MemorySurface::with_slots(["a"]);
        surface.destroy_chart(ChartHandle(99));
        assert!(surface.ops().is_empty());
    }
}
