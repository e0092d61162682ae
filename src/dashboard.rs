//! Composition of registry, controller and derived charts.
//!
//! The registry is shared (`Arc`) and read-only; each `Dashboard` owns its
//! own controller, so one `Dashboard` per session.

use crate::config::Config;
use crate::data::Registry;
use crate::error::ViewError;
use crate::series::{build_chart, ChartId, ChartKind, ChartSpec};
use crate::verify::invariants::{cross_check_invariants, report_violations, ViolationReport};
use crate::view::{SectionDef, ViewController};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;

/// Stand-in for the charting library.
pub trait Renderer {
    type Output;

    fn render(&mut self, chart: &ChartSpec) -> Self::Output;
}

/// Everything the presentation layer needs for the active section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub section: String,
    pub title: String,
    pub sections: Vec<SectionDef>,
    pub charts: Vec<ChartSpec>,
    pub violations: Vec<ViolationReport>,
    /// Shown as a "data inconsistency" banner; never blocks rendering.
    pub inconsistent: bool,
    pub fingerprint: String,
}

pub struct Dashboard {
    registry: Arc<Registry>,
    controller: ViewController,
    top_n: usize,
    violations: Arc<Vec<ViolationReport>>,
}

impl Dashboard {
    /// Runs the cross-checks and logs every report.
    pub fn new(registry: Arc<Registry>, controller: ViewController, config: &Config) -> Self {
        let violations = cross_check_invariants(&registry, config.tolerances());
        report_violations(&violations);
        Self::with_violations(registry, controller, Arc::new(violations), config.top_n)
    }

    /// Session over reports already computed for `registry`; nothing is
    /// re-checked or re-logged.
    pub fn with_violations(
        registry: Arc<Registry>,
        controller: ViewController,
        violations: Arc<Vec<ViolationReport>>,
        top_n: usize,
    ) -> Self {
        Self {
            registry,
            controller,
            top_n,
            violations,
        }
    }

    /// New session over an already-loaded registry.
    pub fn session(registry: Arc<Registry>, config: &Config) -> Result<Self, ViewError> {
        Ok(Self::new(registry, config.view_controller()?, config))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn select(&mut self, section: &str) -> Result<(), ViewError> {
        self.controller.select(section)
    }

    pub fn current_section(&self) -> &str {
        self.controller.current_id()
    }

    pub fn sections(&self) -> &[SectionDef] {
        self.controller.sections()
    }

    pub fn violations(&self) -> &[ViolationReport] {
        &self.violations
    }

    pub fn chart(&self, id: ChartId) -> ChartSpec {
        build_chart(&self.registry, id, self.top_n)
    }

    pub fn charts(&self) -> Vec<ChartSpec> {
        self.controller
            .active_charts()
            .iter()
            .map(|id| self.chart(*id))
            .collect()
    }

    pub fn view(&self) -> DashboardView {
        let section = self.controller.current();
        DashboardView {
            section: section.id.clone(),
            title: section.title.clone(),
            sections: self.controller.sections().to_vec(),
            charts: self.charts(),
            violations: self.violations.to_vec(),
            inconsistent: !self.violations.is_empty(),
            fingerprint: self.registry.fingerprint().to_string(),
        }
    }

    pub fn render<R: Renderer>(&self, renderer: &mut R) -> Vec<R::Output> {
        self.charts().iter().map(|c| renderer.render(c)).collect()
    }
}

/// Plain-text renderer for terminals.
#[derive(Debug, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&mut self, chart: &ChartSpec) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== {}", chart.title);
        for point in &chart.series {
            let label = chart.format_label(&point.label);
            let label = match chart.kind {
                ChartKind::Pie => point
                    .extra
                    .get("slice_label")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| label.to_string()),
                _ => label.to_string(),
            };
            let _ = writeln!(out, "  {:<32} {}", label, chart.format_value(point.value));
        }
        out
    }
}

/// Full text page: header, optional inconsistency banner, charts.
pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();
    let tabs: Vec<String> = view
        .sections
        .iter()
        .map(|s| {
            if s.id == view.section {
                format!("[{}]", s.title)
            } else {
                s.title.clone()
            }
        })
        .collect();
    let _ = writeln!(out, "{}", tabs.join(" | "));
    if view.inconsistent {
        let _ = writeln!(out, "! data inconsistency: {} check(s) failed", view.violations.len());
        for v in &view.violations {
            let _ = writeln!(out, "!   {}", v.message);
        }
    }
    let mut renderer = TextRenderer;
    for chart in &view.charts {
        out.push_str(&renderer.render(chart));
    }
    out
}
