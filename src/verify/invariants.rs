use crate::data::{BreakdownKind, Registry};
use crate::derive::percent_of_total;
use crate::logging::log_violation;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    /// Absolute, for counts and degrees.
    pub count: f64,
    /// Percentage points, for shares.
    pub share: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            count: 0.5,
            share: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    AverageDegree,
    MaxDegree,
    DegreeBinTotal,
    BreakdownShareSum,
    CategoryShare,
    DuplicateOrganization,
    DegreeOutsideBins,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::AverageDegree => "average_degree",
            ViolationKind::MaxDegree => "max_degree",
            ViolationKind::DegreeBinTotal => "degree_bin_total",
            ViolationKind::BreakdownShareSum => "breakdown_share_sum",
            ViolationKind::CategoryShare => "category_share",
            ViolationKind::DuplicateOrganization => "duplicate_organization",
            ViolationKind::DegreeOutsideBins => "degree_outside_bins",
        }
    }
}

/// Data that loaded but does not reconcile. Never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationReport {
    pub kind: ViolationKind,
    pub subject: String,
    pub expected: f64,
    pub observed: f64,
    pub tolerance: f64,
    pub message: String,
}

fn check(
    out: &mut Vec<ViolationReport>,
    kind: ViolationKind,
    subject: &str,
    expected: f64,
    observed: f64,
    tolerance: f64,
    what: &str,
) {
    if (expected - observed).abs() > tolerance {
        out.push(ViolationReport {
            kind,
            subject: subject.to_string(),
            expected,
            observed,
            tolerance,
            message: format!(
                "{}: expected {} got {} (tolerance {})",
                what, expected, observed, tolerance
            ),
        });
    }
}

/// Recompute what can be recomputed and report every mismatch beyond
/// tolerance.
pub fn cross_check_invariants(registry: &Registry, tol: Tolerances) -> Vec<ViolationReport> {
    let mut out = Vec::new();
    let published = registry.published_metrics();
    let summary = registry.network_summary();

    check(
        &mut out,
        ViolationKind::AverageDegree,
        "network",
        summary.average_degree,
        published.average_degree,
        tol.count,
        "published average degree vs 2*edges/nodes",
    );

    if !registry.organizations(None).is_empty() {
        check(
            &mut out,
            ViolationKind::MaxDegree,
            "network",
            summary.max_degree as f64,
            published.max_degree as f64,
            tol.count,
            "published max degree vs top organization degree",
        );
    }

    check(
        &mut out,
        ViolationKind::DegreeBinTotal,
        "degree_bins",
        summary.node_count as f64,
        registry.degree_bin_total() as f64,
        tol.count,
        "sum of degree bins vs node count",
    );

    let ranges = registry.degree_ranges();
    for org in registry.organizations(None) {
        if !ranges.iter().any(|r| r.contains(org.degree)) {
            let covered_to = ranges.last().and_then(|r| r.hi).unwrap_or(0);
            out.push(ViolationReport {
                kind: ViolationKind::DegreeOutsideBins,
                subject: org.name.clone(),
                expected: covered_to as f64,
                observed: org.degree as f64,
                tolerance: 0.0,
                message: format!(
                    "degree of {} ({}) falls outside every degree bin",
                    org.name, org.degree
                ),
            });
        }
    }

    for kind in BreakdownKind::ALL {
        let entries = registry.breakdown(kind);
        if entries.is_empty() {
            continue;
        }
        let sum: f64 = entries.iter().map(|c| c.share_percent).sum();
        check(
            &mut out,
            ViolationKind::BreakdownShareSum,
            kind.table(),
            100.0,
            sum,
            tol.share,
            "sum of shares",
        );

        if registry.shares_derived(kind) {
            continue;
        }
        let total = registry.breakdown_total(kind);
        for entry in entries {
            check(
                &mut out,
                ViolationKind::CategoryShare,
                &format!("{}/{}", kind.table(), entry.label),
                percent_of_total(entry.count, total),
                entry.share_percent,
                tol.share,
                "stored share vs count/total",
            );
        }
    }

    let mut names: HashMap<&str, u64> = HashMap::new();
    let organizations = registry.organizations(None);
    for org in &organizations {
        *names.entry(org.name.as_str()).or_default() += 1;
    }
    for org in &organizations {
        if let Some(n) = names.remove(org.name.as_str()) {
            check(
                &mut out,
                ViolationKind::DuplicateOrganization,
                &org.name,
                1.0,
                n as f64,
                0.0,
                "organization listed more than once",
            );
        }
    }

    out
}

/// Emit one warn record per report.
pub fn report_violations(reports: &[ViolationReport]) {
    for r in reports {
        log_violation(r.kind.as_str(), &r.subject, r.expected, r.observed, r.tolerance);
    }
}
