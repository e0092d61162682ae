//! Chart specs handed to the renderer.
//!
//! Each chart is `{series, value_format, label_format}`. Renderers must
//! treat the series as read-only and format through the attached formats;
//! every percentage and total in here comes from [`crate::derive`].

use crate::data::{BreakdownKind, CategoryBreakdown, Registry};
use crate::derive::{
    build_ranking_series, build_tick_label, format_currency_long, format_currency_tick,
    format_grouped, format_metric_value, format_percent, palette_color, percent_of_total,
    short_label, CurrencyUnit, DisplayLabel, SeriesPoint,
};
use crate::logging::log_series_built;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    NetworkMetrics,
    DegreeDistribution,
    TopOrganizations,
    OrganizationTypes,
    CoordinatorTypes,
    CountryParticipation,
    CountryCollaborations,
    CountryFunding,
    TopTopics,
    ProjectDurations,
    ProjectSizes,
}

impl ChartId {
    pub const ALL: [ChartId; 11] = [
        ChartId::NetworkMetrics,
        ChartId::DegreeDistribution,
        ChartId::TopOrganizations,
        ChartId::OrganizationTypes,
        ChartId::CoordinatorTypes,
        ChartId::CountryParticipation,
        ChartId::CountryCollaborations,
        ChartId::CountryFunding,
        ChartId::TopTopics,
        ChartId::ProjectDurations,
        ChartId::ProjectSizes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartId::NetworkMetrics => "network_metrics",
            ChartId::DegreeDistribution => "degree_distribution",
            ChartId::TopOrganizations => "top_organizations",
            ChartId::OrganizationTypes => "organization_types",
            ChartId::CoordinatorTypes => "coordinator_types",
            ChartId::CountryParticipation => "country_participation",
            ChartId::CountryCollaborations => "country_collaborations",
            ChartId::CountryFunding => "country_funding",
            ChartId::TopTopics => "top_topics",
            ChartId::ProjectDurations => "project_durations",
            ChartId::ProjectSizes => "project_sizes",
        }
    }

    pub fn parse(id: &str) -> Option<ChartId> {
        ChartId::ALL.into_iter().find(|c| c.as_str() == id)
    }

    pub fn title(&self, top_n: usize) -> String {
        match self {
            ChartId::NetworkMetrics => "Key Network Metrics".to_string(),
            ChartId::DegreeDistribution => "Degree Distribution".to_string(),
            ChartId::TopOrganizations => format!("Top {} Organizations by Degree", top_n),
            ChartId::OrganizationTypes => "Organization Types".to_string(),
            ChartId::CoordinatorTypes => "Project Coordinator Types".to_string(),
            ChartId::CountryParticipation => "Country Participation".to_string(),
            ChartId::CountryCollaborations => "Top Country Collaborations".to_string(),
            ChartId::CountryFunding => "Country Funding Distribution".to_string(),
            ChartId::TopTopics => "Top Research Topics".to_string(),
            ChartId::ProjectDurations => "Project Duration Distribution".to_string(),
            ChartId::ProjectSizes => "Organizations per Project".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    MetricList,
    Bar,
    HorizontalBar,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueFormat {
    Metric,
    Count,
    /// `"34,370 organizations (34.29%)"`, share of `total`.
    CountWithShare { noun: String, total: u64 },
    Currency { unit: CurrencyUnit },
}

fn to_amount(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

impl ValueFormat {
    pub fn format(&self, value: f64) -> String {
        match self {
            ValueFormat::Metric => format_metric_value(value),
            ValueFormat::Count => format_grouped(value),
            ValueFormat::CountWithShare { noun, total } => format!(
                "{} {} ({})",
                format_grouped(value),
                noun,
                format_percent(percent_of_total(to_amount(value), *total), 2)
            ),
            ValueFormat::Currency { unit } => format_currency_long(to_amount(value), *unit),
        }
    }

    /// Axis tick text; coarser than [`ValueFormat::format`] for currency.
    pub fn format_tick(&self, value: f64) -> String {
        match self {
            ValueFormat::Currency { unit } => format_currency_tick(to_amount(value), *unit),
            ValueFormat::CountWithShare { .. } => format_grouped(value),
            other => other.format(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelFormat {
    Plain,
    /// Bin labels; power-of-two bounds typeset.
    Tick,
}

impl LabelFormat {
    pub fn format(&self, label: &str) -> DisplayLabel {
        match self {
            LabelFormat::Plain => DisplayLabel::Text {
                text: label.to_string(),
            },
            LabelFormat::Tick => build_tick_label(label),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub id: ChartId,
    pub title: String,
    pub kind: ChartKind,
    pub color: String,
    pub series: Vec<SeriesPoint>,
    pub value_format: ValueFormat,
    pub label_format: LabelFormat,
}

impl ChartSpec {
    fn new(id: ChartId, top_n: usize, kind: ChartKind, color: &str, series: Vec<SeriesPoint>) -> Self {
        log_series_built(id.as_str(), series.len());
        Self {
            id,
            title: id.title(top_n),
            kind,
            color: color.to_string(),
            series,
            value_format: ValueFormat::Count,
            label_format: LabelFormat::Plain,
        }
    }

    fn value_format(mut self, format: ValueFormat) -> Self {
        self.value_format = format;
        self
    }

    fn label_format(mut self, format: LabelFormat) -> Self {
        self.label_format = format;
        self
    }

    pub fn format_value(&self, value: f64) -> String {
        self.value_format.format(value)
    }

    pub fn format_label(&self, label: &str) -> DisplayLabel {
        self.label_format.format(label)
    }

    pub fn total(&self) -> f64 {
        self.series.iter().map(|p| p.value).sum()
    }
}

fn pie_points(entries: &[CategoryBreakdown]) -> Vec<SeriesPoint> {
    entries
        .iter()
        .enumerate()
        .map(|(i, c)| {
            SeriesPoint::new(c.label.clone(), c.count as f64)
                .with("share_percent", c.share_percent)
                .with(
                    "slice_label",
                    format!("{}: {}", short_label(&c.label), format_percent(c.share_percent, 0)),
                )
                .with("color", palette_color(i))
        })
        .collect()
}

fn share_points<'a>(rows: impl Iterator<Item = (&'a str, u64)>, total: u64) -> Vec<SeriesPoint> {
    rows.map(|(label, count)| {
        SeriesPoint::new(label, count as f64).with("share_percent", percent_of_total(count, total))
    })
    .collect()
}

/// Build one chart from the registry. `top_n` bounds every ranking.
pub fn build_chart(registry: &Registry, id: ChartId, top_n: usize) -> ChartSpec {
    match id {
        ChartId::NetworkMetrics => {
            let s = registry.network_summary();
            let series = vec![
                SeriesPoint::new("Organizations (Nodes)", s.node_count as f64),
                SeriesPoint::new("Collaborations (Edges)", s.edge_count as f64),
                SeriesPoint::new("Average Degree", s.average_degree),
                SeriesPoint::new("Maximum Degree", s.max_degree as f64),
            ];
            ChartSpec::new(id, top_n, ChartKind::MetricList, palette_color(0), series)
                .value_format(ValueFormat::Metric)
        }
        ChartId::DegreeDistribution => {
            let total = registry.degree_bin_total();
            let series = registry
                .degree_bins()
                .iter()
                .zip(registry.degree_ranges())
                .map(|(bin, range)| {
                    SeriesPoint::new(bin.range_label.clone(), bin.node_count as f64)
                        .with("lo", range.lo)
                        .with("hi", json!(range.hi))
                        .with("share_percent", percent_of_total(bin.node_count, total))
                })
                .collect();
            ChartSpec::new(id, top_n, ChartKind::Bar, palette_color(4), series)
                .label_format(LabelFormat::Tick)
        }
        ChartId::TopOrganizations => {
            let series = registry
                .organizations(Some(top_n))
                .into_iter()
                .map(|o| SeriesPoint::new(o.name, o.degree as f64).with("country", o.country_code))
                .collect();
            ChartSpec::new(id, top_n, ChartKind::Bar, palette_color(5), series)
        }
        ChartId::OrganizationTypes | ChartId::CoordinatorTypes => {
            let (kind, noun) = if id == ChartId::OrganizationTypes {
                (BreakdownKind::OrgType, "organizations")
            } else {
                (BreakdownKind::CoordinatorType, "coordinated projects")
            };
            let series = pie_points(registry.breakdown(kind));
            ChartSpec::new(id, top_n, ChartKind::Pie, palette_color(4), series).value_format(
                ValueFormat::CountWithShare {
                    noun: noun.to_string(),
                    total: registry.breakdown_total(kind),
                },
            )
        }
        ChartId::CountryParticipation => {
            let series = share_points(
                registry.countries().iter().map(|c| (c.code.as_str(), c.participations)),
                registry.total_participations(),
            );
            ChartSpec::new(id, top_n, ChartKind::Bar, palette_color(4), series)
        }
        ChartId::CountryCollaborations => {
            let pairs = registry.collaboration_pairs(None);
            let series = build_ranking_series(&pairs, |p| p.pair_label.clone(), |p| p.count as f64, Some(top_n))
                .into_iter()
                .map(|point| {
                    let domestic = point
                        .label
                        .split_once('-')
                        .map(|(a, b)| a == b)
                        .unwrap_or(false);
                    point.with("domestic", domestic)
                })
                .collect();
            ChartSpec::new(id, top_n, ChartKind::Bar, palette_color(4), series)
        }
        ChartId::CountryFunding => {
            let unit = CurrencyUnit::GigaEuro;
            let series = registry
                .countries()
                .iter()
                .map(|c| {
                    SeriesPoint::new(c.code.clone(), c.funding as f64)
                        .with("funding_label", format_currency_long(c.funding, unit))
                        .with("share_percent", percent_of_total(c.funding, registry.total_funding()))
                })
                .collect();
            ChartSpec::new(id, top_n, ChartKind::Bar, palette_color(6), series)
                .value_format(ValueFormat::Currency { unit })
        }
        ChartId::TopTopics => {
            let topics = registry.topics(None);
            let series = build_ranking_series(&topics, |t| t.name.clone(), |t| t.project_count as f64, Some(top_n));
            ChartSpec::new(id, top_n, ChartKind::HorizontalBar, palette_color(4), series)
        }
        ChartId::ProjectDurations => {
            let kind = BreakdownKind::Duration;
            let total = registry.breakdown_total(kind);
            let series = share_points(
                registry.breakdown(kind).iter().map(|c| (c.label.as_str(), c.count)),
                total,
            );
            ChartSpec::new(id, top_n, ChartKind::Bar, palette_color(5), series).value_format(
                ValueFormat::CountWithShare {
                    noun: "projects".to_string(),
                    total,
                },
            )
        }
        ChartId::ProjectSizes => {
            let total: u64 = registry.project_sizes().iter().map(|b| b.project_count).sum();
            let series = share_points(
                registry
                    .project_sizes()
                    .iter()
                    .map(|b| (b.range_label.as_str(), b.project_count)),
                total,
            );
            ChartSpec::new(id, top_n, ChartKind::Bar, palette_color(1), series)
                .label_format(LabelFormat::Tick)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::canonical().unwrap()
    }

    #[test]
    fn chart_ids_roundtrip() {
        for id in ChartId::ALL {
            assert_eq!(ChartId::parse(id.as_str()), Some(id));
        }
        assert_eq!(ChartId::parse("pie"), None);
    }

    #[test]
    fn top_organizations_respects_limit() {
        let chart = build_chart(&registry(), ChartId::TopOrganizations, 1);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].label, "FRAUNHOFER GESELLSCHAFT");
        assert_eq!(chart.series[0].extra["country"], "DE");
        assert_eq!(chart.title, "Top 1 Organizations by Degree");
    }

    #[test]
    fn organization_type_tooltip_uses_table_total() {
        let chart = build_chart(&registry(), ChartId::OrganizationTypes, 10);
        assert_eq!(chart.kind, ChartKind::Pie);
        assert_eq!(
            chart.format_value(34370.0),
            "34,370 organizations (34.29%)"
        );
        assert_eq!(chart.series[0].extra["slice_label"], "Higher: 34%");
        assert_eq!(chart.series[0].extra["color"], "#0088FE");
    }

    #[test]
    fn funding_formats() {
        let chart = build_chart(&registry(), ChartId::CountryFunding, 10);
        assert_eq!(chart.format_value(7_143_895_811.0), "\u{20AC}7.14 billion");
        assert_eq!(chart.value_format.format_tick(7_143_895_811.0), "\u{20AC}7B");
        assert_eq!(chart.series[0].extra["funding_label"], "\u{20AC}7.14 billion");
    }

    #[test]
    fn degree_distribution_uses_tick_labels() {
        let chart = build_chart(&registry(), ChartId::DegreeDistribution, 10);
        assert_eq!(chart.series.len(), 11);
        assert!(chart.format_label(&chart.series[9].label).has_exponent());
        assert!(!chart.format_label(&chart.series[1].label).has_exponent());
        assert_eq!(chart.total(), 26618.0);
    }

    #[test]
    fn participation_shares_sum_to_hundred() {
        let chart = build_chart(&registry(), ChartId::CountryParticipation, 10);
        let sum: f64 = chart
            .series
            .iter()
            .map(|p| p.extra["share_percent"].as_f64().unwrap())
            .sum();
        assert!((sum - 100.0).abs() < 0.5);
    }

    #[test]
    fn collaborations_flag_domestic_pairs() {
        let chart = build_chart(&registry(), ChartId::CountryCollaborations, 3);
        let labels: Vec<_> = chart.series.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["ES-IT", "DE-ES", "ES-ES"]);
        assert_eq!(chart.series[2].extra["domestic"], true);
    }

    #[test]
    fn duration_tooltip() {
        let chart = build_chart(&registry(), ChartId::ProjectDurations, 10);
        assert_eq!(chart.format_value(4712.0), "4,712 projects (30.72%)");
    }

    #[test]
    fn metrics_use_derived_summary() {
        let chart = build_chart(&registry(), ChartId::NetworkMetrics, 10);
        assert_eq!(chart.format_value(chart.series[0].value), "27,224");
        assert_eq!(chart.format_value(chart.series[2].value), "55.198");
    }
}
