//! Dataset registry: immutable, validated tables for the dashboard.
//!
//! A registry is built once from a single JSON document (or an already
//! deserialized [`DatasetInput`]) and never mutated afterwards. Shape
//! violations abort construction; numeric drift between tables is left to
//! [`crate::verify::invariants::cross_check_invariants`].

pub mod bins;

use crate::derive::percent_of_total;
use crate::error::DatasetError;
use crate::logging::{log_dataset_loaded, log_dataset_rejected, obj, v_str, ProfileScope};
use bins::{validate_partition, BinRange};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::Path;

/// EU research network, 2021-2027 funding period.
pub const CANONICAL_DATASET: &str = include_str!("../../data/horizon_2021_2027.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizationRecord {
    pub name: String,
    pub country_code: String,
    pub degree: u64,
}

/// `funding` is an exact integer in the dataset's smallest unit (whole
/// euros for EC contributions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountryRecord {
    pub code: String,
    pub participations: u64,
    pub funding: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollaborationPairRecord {
    pub pair_label: String,
    pub count: u64,
}

/// Category row as supplied. When every row of a table omits
/// `share_percent`, shares are derived from counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryInput {
    pub label: String,
    pub count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub label: String,
    pub count: u64,
    pub share_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DegreeBin {
    pub range_label: String,
    pub node_count: u64,
}

/// Participating organizations per project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSizeBin {
    pub range_label: String,
    pub project_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopicRecord {
    pub name: String,
    pub project_count: u64,
}

/// Published network metrics, as computed upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkMetrics {
    pub nodes: u64,
    pub edges: u64,
    pub average_degree: f64,
    pub max_degree: u64,
}

/// Summary derived from the tables rather than taken from the published
/// metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub node_count: u64,
    pub edge_count: u64,
    pub average_degree: f64,
    pub max_degree: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetInput {
    pub network: NetworkMetrics,
    pub organizations: Vec<OrganizationRecord>,
    pub countries: Vec<CountryRecord>,
    pub collaborations: Vec<CollaborationPairRecord>,
    pub org_types: Vec<CategoryInput>,
    pub coordinator_types: Vec<CategoryInput>,
    pub durations: Vec<CategoryInput>,
    pub degree_bins: Vec<DegreeBin>,
    pub topics: Vec<TopicRecord>,
    #[serde(default)]
    pub project_sizes: Vec<ProjectSizeBin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownKind {
    OrgType,
    CoordinatorType,
    Duration,
}

impl BreakdownKind {
    pub const ALL: [BreakdownKind; 3] = [
        BreakdownKind::OrgType,
        BreakdownKind::CoordinatorType,
        BreakdownKind::Duration,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            BreakdownKind::OrgType => "org_types",
            BreakdownKind::CoordinatorType => "coordinator_types",
            BreakdownKind::Duration => "durations",
        }
    }

    fn index(&self) -> usize {
        match self {
            BreakdownKind::OrgType => 0,
            BreakdownKind::CoordinatorType => 1,
            BreakdownKind::Duration => 2,
        }
    }
}

#[derive(Debug, Clone)]
struct BreakdownTable {
    entries: Vec<CategoryBreakdown>,
    shares_derived: bool,
}

#[derive(Debug, Clone)]
pub struct Registry {
    network: NetworkMetrics,
    organizations: Vec<OrganizationRecord>,
    countries: Vec<CountryRecord>,
    collaborations: Vec<CollaborationPairRecord>,
    breakdowns: [BreakdownTable; 3],
    degree_bins: Vec<DegreeBin>,
    degree_ranges: Vec<BinRange>,
    topics: Vec<TopicRecord>,
    project_sizes: Vec<ProjectSizeBin>,
    fingerprint: String,
}

/// Descending by key; `sort_by` is stable so ties keep insertion order.
pub(crate) fn top_by<T: Clone>(records: &[T], key: impl Fn(&T) -> u64, limit: Option<usize>) -> Vec<T> {
    let mut out = records.to_vec();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    if let Some(limit) = limit {
        out.truncate(limit);
    }
    out
}

pub fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_uppercase())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn check_pair_label(label: &str) -> Result<(), DatasetError> {
    let bad = || DatasetError::BadPairLabel(label.to_string());
    let (a, b) = label.split_once('-').ok_or_else(bad)?;
    if !is_country_code(a) || !is_country_code(b) || a > b {
        return Err(bad());
    }
    Ok(())
}

fn build_breakdown(
    kind: BreakdownKind,
    rows: Vec<CategoryInput>,
) -> Result<BreakdownTable, DatasetError> {
    let table = kind.table();
    let declared = rows.iter().filter(|r| r.share_percent.is_some()).count();
    if declared != 0 && declared != rows.len() {
        return Err(DatasetError::Malformed(format!(
            "{} mixes declared and omitted share_percent",
            table
        )));
    }
    let shares_derived = declared == 0;
    let total: u64 = rows.iter().map(|r| r.count).sum();

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        if row.label.trim().is_empty() {
            return Err(DatasetError::Malformed(format!("{} row with empty label", table)));
        }
        let share_percent = match row.share_percent {
            Some(share) => {
                if !share.is_finite() || !(0.0..=100.0).contains(&share) {
                    return Err(DatasetError::ShareOutOfRange {
                        table,
                        label: row.label,
                        share,
                    });
                }
                share
            }
            None => percent_of_total(row.count, total),
        };
        entries.push(CategoryBreakdown {
            label: row.label,
            count: row.count,
            share_percent,
        });
    }
    Ok(BreakdownTable {
        entries,
        shares_derived,
    })
}

impl Registry {
    /// Registry over the embedded 2021-2027 dataset.
    pub fn canonical() -> Result<Self, DatasetError> {
        Self::from_json(CANONICAL_DATASET)
    }

    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DatasetError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, DatasetError> {
        let input: DatasetInput = match serde_json::from_str(text) {
            Ok(input) => input,
            Err(err) => {
                let err = DatasetError::from(err);
                log_dataset_rejected(&err.to_string());
                return Err(err);
            }
        };
        Self::from_input(input)
    }

    /// The fingerprint covers the re-serialized input, so formatting of the
    /// source text does not affect it.
    pub fn from_input(input: DatasetInput) -> Result<Self, DatasetError> {
        let bytes = serde_json::to_vec(&input)?;
        Self::build(input, sha256_hex(&bytes))
    }

    fn build(input: DatasetInput, fingerprint: String) -> Result<Self, DatasetError> {
        let _scope = ProfileScope::with_context("data", "registry_build", &[("fingerprint", v_str(&fingerprint))]);
        match Self::validate(input, fingerprint) {
            Ok(registry) => {
                log_dataset_loaded(
                    &registry.fingerprint,
                    obj(&[
                        ("organizations", registry.organizations.len().into()),
                        ("countries", registry.countries.len().into()),
                        ("collaborations", registry.collaborations.len().into()),
                        ("degree_bins", registry.degree_bins.len().into()),
                        ("topics", registry.topics.len().into()),
                    ]),
                );
                Ok(registry)
            }
            Err(err) => {
                log_dataset_rejected(&err.to_string());
                Err(err)
            }
        }
    }

    fn validate(input: DatasetInput, fingerprint: String) -> Result<Self, DatasetError> {
        let DatasetInput {
            network,
            organizations,
            countries,
            collaborations,
            org_types,
            coordinator_types,
            durations,
            degree_bins,
            topics,
            project_sizes,
        } = input;

        if !network.average_degree.is_finite() || network.average_degree < 0.0 {
            return Err(DatasetError::Malformed(format!(
                "network.average_degree must be a non-negative number, got {}",
                network.average_degree
            )));
        }

        for org in &organizations {
            if org.name.trim().is_empty() {
                return Err(DatasetError::Malformed("organization with empty name".to_string()));
            }
            if !is_country_code(&org.country_code) {
                return Err(DatasetError::BadCountryCode {
                    table: "organizations",
                    code: org.country_code.clone(),
                });
            }
        }

        {
            let mut seen = HashSet::new();
            for country in &countries {
                if !is_country_code(&country.code) {
                    return Err(DatasetError::BadCountryCode {
                        table: "countries",
                        code: country.code.clone(),
                    });
                }
                if !seen.insert(country.code.as_str()) {
                    return Err(DatasetError::DuplicateCountry(country.code.clone()));
                }
            }
        }

        {
            let mut seen = HashSet::new();
            for pair in &collaborations {
                check_pair_label(&pair.pair_label)?;
                if !seen.insert(pair.pair_label.as_str()) {
                    return Err(DatasetError::DuplicatePair(pair.pair_label.clone()));
                }
            }
        }

        for topic in &topics {
            if topic.name.trim().is_empty() {
                return Err(DatasetError::Malformed("topic with empty name".to_string()));
            }
        }

        if degree_bins.is_empty() {
            return Err(DatasetError::EmptyTable("degree_bins"));
        }
        let degree_ranges =
            validate_partition("degree_bins", degree_bins.iter().map(|b| b.range_label.as_str()))?;
        validate_partition(
            "project_sizes",
            project_sizes.iter().map(|b| b.range_label.as_str()),
        )?;

        let breakdowns = [
            build_breakdown(BreakdownKind::OrgType, org_types)?,
            build_breakdown(BreakdownKind::CoordinatorType, coordinator_types)?,
            build_breakdown(BreakdownKind::Duration, durations)?,
        ];

        Ok(Self {
            network,
            organizations,
            countries,
            collaborations,
            breakdowns,
            degree_bins,
            degree_ranges,
            topics,
            project_sizes,
            fingerprint,
        })
    }

    /// Organizations by descending degree, ties in insertion order.
    pub fn organizations(&self, limit: Option<usize>) -> Vec<OrganizationRecord> {
        top_by(&self.organizations, |o| o.degree, limit)
    }

    pub fn countries(&self) -> &[CountryRecord] {
        &self.countries
    }

    pub fn collaboration_pairs(&self, limit: Option<usize>) -> Vec<CollaborationPairRecord> {
        top_by(&self.collaborations, |p| p.count, limit)
    }

    pub fn breakdown(&self, kind: BreakdownKind) -> &[CategoryBreakdown] {
        &self.breakdowns[kind.index()].entries
    }

    /// True when the shares of `kind` were computed from counts at load.
    pub fn shares_derived(&self, kind: BreakdownKind) -> bool {
        self.breakdowns[kind.index()].shares_derived
    }

    pub fn degree_bins(&self) -> &[DegreeBin] {
        &self.degree_bins
    }

    pub fn degree_ranges(&self) -> &[BinRange] {
        &self.degree_ranges
    }

    pub fn project_sizes(&self) -> &[ProjectSizeBin] {
        &self.project_sizes
    }

    pub fn topics(&self, limit: Option<usize>) -> Vec<TopicRecord> {
        top_by(&self.topics, |t| t.project_count, limit)
    }

    pub fn published_metrics(&self) -> &NetworkMetrics {
        &self.network
    }

    pub fn network_summary(&self) -> NetworkSummary {
        let node_count = self.network.nodes;
        let edge_count = self.network.edges;
        let average_degree = if node_count == 0 {
            0.0
        } else {
            2.0 * edge_count as f64 / node_count as f64
        };
        let max_degree = self
            .organizations
            .iter()
            .map(|o| o.degree)
            .max()
            .unwrap_or(self.network.max_degree);
        NetworkSummary {
            node_count,
            edge_count,
            average_degree,
            max_degree,
        }
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn total_participations(&self) -> u64 {
        self.countries.iter().map(|c| c.participations).sum()
    }

    pub fn total_funding(&self) -> u64 {
        self.countries.iter().map(|c| c.funding).sum()
    }

    pub fn breakdown_total(&self, kind: BreakdownKind) -> u64 {
        self.breakdown(kind).iter().map(|c| c.count).sum()
    }

    pub fn degree_bin_total(&self) -> u64 {
        self.degree_bins.iter().map(|b| b.node_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> DatasetInput {
        serde_json::from_str(CANONICAL_DATASET).unwrap()
    }

    #[test]
    fn canonical_dataset_loads() {
        let registry = Registry::canonical().unwrap();
        assert_eq!(registry.countries().len(), 8);
        assert_eq!(registry.degree_bins().len(), 11);
        assert_eq!(registry.fingerprint().len(), 64);
    }

    #[test]
    fn fingerprint_ignores_source_formatting() {
        let canonical = Registry::canonical().unwrap();
        let value: serde_json::Value = serde_json::from_str(CANONICAL_DATASET).unwrap();
        let compact = Registry::from_json(&value.to_string()).unwrap();
        let pretty = Registry::from_json(&serde_json::to_string_pretty(&value).unwrap()).unwrap();
        let parsed = Registry::from_input(input()).unwrap();
        assert_eq!(compact.fingerprint(), canonical.fingerprint());
        assert_eq!(pretty.fingerprint(), canonical.fingerprint());
        assert_eq!(parsed.fingerprint(), canonical.fingerprint());
    }

    #[test]
    fn organizations_limit_and_order() {
        let registry = Registry::canonical().unwrap();
        let top = registry.organizations(Some(3));
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].name, "FRAUNHOFER GESELLSCHAFT");
        assert!(top.windows(2).all(|w| w[0].degree >= w[1].degree));
        assert_eq!(registry.organizations(Some(500)).len(), 10);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut data = input();
        data.topics = vec![
            TopicRecord { name: "b".into(), project_count: 5 },
            TopicRecord { name: "a".into(), project_count: 7 },
            TopicRecord { name: "c".into(), project_count: 5 },
        ];
        let registry = Registry::from_input(data).unwrap();
        let names: Vec<_> = registry.topics(None).into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn coordinator_shares_are_derived() {
        let registry = Registry::canonical().unwrap();
        assert!(registry.shares_derived(BreakdownKind::CoordinatorType));
        assert!(!registry.shares_derived(BreakdownKind::OrgType));
        let sum: f64 = registry
            .breakdown(BreakdownKind::CoordinatorType)
            .iter()
            .map(|c| c.share_percent)
            .sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn summary_average_is_derived_from_edges() {
        let registry = Registry::canonical().unwrap();
        let summary = registry.network_summary();
        assert!((summary.average_degree - 2.0 * 751350.0 / 27224.0).abs() < 1e-9);
        assert_eq!(summary.max_degree, 5312);
    }

    #[test]
    fn reversed_pair_rejected() {
        let mut data = input();
        data.collaborations.push(CollaborationPairRecord {
            pair_label: "IT-DE".into(),
            count: 1,
        });
        assert_eq!(
            Registry::from_input(data).unwrap_err(),
            DatasetError::BadPairLabel("IT-DE".into())
        );
    }

    #[test]
    fn duplicate_pair_rejected() {
        let mut data = input();
        data.collaborations.push(CollaborationPairRecord {
            pair_label: "ES-IT".into(),
            count: 1,
        });
        assert_eq!(
            Registry::from_input(data).unwrap_err(),
            DatasetError::DuplicatePair("ES-IT".into())
        );
    }

    #[test]
    fn mixed_shares_rejected() {
        let mut data = input();
        data.durations[0].share_percent = None;
        assert!(matches!(
            Registry::from_input(data),
            Err(DatasetError::Malformed(_))
        ));
    }

    #[test]
    fn share_out_of_range_rejected() {
        let mut data = input();
        data.org_types[0].share_percent = Some(140.0);
        assert!(matches!(
            Registry::from_input(data),
            Err(DatasetError::ShareOutOfRange { .. })
        ));
    }

    #[test]
    fn missing_table_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(CANONICAL_DATASET).unwrap();
        value.as_object_mut().unwrap().remove("topics");
        let err = Registry::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, DatasetError::Malformed(msg) if msg.contains("topics")));
    }

    #[test]
    fn unknown_field_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(CANONICAL_DATASET).unwrap();
        value["countries"][0]["coordinators"] = serde_json::json!(2114);
        assert!(matches!(
            Registry::from_json(&value.to_string()),
            Err(DatasetError::Malformed(_))
        ));
    }

    #[test]
    fn negative_degree_rejected() {
        let mut value: serde_json::Value = serde_json::from_str(CANONICAL_DATASET).unwrap();
        value["organizations"][0]["degree"] = serde_json::json!(-1);
        assert!(Registry::from_json(&value.to_string()).is_err());
    }
}
