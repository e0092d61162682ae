use crate::data::Registry;
use crate::error::{DatasetError, ViewError};
use crate::verify::invariants::Tolerances;
use crate::view::{default_sections, select_sections, SectionDef, ViewController};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// JSON dataset; the embedded canonical dataset when unset.
    pub dataset_path: Option<PathBuf>,
    pub sections: Vec<String>,
    pub top_n: usize,
    pub count_tolerance: f64,
    pub share_tolerance: f64,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_path: None,
            sections: default_sections().into_iter().map(|s| s.id).collect(),
            top_n: 10,
            count_tolerance: 0.5,
            share_tolerance: 0.1,
            port: 8765,
        }
    }
}

fn parse_sections(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            dataset_path: std::env::var("DATASET_PATH").ok().map(PathBuf::from),
            sections: std::env::var("DASHBOARD_SECTIONS").ok().map(|v| parse_sections(&v)).unwrap_or(defaults.sections),
            top_n: std::env::var("TOP_N").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.top_n),
            count_tolerance: std::env::var("COUNT_TOLERANCE").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.count_tolerance),
            share_tolerance: std::env::var("SHARE_TOLERANCE").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.share_tolerance),
            port: std::env::var("DASHBOARD_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(defaults.port),
        }
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            count: self.count_tolerance,
            share: self.share_tolerance,
        }
    }

    pub fn load_registry(&self) -> Result<Registry, DatasetError> {
        match &self.dataset_path {
            Some(path) => Registry::from_path(path),
            None => Registry::canonical(),
        }
    }

    pub fn section_defs(&self) -> Result<Vec<SectionDef>, ViewError> {
        select_sections(&default_sections(), &self.sections)
    }

    /// Fresh controller for one session.
    pub fn view_controller(&self) -> Result<ViewController, ViewError> {
        ViewController::new(self.section_defs()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_section_list() {
        assert_eq!(parse_sections(" Topics, overview ,,"), vec!["topics", "overview"]);
    }

    #[test]
    fn defaults_enable_all_sections() {
        let cfg = Config::default();
        let view = cfg.view_controller().unwrap();
        assert_eq!(view.sections().len(), 3);
        assert_eq!(cfg.tolerances(), Tolerances::default());
    }

    #[test]
    fn empty_section_list_is_rejected() {
        let cfg = Config {
            sections: vec![],
            ..Config::default()
        };
        assert_eq!(cfg.view_controller().unwrap_err(), ViewError::NoSections);
    }
}
