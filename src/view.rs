//! Section selection state machine.
//!
//! The enabled sections are data ([`SectionDef`]); the controller only
//! knows "one of these is active". One controller per session.

use crate::error::ViewError;
use crate::logging::{log_section_change, log_section_rejected};
use crate::series::ChartId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDef {
    pub id: String,
    pub title: String,
    pub charts: Vec<ChartId>,
}

impl SectionDef {
    pub fn new(id: &str, title: &str, charts: &[ChartId]) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            charts: charts.to_vec(),
        }
    }
}

/// Overview, Countries, Topics.
pub fn default_sections() -> Vec<SectionDef> {
    vec![
        SectionDef::new(
            "overview",
            "Network Overview",
            &[
                ChartId::NetworkMetrics,
                ChartId::DegreeDistribution,
                ChartId::TopOrganizations,
                ChartId::OrganizationTypes,
                ChartId::CoordinatorTypes,
            ],
        ),
        SectionDef::new(
            "countries",
            "Countries",
            &[
                ChartId::CountryParticipation,
                ChartId::CountryCollaborations,
                ChartId::CountryFunding,
            ],
        ),
        SectionDef::new(
            "topics",
            "Research Topics",
            &[
                ChartId::TopTopics,
                ChartId::ProjectDurations,
                ChartId::ProjectSizes,
            ],
        ),
    ]
}

/// Pick sections from `catalog` by id, in the order given.
pub fn select_sections(catalog: &[SectionDef], ids: &[String]) -> Result<Vec<SectionDef>, ViewError> {
    ids.iter()
        .map(|id| {
            catalog
                .iter()
                .find(|s| &s.id == id)
                .cloned()
                .ok_or_else(|| ViewError::UnknownSection(id.clone()))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Select(String),
    Reset,
}

#[derive(Debug, Clone)]
pub struct ViewController {
    sections: Vec<SectionDef>,
    active: usize,
}

impl ViewController {
    pub fn new(sections: Vec<SectionDef>) -> Result<Self, ViewError> {
        if sections.is_empty() {
            return Err(ViewError::NoSections);
        }
        let mut seen = HashSet::new();
        for section in &sections {
            if !seen.insert(section.id.as_str()) {
                return Err(ViewError::DuplicateSection(section.id.clone()));
            }
        }
        Ok(Self { sections, active: 0 })
    }

    pub fn with_defaults() -> Self {
        Self {
            sections: default_sections(),
            active: 0,
        }
    }

    /// Either the transition happens in full or the state is unchanged.
    pub fn apply(&mut self, event: ViewEvent) -> Result<(), ViewError> {
        match event {
            ViewEvent::Select(id) => {
                let Some(next) = self.sections.iter().position(|s| s.id == id) else {
                    log_section_rejected(self.current_id(), &id);
                    return Err(ViewError::UnknownSection(id));
                };
                if next != self.active {
                    log_section_change(self.current_id(), &id);
                    self.active = next;
                }
                Ok(())
            }
            ViewEvent::Reset => {
                self.active = 0;
                Ok(())
            }
        }
    }

    pub fn select(&mut self, id: &str) -> Result<(), ViewError> {
        self.apply(ViewEvent::Select(id.to_string()))
    }

    pub fn current(&self) -> &SectionDef {
        &self.sections[self.active]
    }

    pub fn current_id(&self) -> &str {
        &self.sections[self.active].id
    }

    pub fn active_charts(&self) -> &[ChartId] {
        &self.current().charts
    }

    pub fn sections(&self) -> &[SectionDef] {
        &self.sections
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.sections.iter().any(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_first_section() {
        let view = ViewController::with_defaults();
        assert_eq!(view.current_id(), "overview");
        assert_eq!(view.active_charts()[0], ChartId::NetworkMetrics);
    }

    #[test]
    fn unknown_section_leaves_state() {
        let mut view = ViewController::with_defaults();
        view.select("countries").unwrap();
        let err = view.select("bogus").unwrap_err();
        assert_eq!(err, ViewError::UnknownSection("bogus".into()));
        assert_eq!(view.current_id(), "countries");
    }

    #[test]
    fn reselect_is_noop() {
        let mut view = ViewController::with_defaults();
        view.select("topics").unwrap();
        view.select("topics").unwrap();
        assert_eq!(view.current_id(), "topics");
        view.apply(ViewEvent::Reset).unwrap();
        assert_eq!(view.current_id(), "overview");
    }

    #[test]
    fn empty_and_duplicate_configs_rejected() {
        assert_eq!(ViewController::new(vec![]).unwrap_err(), ViewError::NoSections);
        let dup = vec![
            SectionDef::new("a", "A", &[]),
            SectionDef::new("a", "A again", &[]),
        ];
        assert_eq!(
            ViewController::new(dup).unwrap_err(),
            ViewError::DuplicateSection("a".into())
        );
    }

    #[test]
    fn added_section_needs_no_controller_change() {
        let mut sections = default_sections();
        sections.push(SectionDef::new("funding", "Funding", &[ChartId::CountryFunding]));
        let mut view = ViewController::new(sections).unwrap();
        view.select("funding").unwrap();
        assert_eq!(view.active_charts(), &[ChartId::CountryFunding]);
    }

    #[test]
    fn subset_selection_keeps_order() {
        let ids = vec!["topics".to_string(), "overview".to_string()];
        let picked = select_sections(&default_sections(), &ids).unwrap();
        let view = ViewController::new(picked).unwrap();
        assert_eq!(view.current_id(), "topics");
        assert!(!view.is_enabled("countries"));
        assert_eq!(
            select_sections(&default_sections(), &["nope".to_string()]).unwrap_err(),
            ViewError::UnknownSection("nope".into())
        );
    }
}
