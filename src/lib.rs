//! Analytics core for the EU research collaboration dashboard: a validated
//! dataset registry, pure derivations over it, and the section controller
//! that decides which charts are on screen.

pub mod config;
pub mod dashboard;
pub mod data;
pub mod derive;
pub mod error;
pub mod logging;
pub mod series;
pub mod verify;
pub mod view;

pub use config::Config;
pub use dashboard::{Dashboard, DashboardView, Renderer, TextRenderer};
pub use data::Registry;
pub use error::{DatasetError, ViewError};
