pub mod card_service;
pub mod card_store;
pub mod catalog;
pub mod config;
pub mod database;
pub mod errors;
pub mod generator;
pub mod logging;
pub mod models;
pub mod review_session;
pub mod scheduler;
pub mod selector;

pub use card_service::CardService;
pub use card_store::{deserialize_cards, serialize_cards, CardStore};
pub use catalog::{group_by_subject_then_theme, Catalog, CatalogCounts};
pub use config::Config;
pub use database::{Database, SnapshotStore};
pub use errors::*;
pub use generator::{CardGenerator, GenerationContext};
pub use models::*;
pub use review_session::{ReviewSession, SessionPhase, SessionSummary};
pub use scheduler::{ReviewLog, Sm2Scheduler};
pub use selector::{select_review_queue, CardPredicate, ConfidenceFilter, CustomFilter, ReviewFilter};
