pub mod app;
pub mod cards;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod placeholders;
pub mod search;
pub mod session;
pub mod storage;
pub mod store;

pub use app::{Board, BoardOptions, Services};
pub use cards::{Card, CardFields, CardHandle, CardPatch};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use store::{CardStore, PersistedSnapshot};
