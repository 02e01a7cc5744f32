pub mod cache;
pub mod clock;
pub mod config;
pub mod connection;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod mapper;
pub mod render;
pub mod repository;
pub mod service;
pub mod structure;
#[cfg(test)]
pub(crate) mod test_support;
pub mod unit_of_work;

pub use error::{StoreError, StoreResult};
pub use service::{NodeSpec, TreeService};
