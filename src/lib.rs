//! Seeding, validation and repair tooling for a services marketplace catalog
//! kept in a document store.

pub mod batch_writer;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod reconciler;
pub mod report;
pub mod runner;
pub mod seeder;
pub mod storage;
pub mod taxonomy;
pub mod types;
pub mod validator;
