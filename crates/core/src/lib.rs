//! Core library for the local task list
//!
//! This crate contains the task list engine, including:
//! - Task model and the reducer-style task store
//! - Key-value persistence of the task list
//! - Autosave glue connecting the two

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod sync;
pub mod task;

pub use config::StoreConfig;
pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
