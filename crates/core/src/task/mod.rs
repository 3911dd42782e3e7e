//! Task module
//!
//! This module contains the task model, the reducer and the task store.

mod action;
mod model;
mod store;

pub use action::{reduce, TaskAction};
pub use model::*;
pub use store::{Hydrated, ListenerId, StorePhase, TaskSnapshot, TaskStore};
