//! Data models for roster entities.
//!
//! This module contains the structures shared by the ingestion pipeline,
//! the matcher and the write path:
//!
//! - `User`: one validated roster entry
//! - `NewMember`: the operator-entered fields of a member being added
//! - `RosterSchema`, `ColumnMap`: which sheet column holds which field

pub mod schema;
pub mod user;

pub use schema::{ColumnMap, RosterSchema};
pub use user::{NewMember, User};
