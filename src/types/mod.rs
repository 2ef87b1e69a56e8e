//! Common types used throughout the store client.
//!
//! This module defines the object locator, option structs for each
//! operation, and the typed results operations return.

mod common;
mod requests;
mod responses;

pub use common::*;
pub use requests::*;
pub use responses::*;
