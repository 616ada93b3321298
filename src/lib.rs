// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! LeafLens: photograph a plant, find out what it is
//!
//! Sends photos to the plant.id identification service, ranks the candidate
//! matches, gathers supplementary facts, and keeps a list of saved plants and
//! a log of recent scans on local storage.

pub mod config;
pub mod error;
pub mod facts;
pub mod photo;
pub mod plant_id;
pub mod ranking;
pub mod scan;
pub mod store;

pub use config::AppConfig;
pub use error::{LeafLensError, Result};
