// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Spreadsheet Proxy
//!
//! Reads rows from the hosted spreadsheet API (SheetBest), reshapes them into
//! [`SheetRow`]s with summary statistics, and falls back to a built-in
//! example dataset when the source is missing or failing.

pub mod client;
pub mod rows;
pub mod service;

pub use client::{SheetBestClient, SheetError};
pub use rows::{compute_stats, example_rows, normalize_rows, SheetRow, SheetStats};
pub use service::{DataSource, SheetLoad, SheetService, SheetSnapshot};
