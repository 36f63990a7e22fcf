// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Browser Session Model
//!
//! The static site's client-side behavior expressed as plain Rust: the
//! page-load state machine, logout cleanup and the protected content cache.
//! Nothing here touches a real browser; storage is behind
//! [`BrowserStorage`].

pub mod content_cache;
pub mod logout;
pub mod router;
pub mod storage;

pub use content_cache::{load_content, store_content, ContentEnvelope};
pub use logout::{perform_logout, LogoutPlan};
pub use router::{Navigation, Page, SessionEvent, SessionMachine, SessionState};
pub use storage::{BrowserStorage, MemoryStorage};
