// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator tooling behind the `wallctl` binary.

pub mod client_config;
pub mod env_file;

pub use client_config::{ClientConfig, DeployTarget};
pub use env_file::{read_env_file, render_env_file, SetupAnswers};

#[derive(Debug, thiserror::Error)]
pub enum ToolingError {
    #[error("missing required variables: {}", .0.join(", "))]
    MissingVariables(Vec<&'static str>),

    #[error("env file could not be read: {0}")]
    EnvFile(#[from] dotenv::Error),

    #[error("config could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}
