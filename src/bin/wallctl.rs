// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wall_server::tooling::client_config::{self, ClientConfig, DeployTarget};
use wall_server::tooling::env_file::{self, SetupAnswers};

/// Operator tasks for the protected wall site
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prompt for project settings and write the local env file
    Setup {
        #[arg(long, default_value = env_file::DEFAULT_ENV_FILE)]
        output: PathBuf,
    },
    /// Regenerate the browser config script for a deploy target
    InjectEnv {
        #[arg(value_enum)]
        target: DeployTarget,

        /// Env file read for development builds
        #[arg(long, default_value = env_file::DEFAULT_ENV_FILE)]
        env_file: PathBuf,

        #[arg(long, default_value = client_config::DEFAULT_OUTPUT)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    match Args::parse().command {
        Command::Setup { output } => setup(&output),
        Command::InjectEnv {
            target,
            env_file,
            output,
        } => inject_env(target, &env_file, &output),
    }
}

fn setup(output: &Path) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let answers = SetupAnswers {
        project_name: prompt(&mut input, "Project name")?,
        auth0_domain: prompt(&mut input, "Auth0 domain (e.g. dev-xxx.auth0.com)")?,
        auth0_client_id: prompt(&mut input, "Auth0 client ID")?,
        base_url: prompt(&mut input, "Site URL (e.g. https://my-app.netlify.app)")?,
    };
    answers.validate()?;

    std::fs::write(output, env_file::render_env_file(&answers, chrono::Utc::now()))
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {}", output.display());

    println!();
    println!("Allowed callback URLs for the Auth0 application:");
    for url in answers.callback_urls() {
        println!("  {url}");
    }
    Ok(())
}

fn inject_env(target: DeployTarget, env_path: &Path, output: &Path) -> Result<()> {
    let vars = match target {
        DeployTarget::Development => env_file::read_env_file(env_path)
            .with_context(|| format!("Failed to read {}", env_path.display()))?,
        DeployTarget::Production => client_config::process_env_vars(),
    };

    let config = ClientConfig::resolve(target, &vars)?;
    let script = config.render_js()?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(output, script)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Generated {} for {:?}", output.display(), target);
    Ok(())
}

fn prompt(input: &mut impl BufRead, label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read answer")?;
    Ok(line.trim().to_string())
}
