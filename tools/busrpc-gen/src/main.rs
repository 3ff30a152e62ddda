// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! busrpc-gen CLI
//!
//! # Usage
//!
//! ```bash
//! # Emit bindings into src/rpc
//! busrpc-gen generate --input greeter.yaml --out src/rpc
//!
//! # Validate only
//! busrpc-gen check --input greeter.yaml
//! ```

use anyhow::Context;
use busrpc_gen::{generate_document, write_artifacts, ModelDocument};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// busrpc binding generator
#[derive(Parser, Debug)]
#[command(name = "busrpc-gen")]
#[command(about = "Generate busrpc service bindings from an interface definition")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate Rust bindings
    Generate {
        /// Interface definition (.yaml, .yml or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Validate an interface definition without writing anything
    Check {
        /// Interface definition (.yaml, .yml or .json)
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::Generate { input, out } => {
            let artifacts = generate_document(&input)?;
            write_artifacts(&out, &artifacts)?;
            tracing::info!(
                input = %input.display(),
                out = %out.display(),
                files = artifacts.len(),
                "generated bindings"
            );
        }
        Commands::Check { input } => {
            let model = ModelDocument::load(&input)?
                .into_model()
                .with_context(|| format!("invalid interface definition {}", input.display()))?;
            busrpc_gen::generate(&model)?;
            println!(
                "{}: namespace {}, {} service(s), {} message(s)",
                input.display(),
                model.namespace(),
                model.services().len(),
                model.messages().len()
            );
        }
    }

    Ok(())
}
