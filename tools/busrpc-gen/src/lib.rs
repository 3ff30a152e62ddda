// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! busrpc-gen: Rust bindings from interface definitions.
//!
//! Reads a YAML or JSON interface document, validates it into a
//! [`busrpc::DescriptorModel`] and emits one module per service plus a
//! shared `messages` module. See [`codegen`] for the output layout.

pub mod codegen;
pub mod document;

pub use codegen::{generate, GenerateError, SourceArtifact};
pub use document::{DocumentError, ModelDocument};

use std::path::Path;

/// Load, validate and generate in one step.
pub fn generate_document(path: &Path) -> anyhow::Result<Vec<SourceArtifact>> {
    use anyhow::Context;

    let model = ModelDocument::load(path)?
        .into_model()
        .with_context(|| format!("invalid interface definition {}", path.display()))?;
    let artifacts = generate(&model)
        .with_context(|| format!("cannot generate bindings for {}", path.display()))?;
    Ok(artifacts)
}

/// Write generated files into `out_dir`, creating it if needed.
pub fn write_artifacts(out_dir: &Path, artifacts: &[SourceArtifact]) -> anyhow::Result<()> {
    use anyhow::Context;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;
    for artifact in artifacts {
        let path = out_dir.join(&artifact.file_name);
        std::fs::write(&path, &artifact.contents)
            .with_context(|| format!("cannot write {}", path.display()))?;
        tracing::debug!(file = %path.display(), bytes = artifact.contents.len(), "wrote");
    }
    Ok(())
}
