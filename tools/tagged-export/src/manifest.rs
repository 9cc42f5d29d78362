//! tagged.toml manifest parsing
//!
//! A manifest lists text descriptions to convert in one go:
//!
//! ```toml
//! [output]
//! dir = "build"
//! magic = 42
//!
//! [[models]]
//! id = "teapot"
//! input = "teapot.tmf.txt"
//! output = "teapot.tmf"
//! ```

use anyhow::{Context, Result, bail};
use hashbrown::HashSet;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::convert;

/// Default manifest file name
pub const MANIFEST_NAME: &str = "tagged.toml";

/// Extension given to outputs that do not name one
pub const OUTPUT_EXT: &str = "tmf";

/// tagged.toml manifest structure
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

/// Output configuration section
#[derive(Debug, Default, Deserialize)]
pub struct OutputSection {
    /// Output directory, relative to the manifest. Default: the manifest's directory
    pub dir: Option<PathBuf>,
    /// Header magic written into every output. Default: 42
    pub magic: Option<u32>,
}

/// Single model entry
#[derive(Debug, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    /// Text description, relative to the manifest
    pub input: PathBuf,
    /// Output file name. Default: `<id>.tmf`
    pub output: Option<PathBuf>,
}

impl ModelEntry {
    pub fn output_name(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}.{OUTPUT_EXT}", self.id)))
    }
}

/// Load manifest from file
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    parse_manifest(&content).with_context(|| format!("Invalid manifest: {}", path.display()))
}

/// Parse manifest from string
pub fn parse_manifest(content: &str) -> Result<Manifest> {
    toml::from_str(content).context("Failed to parse tagged.toml")
}

/// Check ids are unique and every input exists relative to `base_dir`.
pub fn validate(manifest: &Manifest, base_dir: &Path) -> Result<()> {
    let mut ids = HashSet::new();
    for model in &manifest.models {
        if model.id.is_empty() {
            bail!("Model with input {:?} has an empty id", model.input);
        }
        if !ids.insert(model.id.as_str()) {
            bail!("Duplicate model id: {}", model.id);
        }
        let input = base_dir.join(&model.input);
        if !input.is_file() {
            bail!("Model {}: input not found: {}", model.id, input.display());
        }
    }
    Ok(())
}

/// Convert every model, returning the written paths.
///
/// `output_override` replaces the manifest's output directory.
pub fn build_all(
    manifest: &Manifest,
    base_dir: &Path,
    output_override: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    validate(manifest, base_dir)?;

    let output_dir = match (output_override, &manifest.output.dir) {
        (Some(dir), _) => dir.to_path_buf(),
        (None, Some(dir)) => base_dir.join(dir),
        (None, None) => base_dir.to_path_buf(),
    };
    std::fs::create_dir_all(&output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let mut written = Vec::with_capacity(manifest.models.len());
    for model in &manifest.models {
        let input = base_dir.join(&model.input);
        let output = output_dir.join(model.output_name());
        tracing::info!("  {} -> {}", model.id, output.display());
        convert::convert_file(&input, &output, manifest.output.magic)
            .with_context(|| format!("Failed to build model {}", model.id))?;
        written.push(output);
    }

    tracing::info!("Built {} models into {}", written.len(), output_dir.display());
    Ok(written)
}
