//! Text ↔ binary conversion entry points used by the CLI and manifest builds.

use anyhow::{Context, Result};
use std::path::Path;

use crate::{dump, text};

/// Convert a text description to a binary buffer.
pub fn convert_str(source: &str, magic: Option<u32>) -> Result<Vec<u8>> {
    let mut description = text::parse(source)?;
    if let Some(magic) = magic {
        description.set_magic(magic);
    }
    let bytes = tagged_format::build(&description)?;
    Ok(bytes)
}

/// Convert a text file and write the buffer to `output`.
pub fn convert_file(input: &Path, output: &Path, magic: Option<u32>) -> Result<()> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let bytes =
        convert_str(&source, magic).with_context(|| format!("Failed to convert {}", input.display()))?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(output, &bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), output.display());
    Ok(())
}

/// Read a binary file and render its block tree.
pub fn dump_file(input: &Path) -> Result<String> {
    let bytes = std::fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let reader = tagged_format::load(bytes)
        .with_context(|| format!("{} is not a tagged format buffer", input.display()))?;
    Ok(dump::dump(&reader))
}
