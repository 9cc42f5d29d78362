//! Human readable tree view of a buffer
//!
//! Starts at the header and follows every offset field depth first. A block
//! reached a second time is printed as a back reference instead of being
//! expanded again, so shared blocks and cycles terminate. Chains nested
//! deeper than [`MAX_DEPTH`] are cut off.

use std::fmt::{self, Write};

use hashbrown::HashSet;
use tagged_format::{Block, BlockData, Reader};

/// Maximum number of indices printed inline
const INDEX_PREVIEW: usize = 16;

/// Deepest nesting expanded before a branch is cut off
pub const MAX_DEPTH: usize = 64;

/// Dump the whole buffer as an indented tree.
pub fn dump<B: AsRef<[u8]>>(reader: &Reader<B>) -> String {
    let mut out = String::new();
    // Writing into a String never fails
    let _ = dump_to(reader, &mut out);
    out
}

pub fn dump_to<B: AsRef<[u8]>>(reader: &Reader<B>, out: &mut impl Write) -> fmt::Result {
    let mut visited = HashSet::new();
    visit(reader, 0, None, 0, &mut visited, out)
}

fn visit<B: AsRef<[u8]>>(
    reader: &Reader<B>,
    offset: u64,
    label: Option<&str>,
    depth: usize,
    visited: &mut HashSet<u64>,
    out: &mut impl Write,
) -> fmt::Result {
    let indent = "  ".repeat(depth);
    let prefix = match label {
        Some(label) => format!("{indent}{label} -> "),
        None => indent.clone(),
    };

    if depth > MAX_DEPTH {
        return writeln!(out, "{prefix}@{offset} ... (nested too deep)");
    }

    if !visited.insert(offset) {
        return writeln!(out, "{prefix}@{offset} (see above)");
    }

    let block = match reader.block_at(offset) {
        Ok(block) => block,
        Err(err) => return writeln!(out, "{prefix}@{offset} <error: {err}>"),
    };

    writeln!(
        out,
        "{prefix}{} @{} ({} bytes){}",
        block.tag,
        block.offset,
        block.byte_size,
        summary(&block)
    )?;

    for line in detail_lines(&block) {
        writeln!(out, "{indent}    {line}")?;
    }

    for (label, target) in children(&block) {
        if target == 0 {
            continue;
        }
        visit(reader, target, Some(&label), depth + 1, visited, out)?;
    }

    Ok(())
}

fn summary(block: &Block<'_>) -> String {
    match &block.data {
        BlockData::Header(header) => format!(" magic={}", header.magic),
        BlockData::OffsetTable(table) => format!(" {} entries", table.len()),
        BlockData::Mesh(mesh) => format!(" layout={}", mesh.layout),
        BlockData::Indices(indices) => {
            let preview: Vec<String> = indices
                .iter()
                .take(INDEX_PREVIEW)
                .map(|i| i.to_string())
                .collect();
            let more = if indices.len() > INDEX_PREVIEW { " ..." } else { "" };
            format!(
                " {} x {}: {}{more}",
                indices.len(),
                indices.width().data_type().name(),
                preview.join(" ")
            )
        }
        BlockData::Vertices(vertices) => format!(
            " {} x {} (stride {})",
            vertices.len(),
            vertices.format().name,
            vertices.stride()
        ),
        BlockData::Skeleton(_) => String::new(),
        BlockData::Axes(axes) => format!(" {} axes", axes.len()),
        BlockData::Camera(_) => " camera".to_string(),
        BlockData::Node(node) => format!(" name={:?} children={}", node.name, node.children.len()),
        BlockData::GeometryInstance(_) => String::new(),
        BlockData::External(external) => format!(" url={:?}", external.url),
        BlockData::Custom(_) => " <custom>".to_string(),
        BlockData::Opaque => " <opaque>".to_string(),
    }
}

fn detail_lines(block: &Block<'_>) -> Vec<String> {
    match &block.data {
        BlockData::Axes(axes) => axes
            .axes()
            .iter()
            .map(|axis| {
                let t = axis.translation;
                let r = axis.rotation;
                format!(
                    "{} T=({}, {}, {}) R=({}, {}, {}, {})",
                    axis.name, t.x, t.y, t.z, r.x, r.y, r.z, r.w
                )
            })
            .collect(),
        BlockData::Camera(camera) => vec![
            format!("view={:?}", camera.view.to_cols_array()),
            format!("projection={:?}", camera.projection.to_cols_array()),
        ],
        _ => Vec::new(),
    }
}

/// Labelled offsets to follow from a block.
fn children(block: &Block<'_>) -> Vec<(String, u64)> {
    match &block.data {
        BlockData::Header(header) => vec![("top".to_string(), header.top)],
        BlockData::OffsetTable(table) => table
            .entries()
            .iter()
            .map(|entry| (entry.name.clone(), entry.offset))
            .collect(),
        BlockData::Mesh(mesh) => vec![
            ("indices".to_string(), mesh.indices),
            ("vertices".to_string(), mesh.vertices),
            ("axes".to_string(), mesh.axes),
            ("metadata".to_string(), mesh.metadata),
        ],
        BlockData::Skeleton(skeleton) => vec![
            ("bones".to_string(), skeleton.bones),
            ("sequences".to_string(), skeleton.sequences),
        ],
        BlockData::Node(node) => node
            .children
            .iter()
            .enumerate()
            .map(|(i, &child)| (format!("child {i}"), child))
            .collect(),
        BlockData::GeometryInstance(instance) => vec![
            ("mesh".to_string(), instance.mesh),
            ("skeleton".to_string(), instance.skeleton),
            ("material".to_string(), instance.material),
        ],
        _ => Vec::new(),
    }
}
