//! Text description parser
//!
//! Turns the whitespace-separated text form into a [`Description`] ready for
//! the writer.
//!
//! ```text
//! top: offset-table
//!     cube: mesh triangles
//!         indices: array index16 0 1 2 end
//!         vertices: array vertex-p3n3m2
//!             0 0 0  0 0 1  0 0
//!             1 0 0  0 0 1  1 0
//!             0 1 0  0 0 1  0 1
//!         end
//!     end
//! end
//! ```
//!
//! `name:` before an item names it in the enclosing scope. `$name` refers to
//! an item defined earlier, searching the innermost scope first. A token
//! starting with `#` comments out the rest of the line.
//!
//! Blocks are emitted in a fixed order: meshes,
//! skeletons and geometry instances before their children; arrays, tables
//! and nodes after.

use hashbrown::HashMap;
use tagged_format::codec::{NAME_SIZE, encode_fixed_string};
use tagged_format::{
    Axis, BlockValue, Camera, Description, External, FormatError, GeometryInstance, IndexBuffer,
    Layout, Mesh, Node, Reference, Skeleton, VertexBuffer, VertexFormat, sorted_entries,
};

/// Errors raised while parsing a text description.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unexpected end of input, expected {expected}")]
    UnexpectedEof { line: usize, expected: &'static str },

    #[error("line {line}: unknown keyword {keyword:?}")]
    UnknownKeyword { line: usize, keyword: String },

    #[error("line {line}: ${name} is not defined")]
    UndefinedName { line: usize, name: String },

    #[error("line {line}: invalid number {token:?}")]
    InvalidNumber { line: usize, token: String },

    #[error("line {line}: unknown array type {name:?}")]
    UnknownArrayType { line: usize, name: String },

    #[error("line {line}: unknown mesh layout {name:?}")]
    UnknownLayout { line: usize, name: String },

    #[error("line {line}: {item} is missing its `end`")]
    MissingEnd { line: usize, item: &'static str },

    #[error("line {line}: `end` without an open item")]
    UnexpectedEnd { line: usize },

    #[error("line {line}: {format} array has {found} values, not a multiple of {expected}")]
    IncompleteRecord {
        line: usize,
        format: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("no `top:` item defined")]
    MissingTop,

    #[error("line {line}: {source}")]
    Format {
        line: usize,
        #[source]
        source: FormatError,
    },
}

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a text description.
pub fn parse(source: &str) -> Result<Description> {
    let mut parser = Parser::new(source);
    let root = parser.parse_scope(None)?;
    let top = root.names.get("top").copied().ok_or(ParseError::MissingTop)?;
    parser.description.set_top(top);

    tracing::debug!("Parsed {} blocks", parser.description.len());
    Ok(parser.description)
}

#[derive(Debug, Clone)]
struct Token<'s> {
    text: &'s str,
    line: usize,
}

fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    for (index, line) in source.lines().enumerate() {
        for text in line.split_whitespace() {
            if text.starts_with('#') {
                break;
            }
            tokens.push(Token {
                text,
                line: index + 1,
            });
        }
    }
    tokens
}

/// Items parsed inside one `... end` body.
#[derive(Debug, Default)]
struct Scope {
    names: HashMap<String, Reference>,
    items: Vec<Reference>,
}

impl Scope {
    fn named(&self, name: &str) -> Reference {
        self.names.get(name).copied().unwrap_or_default()
    }
}

struct Parser<'s> {
    tokens: Vec<Token<'s>>,
    pos: usize,
    /// Enclosing scopes, outermost first, used for `$name` lookup.
    scopes: Vec<Scope>,
    description: Description,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            tokens: tokenize(source),
            pos: 0,
            scopes: Vec::new(),
            description: Description::new(),
        }
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map(|token| token.line).unwrap_or(1)
    }

    fn next(&mut self, expected: &'static str) -> Result<Token<'s>> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEof {
                line: self.last_line(),
                expected,
            })?;
        self.pos += 1;
        Ok(token)
    }

    fn peek(&self) -> Option<&Token<'s>> {
        self.tokens.get(self.pos)
    }

    fn number<T: std::str::FromStr>(&mut self, expected: &'static str) -> Result<T> {
        let token = self.next(expected)?;
        token.text.parse().map_err(|_| ParseError::InvalidNumber {
            line: token.line,
            token: token.text.to_string(),
        })
    }

    fn matrix(&mut self) -> Result<glam::Mat4> {
        let mut values = [0.0f32; 16];
        for value in values.iter_mut() {
            *value = self.number("matrix component")?;
        }
        Ok(glam::Mat4::from_cols_array(&values))
    }

    /// Parse items until `end`, or until the input runs out when `opened`
    /// is `None` (the top level).
    fn parse_scope(&mut self, opened: Option<(&'static str, usize)>) -> Result<Scope> {
        self.scopes.push(Scope::default());

        loop {
            let Some(token) = self.peek().cloned() else {
                if let Some((item, line)) = opened {
                    return Err(ParseError::MissingEnd { line, item });
                }
                break;
            };
            self.pos += 1;

            if token.text == "end" {
                if opened.is_none() {
                    return Err(ParseError::UnexpectedEnd { line: token.line });
                }
                break;
            }

            let (name, keyword) = match token.text.strip_suffix(':') {
                Some(name) if !name.is_empty() => (Some(name), self.next("item after name")?),
                _ => (None, token),
            };

            let item = self.parse_item(&keyword)?;
            if let Some(scope) = self.scopes.last_mut() {
                if let Some(name) = name {
                    scope.names.insert(name.to_string(), item);
                }
                scope.items.push(item);
            }
        }

        Ok(self.scopes.pop().unwrap_or_default())
    }

    fn lookup(&self, name: &str) -> Option<Reference> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.names.get(name).copied())
    }

    fn parse_item(&mut self, keyword: &Token<'s>) -> Result<Reference> {
        let line = keyword.line;

        if let Some(name) = keyword.text.strip_prefix('$') {
            return self.lookup(name).ok_or_else(|| ParseError::UndefinedName {
                line,
                name: name.to_string(),
            });
        }

        let id = match keyword.text {
            "mesh" => {
                let layout = self.next("mesh layout")?;
                let layout = Layout::from_name(layout.text)
                    .or_else(|| layout.text.parse().ok().map(Layout::from_code))
                    .ok_or_else(|| ParseError::UnknownLayout {
                        line: layout.line,
                        name: layout.text.to_string(),
                    })?;

                let id = self.description.reserve();
                let children = self.parse_scope(Some(("mesh", line)))?;
                let mesh = Mesh {
                    layout,
                    indices: children.named("indices"),
                    vertices: children.named("vertices"),
                    axes: children.named("axes"),
                    metadata: children.named("metadata"),
                };
                self.fill(id, BlockValue::Mesh(mesh), line)?;
                id
            }
            "array" => {
                let value = self.parse_array()?;
                self.description.add(value)
            }
            "offset-table" => {
                let children = self.parse_scope(Some(("offset-table", line)))?;
                for name in children.names.keys() {
                    encode_fixed_string(name, NAME_SIZE)
                        .map_err(|source| ParseError::Format { line, source })?;
                }
                self.description
                    .add(BlockValue::OffsetTable(sorted_entries(children.names)))
            }
            "skeleton" => {
                let id = self.description.reserve();
                let children = self.parse_scope(Some(("skeleton", line)))?;
                let skeleton = Skeleton {
                    bones: children.named("bones"),
                    sequences: children.named("sequences"),
                };
                self.fill(id, BlockValue::Skeleton(skeleton), line)?;
                id
            }
            "node" => {
                let name = self.next("node name")?;
                encode_fixed_string(name.text, NAME_SIZE).map_err(|source| ParseError::Format {
                    line: name.line,
                    source,
                })?;
                let transform = self.matrix()?;
                let children = self.parse_scope(Some(("node", line)))?;
                self.description.add(BlockValue::Node(Node {
                    name: name.text.to_string(),
                    transform,
                    children: children.items,
                }))
            }
            "geometry-instance" => {
                let id = self.description.reserve();
                let children = self.parse_scope(Some(("geometry-instance", line)))?;
                let instance = GeometryInstance {
                    mesh: children.named("mesh"),
                    skeleton: children.named("skeleton"),
                    material: children.named("material"),
                };
                self.fill(id, BlockValue::GeometryInstance(instance), line)?;
                id
            }
            "camera" => {
                let view = self.matrix()?;
                let projection = self.matrix()?;
                self.description
                    .add(BlockValue::Camera(Camera::new(view, projection)))
            }
            "external" => {
                let url = self.next("external url")?;
                self.description
                    .add(BlockValue::External(External::new(url.text)))
            }
            other => {
                return Err(ParseError::UnknownKeyword {
                    line,
                    keyword: other.to_string(),
                });
            }
        };

        Ok(Reference::Block(id))
    }

    fn fill(&mut self, id: tagged_format::BlockId, value: BlockValue, line: usize) -> Result<()> {
        self.description
            .set(id, value)
            .map_err(|source| ParseError::Format { line, source })
    }

    fn parse_array(&mut self) -> Result<BlockValue> {
        let kind = self.next("array type")?;
        let line = kind.line;

        match kind.text {
            "index16" => {
                let values = self.parse_numbers::<u16>("index16")?;
                Ok(BlockValue::Indices(IndexBuffer::U16(values)))
            }
            "index32" => {
                let values = self.parse_numbers::<u32>("index32")?;
                Ok(BlockValue::Indices(IndexBuffer::U32(values)))
            }
            "axis" => {
                let mut axes = Vec::new();
                loop {
                    let name = self.next("axis name or `end`")?;
                    if name.text == "end" {
                        break;
                    }
                    encode_fixed_string(name.text, NAME_SIZE).map_err(|source| {
                        ParseError::Format {
                            line: name.line,
                            source,
                        }
                    })?;
                    let mut values = [0.0f32; 7];
                    for value in values.iter_mut() {
                        *value = self.number("axis component")?;
                    }
                    axes.push(Axis::new(
                        name.text,
                        glam::Vec3::new(values[0], values[1], values[2]),
                        glam::Quat::from_xyzw(values[3], values[4], values[5], values[6]),
                    ));
                }
                Ok(BlockValue::Axes(axes))
            }
            name => {
                let format = VertexFormat::from_name(name).ok_or_else(|| {
                    ParseError::UnknownArrayType {
                        line,
                        name: name.to_string(),
                    }
                })?;
                let values = self.parse_numbers::<f64>(format.name)?;
                let per_record: usize = format.attributes.iter().map(|a| a.count).sum();
                if values.len() % per_record != 0 {
                    return Err(ParseError::IncompleteRecord {
                        line,
                        format: format.name,
                        found: values.len(),
                        expected: per_record,
                    });
                }

                let mut buffer = VertexBuffer::new(format);
                for record in values.chunks_exact(per_record) {
                    buffer
                        .push_components(record)
                        .map_err(|source| ParseError::Format { line, source })?;
                }
                Ok(BlockValue::Vertices(buffer))
            }
        }
    }

    /// Numbers up to and including the closing `end`.
    fn parse_numbers<T: std::str::FromStr>(&mut self, array: &'static str) -> Result<Vec<T>> {
        let opened = self.tokens.get(self.pos.saturating_sub(1)).map_or(1, |t| t.line);
        let mut values = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(ParseError::MissingEnd {
                        line: opened,
                        item: array,
                    });
                }
                Some(token) if token.text == "end" => {
                    self.pos += 1;
                    return Ok(values);
                }
                Some(_) => values.push(self.number(array)?),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagged_format::{BlockData, VERTEX_P3N3M2B4, VertexP3N3M2B4, build, load};

    #[test]
    fn test_mesh_inside_table() {
        let source = "
            # a single triangle
            top: offset-table
                triangle: mesh triangles
                    indices: array index16 0 1 2 end
                    vertices: array vertex-p3 0 0 0  1 0 0  0 1 0 end
                end
            end
        ";
        let bytes = build(&parse(source).unwrap()).unwrap();
        let reader = load(bytes).unwrap();

        let table = reader.table_at(reader.header().unwrap().top).unwrap();
        let mesh = reader.mesh_at(table.lookup("triangle").unwrap()).unwrap();
        assert_eq!(mesh.layout, Layout::Triangles);
        assert_eq!(
            reader.indices_at(mesh.indices).unwrap().iter().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(reader.vertices_at(mesh.vertices).unwrap().len(), 3);
        assert_eq!(mesh.axes, 0);
    }

    #[test]
    fn test_mesh_written_before_children() {
        let source = "
            top: geometry-instance
                mesh: mesh triangle-strip
                    vertices: array vertex-p3 0 0 0 end
                end
                skeleton: skeleton end
            end
        ";
        let reader = load(build(&parse(source).unwrap()).unwrap()).unwrap();
        let instance = reader.geometry_instance_at(reader.header().unwrap().top).unwrap();
        // header 24, geometry instance 36
        assert_eq!(reader.header().unwrap().top, 24);
        assert_eq!(instance.mesh, 60);
        // mesh 48, vertices 24
        assert_eq!(instance.skeleton, 60 + 48 + 24);
    }

    #[test]
    fn test_skinned_vertices() {
        let source = "
            top: mesh triangles
                vertices: array vertex-p3n3m2b4
                    1.0 2.0 3.0 4.0 5.0 6.0 7.0 8.0 1 2 3 4 0.60 0.20 0.15 0.05
                end
            end
        ";
        let reader = load(build(&parse(source).unwrap()).unwrap()).unwrap();
        let mesh = reader.mesh_at(reader.header().unwrap().top).unwrap();
        let vertices = reader.vertices_at(mesh.vertices).unwrap();
        assert_eq!(vertices.format(), &VERTEX_P3N3M2B4);
        let vertex = vertices.get::<VertexP3N3M2B4>(0).unwrap();
        assert_eq!(vertex.bones, [1, 2, 3, 4]);
        assert_eq!(vertex.weights, [0.60, 0.20, 0.15, 0.05]);
        assert_eq!(vertex.mapping, [7.0, 8.0]);
    }

    #[test]
    fn test_bone_indices_must_fit() {
        for bones in ["300 0 0 0", "-1 0 0 0", "1.7 0 0 0", "0 0 0 256"] {
            let source = format!(
                "top: mesh triangles\n  vertices: array vertex-p3n3m2b4\n    0 0 0 0 0 1 0 0 {bones} 1 0 0 0\n  end\nend"
            );
            let err = parse(&source).unwrap_err();
            assert!(
                matches!(
                    err,
                    ParseError::Format {
                        line: 2,
                        source: FormatError::ComponentRange { attribute: "bones", .. }
                    }
                ),
                "{bones}: {err:?}"
            );
        }
    }

    #[test]
    fn test_references_and_scopes() {
        let source = "
            shared: array index16 0 1 2 end
            top: offset-table
                first: mesh triangles
                    indices: $shared
                end
                second: mesh lines
                    indices: $shared
                    vertices: $first
                end
            end
        ";
        let reader = load(build(&parse(source).unwrap()).unwrap()).unwrap();
        let table = reader.table_at(reader.header().unwrap().top).unwrap();
        let first = table.lookup("first").unwrap();
        let second = reader.mesh_at(table.lookup("second").unwrap()).unwrap();

        assert_eq!(reader.mesh_at(first).unwrap().indices, 24);
        assert_eq!(second.indices, 24);
        // siblings are visible to later items in the same scope
        assert_eq!(second.vertices, first);
    }

    #[test]
    fn test_offset_table_sorted() {
        let source = "
            top: offset-table
                zeta: external zeta.bin
                alpha: external alpha.bin
            end
        ";
        let reader = load(build(&parse(source).unwrap()).unwrap()).unwrap();
        let table = reader.table_at(reader.header().unwrap().top).unwrap();
        let names: Vec<&str> = table.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
        assert_eq!(
            reader.external_at(table.lookup("zeta").unwrap()).unwrap().url,
            "zeta.bin"
        );
    }

    #[test]
    fn test_node_children_in_order() {
        let source = "
            top: node root 1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1
                camera 1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1  1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1
                node child 1 0 0 0 0 1 0 0 0 0 1 0 5 0 0 1 end
            end
        ";
        let reader = load(build(&parse(source).unwrap()).unwrap()).unwrap();
        let root = reader.node_at(reader.header().unwrap().top).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.children.len(), 2);

        let camera = reader.block_at(root.children[0]).unwrap();
        assert!(matches!(camera.data, BlockData::Camera(_)));
        let child = reader.node_at(root.children[1]).unwrap();
        assert_eq!(child.transform.w_axis.x, 5.0);
    }

    #[test]
    fn test_axes() {
        let source = "
            top: mesh points
                axes: array axis
                    grip 0 1 0  0 0 0 1
                end
            end
        ";
        let reader = load(build(&parse(source).unwrap()).unwrap()).unwrap();
        let mesh = reader.mesh_at(reader.header().unwrap().top).unwrap();
        let axes = reader.axes_at(mesh.axes).unwrap();
        assert_eq!(axes.lookup("grip").unwrap().translation, glam::Vec3::Y);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(
            parse("top: $nowhere").unwrap_err(),
            ParseError::UndefinedName {
                line: 1,
                name: "nowhere".to_string()
            }
        );
        assert_eq!(
            parse("\ntop: sphere").unwrap_err(),
            ParseError::UnknownKeyword {
                line: 2,
                keyword: "sphere".to_string()
            }
        );
        assert_eq!(
            parse("top: array index16 1 two end").unwrap_err(),
            ParseError::InvalidNumber {
                line: 1,
                token: "two".to_string()
            }
        );
        assert_eq!(
            parse("top: mesh triangles\n indices: array index16 1 end\n").unwrap_err(),
            ParseError::MissingEnd {
                line: 1,
                item: "mesh"
            }
        );
        assert_eq!(
            parse("x: external a.bin").unwrap_err(),
            ParseError::MissingTop
        );
        assert!(matches!(
            parse("top: array vertex-p3 1 2 end").unwrap_err(),
            ParseError::IncompleteRecord { expected: 3, found: 2, .. }
        ));
        assert!(matches!(
            parse("top: array quads end").unwrap_err(),
            ParseError::UnknownArrayType { .. }
        ));
        assert!(matches!(
            parse("end").unwrap_err(),
            ParseError::UnexpectedEnd { line: 1 }
        ));
    }

    #[test]
    fn test_name_too_long() {
        let source = format!("top: node {} 1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1 end", "n".repeat(33));
        assert!(matches!(
            parse(&source).unwrap_err(),
            ParseError::Format {
                source: FormatError::StringTooLong { .. },
                ..
            }
        ));
    }
}
