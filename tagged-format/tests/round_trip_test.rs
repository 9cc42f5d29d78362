//! Writer → reader round trip over every built-in block value.
//!
//! Offsets are checked against where the writer placed the referenced block,
//! and each referenced block is decoded back and compared with its value.

use glam::{Mat4, Quat, Vec3};
use tagged_format::{
    Axis, BlockData, BlockId, BlockValue, Camera, Description, External, GeometryInstance, Header,
    IndexBuffer, Layout, Mesh, NamedOffset, Node, Reader, Reference, Skeleton, Tag, VertexBuffer,
    VertexP2C4, VertexP3N3M2B4, build, load,
};

struct Scene {
    description: Description,
    external: BlockId,
    bones: BlockId,
    sequences: BlockId,
    skeleton: BlockId,
    indices16: BlockId,
    indices32: BlockId,
    skinned: BlockId,
    colored: BlockId,
    axes: BlockId,
    mesh: BlockId,
    plain_mesh: BlockId,
    instance: BlockId,
    camera: BlockId,
    child: BlockId,
    root: BlockId,
    table: BlockId,
}

fn scene() -> Scene {
    let mut d = Description::new();
    d.set_magic(5);

    let external = d.add(BlockValue::External(External::new("materials/steel.png")));
    let bones = d.add(BlockValue::Raw {
        tag: Tag::from_bytes(*b"BONE"),
        payload: vec![1, 2, 3, 4],
    });
    let sequences = d.add(BlockValue::Raw {
        tag: Tag::from_bytes(*b"SEQS"),
        payload: vec![9; 8],
    });
    let skeleton = d.add(BlockValue::Skeleton(Skeleton {
        bones: bones.into(),
        sequences: sequences.into(),
    }));
    let indices16 = d.add(BlockValue::Indices(IndexBuffer::U16(vec![0, 1, 2, 2, 1, 3])));
    let indices32 = d.add(BlockValue::Indices(IndexBuffer::U32(vec![0, 70_000, 5])));
    let skinned = d.add(BlockValue::Vertices(VertexBuffer::from_vertices(&[
        VertexP3N3M2B4 {
            position: [0.0, 1.0, 2.0],
            normal: [0.0, 0.0, 1.0],
            mapping: [0.5, 0.5],
            bones: [0, 1, 2, 3],
            weights: [0.4, 0.3, 0.2, 0.1],
        },
        VertexP3N3M2B4 {
            position: [-1.0, 0.5, 0.0],
            normal: [1.0, 0.0, 0.0],
            mapping: [0.0, 1.0],
            bones: [7, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        },
    ])));
    let colored = d.add(BlockValue::Vertices(VertexBuffer::from_vertices(&[
        VertexP2C4 {
            position: [3.0, 4.0],
            color: [1.0, 0.0, 0.0, 1.0],
        },
    ])));
    let axes = d.add(BlockValue::Axes(vec![
        Axis::new("grip", Vec3::new(0.0, 1.5, 0.0), Quat::IDENTITY),
        Axis::new("muzzle", Vec3::new(0.0, 0.0, -2.0), Quat::from_rotation_y(0.5)),
    ]));
    let mesh = d.add(BlockValue::Mesh(Mesh {
        layout: Layout::Triangles,
        indices: indices16.into(),
        vertices: skinned.into(),
        axes: axes.into(),
        metadata: external.into(),
    }));
    let plain_mesh = d.add(BlockValue::Mesh(Mesh {
        layout: Layout::Other(77),
        indices: indices32.into(),
        vertices: colored.into(),
        axes: Reference::Null,
        metadata: Reference::Null,
    }));
    let instance = d.add(BlockValue::GeometryInstance(GeometryInstance {
        mesh: mesh.into(),
        skeleton: skeleton.into(),
        material: external.into(),
    }));
    let camera = d.add(BlockValue::Camera(Camera::new(
        Mat4::look_at_rh(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y),
        Mat4::perspective_rh(1.0, 4.0 / 3.0, 0.1, 50.0),
    )));
    let child = d.add(BlockValue::Node(Node {
        name: "camera-rig".to_string(),
        transform: Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)),
        children: vec![camera.into()],
    }));
    // root is filled after the table so it can list itself
    let root = d.reserve();
    let table = d.add(BlockValue::OffsetTable(vec![
        NamedOffset::new("root", root.into()),
        NamedOffset::new("plain", plain_mesh.into()),
        NamedOffset::new("nothing", Reference::Null),
    ]));
    d.set(
        root,
        BlockValue::Node(Node {
            name: "root".to_string(),
            transform: Mat4::IDENTITY,
            children: vec![instance.into(), child.into(), root.into()],
        }),
    )
    .unwrap();
    d.set_top(table);

    Scene {
        description: d,
        external,
        bones,
        sequences,
        skeleton,
        indices16,
        indices32,
        skinned,
        colored,
        axes,
        mesh,
        plain_mesh,
        instance,
        camera,
        child,
        root,
        table,
    }
}

/// Offsets of every block in write order; index 0 is the header.
fn block_offsets(reader: &Reader<Vec<u8>>) -> Vec<u64> {
    reader.blocks().map(|block| block.unwrap().offset).collect()
}

struct Placed {
    offsets: Vec<u64>,
}

impl Placed {
    fn of(&self, reference: impl Into<Reference>) -> u64 {
        match reference.into() {
            Reference::Null => 0,
            Reference::Block(id) => self.offsets[id.index() + 1],
        }
    }
}

fn round_trip() -> (Scene, Reader<Vec<u8>>, Placed) {
    let scene = scene();
    let reader = load(build(&scene.description).unwrap()).unwrap();
    let placed = Placed {
        offsets: block_offsets(&reader),
    };
    assert_eq!(placed.offsets.len(), scene.description.len() + 1);
    (scene, reader, placed)
}

fn value(scene: &Scene, id: BlockId) -> &BlockValue {
    scene.description.get(id).unwrap()
}

#[test]
fn test_every_block_keeps_its_tag() {
    let (scene, reader, placed) = round_trip();
    let ids = [
        scene.external,
        scene.bones,
        scene.sequences,
        scene.skeleton,
        scene.indices16,
        scene.indices32,
        scene.skinned,
        scene.colored,
        scene.axes,
        scene.mesh,
        scene.plain_mesh,
        scene.instance,
        scene.camera,
        scene.child,
        scene.root,
        scene.table,
    ];
    assert_eq!(ids.len(), scene.description.len());
    for id in ids {
        let block = reader.block_at(placed.of(id)).unwrap();
        assert_eq!(block.tag, value(&scene, id).tag(), "block #{}", id.index());
    }
}

#[test]
fn test_header() {
    let (scene, reader, placed) = round_trip();
    assert_eq!(reader.header().unwrap(), Header::new(5, placed.of(scene.table)));
}

#[test]
fn test_offset_table() {
    let (scene, reader, placed) = round_trip();
    let table = reader.table_at(placed.of(scene.table)).unwrap();
    assert_eq!(
        table.entries(),
        [
            NamedOffset::new("root", placed.of(scene.root)),
            NamedOffset::new("plain", placed.of(scene.plain_mesh)),
            NamedOffset::new("nothing", 0),
        ]
    );
    assert_eq!(reader.named("plain").unwrap().offset, placed.of(scene.plain_mesh));
}

#[test]
fn test_meshes() {
    let (scene, reader, placed) = round_trip();

    let mesh = reader.mesh_at(placed.of(scene.mesh)).unwrap();
    assert_eq!(
        mesh,
        Mesh {
            layout: Layout::Triangles,
            indices: placed.of(scene.indices16),
            vertices: placed.of(scene.skinned),
            axes: placed.of(scene.axes),
            metadata: placed.of(scene.external),
        }
    );

    let plain = reader.mesh_at(placed.of(scene.plain_mesh)).unwrap();
    assert_eq!(plain.layout, Layout::Other(77));
    assert_eq!(plain.indices, placed.of(scene.indices32));
    assert_eq!(plain.vertices, placed.of(scene.colored));
    assert_eq!((plain.axes, plain.metadata), (0, 0));
}

#[test]
fn test_index_and_vertex_arrays() {
    let (scene, reader, placed) = round_trip();

    for id in [scene.indices16, scene.indices32] {
        let BlockValue::Indices(expected) = value(&scene, id) else {
            panic!("expected indices");
        };
        assert_eq!(&reader.indices_at(placed.of(id)).unwrap().to_buffer(), expected);
    }

    for id in [scene.skinned, scene.colored] {
        let BlockValue::Vertices(expected) = value(&scene, id) else {
            panic!("expected vertices");
        };
        assert_eq!(&reader.vertices_at(placed.of(id)).unwrap().to_buffer(), expected);
    }
}

#[test]
fn test_skeleton_with_opaque_children() {
    let (scene, reader, placed) = round_trip();
    let skeleton = reader.skeleton_at(placed.of(scene.skeleton)).unwrap();
    assert_eq!(
        skeleton,
        Skeleton {
            bones: placed.of(scene.bones),
            sequences: placed.of(scene.sequences),
        }
    );

    let bones = reader.block_at(skeleton.bones).unwrap();
    assert!(bones.is_opaque());
    assert_eq!(bones.payload, [1, 2, 3, 4]);
    let sequences = reader.block_at(skeleton.sequences).unwrap();
    assert_eq!(sequences.tag, Tag::from_bytes(*b"SEQS"));
    assert_eq!(sequences.payload, [9; 8]);
}

#[test]
fn test_axes() {
    let (scene, reader, placed) = round_trip();
    let BlockValue::Axes(expected) = value(&scene, scene.axes) else {
        panic!("expected axes");
    };
    let axes = reader.axes_at(placed.of(scene.axes)).unwrap();
    assert_eq!(axes.axes(), expected.as_slice());
    assert_eq!(axes.lookup("muzzle").unwrap(), &expected[1]);
}

#[test]
fn test_camera() {
    let (scene, reader, placed) = round_trip();
    let BlockValue::Camera(expected) = value(&scene, scene.camera) else {
        panic!("expected camera");
    };
    assert_eq!(&reader.camera_at(placed.of(scene.camera)).unwrap(), expected);
}

#[test]
fn test_nodes_and_instance() {
    let (scene, reader, placed) = round_trip();

    let root = reader.node_at(placed.of(scene.root)).unwrap();
    assert_eq!(root.name, "root");
    assert_eq!(root.transform, Mat4::IDENTITY);
    assert_eq!(
        root.children,
        [
            placed.of(scene.instance),
            placed.of(scene.child),
            placed.of(scene.root),
        ]
    );

    let child = reader.node_at(root.children[1]).unwrap();
    assert_eq!(child.name, "camera-rig");
    assert_eq!(child.transform.w_axis.y, 2.0);
    assert_eq!(child.children, [placed.of(scene.camera)]);

    let instance = reader.geometry_instance_at(root.children[0]).unwrap();
    assert_eq!(
        instance,
        GeometryInstance {
            mesh: placed.of(scene.mesh),
            skeleton: placed.of(scene.skeleton),
            material: placed.of(scene.external),
        }
    );

    let material = reader.block_at(instance.material).unwrap();
    let BlockData::External(external) = material.data else {
        panic!("expected external, got {:?}", material.data);
    };
    assert_eq!(external.url, "materials/steel.png");
}
