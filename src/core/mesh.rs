//! Bulk storage for indexed meshes. Individual triangles and bilinear
//! patches are just `(mesh index, primitive index)` pairs; the vertex,
//! normal, tangent, and uv arrays live here, registered once at scene
//! load in process-wide tables and never mutated afterwards. Positions
//! and shading data are baked into render space at construction so the
//! per-ray code needs no transform.

use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use log::error;

use crate::core::geometry::{Normal3f, Point2f, Point3f, Vector3f};
use crate::core::transform::Transform;

#[derive(Debug, Clone)]
pub struct TriangleMesh {
    /// the total number of triangles in the mesh
    pub n_triangles: usize,
    /// 3 vertex indices per triangle
    pub vertex_indices: Vec<usize>,
    /// vertex positions, in render space
    pub p: Vec<Point3f>,
    /// optional per-vertex shading normals (empty when absent)
    pub n: Vec<Normal3f>,
    /// optional per-vertex shading tangents (empty when absent)
    pub s: Vec<Vector3f>,
    /// optional parametric (u, v) texture coordinates (empty when absent)
    pub uv: Vec<Point2f>,
    /// optional per-triangle face indices (empty when absent)
    pub face_indices: Vec<usize>,
    pub reverse_orientation: bool,
    pub transform_swaps_handedness: bool,
}

impl TriangleMesh {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        render_from_object: &Transform,
        reverse_orientation: bool,
        vertex_indices: Vec<usize>,
        p: Vec<Point3f>,
        s: Vec<Vector3f>,
        n: Vec<Normal3f>,
        uv: Vec<Point2f>,
        face_indices: Vec<usize>,
    ) -> Self {
        let n_triangles = vertex_indices.len() / 3;
        let n_vertices = p.len();
        // bake vertex data into render space
        let p: Vec<Point3f> = p
            .iter()
            .map(|pt| render_from_object.transform_point(pt))
            .collect();
        let n = validated(n, n_vertices, "N")
            .iter()
            .map(|nn| render_from_object.transform_normal(nn))
            .collect();
        let s = validated(s, n_vertices, "S")
            .iter()
            .map(|ss| render_from_object.transform_vector(ss))
            .collect();
        let uv = validated(uv, n_vertices, "uv");
        let face_indices = validated(face_indices, n_triangles, "faceIndices");
        TriangleMesh {
            n_triangles,
            vertex_indices,
            p,
            n,
            s,
            uv,
            face_indices,
            reverse_orientation,
            transform_swaps_handedness: render_from_object.swaps_handedness(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BilinearPatchMesh {
    /// the total number of patches in the mesh
    pub n_patches: usize,
    /// 4 vertex indices per patch, in (0,0) (1,0) (0,1) (1,1) order
    pub vertex_indices: Vec<usize>,
    /// vertex positions, in render space
    pub p: Vec<Point3f>,
    /// optional per-vertex shading normals (empty when absent)
    pub n: Vec<Normal3f>,
    /// optional parametric (u, v) texture coordinates (empty when absent)
    pub uv: Vec<Point2f>,
    /// optional per-patch face indices (empty when absent)
    pub face_indices: Vec<usize>,
    pub reverse_orientation: bool,
    pub transform_swaps_handedness: bool,
}

impl BilinearPatchMesh {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        render_from_object: &Transform,
        reverse_orientation: bool,
        vertex_indices: Vec<usize>,
        p: Vec<Point3f>,
        n: Vec<Normal3f>,
        uv: Vec<Point2f>,
        face_indices: Vec<usize>,
    ) -> Self {
        let n_patches = vertex_indices.len() / 4;
        let n_vertices = p.len();
        let p: Vec<Point3f> = p
            .iter()
            .map(|pt| render_from_object.transform_point(pt))
            .collect();
        let n = validated(n, n_vertices, "N")
            .iter()
            .map(|nn| render_from_object.transform_normal(nn))
            .collect();
        let uv = validated(uv, n_vertices, "uv");
        let face_indices = validated(face_indices, n_patches, "faceIndices");
        BilinearPatchMesh {
            n_patches,
            vertex_indices,
            p,
            n,
            uv,
            face_indices,
            reverse_orientation,
            transform_swaps_handedness: render_from_object.swaps_handedness(),
        }
    }
}

/// Discard an optional per-vertex array whose length does not match the
/// vertex count.
fn validated<T>(values: Vec<T>, expected: usize, name: &str) -> Vec<T> {
    if !values.is_empty() && values.len() != expected {
        error!(
            "\"{}\" array has {} entries, expected {}; discarding it",
            name,
            values.len(),
            expected
        );
        return Vec::new();
    }
    values
}

lazy_static! {
    static ref TRIANGLE_MESHES: RwLock<Vec<Arc<TriangleMesh>>> = RwLock::new(Vec::new());
    static ref BILINEAR_MESHES: RwLock<Vec<Arc<BilinearPatchMesh>>> = RwLock::new(Vec::new());
}

/// Add a mesh to the global triangle mesh table, returning its index.
/// Registration happens during (single-threaded) scene load; lookups
/// afterwards only take the read lock.
pub fn register_triangle_mesh(mesh: TriangleMesh) -> u32 {
    let mut table = TRIANGLE_MESHES.write().unwrap();
    table.push(Arc::new(mesh));
    (table.len() - 1) as u32
}

pub fn triangle_mesh(index: u32) -> Arc<TriangleMesh> {
    TRIANGLE_MESHES.read().unwrap()[index as usize].clone()
}

/// Add a mesh to the global bilinear patch mesh table, returning its
/// index.
pub fn register_bilinear_mesh(mesh: BilinearPatchMesh) -> u32 {
    let mut table = BILINEAR_MESHES.write().unwrap();
    table.push(Arc::new(mesh));
    (table.len() - 1) as u32
}

pub fn bilinear_mesh(index: u32) -> Arc<BilinearPatchMesh> {
    BILINEAR_MESHES.read().unwrap()[index as usize].clone()
}
