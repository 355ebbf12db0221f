// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use crate::error::{Error, Result};
use crate::shape::Shape;
use crate::triangulation::{project_to_2d, triangulate_polygon};
use nalgebra::{Matrix4, Point3, Vector3};
use rustc_hash::FxHashMap;

/// Triangle mesh with per-triangle material slots and curve edges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f64>,
    /// Vertex normals (nx, ny, nz); empty for welded meshes
    pub normals: Vec<f64>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
    /// Line segment indices (i0, i1) for curves
    pub edges: Vec<u32>,
    /// Material slot per triangle, -1 for none
    pub material_ids: Vec<i32>,
}

/// Quantized position key used for welding
type WeldKey = (i64, i64, i64);

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
            edges: Vec::new(),
            material_ids: Vec::with_capacity(index_count / 3),
        }
    }

    /// Triangulate a shape.
    ///
    /// With `weld`, vertices sharing a position (within `tolerance`) are
    /// merged across faces and curves and no normals are emitted. Without it,
    /// every face gets its own vertices carrying the face normal.
    pub fn from_shape(shape: &Shape, weld: bool, tolerance: f64) -> Result<Self> {
        let face_vertices: usize = shape.faces.iter().map(|f| f.points.len()).sum();
        let mut mesh = Self::with_capacity(face_vertices, face_vertices * 3);
        let mut welder = Welder::new(weld, tolerance);

        for face in &shape.faces {
            let indices = if face.points.len() == 3 {
                vec![0, 1, 2]
            } else {
                let (points_2d, _, _, _) = project_to_2d(&face.points, &face.normal);
                triangulate_polygon(&points_2d)?
            };

            let local: Vec<u32> = face
                .points
                .iter()
                .map(|p| welder.vertex(&mut mesh, p, Some(&face.normal)))
                .collect();

            for tri in indices.chunks_exact(3) {
                let (a, b, c) = (local[tri[0]], local[tri[1]], local[tri[2]]);
                // Welding can collapse a sliver triangle
                if a == b || b == c || a == c {
                    continue;
                }
                mesh.add_triangle(a, b, c);
                mesh.material_ids.push(face.material);
            }
        }

        for curve in &shape.curves {
            let local: Vec<u32> = curve
                .points
                .iter()
                .map(|p| welder.vertex(&mut mesh, p, None))
                .collect();
            let n = local.len();
            for i in 0..curve.segment_count() {
                mesh.edges.push(local[i]);
                mesh.edges.push(local[(i + 1) % n]);
            }
        }

        if !weld && mesh.normals.len() != mesh.positions.len() {
            return Err(Error::EmptyMesh("normal count does not match vertex count".into()));
        }
        Ok(mesh)
    }

    /// Add a vertex with normal
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.add_position(position);
        self.normals.extend_from_slice(&[normal.x, normal.y, normal.z]);
    }

    /// Add a vertex without normal
    #[inline]
    pub fn add_position(&mut self, position: Point3<f64>) {
        self.positions
            .extend_from_slice(&[position.x, position.y, position.z]);
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.extend_from_slice(&[i0, i1, i2]);
    }

    /// Apply a transformation matrix to positions and normals
    pub fn transform(&mut self, transform: &Matrix4<f64>) {
        self.positions.chunks_exact_mut(3).for_each(|chunk| {
            let p = transform.transform_point(&Point3::new(chunk[0], chunk[1], chunk[2]));
            chunk.copy_from_slice(&[p.x, p.y, p.z]);
        });

        // Inverse transpose for correct normal transformation
        let normal_matrix = transform.try_inverse().unwrap_or(*transform).transpose();
        self.normals.chunks_exact_mut(3).for_each(|chunk| {
            let n = Vector3::new(chunk[0], chunk[1], chunk[2]);
            let t = (normal_matrix * n.to_homogeneous()).xyz();
            let t = t.try_normalize(1e-12).unwrap_or(n);
            chunk.copy_from_slice(&[t.x, t.y, t.z]);
        });
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Position of vertex `i`
    pub fn vertex(&self, i: usize) -> Point3<f64> {
        Point3::new(
            self.positions[i * 3],
            self.positions[i * 3 + 1],
            self.positions[i * 3 + 2],
        )
    }

    /// Calculate bounds (min, max)
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut chunks = self.positions.chunks_exact(3);
        let first = chunks.next()?;
        let mut min = Point3::new(first[0], first[1], first[2]);
        let mut max = min;

        for chunk in chunks {
            let p = Point3::new(chunk[0], chunk[1], chunk[2]);
            min = min.inf(&p);
            max = max.sup(&p);
        }
        Some((min, max))
    }
}

/// Vertex emitter that optionally merges coincident positions
struct Welder {
    weld: bool,
    inv_tolerance: f64,
    seen: FxHashMap<WeldKey, u32>,
}

impl Welder {
    fn new(weld: bool, tolerance: f64) -> Self {
        Self {
            weld,
            inv_tolerance: 1.0 / tolerance.max(1e-12),
            seen: FxHashMap::default(),
        }
    }

    fn key(&self, p: &Point3<f64>) -> WeldKey {
        (
            (p.x * self.inv_tolerance).round() as i64,
            (p.y * self.inv_tolerance).round() as i64,
            (p.z * self.inv_tolerance).round() as i64,
        )
    }

    fn vertex(&mut self, mesh: &mut Mesh, p: &Point3<f64>, normal: Option<&Vector3<f64>>) -> u32 {
        if self.weld {
            let key = self.key(p);
            if let Some(&index) = self.seen.get(&key) {
                return index;
            }
            let index = mesh.vertex_count() as u32;
            mesh.add_position(*p);
            self.seen.insert(key, index);
            return index;
        }

        let index = mesh.vertex_count() as u32;
        mesh.add_vertex(*p, normal.copied().unwrap_or_else(Vector3::zeros));
        index
    }
}
