// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CSG (Constructive Solid Geometry) Operations
//!
//! Opening subtraction and layer slicing on top of csgrs BSP booleans.

use crate::error::{Error, Result};
use crate::shape::{bounds_overlap, Face, Shape, NO_MATERIAL};
use crate::tessellate::box_shape;
use crate::triangulation::{project_to_2d, triangulate_polygon};
use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

type CsgMesh = csgrs::mesh::Mesh<()>;

/// Boolean operations on closed shells
pub struct ClippingProcessor {
    /// Epsilon for coplanarity and overlap checks
    pub epsilon: f64,
}

impl ClippingProcessor {
    pub fn new() -> Self {
        Self { epsilon: 1e-6 }
    }

    /// Processor whose checks use the given geometric tolerance
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            epsilon: tolerance.max(1e-12),
        }
    }

    /// Convert our faces to csgrs polygons, triangulating non-triangular faces
    fn shape_to_csgrs(shape: &Shape) -> CsgMesh {
        let (polygons, dropped) = Self::to_polygons(shape);
        if dropped > 0 {
            tracing::warn!(
                dropped,
                faces = shape.faces.len(),
                "Faces could not be triangulated for boolean input, shell may be open"
            );
        }
        CsgMesh::from_polygons(&polygons, None)
    }

    /// Triangles of every face, plus the number of faces that failed to
    /// triangulate
    fn to_polygons(shape: &Shape) -> (Vec<csgrs::mesh::polygon::Polygon<()>>, usize) {
        use csgrs::mesh::{polygon::Polygon, vertex::Vertex};

        let mut polygons = Vec::with_capacity(shape.faces.len() * 2);
        let mut dropped = 0usize;

        for face in &shape.faces {
            let normal = face.normal;
            if face.points.len() == 3 {
                let vertices = face
                    .points
                    .iter()
                    .map(|p| Vertex::new(*p, normal))
                    .collect();
                polygons.push(Polygon::new(vertices, None));
                continue;
            }

            let (points_2d, _, _, _) = project_to_2d(&face.points, &normal);
            let Ok(indices) = triangulate_polygon(&points_2d) else {
                dropped += 1;
                continue;
            };

            for tri in indices.chunks_exact(3) {
                let vertices = tri
                    .iter()
                    .map(|&i| Vertex::new(face.points[i], normal))
                    .collect();
                polygons.push(Polygon::new(vertices, None));
            }
        }

        (polygons, dropped)
    }

    /// Convert csgrs polygons back to faces.
    ///
    /// Materials are recovered from the source face lying in the same plane;
    /// faces created by the boolean itself get `fallback`.
    fn csgrs_to_shape(&self, csg_mesh: &CsgMesh, sources: &[&Face], fallback: i32) -> Result<Shape> {
        let mut faces = Vec::with_capacity(csg_mesh.polygons.len());

        for polygon in &csg_mesh.polygons {
            let vertices = &polygon.vertices;
            if vertices.len() < 3 {
                continue;
            }

            let points: Vec<Point3<f64>> = vertices
                .iter()
                .map(|v| Point3::new(v.pos[0], v.pos[1], v.pos[2]))
                .collect();

            if points.iter().any(|p| !p.iter().all(|c| c.is_finite())) {
                return Err(Error::BooleanFailed(
                    "result contains non-finite coordinates".to_string(),
                ));
            }

            let Some(mut face) = Face::new(points, NO_MATERIAL) else {
                continue; // Skip degenerate polygon
            };
            face.material = self.source_material(&face, sources).unwrap_or(fallback);
            faces.push(face);
        }

        Ok(Shape::from_faces(faces))
    }

    fn source_material(&self, face: &Face, sources: &[&Face]) -> Option<i32> {
        let offset = face.plane_offset();
        sources
            .iter()
            .find(|s| {
                s.normal.dot(&face.normal) > 1.0 - 1e-6
                    && (s.plane_offset() - offset).abs() <= self.epsilon.max(1e-9)
            })
            .map(|s| s.material)
    }

    /// Subtract an opening shell from a host shell.
    ///
    /// Faces cut into the host by the opening take the host's dominant
    /// material. Curves of the host are kept as-is.
    pub fn subtract(&self, host: &Shape, opening: &Shape) -> Result<Shape> {
        use csgrs::traits::CSG;

        // Fast path: nothing to remove
        let (Some(host_bounds), Some(opening_bounds)) = (host.bounds(), opening.bounds()) else {
            return Ok(host.clone());
        };
        if opening.faces.is_empty() || !bounds_overlap(&host_bounds, &opening_bounds, -self.epsilon) {
            return Ok(host.clone());
        }
        if host.faces.is_empty() {
            return Err(Error::BooleanFailed("host has no surfaces".to_string()));
        }
        // BSP difference leaves the host untouched when the cutter swallows it
        if self.encloses(opening, host) {
            return Err(Error::BooleanFailed(
                "opening removes the entire host".to_string(),
            ));
        }

        let host_csg = Self::shape_to_csgrs(host);
        let opening_csg = Self::shape_to_csgrs(opening);

        let result_csg = host_csg.difference(&opening_csg);

        let sources: Vec<&Face> = host.faces.iter().collect();
        let mut result = self.csgrs_to_shape(&result_csg, &sources, dominant_material(host))?;
        if result.faces.is_empty() {
            return Err(Error::BooleanFailed(
                "opening removes the entire host".to_string(),
            ));
        }
        if result.faces.len() == host.faces.len()
            && result.bounds() == Some(host_bounds)
            && contains_strictly(&opening_bounds, &host_bounds, self.epsilon)
        {
            return Err(Error::BooleanFailed(
                "opening encloses the host but nothing was removed".to_string(),
            ));
        }
        result.curves = host.curves.clone();
        Ok(result)
    }

    /// Whether `outer` is a closed convex shell with every point of `inner`
    /// on or behind all of its face planes
    fn encloses(&self, outer: &Shape, inner: &Shape) -> bool {
        let behind_all = |p: &Point3<f64>| {
            outer
                .faces
                .iter()
                .all(|f| f.normal.dot(&(*p - f.points[0])) <= self.epsilon)
        };
        let inner_points = || inner.faces.iter().flat_map(|f| f.points.iter());

        is_closed_shell(outer, self.epsilon)
            && outer.faces.iter().flat_map(|f| f.points.iter()).all(behind_all)
            && inner_points().all(behind_all)
    }

    /// Keep the part of a shell inside an axis-aligned box.
    ///
    /// Cut faces take `material`; faces from the original shell keep theirs
    /// unless `override_material` is set, in which case every face gets
    /// `material`. An empty result is not an error.
    pub fn intersect_box(
        &self,
        shape: &Shape,
        min: Point3<f64>,
        max: Point3<f64>,
        material: i32,
        override_material: bool,
    ) -> Result<Shape> {
        use csgrs::traits::CSG;

        let Some(bounds) = shape.bounds() else {
            return Ok(Shape::new());
        };
        if shape.faces.is_empty() || !bounds_overlap(&bounds, &(min, max), -self.epsilon) {
            return Ok(Shape::new());
        }

        let clip = box_shape(min, max, material)?;
        let result_csg = Self::shape_to_csgrs(shape).intersection(&Self::shape_to_csgrs(&clip));

        let sources: Vec<&Face> = shape.faces.iter().collect();
        let mut result = self.csgrs_to_shape(&result_csg, &sources, material)?;
        if override_material {
            result.set_material(material);
        }
        Ok(result)
    }
}

impl Default for ClippingProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Most frequent face material of a shape
fn dominant_material(shape: &Shape) -> i32 {
    let mut counts: FxHashMap<i32, usize> = FxHashMap::default();
    for face in &shape.faces {
        *counts.entry(face.material).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|&(material, count)| (count, std::cmp::Reverse(material)))
        .map(|(material, _)| material)
        .unwrap_or(NO_MATERIAL)
}

/// Every edge is shared by an even number of face boundaries
fn is_closed_shell(shape: &Shape, epsilon: f64) -> bool {
    if shape.faces.len() < 4 {
        return false;
    }
    let scale = 1.0 / epsilon.max(1e-9);
    let key = |p: &Point3<f64>| {
        (
            (p.x * scale).round() as i64,
            (p.y * scale).round() as i64,
            (p.z * scale).round() as i64,
        )
    };

    let mut edges: FxHashMap<_, usize> = FxHashMap::default();
    for face in &shape.faces {
        let n = face.points.len();
        for i in 0..n {
            let (a, b) = (key(&face.points[i]), key(&face.points[(i + 1) % n]));
            if a == b {
                continue;
            }
            *edges.entry(if a < b { (a, b) } else { (b, a) }).or_default() += 1;
        }
    }
    !edges.is_empty() && edges.values().all(|count| count % 2 == 0)
}

/// `outer` extends past `inner` on every side
fn contains_strictly(
    outer: &(Point3<f64>, Point3<f64>),
    inner: &(Point3<f64>, Point3<f64>),
    tolerance: f64,
) -> bool {
    (0..3).all(|i| outer.0[i] < inner.0[i] - tolerance && outer.1[i] > inner.1[i] + tolerance)
}

/// Box covering `bounds` except along `axis`, where it spans `[from, to]`
pub fn slab(
    bounds: &(Point3<f64>, Point3<f64>),
    axis: usize,
    from: f64,
    to: f64,
    margin: f64,
) -> (Point3<f64>, Point3<f64>) {
    let pad = Vector3::repeat(margin);
    let mut min = bounds.0 - pad;
    let mut max = bounds.1 + pad;
    min[axis] = from;
    max[axis] = to;
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(min: [f64; 3], max: [f64; 3], material: i32) -> Shape {
        box_shape(Point3::from(min), Point3::from(max), material).unwrap()
    }

    #[test]
    fn test_subtract_through_hole() {
        let processor = ClippingProcessor::new();
        let host = cube([0.0, 0.0, 0.0], [4.0, 0.2, 3.0], 1);
        let opening = cube([1.0, -0.1, 0.5], [2.0, 0.3, 2.0], 5);

        let result = processor.subtract(&host, &opening).unwrap();
        assert!(result.faces.len() > host.faces.len());
        // Cut faces inherit the host material, never the opening's
        assert!(result.faces.iter().all(|f| f.material == 1));

        let (min, max) = result.bounds().unwrap();
        assert!((min.x - 0.0).abs() < 1e-9 && (max.x - 4.0).abs() < 1e-9);
        assert!((max.z - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_subtract_disjoint_is_noop() {
        let processor = ClippingProcessor::new();
        let host = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], 0);
        let opening = cube([5.0, 5.0, 5.0], [6.0, 6.0, 6.0], 0);
        assert_eq!(processor.subtract(&host, &opening).unwrap(), host);
    }

    #[test]
    fn test_subtract_everything_fails() {
        let processor = ClippingProcessor::new();
        let host = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], 0);
        let opening = cube([-1.0, -1.0, -1.0], [2.0, 2.0, 2.0], 0);
        assert!(matches!(
            processor.subtract(&host, &opening),
            Err(Error::BooleanFailed(_))
        ));
    }

    #[test]
    fn test_subtract_flush_enclosure_fails() {
        let processor = ClippingProcessor::new();
        let host = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], 0);
        let opening = cube([0.0, 0.0, 0.0], [1.0, 1.0, 2.0], 0);
        assert!(matches!(
            processor.subtract(&host, &opening),
            Err(Error::BooleanFailed(_))
        ));
    }

    #[test]
    fn test_subtract_top_half() {
        let processor = ClippingProcessor::new();
        let host = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], 0);
        let opening = cube([-1.0, -1.0, 0.5], [2.0, 2.0, 2.0], 0);

        let result = processor.subtract(&host, &opening).unwrap();
        let (min, max) = result.bounds().unwrap();
        assert!((max.z - 0.5).abs() < 1e-9);
        assert!(min.z.abs() < 1e-9);
    }

    #[test]
    fn test_enclosure_checks() {
        let processor = ClippingProcessor::new();
        let small = cube([0.0, 0.0, 0.0], [1.0, 1.0, 1.0], 0);
        let large = cube([-1.0, -1.0, -1.0], [2.0, 2.0, 2.0], 0);
        let shifted = cube([0.5, -1.0, -1.0], [2.0, 2.0, 2.0], 0);

        assert!(is_closed_shell(&large, 1e-6));
        assert!(processor.encloses(&large, &small));
        assert!(!processor.encloses(&small, &large));
        assert!(!processor.encloses(&shifted, &small));

        let mut open = large.clone();
        open.faces.pop();
        assert!(!is_closed_shell(&open, 1e-6));
        assert!(!processor.encloses(&open, &small));
    }

    #[test]
    fn test_untriangulable_faces_counted() {
        let mut shape = cube([0.0; 3], [1.0; 3], 0);
        shape.faces.push(Face {
            points: vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
            normal: Vector3::z(),
            material: 0,
        });

        let (polygons, dropped) = ClippingProcessor::to_polygons(&shape);
        assert_eq!(dropped, 1);
        assert_eq!(polygons.len(), 12);
    }

    #[test]
    fn test_contains_strictly() {
        let outer = (Point3::new(-1.0, -1.0, -1.0), Point3::new(2.0, 2.0, 2.0));
        let inner = (Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        assert!(contains_strictly(&outer, &inner, 1e-6));
        assert!(!contains_strictly(&inner, &outer, 1e-6));
        assert!(!contains_strictly(&inner, &inner, 1e-6));
    }

    #[test]
    fn test_intersect_box_slices_layer() {
        let processor = ClippingProcessor::new();
        let wall = cube([0.0, 0.0, 0.0], [4.0, 0.3, 3.0], 0);
        let bounds = wall.bounds().unwrap();
        let (min, max) = slab(&bounds, 1, 0.1, 0.2, 0.01);

        let layer = processor.intersect_box(&wall, min, max, 2, true).unwrap();
        let (lmin, lmax) = layer.bounds().unwrap();
        assert!((lmin.y - 0.1).abs() < 1e-9);
        assert!((lmax.y - 0.2).abs() < 1e-9);
        assert!((lmax.x - 4.0).abs() < 1e-9);
        assert!(layer.faces.iter().all(|f| f.material == 2));

        let (min, max) = slab(&bounds, 1, 1.0, 2.0, 0.01);
        assert!(processor.intersect_box(&wall, min, max, 2, true).unwrap().is_empty());
    }

    #[test]
    fn test_dominant_material() {
        let mut shape = cube([0.0; 3], [1.0; 3], 4);
        shape.faces[0].material = 7;
        assert_eq!(dominant_material(&shape), 4);
        assert_eq!(dominant_material(&Shape::new()), NO_MATERIAL);
    }
}
