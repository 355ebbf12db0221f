// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use approx::assert_relative_eq;
use ifcgeom_geometry::{box_shape, ClippingProcessor, Mesh, Point3, Shape};

/// Signed volume of a closed triangle mesh
fn volume(mesh: &Mesh) -> f64 {
    mesh.indices
        .chunks_exact(3)
        .map(|tri| {
            let a = mesh.vertex(tri[0] as usize).coords;
            let b = mesh.vertex(tri[1] as usize).coords;
            let c = mesh.vertex(tri[2] as usize).coords;
            a.dot(&b.cross(&c)) / 6.0
        })
        .sum()
}

fn wall() -> Shape {
    box_shape(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.2, 3.0), 0).unwrap()
}

fn window_opening() -> Shape {
    box_shape(Point3::new(1.0, -0.1, 0.5), Point3::new(2.0, 0.3, 2.0), 0).unwrap()
}

#[test]
fn test_opening_removes_volume() {
    let host = wall();
    let before = Mesh::from_shape(&host, false, 1e-6).unwrap();
    assert_relative_eq!(volume(&before), 2.4, epsilon = 1e-9);

    let cut = ClippingProcessor::new()
        .subtract(&host, &window_opening())
        .unwrap();
    let after = Mesh::from_shape(&cut, false, 1e-6).unwrap();

    // 4 x 0.2 x 3 wall minus a 1 x 0.2 x 1.5 hole
    assert_relative_eq!(volume(&after), 2.1, epsilon = 1e-6);
    assert_ne!(before.vertex_count(), after.vertex_count());
    assert!(after.triangle_count() > before.triangle_count());
}

#[test]
fn test_welding_reduces_vertices_after_cut() {
    let cut = ClippingProcessor::new()
        .subtract(&wall(), &window_opening())
        .unwrap();
    let welded = Mesh::from_shape(&cut, true, 1e-6).unwrap();
    let unwelded = Mesh::from_shape(&cut, false, 1e-6).unwrap();

    assert!(welded.vertex_count() < unwelded.vertex_count());
    assert!(welded.normals.is_empty());
    assert_eq!(unwelded.normals.len(), unwelded.positions.len());
    assert_relative_eq!(volume(&welded), volume(&unwelded), epsilon = 1e-6);
}

#[test]
fn test_opening_in_other_frame_is_noop_when_disjoint() {
    let host = wall();
    let mut opening = window_opening();
    opening.transform(&ifcgeom_geometry::Matrix4::new_translation(
        &ifcgeom_geometry::Vector3::new(10.0, 0.0, 0.0),
    ));
    let result = ClippingProcessor::new().subtract(&host, &opening).unwrap();
    assert_eq!(result, host);
}
