// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D profile definitions

use crate::error::{Error, Result};
use crate::triangulation::{is_self_intersecting, signed_area, triangulate_polygon};
use nalgebra::Point2;

/// Closed 2D profile in the XY plane
#[derive(Debug, Clone)]
pub struct Profile2D {
    /// Outer boundary (counter-clockwise after [`Profile2D::validated`])
    pub outer: Vec<Point2<f64>>,
}

/// Triangulated profile
#[derive(Debug, Clone)]
pub struct Triangulation {
    pub points: Vec<Point2<f64>>,
    pub indices: Vec<usize>,
}

impl Profile2D {
    pub fn new(outer: Vec<Point2<f64>>) -> Self {
        Self { outer }
    }

    pub fn from_coords(coords: &[[f64; 2]]) -> Self {
        Self::new(coords.iter().map(|c| Point2::new(c[0], c[1])).collect())
    }

    /// Clean up and check the wire: drops a repeated closing point and
    /// consecutive duplicates, rejects degenerate and self-intersecting wires,
    /// and orients the result counter-clockwise.
    pub fn validated(mut self, tolerance: f64) -> Result<Self> {
        if self.outer.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::InvalidProfile("non-finite coordinate".to_string()));
        }

        self.outer.dedup_by(|a, b| (*a - *b).norm() <= tolerance);
        if self.outer.len() > 1 {
            let first = self.outer[0];
            if self
                .outer
                .last()
                .is_some_and(|last| (*last - first).norm() <= tolerance)
            {
                self.outer.pop();
            }
        }

        if self.outer.len() < 3 {
            return Err(Error::InvalidProfile(format!(
                "profile must have at least 3 distinct vertices, got {}",
                self.outer.len()
            )));
        }

        if is_self_intersecting(&self.outer) {
            return Err(Error::SelfIntersectingWire(format!(
                "profile with {} vertices crosses itself",
                self.outer.len()
            )));
        }

        let area = signed_area(&self.outer);
        if area.abs() <= tolerance * tolerance {
            return Err(Error::InvalidProfile("profile has zero area".to_string()));
        }

        if area < 0.0 {
            self.outer.reverse();
        }
        Ok(self)
    }

    /// Triangulate the profile using earcutr
    pub fn triangulate(&self) -> Result<Triangulation> {
        let indices = triangulate_polygon(&self.outer)?;
        Ok(Triangulation {
            points: self.outer.clone(),
            indices,
        })
    }
}

/// Create a circle profile centred at the origin
pub fn create_circle(radius: f64, segments: usize) -> Result<Profile2D> {
    if radius <= 0.0 || !radius.is_finite() {
        return Err(Error::InvalidProfile(format!(
            "circle radius must be positive, got {}",
            radius
        )));
    }
    Ok(Profile2D::new(circle_points(radius, segments)))
}

/// Points of a regular polygon approximating a circle, counter-clockwise
pub fn circle_points(radius: f64, segments: usize) -> Vec<Point2<f64>> {
    let segments = segments.max(3);
    (0..segments)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * (i as f64) / (segments as f64);
            Point2::new(radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}
