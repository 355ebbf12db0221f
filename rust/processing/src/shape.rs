// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-shape request
//!
//! Synchronous processing of one element with the same pipeline the iterator
//! uses. Errors are returned to the caller; there are no retries.

use crate::error::{ElementError, ElementErrorKind, RunError};
use crate::output::{ElementShape, ItemShape};
use crate::pipeline::Pipeline;
use ifcgeom_core::{ContextSelector, Model, ObjectRef, RepresentationItem, Settings};
use thiserror::Error;

/// Failure of a single-shape request
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Element(#[from] ElementError),

    #[error("item geometry failed: {0}")]
    Item(#[source] ElementErrorKind),
}

/// Process one element, selecting representations by the settings' contexts
pub fn create_shape(
    settings: &Settings,
    model: &Model,
    element: ObjectRef,
) -> Result<ElementShape, ShapeError> {
    request(settings, model, element, None)
}

/// Process one element using an explicit representation
pub fn create_shape_with_representation(
    settings: &Settings,
    model: &Model,
    element: ObjectRef,
    representation: u32,
) -> Result<ElementShape, ShapeError> {
    request(settings, model, element, Some(representation))
}

/// Process a bare representation item, e.g. a profile or an opening solid
/// that is not (yet) attached to an element. `model` supplies the length
/// unit and precision.
pub fn create_shape_for_item(
    settings: &Settings,
    model: &Model,
    item: &RepresentationItem,
) -> Result<ItemShape, ShapeError> {
    let selector = ContextSelector::from_settings(settings);
    let pipeline = Pipeline::new(model, settings, &selector).map_err(RunError::from)?;
    pipeline.build_item(item).map_err(|kind| {
        tracing::debug!(error = %kind, "Item shape request failed");
        ShapeError::Item(kind)
    })
}

fn request(
    settings: &Settings,
    model: &Model,
    element: ObjectRef,
    representation: Option<u32>,
) -> Result<ElementShape, ShapeError> {
    let selector = ContextSelector::from_settings(settings);
    let pipeline = Pipeline::new(model, settings, &selector).map_err(RunError::from)?;

    let element = model
        .get(element)
        .ok_or_else(|| ElementError::new(element.0, "", ElementErrorKind::NotFound))?;

    pipeline.process(element, representation).map_err(|e| {
        tracing::debug!(element = e.id, error = %e.kind, "Shape request failed");
        ShapeError::Element(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifcgeom_core::{names, ItemGeometry};

    const MODEL: &str = r#"{
        "elements": [{
            "id": 5,
            "entity": "IfcColumn",
            "representations": [
                {
                    "id": 50,
                    "context": {"id": 1, "identifier": "Body", "type": "Model"},
                    "items": [{"kind": "circle_extrusion", "radius": 0.2, "depth": 3.0}]
                },
                {
                    "id": 51,
                    "context": {"id": 2, "identifier": "Axis", "type": "Model"},
                    "items": [{"kind": "polyline", "points": [[0, 0, 0], [0, 0, 3]]}]
                }
            ]
        }]
    }"#;

    #[test]
    fn test_create_shape() {
        let model = Model::from_json_str(MODEL).unwrap();
        let shape = create_shape(&Settings::new(), &model, ObjectRef(5)).unwrap();
        assert_eq!(shape.entity, "IfcColumn");
        assert_eq!(shape.context, "Body");
        assert!(shape.mesh().unwrap().triangle_count() > 0);
    }

    #[test]
    fn test_explicit_representation() {
        let model = Model::from_json_str(MODEL).unwrap();
        let settings = Settings::new()
            .with(names::DIMENSIONALITY, ifcgeom_core::Dimensionality::CurvesSurfacesAndSolids)
            .unwrap();
        let shape = create_shape_with_representation(&settings, &model, ObjectRef(5), 51).unwrap();
        assert_eq!(shape.context, "Axis");
        assert_eq!(shape.mesh().unwrap().edges.len(), 2);
    }

    #[test]
    fn test_circle_segments() {
        let model = Model::from_json_str(MODEL).unwrap();
        let coarse = Settings::new().with(names::CIRCLE_SEGMENTS, 8i64).unwrap();
        let fine = Settings::new().with(names::CIRCLE_SEGMENTS, 64i64).unwrap();
        let coarse = create_shape(&coarse, &model, ObjectRef(5)).unwrap();
        let fine = create_shape(&fine, &model, ObjectRef(5)).unwrap();
        assert!(
            fine.mesh().unwrap().triangle_count() > coarse.mesh().unwrap().triangle_count()
        );
    }

    #[test]
    fn test_item_shape() {
        let model = Model::from_json_str(r#"{"length_unit_scale": 0.001, "elements": []}"#).unwrap();
        let item: RepresentationItem = ItemGeometry::Box {
            min: [0.0, 0.0, 0.0],
            max: [1000.0, 500.0, 250.0],
        }
        .into();

        let shape = create_shape_for_item(&Settings::new(), &model, &item).unwrap();
        let (_, max) = shape.mesh().unwrap().bounds().unwrap();
        assert!((max.x - 1.0).abs() < 1e-9);
        assert!((max.z - 0.25).abs() < 1e-9);
        assert!(shape.materials.is_empty());
        assert!(shape.mesh().unwrap().material_ids.iter().all(|&m| m == -1));
    }

    #[test]
    fn test_item_curve_needs_curve_dimensionality() {
        let model = Model::from_json_str(MODEL).unwrap();
        let item: RepresentationItem = ItemGeometry::Polyline {
            points: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
        }
        .into();

        let err = create_shape_for_item(&Settings::new(), &model, &item).unwrap_err();
        assert!(matches!(err, ShapeError::Item(ElementErrorKind::NoGeometry)));

        let settings = Settings::new()
            .with(names::DIMENSIONALITY, ifcgeom_core::Dimensionality::Curves)
            .unwrap();
        let shape = create_shape_for_item(&settings, &model, &item).unwrap();
        assert_eq!(shape.mesh().unwrap().edges.len(), 4);
    }

    #[test]
    fn test_missing_element() {
        let model = Model::from_json_str(MODEL).unwrap();
        let err = create_shape(&Settings::new(), &model, ObjectRef(99)).unwrap_err();
        assert!(matches!(
            err,
            ShapeError::Element(ElementError {
                kind: ElementErrorKind::NotFound,
                ..
            })
        ));
    }
}
