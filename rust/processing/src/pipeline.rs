// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-element geometry pipeline
//!
//! map -> tessellate -> subtract openings -> slice layers -> scale units ->
//! model transform -> world coordinates -> triangulate or serialize.

use crate::error::{ElementError, ElementErrorKind};
use crate::mapping::{LayerPlan, MappedElement, Mapper};
use crate::materials::{MaterialTable, OutputMaterial};
use crate::output::{serialize_shape, ElementShape, Geometry, ItemShape};
use ifcgeom_core::{
    keys, names, ConfigError, ContextSelector, Dimensionality, Element, IteratorOutput, Model,
    RepresentationItem, Settings,
};
use ifcgeom_geometry::csg::slab;
use ifcgeom_geometry::transform::scale_translation;
use ifcgeom_geometry::{
    item_to_shape, ClippingProcessor, Matrix4, Mesh, ModelTransform, Shape, TessellationParams,
    NO_MATERIAL,
};

/// Processes elements of one model with one settings snapshot.
///
/// Holds only shared references and plain data, so one instance per worker
/// is cheap and needs no locking.
pub struct Pipeline<'a> {
    model: &'a Model,
    settings: &'a Settings,
    mapper: Mapper<'a>,
    transform: ModelTransform,
    tessellation: TessellationParams,
    tolerance: f64,
    clipper: ClippingProcessor,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        model: &'a Model,
        settings: &'a Settings,
        selector: &'a ContextSelector,
    ) -> Result<Self, ConfigError> {
        let transform = ModelTransform::new(
            settings.value(keys::MODEL_OFFSET),
            settings.value(keys::MODEL_ROTATION),
        )
        .map_err(|e| ConfigError::InvalidValue {
            name: names::MODEL_ROTATION.to_string(),
            reason: e.to_string(),
        })?;

        let tolerance = settings.tolerance(model.precision);
        Ok(Self {
            model,
            settings,
            mapper: Mapper::new(settings, selector),
            transform,
            tessellation: TessellationParams {
                circle_segments: settings.value(keys::CIRCLE_SEGMENTS).max(3) as usize,
                tolerance,
            },
            tolerance,
            clipper: ClippingProcessor::with_tolerance(tolerance),
        })
    }

    pub fn mapper(&self) -> &Mapper<'a> {
        &self.mapper
    }

    /// Map and build one element
    pub fn process(
        &self,
        element: &Element,
        representation: Option<u32>,
    ) -> Result<ElementShape, ElementError> {
        let mapped = self.mapper.map(element, representation)?;
        self.build(element, &mapped)
    }

    /// Build the output geometry of an already mapped element
    pub fn build(
        &self,
        element: &Element,
        mapped: &MappedElement,
    ) -> Result<ElementShape, ElementError> {
        let fail = |kind: ElementErrorKind| ElementError::new(element.id, &element.entity, kind);
        let dimensionality = self.settings.value(keys::DIMENSIONALITY);

        let mut materials = MaterialTable::new();
        let mut shape = self
            .tessellate(element, mapped, dimensionality, &mut materials)
            .map_err(|e| fail(e.into()))?;
        if shape.is_empty() {
            return Err(fail(ElementErrorKind::NoGeometry));
        }

        if !self.settings.value(keys::DISABLE_OPENING_SUBTRACTIONS)
            && shape.has_surfaces()
            && !element.openings.is_empty()
        {
            shape = self.subtract_openings(element, mapped, shape)?;
        }

        if let Some(plan) = &mapped.layers {
            if shape.has_surfaces() {
                shape = self
                    .slice_layers(element, shape, plan, &mut materials)
                    .map_err(|e| fail(e.into()))?;
            }
        }

        if !shape.is_finite() {
            return Err(fail(ElementErrorKind::Geometry(
                ifcgeom_geometry::Error::DegenerateShape("non-finite coordinates".into()),
            )));
        }
        let materials = compact_materials(materials, &mut shape);
        let (transformation, geometry) = self.finish(shape, &mapped.placement).map_err(fail)?;

        let context = mapped
            .representations
            .first()
            .and_then(|id| element.representation(*id))
            .map(|r| r.context.identifier.clone())
            .unwrap_or_default();

        Ok(ElementShape {
            id: element.id,
            guid: element.guid.clone(),
            name: element.name.clone(),
            entity: element.entity.clone(),
            context,
            transformation,
            geometry,
            materials,
        })
    }

    /// Build the geometry of a bare representation item, outside any element.
    ///
    /// Only the item's own style applies and the placement is the identity,
    /// so the result is in item coordinates after unit scaling and the model
    /// transform.
    pub fn build_item(&self, item: &RepresentationItem) -> Result<ItemShape, ElementErrorKind> {
        if !wanted(self.settings.value(keys::DIMENSIONALITY), item) {
            return Err(ElementErrorKind::NoGeometry);
        }

        let mut materials = MaterialTable::new();
        let material = item
            .style
            .as_ref()
            .map(|style| materials.intern(style))
            .unwrap_or(NO_MATERIAL);
        let mut shape = item_to_shape(&item.geometry, material, &self.tessellation)?;
        if shape.is_empty() {
            return Err(ElementErrorKind::NoGeometry);
        }
        if !shape.is_finite() {
            return Err(ElementErrorKind::Geometry(
                ifcgeom_geometry::Error::DegenerateShape("non-finite coordinates".into()),
            ));
        }

        let materials = compact_materials(materials, &mut shape);
        let (transformation, geometry) = self.finish(shape, &Matrix4::identity())?;
        Ok(ItemShape {
            transformation,
            geometry,
            materials,
        })
    }

    /// Scale to meters, apply placement and model transform, then
    /// triangulate or serialize
    fn finish(
        &self,
        mut shape: Shape,
        placement: &Matrix4<f64>,
    ) -> Result<(Matrix4<f64>, Geometry), ElementErrorKind> {
        // Placements and geometry are in model units until here
        let scale = if self.settings.value(keys::CONVERT_BACK_UNITS) {
            1.0
        } else {
            self.model.length_unit_scale
        };
        shape.scale(scale);
        let mut transformation = self.transform.apply(&scale_translation(placement, scale));

        if self.settings.value(keys::USE_WORLD_COORDS) {
            shape.transform(&transformation);
            transformation = Matrix4::identity();
        }

        let geometry = match self.settings.value(keys::ITERATOR_OUTPUT) {
            IteratorOutput::Triangulated => {
                let weld = self.settings.value(keys::WELD_VERTICES);
                Geometry::Triangulated(Mesh::from_shape(&shape, weld, self.tolerance * scale)?)
            }
            IteratorOutput::Serialized => serialize_shape(&shape)
                .map(Geometry::Serialized)
                .map_err(|e| ElementErrorKind::Serialization(e.to_string()))?,
        };
        Ok((transformation, geometry))
    }

    /// Items of the selected representations in local coordinates
    fn tessellate(
        &self,
        element: &Element,
        mapped: &MappedElement,
        dimensionality: Dimensionality,
        materials: &mut MaterialTable,
    ) -> ifcgeom_geometry::Result<Shape> {
        let mut shape = Shape::new();
        let items = mapped
            .representations
            .iter()
            .filter_map(|id| element.representation(*id))
            .flat_map(|r| r.items.iter());

        for item in items.filter(|item| wanted(dimensionality, item)) {

            let material = item
                .style
                .as_ref()
                .or(mapped.style.as_ref())
                .map(|style| materials.intern(style))
                .unwrap_or(NO_MATERIAL);
            shape.merge(item_to_shape(&item.geometry, material, &self.tessellation)?);
        }
        Ok(shape)
    }

    fn subtract_openings(
        &self,
        element: &Element,
        mapped: &MappedElement,
        mut shape: Shape,
    ) -> Result<Shape, ElementError> {
        let fail = |kind: ElementErrorKind| ElementError::new(element.id, &element.entity, kind);
        let host_inverse = mapped.placement.try_inverse().ok_or_else(|| {
            fail(ElementErrorKind::InvalidPlacement(
                "placement is not invertible".into(),
            ))
        })?;

        for opening_ref in &element.openings {
            let Some(opening) = self.model.get(*opening_ref) else {
                continue;
            };

            let opening_shape = match self.opening_in_host_frame(opening, &host_inverse) {
                Ok(Some(s)) => s,
                Ok(None) => {
                    tracing::debug!(
                        element = element.id,
                        opening = opening.id,
                        "Opening has no body geometry"
                    );
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        element = element.id,
                        opening = opening.id,
                        error = %e,
                        "Opening geometry failed, opening skipped"
                    );
                    continue;
                }
            };

            shape = self
                .clipper
                .subtract(&shape, &opening_shape)
                .map_err(|e| fail(e.into()))?;
        }

        Ok(shape)
    }

    /// Opening solids expressed in the host's local frame
    fn opening_in_host_frame(
        &self,
        opening: &Element,
        host_inverse: &Matrix4<f64>,
    ) -> Result<Option<Shape>, ElementError> {
        let mapped = match self.mapper.map(opening, None) {
            Ok(mapped) => mapped,
            Err(e) if e.is_skip() => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut scratch = MaterialTable::new();
        let mut shape = self
            .tessellate(
                opening,
                &mapped,
                Dimensionality::SurfacesAndSolids,
                &mut scratch,
            )
            .map_err(|e| ElementError::new(opening.id, &opening.entity, e))?;
        if !shape.has_surfaces() {
            return Ok(None);
        }

        shape.transform(&(host_inverse * mapped.placement));
        Ok(Some(shape))
    }

    /// Split a shape into one part per material layer.
    ///
    /// The outermost layers extend past the element bounds so that faces
    /// lying on the element boundary are never coplanar with a cut.
    fn slice_layers(
        &self,
        element: &Element,
        shape: Shape,
        plan: &LayerPlan,
        materials: &mut MaterialTable,
    ) -> ifcgeom_geometry::Result<Shape> {
        let Some(bounds) = shape.bounds() else {
            return Ok(shape);
        };
        let axis = plan.axis;
        let margin = (bounds.1 - bounds.0).norm().max(1.0);

        let mut slabs = Vec::with_capacity(plan.layers.len());
        let mut from = plan.offset;
        for (thickness, style) in &plan.layers {
            let to = from + thickness;
            if *thickness > 0.0 {
                slabs.push((from, to, style));
            }
            from = to;
        }

        let last = slabs.len().saturating_sub(1);
        let mut sliced = Shape::new();
        for (i, (from, to, style)) in slabs.into_iter().enumerate() {
            let lo = if i == 0 { from.min(bounds.0[axis]) - margin } else { from };
            let hi = if i == last { to.max(bounds.1[axis]) + margin } else { to };
            let (min, max) = slab(&bounds, axis, lo, hi, margin);

            let material = materials.intern(style);
            let part = self.clipper.intersect_box(&shape, min, max, material, true)?;
            sliced.faces.extend(part.faces);
        }

        if sliced.faces.is_empty() {
            tracing::warn!(
                element = element.id,
                layers = plan.layers.len(),
                "Layer set does not overlap element geometry, slicing skipped"
            );
            return Ok(shape);
        }
        sliced.curves = shape.curves;
        Ok(sliced)
    }
}

/// Whether an item contributes under the requested dimensionality
fn wanted(dimensionality: Dimensionality, item: &RepresentationItem) -> bool {
    if item.geometry.is_curve() {
        dimensionality.includes_curves()
    } else {
        dimensionality.includes_surfaces()
    }
}

/// Drop materials no face references and renumber the rest
fn compact_materials(table: MaterialTable, shape: &mut Shape) -> Vec<OutputMaterial> {
    let all = table.into_vec();
    let mut remap = vec![NO_MATERIAL; all.len()];
    let mut used = Vec::new();

    for face in &mut shape.faces {
        if face.material < 0 {
            continue;
        }
        let old = face.material as usize;
        if remap[old] == NO_MATERIAL {
            remap[old] = used.len() as i32;
            used.push(all[old].clone());
        }
        face.material = remap[old];
    }
    used
}
