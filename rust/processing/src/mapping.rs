// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Element mapping: placement, representation selection and element-level
//! material resolution.
//!
//! Mapping is cheap relative to tessellation and only reads the element and
//! the settings, so it can run either inside each worker or as a
//! single-threaded pre-pass (`no-parallel-mapping`).

use crate::error::{ElementError, ElementErrorKind};
use crate::materials::{default_style, material_style};
use ifcgeom_core::{
    keys, ContextSelector, Element, LayerAxis, MaterialAssociation, ObjectRef, Settings, Style,
};
use ifcgeom_geometry::{placement_matrix, Matrix4};

/// Material layers to slice an element into
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPlan {
    /// Local axis index (0 = X, 1 = Y, 2 = Z)
    pub axis: usize,
    /// Start of the first layer along `axis`
    pub offset: f64,
    /// (thickness, style) per layer
    pub layers: Vec<(f64, Style)>,
}

/// An element resolved against the settings, ready for tessellation
#[derive(Debug, Clone, PartialEq)]
pub struct MappedElement {
    pub id: ObjectRef,
    /// Object placement in model units, without the model transform
    pub placement: Matrix4<f64>,
    /// Representation ids to tessellate, in element order
    pub representations: Vec<u32>,
    /// Style for items that carry none of their own
    pub style: Option<Style>,
    pub layers: Option<LayerPlan>,
}

/// Maps elements using one settings snapshot and context selector
#[derive(Debug, Clone, Copy)]
pub struct Mapper<'a> {
    settings: &'a Settings,
    selector: &'a ContextSelector,
}

impl<'a> Mapper<'a> {
    pub fn new(settings: &'a Settings, selector: &'a ContextSelector) -> Self {
        Self { settings, selector }
    }

    /// Map an element. An explicit `representation` id bypasses context selection.
    pub fn map(
        &self,
        element: &Element,
        representation: Option<u32>,
    ) -> Result<MappedElement, ElementError> {
        let fail = |kind: ElementErrorKind| ElementError::new(element.id, &element.entity, kind);

        let representations: Vec<u32> = match representation {
            Some(id) => {
                element
                    .representation(id)
                    .ok_or_else(|| fail(ElementErrorKind::UnknownRepresentation(id)))?;
                vec![id]
            }
            None => self.selector.select(element).map(|r| r.id).collect(),
        };
        if representations.is_empty() {
            return Err(fail(ElementErrorKind::NoRepresentation));
        }

        let placement = match &element.placement {
            Some(placement) => placement_matrix(placement)
                .map_err(|e| fail(ElementErrorKind::InvalidPlacement(e.to_string())))?,
            None => Matrix4::identity(),
        };

        Ok(MappedElement {
            id: ObjectRef(element.id),
            placement,
            representations,
            style: self.element_style(element),
            layers: self.layer_plan(element),
        })
    }

    /// Element style, then associated material, then the type default
    fn element_style(&self, element: &Element) -> Option<Style> {
        if let Some(style) = &element.style {
            return Some(style.clone());
        }

        let associated = match &element.material {
            Some(MaterialAssociation::Single { material }) => {
                Some(material_style(material, element))
            }
            Some(MaterialAssociation::LayerSet { layers, .. })
                if self.settings.value(keys::LAYERSET_FIRST) =>
            {
                layers.first().map(|l| material_style(&l.material, element))
            }
            _ => None,
        };

        associated.or_else(|| {
            self.settings
                .value(keys::APPLY_DEFAULT_MATERIALS)
                .then(|| default_style(element))
        })
    }

    fn layer_plan(&self, element: &Element) -> Option<LayerPlan> {
        if !self.settings.value(keys::APPLY_LAYERSETS) {
            return None;
        }
        let Some(MaterialAssociation::LayerSet {
            axis,
            offset,
            layers,
        }) = &element.material
        else {
            return None;
        };
        if layers.is_empty() {
            return None;
        }

        Some(LayerPlan {
            axis: match axis {
                LayerAxis::X => 0,
                LayerAxis::Y => 1,
                LayerAxis::Z => 2,
            },
            offset: *offset,
            layers: layers
                .iter()
                .map(|l| (l.thickness, material_style(&l.material, element)))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifcgeom_core::{
        names, ItemGeometry, Material, MaterialLayer, Placement, Representation,
        RepresentationContext,
    };

    fn element(contexts: &[(&str, &str)]) -> Element {
        let representations = contexts
            .iter()
            .enumerate()
            .map(|(i, (identifier, context_type))| Representation {
                id: 100 + i as u32,
                context: RepresentationContext {
                    id: 1 + i as u32,
                    identifier: identifier.to_string(),
                    context_type: context_type.to_string(),
                },
                items: vec![ItemGeometry::Box {
                    min: [0.0; 3],
                    max: [1.0; 3],
                }
                .into()],
            })
            .collect();

        Element {
            id: 1,
            guid: String::new(),
            name: None,
            entity: "IfcWall".to_string(),
            layers: Vec::new(),
            attributes: Default::default(),
            placement: Some(Placement::at([1.0, 2.0, 3.0])),
            representations,
            style: None,
            material: None,
            openings: Vec::new(),
            decomposed_by: Vec::new(),
            contained_elements: Vec::new(),
            filled_by: Vec::new(),
        }
    }

    fn layer(name: &str, thickness: f64) -> MaterialLayer {
        MaterialLayer {
            material: Material {
                name: name.to_string(),
                style: None,
            },
            thickness,
        }
    }

    #[test]
    fn test_default_context_selection() {
        let settings = Settings::new();
        let selector = ContextSelector::default();
        let mapped = Mapper::new(&settings, &selector)
            .map(&element(&[("Body", "Model"), ("Annotation", "Plan")]), None)
            .unwrap();
        assert_eq!(mapped.representations, vec![100]);
        assert_eq!(mapped.placement[(0, 3)], 1.0);
        assert_eq!(mapped.placement[(2, 3)], 3.0);
    }

    #[test]
    fn test_explicit_representation() {
        let settings = Settings::new();
        let selector = ContextSelector::default();
        let mapper = Mapper::new(&settings, &selector);
        let e = element(&[("Body", "Model"), ("Annotation", "Plan")]);

        assert_eq!(mapper.map(&e, Some(101)).unwrap().representations, vec![101]);
        assert_eq!(
            mapper.map(&e, Some(7)).unwrap_err().kind,
            ElementErrorKind::UnknownRepresentation(7)
        );
    }

    #[test]
    fn test_no_representation() {
        let settings = Settings::new();
        let selector = ContextSelector::identifiers(["Axis"]);
        let err = Mapper::new(&settings, &selector)
            .map(&element(&[("Body", "Model")]), None)
            .unwrap_err();
        assert!(err.is_skip());
    }

    #[test]
    fn test_style_resolution_order() {
        let selector = ContextSelector::default();
        let mut e = element(&[("Body", "Model")]);

        let settings = Settings::new();
        let mapped = Mapper::new(&settings, &selector).map(&e, None).unwrap();
        assert_eq!(mapped.style.unwrap().name, "IfcWall");

        let settings = Settings::new()
            .with(names::APPLY_DEFAULT_MATERIALS, false)
            .unwrap();
        assert_eq!(Mapper::new(&settings, &selector).map(&e, None).unwrap().style, None);

        e.material = Some(MaterialAssociation::Single {
            material: Material {
                name: "Concrete".to_string(),
                style: None,
            },
        });
        let mapped = Mapper::new(&settings, &selector).map(&e, None).unwrap();
        assert_eq!(mapped.style.unwrap().name, "Concrete");

        e.style = Some(Style {
            name: "Red".to_string(),
            color: [1.0, 0.0, 0.0],
            transparency: 0.0,
        });
        let mapped = Mapper::new(&settings, &selector).map(&e, None).unwrap();
        assert_eq!(mapped.style.unwrap().name, "Red");
    }

    #[test]
    fn test_layer_sets() {
        let selector = ContextSelector::default();
        let mut e = element(&[("Body", "Model")]);
        e.material = Some(MaterialAssociation::LayerSet {
            axis: LayerAxis::Y,
            offset: 0.0,
            layers: vec![layer("Plaster", 0.02), layer("Brick", 0.2)],
        });

        let settings = Settings::new()
            .with(names::APPLY_DEFAULT_MATERIALS, false)
            .unwrap();
        let mapped = Mapper::new(&settings, &selector).map(&e, None).unwrap();
        assert_eq!(mapped.style, None);
        assert_eq!(mapped.layers, None);

        let settings = settings.with(names::LAYERSET_FIRST, true).unwrap();
        let mapped = Mapper::new(&settings, &selector).map(&e, None).unwrap();
        assert_eq!(mapped.style.unwrap().name, "Plaster");

        let settings = settings.with(names::APPLY_LAYERSETS, true).unwrap();
        let plan = Mapper::new(&settings, &selector)
            .map(&e, None)
            .unwrap()
            .layers
            .unwrap();
        assert_eq!(plan.axis, 1);
        assert_eq!(plan.layers.len(), 2);
        assert_eq!(plan.layers[1].1.name, "Brick");
    }
}
