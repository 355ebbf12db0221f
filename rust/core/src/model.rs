// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory element model
//!
//! A decoded building model reduced to what geometry iteration needs:
//! element identity and classification, placements, representations grouped
//! by context, styles, material associations and the relationships used by
//! opening subtraction and deep filters.

use crate::error::ModelError;
use crate::schema::{self, IfcType};
use crate::value::ObjectRef;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

fn default_schema() -> String {
    "IFC4".to_string()
}

fn default_unit_scale() -> f64 {
    1.0
}

fn default_precision() -> f64 {
    1e-5
}

/// A building model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Length unit expressed in metres (0.001 for millimetre models)
    #[serde(default = "default_unit_scale")]
    pub length_unit_scale: f64,
    /// Geometric precision declared by the model, in model units
    #[serde(default = "default_precision")]
    pub precision: f64,
    pub elements: Vec<Element>,
    #[serde(skip)]
    index: FxHashMap<u32, usize>,
}

impl Model {
    /// Build a model from elements, indexing and validating relationships
    pub fn new(elements: Vec<Element>) -> Result<Self, ModelError> {
        Self {
            schema: default_schema(),
            length_unit_scale: default_unit_scale(),
            precision: default_precision(),
            elements,
            index: FxHashMap::default(),
        }
        .indexed()
    }

    pub fn from_json_str(content: &str) -> Result<Self, ModelError> {
        let model: Model = serde_json::from_str(content)?;
        model.indexed()
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    fn indexed(mut self) -> Result<Self, ModelError> {
        self.index.clear();
        self.index.reserve(self.elements.len());
        for (i, element) in self.elements.iter().enumerate() {
            if self.index.insert(element.id, i).is_some() {
                return Err(ModelError::DuplicateElement(element.id));
            }
        }

        for element in &self.elements {
            for (relation, targets) in element.relations() {
                if let Some(missing) = targets.iter().find(|t| !self.index.contains_key(&t.0)) {
                    return Err(ModelError::DanglingReference {
                        element: element.id,
                        target: missing.0,
                        relation,
                    });
                }
            }
        }

        tracing::debug!(
            elements = self.elements.len(),
            schema = %self.schema,
            "Model indexed"
        );
        Ok(self)
    }

    pub fn get(&self, id: ObjectRef) -> Option<&Element> {
        self.index.get(&id.0).map(|&i| &self.elements[i])
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements whose type is `entity` or one of its subtypes
    pub fn by_type<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements.iter().filter(move |e| e.is_a(entity))
    }

    /// Host element voided by the given opening, if any
    pub fn voided_host(&self, opening: ObjectRef) -> Option<&Element> {
        self.elements.iter().find(|e| e.openings.contains(&opening))
    }
}

/// A product with geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub id: u32,
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub name: Option<String>,
    /// IFC entity type name (e.g. `IfcWall`)
    pub entity: String,
    /// Presentation layer names
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub placement: Option<Placement>,
    #[serde(default)]
    pub representations: Vec<Representation>,
    /// Style assigned to the whole element
    #[serde(default)]
    pub style: Option<Style>,
    #[serde(default)]
    pub material: Option<MaterialAssociation>,
    /// HasOpenings: opening elements voiding this element
    #[serde(default)]
    pub openings: Vec<ObjectRef>,
    /// IsDecomposedBy: aggregated parts
    #[serde(default)]
    pub decomposed_by: Vec<ObjectRef>,
    /// ContainsElements: elements contained in this spatial structure
    #[serde(default)]
    pub contained_elements: Vec<ObjectRef>,
    /// HasFillings: doors/windows filling this opening
    #[serde(default)]
    pub filled_by: Vec<ObjectRef>,
}

impl Element {
    pub fn ifc_type(&self) -> Option<IfcType> {
        IfcType::from_name(&self.entity)
    }

    pub fn is_a(&self, entity: &str) -> bool {
        schema::is_a(&self.entity, entity)
    }

    /// Attribute value; `GlobalId` and `Name` resolve to the element identity fields
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match name {
            "GlobalId" if !self.guid.is_empty() => Some(&self.guid),
            "Name" if self.name.is_some() => self.name.as_deref(),
            _ => self.attributes.get(name).map(String::as_str),
        }
    }

    /// Outgoing relationships as (relation name, targets)
    pub fn relations(&self) -> [(&'static str, &[ObjectRef]); 4] {
        [
            ("HasOpenings", self.openings.as_slice()),
            ("IsDecomposedBy", self.decomposed_by.as_slice()),
            ("ContainsElements", self.contained_elements.as_slice()),
            ("HasFillings", self.filled_by.as_slice()),
        ]
    }

    pub fn representation(&self, id: u32) -> Option<&Representation> {
        self.representations.iter().find(|r| r.id == id)
    }
}

/// Local placement: an axis placement optionally relative to a parent placement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    #[serde(default)]
    pub location: [f64; 3],
    /// Local Z axis, defaults to (0, 0, 1)
    #[serde(default)]
    pub axis: Option<[f64; 3]>,
    /// Local X axis, defaults to (1, 0, 0)
    #[serde(default)]
    pub ref_direction: Option<[f64; 3]>,
    #[serde(default)]
    pub relative_to: Option<Box<Placement>>,
}

impl Placement {
    pub fn at(location: [f64; 3]) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }
}

/// Geometric representation context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepresentationContext {
    pub id: u32,
    /// e.g. `Body`, `Axis`, `FootPrint`
    #[serde(default)]
    pub identifier: String,
    /// e.g. `Model`, `Plan`
    #[serde(rename = "type", default)]
    pub context_type: String,
}

/// A shape representation of an element in one context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Representation {
    pub id: u32,
    pub context: RepresentationContext,
    #[serde(default)]
    pub items: Vec<RepresentationItem>,
}

/// One geometric item of a representation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepresentationItem {
    #[serde(flatten)]
    pub geometry: ItemGeometry,
    /// Style assigned directly to the item
    #[serde(default)]
    pub style: Option<Style>,
}

impl From<ItemGeometry> for RepresentationItem {
    fn from(geometry: ItemGeometry) -> Self {
        Self {
            geometry,
            style: None,
        }
    }
}

/// Geometry of a representation item, in the element's local coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemGeometry {
    /// Axis-aligned block
    Box { min: [f64; 3], max: [f64; 3] },
    /// Polygonal boundary representation; faces index into `vertices`
    Mesh {
        vertices: Vec<[f64; 3]>,
        faces: Vec<Vec<u32>>,
    },
    /// Closed profile in the XY plane extruded along +Z
    Extrusion {
        profile: Vec<[f64; 2]>,
        depth: f64,
        #[serde(default)]
        position: Option<Placement>,
    },
    /// Circular profile extruded along +Z
    CircleExtrusion {
        radius: f64,
        depth: f64,
        #[serde(default)]
        position: Option<Placement>,
    },
    /// Open or closed 3D polyline
    Polyline { points: Vec<[f64; 3]> },
    /// Full circle in the XY plane
    Circle {
        radius: f64,
        #[serde(default)]
        center: [f64; 3],
    },
}

impl ItemGeometry {
    /// Curves as opposed to surfaces and solids
    pub fn is_curve(&self) -> bool {
        matches!(self, Self::Polyline { .. } | Self::Circle { .. })
    }
}

/// Surface style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,
    /// Diffuse colour, RGB in 0-1 range
    pub color: [f32; 3],
    #[serde(default)]
    pub transparency: f32,
}

/// Material with an optional surface style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub style: Option<Style>,
}

/// One layer of a material layer set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLayer {
    pub material: Material,
    pub thickness: f64,
}

/// Local axis along which material layers are stacked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerAxis {
    #[serde(alias = "AXIS1")]
    X,
    #[default]
    #[serde(alias = "AXIS2")]
    Y,
    #[serde(alias = "AXIS3")]
    Z,
}

/// Material associated with an element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialAssociation {
    Single {
        material: Material,
    },
    LayerSet {
        #[serde(default)]
        axis: LayerAxis,
        /// Start of the first layer along `axis`
        #[serde(default)]
        offset: f64,
        layers: Vec<MaterialLayer>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALL_JSON: &str = r#"{
        "schema": "IFC4",
        "length_unit_scale": 0.001,
        "elements": [
            {
                "id": 10,
                "guid": "2O2Fr$t4X7Zf8NOew3FLOH",
                "name": "Wall 01",
                "entity": "IfcWallStandardCase",
                "layers": ["A-WALL"],
                "attributes": {"Tag": "W1"},
                "representations": [{
                    "id": 100,
                    "context": {"id": 1, "identifier": "Body", "type": "Model"},
                    "items": [{"kind": "box", "min": [0, 0, 0], "max": [4000, 200, 3000]}]
                }],
                "openings": [11]
            },
            {
                "id": 11,
                "entity": "IfcOpeningElement",
                "representations": [{
                    "id": 101,
                    "context": {"id": 1, "identifier": "Body", "type": "Model"},
                    "items": [{"kind": "box", "min": [1000, -10, 0], "max": [2000, 210, 2100],
                               "style": {"name": "red", "color": [1, 0, 0]}}]
                }]
            }
        ]
    }"#;

    #[test]
    fn test_parse_model() {
        let model = Model::from_json_str(WALL_JSON).unwrap();
        assert_eq!(model.len(), 2);
        assert_eq!(model.length_unit_scale, 0.001);
        assert_eq!(model.precision, 1e-5);

        let wall = model.get(ObjectRef(10)).unwrap();
        assert_eq!(wall.ifc_type(), Some(IfcType::IfcWallStandardCase));
        assert!(wall.is_a("IfcWall"));
        assert_eq!(wall.attribute("Tag"), Some("W1"));
        assert_eq!(wall.attribute("Name"), Some("Wall 01"));
        assert_eq!(wall.representations[0].context.context_type, "Model");
        assert!(matches!(
            wall.representations[0].items[0].geometry,
            ItemGeometry::Box { .. }
        ));

        let opening = model.get(ObjectRef(11)).unwrap();
        assert!(opening.representations[0].items[0].style.is_some());
        assert_eq!(model.voided_host(ObjectRef(11)).map(|e| e.id), Some(10));
        assert_eq!(model.by_type("IfcWall").count(), 1);
    }

    #[test]
    fn test_dangling_reference_rejected() {
        let element = Element {
            id: 1,
            guid: String::new(),
            name: None,
            entity: "IfcWall".into(),
            layers: Vec::new(),
            attributes: BTreeMap::new(),
            placement: None,
            representations: Vec::new(),
            style: None,
            material: None,
            openings: vec![ObjectRef(99)],
            decomposed_by: Vec::new(),
            contained_elements: Vec::new(),
            filled_by: Vec::new(),
        };
        let err = Model::new(vec![element]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::DanglingReference { element: 1, target: 99, relation: "HasOpenings" }
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{"elements": [
            {"id": 1, "entity": "IfcWall"},
            {"id": 1, "entity": "IfcSlab"}
        ]}"#;
        assert!(matches!(
            Model::from_json_str(json),
            Err(ModelError::DuplicateElement(1))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Model::from_json_str("{\"elements\": 3}"),
            Err(ModelError::Json(_))
        ));
    }

    #[test]
    fn test_layer_set_association() {
        let json = r#"{"kind": "layer_set", "axis": "AXIS2", "layers": [
            {"material": {"name": "Brick"}, "thickness": 0.1},
            {"material": {"name": "Insulation"}, "thickness": 0.05}
        ]}"#;
        let assoc: MaterialAssociation = serde_json::from_str(json).unwrap();
        match assoc {
            MaterialAssociation::LayerSet { axis, layers, offset } => {
                assert_eq!(axis, LayerAxis::Y);
                assert_eq!(offset, 0.0);
                assert_eq!(layers.len(), 2);
            }
            _ => panic!("expected a layer set"),
        }
    }
}
