// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output materials and per-type defaults

use ifcgeom_core::{Element, IfcType, Material, Style};
use serde::Serialize;

/// A material referenced by index from emitted faces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputMaterial {
    pub name: String,
    /// RGBA, alpha = 1 - transparency
    pub color: [f32; 4],
}

impl OutputMaterial {
    pub fn from_style(style: &Style) -> Self {
        let [r, g, b] = style.color;
        Self {
            name: style.name.clone(),
            color: [r, g, b, (1.0 - style.transparency).clamp(0.0, 1.0)],
        }
    }
}

/// Materials of one element, indexed in first-use order
#[derive(Debug, Clone, Default)]
pub struct MaterialTable {
    materials: Vec<OutputMaterial>,
}

impl MaterialTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `style`, adding it when first seen
    pub fn intern(&mut self, style: &Style) -> i32 {
        let material = OutputMaterial::from_style(style);
        match self.materials.iter().position(|m| *m == material) {
            Some(i) => i as i32,
            None => {
                self.materials.push(material);
                (self.materials.len() - 1) as i32
            }
        }
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn into_vec(self) -> Vec<OutputMaterial> {
        self.materials
    }
}

/// Get default color based on IFC type.
pub fn default_color(ifc_type: Option<IfcType>) -> [f32; 4] {
    let Some(ifc_type) = ifc_type else {
        return [0.8, 0.8, 0.8, 1.0];
    };

    match ifc_type {
        // Walls - light gray
        IfcType::IfcWall | IfcType::IfcWallStandardCase => [0.85, 0.85, 0.85, 1.0],

        // Slabs - darker gray
        IfcType::IfcSlab => [0.7, 0.7, 0.7, 1.0],

        // Roofs - brown-ish
        IfcType::IfcRoof => [0.6, 0.5, 0.4, 1.0],

        // Columns/Beams - steel gray
        IfcType::IfcColumn | IfcType::IfcBeam | IfcType::IfcMember => [0.6, 0.65, 0.7, 1.0],

        // Windows - light blue transparent
        IfcType::IfcWindow => [0.6, 0.8, 1.0, 0.4],

        // Doors - wood brown
        IfcType::IfcDoor => [0.6, 0.45, 0.3, 1.0],

        IfcType::IfcStair | IfcType::IfcStairFlight => [0.75, 0.75, 0.75, 1.0],

        IfcType::IfcRailing => [0.4, 0.4, 0.45, 1.0],

        IfcType::IfcPlate | IfcType::IfcCovering => [0.8, 0.8, 0.8, 1.0],

        IfcType::IfcFurnishingElement | IfcType::IfcFurniture => [0.5, 0.35, 0.2, 1.0],

        // Space - cyan transparent
        IfcType::IfcSpace => [0.2, 0.85, 1.0, 0.3],

        // Opening elements - red-orange transparent
        IfcType::IfcOpeningElement => [1.0, 0.42, 0.29, 0.4],

        IfcType::IfcSite => [0.4, 0.8, 0.3, 1.0],

        IfcType::IfcBuildingElementProxy => [0.6, 0.6, 0.6, 1.0],

        _ => [0.8, 0.8, 0.8, 1.0],
    }
}

fn style_from_rgba(name: String, [r, g, b, a]: [f32; 4]) -> Style {
    Style {
        name,
        color: [r, g, b],
        transparency: 1.0 - a,
    }
}

/// Material derived from the element's entity type
pub fn default_style(element: &Element) -> Style {
    let ifc_type = element.ifc_type();
    let name = ifc_type
        .map(|t| t.name().to_string())
        .unwrap_or_else(|| element.entity.clone());
    style_from_rgba(name, default_color(ifc_type))
}

/// Surface style of an associated material; unstyled materials keep their
/// name and take the entity type's colour
pub fn material_style(material: &Material, element: &Element) -> Style {
    match &material.style {
        Some(style) => style.clone(),
        None => style_from_rgba(material.name.clone(), default_color(element.ifc_type())),
    }
}
