// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Schema Types
//!
//! Fast type checking using an enum instead of string comparison, with the
//! supertype chain needed for `is_a` style entity filters.

use smallvec::SmallVec;
use std::fmt;

/// IFC entity types known to the iterator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IfcType {
    // Abstract supertypes
    IfcProduct,
    IfcElement,
    IfcBuildingElement,
    IfcFeatureElement,
    IfcFeatureElementSubtraction,
    IfcSpatialElement,
    IfcSpatialStructureElement,
    IfcDistributionElement,
    IfcFlowSegment,

    // Structural Elements
    IfcWall,
    IfcWallStandardCase,
    IfcSlab,
    IfcBeam,
    IfcColumn,
    IfcRoof,
    IfcStair,
    IfcStairFlight,
    IfcRailing,
    IfcCurtainWall,
    IfcPlate,
    IfcMember,
    IfcCovering,
    IfcBuildingElementProxy,

    // Openings
    IfcDoor,
    IfcWindow,
    IfcOpeningElement,

    // Spaces
    IfcSpace,
    IfcBuildingStorey,
    IfcBuilding,
    IfcSite,

    // MEP
    IfcPipeSegment,
    IfcDuctSegment,
    IfcCableSegment,

    // Furniture
    IfcFurnishingElement,
    IfcFurniture,

    // Annotations
    IfcAnnotation,
    IfcGrid,
}

impl IfcType {
    /// Parse an IFC type name, case-insensitively (`IfcWall`, `IFCWALL`)
    pub fn from_name(s: &str) -> Option<Self> {
        let t = match s.to_ascii_uppercase().as_str() {
            "IFCPRODUCT" => Self::IfcProduct,
            "IFCELEMENT" => Self::IfcElement,
            "IFCBUILDINGELEMENT" => Self::IfcBuildingElement,
            "IFCFEATUREELEMENT" => Self::IfcFeatureElement,
            "IFCFEATUREELEMENTSUBTRACTION" => Self::IfcFeatureElementSubtraction,
            "IFCSPATIALELEMENT" => Self::IfcSpatialElement,
            "IFCSPATIALSTRUCTUREELEMENT" => Self::IfcSpatialStructureElement,
            "IFCDISTRIBUTIONELEMENT" => Self::IfcDistributionElement,
            "IFCFLOWSEGMENT" => Self::IfcFlowSegment,

            "IFCWALL" => Self::IfcWall,
            "IFCWALLSTANDARDCASE" => Self::IfcWallStandardCase,
            "IFCSLAB" => Self::IfcSlab,
            "IFCBEAM" => Self::IfcBeam,
            "IFCCOLUMN" => Self::IfcColumn,
            "IFCROOF" => Self::IfcRoof,
            "IFCSTAIR" => Self::IfcStair,
            "IFCSTAIRFLIGHT" => Self::IfcStairFlight,
            "IFCRAILING" => Self::IfcRailing,
            "IFCCURTAINWALL" => Self::IfcCurtainWall,
            "IFCPLATE" => Self::IfcPlate,
            "IFCMEMBER" => Self::IfcMember,
            "IFCCOVERING" => Self::IfcCovering,
            "IFCBUILDINGELEMENTPROXY" => Self::IfcBuildingElementProxy,

            "IFCDOOR" => Self::IfcDoor,
            "IFCWINDOW" => Self::IfcWindow,
            "IFCOPENINGELEMENT" => Self::IfcOpeningElement,

            "IFCSPACE" => Self::IfcSpace,
            "IFCBUILDINGSTOREY" => Self::IfcBuildingStorey,
            "IFCBUILDING" => Self::IfcBuilding,
            "IFCSITE" => Self::IfcSite,

            "IFCPIPESEGMENT" => Self::IfcPipeSegment,
            "IFCDUCTSEGMENT" => Self::IfcDuctSegment,
            "IFCCABLESEGMENT" => Self::IfcCableSegment,

            "IFCFURNISHINGELEMENT" => Self::IfcFurnishingElement,
            "IFCFURNITURE" => Self::IfcFurniture,

            "IFCANNOTATION" => Self::IfcAnnotation,
            "IFCGRID" => Self::IfcGrid,

            _ => return None,
        };
        Some(t)
    }

    /// Canonical mixed-case name
    pub fn name(&self) -> &'static str {
        match self {
            Self::IfcProduct => "IfcProduct",
            Self::IfcElement => "IfcElement",
            Self::IfcBuildingElement => "IfcBuildingElement",
            Self::IfcFeatureElement => "IfcFeatureElement",
            Self::IfcFeatureElementSubtraction => "IfcFeatureElementSubtraction",
            Self::IfcSpatialElement => "IfcSpatialElement",
            Self::IfcSpatialStructureElement => "IfcSpatialStructureElement",
            Self::IfcDistributionElement => "IfcDistributionElement",
            Self::IfcFlowSegment => "IfcFlowSegment",
            Self::IfcWall => "IfcWall",
            Self::IfcWallStandardCase => "IfcWallStandardCase",
            Self::IfcSlab => "IfcSlab",
            Self::IfcBeam => "IfcBeam",
            Self::IfcColumn => "IfcColumn",
            Self::IfcRoof => "IfcRoof",
            Self::IfcStair => "IfcStair",
            Self::IfcStairFlight => "IfcStairFlight",
            Self::IfcRailing => "IfcRailing",
            Self::IfcCurtainWall => "IfcCurtainWall",
            Self::IfcPlate => "IfcPlate",
            Self::IfcMember => "IfcMember",
            Self::IfcCovering => "IfcCovering",
            Self::IfcBuildingElementProxy => "IfcBuildingElementProxy",
            Self::IfcDoor => "IfcDoor",
            Self::IfcWindow => "IfcWindow",
            Self::IfcOpeningElement => "IfcOpeningElement",
            Self::IfcSpace => "IfcSpace",
            Self::IfcBuildingStorey => "IfcBuildingStorey",
            Self::IfcBuilding => "IfcBuilding",
            Self::IfcSite => "IfcSite",
            Self::IfcPipeSegment => "IfcPipeSegment",
            Self::IfcDuctSegment => "IfcDuctSegment",
            Self::IfcCableSegment => "IfcCableSegment",
            Self::IfcFurnishingElement => "IfcFurnishingElement",
            Self::IfcFurniture => "IfcFurniture",
            Self::IfcAnnotation => "IfcAnnotation",
            Self::IfcGrid => "IfcGrid",
        }
    }

    /// Direct supertype
    pub fn parent(&self) -> Option<Self> {
        use IfcType::*;
        match self {
            IfcProduct => None,
            IfcElement | IfcSpatialElement | IfcAnnotation | IfcGrid => Some(IfcProduct),
            IfcBuildingElement | IfcFeatureElement | IfcDistributionElement
            | IfcFurnishingElement => Some(IfcElement),
            IfcFeatureElementSubtraction => Some(IfcFeatureElement),
            IfcOpeningElement => Some(IfcFeatureElementSubtraction),
            IfcSpatialStructureElement => Some(IfcSpatialElement),
            IfcSpace | IfcBuildingStorey | IfcBuilding | IfcSite => {
                Some(IfcSpatialStructureElement)
            }
            IfcFlowSegment => Some(IfcDistributionElement),
            IfcPipeSegment | IfcDuctSegment | IfcCableSegment => Some(IfcFlowSegment),
            IfcFurniture => Some(IfcFurnishingElement),
            IfcWallStandardCase => Some(IfcWall),
            IfcWall | IfcSlab | IfcBeam | IfcColumn | IfcRoof | IfcStair | IfcStairFlight
            | IfcRailing | IfcCurtainWall | IfcPlate | IfcMember | IfcCovering
            | IfcBuildingElementProxy | IfcDoor | IfcWindow => Some(IfcBuildingElement),
        }
    }

    /// This type followed by all of its supertypes
    pub fn ancestry(&self) -> SmallVec<[IfcType; 6]> {
        let mut chain = SmallVec::new();
        let mut current = Some(*self);
        while let Some(t) = current {
            chain.push(t);
            current = t.parent();
        }
        chain
    }

    /// Check if this type is `other` or one of its subtypes
    pub fn is_subtype_of(&self, other: IfcType) -> bool {
        self.ancestry().contains(&other)
    }

    /// Check if this is a spatial structure element
    pub fn is_spatial(&self) -> bool {
        self.is_subtype_of(Self::IfcSpatialElement)
    }

    /// Check if this is a building element
    pub fn is_building_element(&self) -> bool {
        self.is_subtype_of(Self::IfcBuildingElement)
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `is_a` check on entity type names.
///
/// Names unknown to the schema table only match themselves.
pub fn is_a(entity: &str, query: &str) -> bool {
    if entity.eq_ignore_ascii_case(query) {
        return true;
    }
    match (IfcType::from_name(entity), IfcType::from_name(query)) {
        (Some(e), Some(q)) => e.is_subtype_of(q),
        _ => false,
    }
}
