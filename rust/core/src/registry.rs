// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Option registry
//!
//! Static tables mapping option names to their kind, default value and scope.
//! Registries are built once per process and are read-only afterwards; there is
//! no runtime registration.

use crate::error::{ConfigError, Result};
use crate::value::{Dimensionality, IteratorOutput, ObjectRef, OptionKind, OptionValue};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Where an option may be set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Set per iterator run or shape request, never on shared settings
    Instance,
    /// Settable on a settings object and reused across runs
    Shared,
}

/// Named default profiles.
///
/// The embedding API and the command-line front end document different
/// defaults for some options (`weld-vertices`); both are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    #[default]
    Embedded,
    CommandLine,
}

/// Option names of the geometry registry
pub mod names {
    pub const WELD_VERTICES: &str = "weld-vertices";
    pub const USE_WORLD_COORDS: &str = "use-world-coords";
    pub const CONVERT_BACK_UNITS: &str = "convert-back-units";
    pub const ITERATOR_OUTPUT: &str = "iterator-output";
    pub const DISABLE_OPENING_SUBTRACTIONS: &str = "disable-opening-subtractions";
    pub const APPLY_DEFAULT_MATERIALS: &str = "apply-default-materials";
    pub const DIMENSIONALITY: &str = "dimensionality";
    pub const LAYERSET_FIRST: &str = "layerset-first";
    pub const APPLY_LAYERSETS: &str = "apply-layersets";
    pub const MODEL_OFFSET: &str = "model-offset";
    pub const MODEL_ROTATION: &str = "model-rotation";
    pub const PRECISION: &str = "precision";
    pub const PRECISION_FACTOR: &str = "precision-factor";
    pub const CONTEXT_IDENTIFIERS: &str = "context-identifiers";
    pub const CONTEXT_IDS: &str = "context-ids";
    pub const CONTEXT_TYPES: &str = "context-types";
    pub const NO_PARALLEL_MAPPING: &str = "no-parallel-mapping";
    pub const CIRCLE_SEGMENTS: &str = "circle-segments";
    pub const NUM_THREADS: &str = "num-threads";
    pub const INCLUDE: &str = "include";
    pub const EXCLUDE: &str = "exclude";

    pub const USE_ELEMENT_NAMES: &str = "use-element-names";
    pub const USE_ELEMENT_GUIDS: &str = "use-element-guids";
    pub const USE_ELEMENT_STEP_IDS: &str = "use-element-step-ids";
    pub const USE_MATERIAL_NAMES: &str = "use-material-names";
    pub const UNIT_NAME: &str = "unit-name";
    pub const UNIT_MAGNITUDE: &str = "unit-magnitude";
}

/// Definition of a single option
#[derive(Debug, Clone)]
pub struct OptionDef {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: OptionValue,
    /// Default under the command-line profile, when it differs
    pub cli_default: Option<OptionValue>,
    pub scope: Scope,
    pub description: &'static str,
    /// Allowed variants for `Enum` options
    pub variants: &'static [(&'static str, i64)],
    /// Required element count for `DoubleArray` options
    pub arity: Option<usize>,
    /// Inclusive lower bound for numeric options
    pub minimum: Option<f64>,
}

impl OptionDef {
    fn shared(name: &'static str, default: OptionValue, description: &'static str) -> Self {
        Self {
            name,
            kind: default.kind(),
            default,
            cli_default: None,
            scope: Scope::Shared,
            description,
            variants: &[],
            arity: None,
            minimum: None,
        }
    }

    fn instance(name: &'static str, default: OptionValue, description: &'static str) -> Self {
        Self {
            scope: Scope::Instance,
            ..Self::shared(name, default, description)
        }
    }

    fn with_variants(mut self, variants: &'static [(&'static str, i64)]) -> Self {
        self.variants = variants;
        self
    }

    fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    fn with_cli_default(mut self, value: OptionValue) -> Self {
        self.cli_default = Some(value);
        self
    }

    /// Default value under the given profile
    pub fn default_for(&self, profile: Profile) -> &OptionValue {
        match (profile, &self.cli_default) {
            (Profile::CommandLine, Some(value)) => value,
            _ => &self.default,
        }
    }

    /// Name of an enum variant
    pub fn variant_name(&self, value: i64) -> Option<&'static str> {
        self.variants
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| *name)
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            name: self.name.to_string(),
            reason: reason.into(),
        }
    }

    /// Check that `value` has this option's kind and satisfies its constraints
    pub fn validate(&self, value: &OptionValue) -> Result<()> {
        if value.kind() != self.kind {
            return Err(ConfigError::TypeMismatch {
                name: self.name.to_string(),
                expected: self.kind,
                found: value.kind(),
            });
        }

        match value {
            OptionValue::Enum(v) if self.variant_name(*v).is_none() => {
                Err(self.invalid(format!("{} is not a valid variant", v)))
            }
            OptionValue::DoubleArray(values) => {
                if let Some(arity) = self.arity {
                    if values.len() != arity {
                        return Err(self.invalid(format!(
                            "expected {} components, got {}",
                            arity,
                            values.len()
                        )));
                    }
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(self.invalid("components must be finite"));
                }
                Ok(())
            }
            OptionValue::Int(v) => self.check_minimum(*v as f64),
            OptionValue::Double(v) => {
                if !v.is_finite() {
                    return Err(self.invalid("value must be finite"));
                }
                self.check_minimum(*v)
            }
            _ => Ok(()),
        }
    }

    fn check_minimum(&self, v: f64) -> Result<()> {
        match self.minimum {
            Some(min) if v < min => Err(self.invalid(format!("must be at least {}", min))),
            _ => Ok(()),
        }
    }

    /// Parse a textual value (flag argument, environment variable) for this option
    pub fn parse(&self, text: &str) -> Result<OptionValue> {
        let parse_err = || ConfigError::Parse {
            name: self.name.to_string(),
            kind: self.kind,
            text: text.to_string(),
        };
        let trimmed = text.trim();
        let items = || {
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let value = match self.kind {
            OptionKind::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => OptionValue::Bool(true),
                "false" | "0" | "no" | "off" => OptionValue::Bool(false),
                _ => return Err(parse_err()),
            },
            OptionKind::Int => OptionValue::Int(trimmed.parse().map_err(|_| parse_err())?),
            OptionKind::Double => OptionValue::Double(trimmed.parse().map_err(|_| parse_err())?),
            OptionKind::String => OptionValue::String(trimmed.to_string()),
            OptionKind::StringList => OptionValue::StringList(items().map(str::to_string).collect()),
            OptionKind::IntList => OptionValue::IntList(
                items()
                    .map(|s| s.parse().map_err(|_| parse_err()))
                    .collect::<Result<_>>()?,
            ),
            OptionKind::ObjectRefList => OptionValue::ObjectRefList(
                items()
                    .map(|s| {
                        s.trim_start_matches('#')
                            .parse()
                            .map(ObjectRef)
                            .map_err(|_| parse_err())
                    })
                    .collect::<Result<_>>()?,
            ),
            OptionKind::DoubleArray => OptionValue::DoubleArray(
                items()
                    .map(|s| s.parse().map_err(|_| parse_err()))
                    .collect::<Result<_>>()?,
            ),
            OptionKind::Enum => {
                let normalized = trimmed.replace('-', "_");
                match self
                    .variants
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(&normalized))
                {
                    Some((_, v)) => OptionValue::Enum(*v),
                    None => OptionValue::Enum(trimmed.parse().map_err(|_| parse_err())?),
                }
            }
        };

        self.validate(&value)?;
        Ok(value)
    }
}

/// Process-wide, read-only option table
#[derive(Debug)]
pub struct Registry {
    defs: Vec<OptionDef>,
    index: FxHashMap<&'static str, usize>,
}

const DIMENSIONALITY_VARIANTS: &[(&str, i64)] = &[
    ("CURVES", Dimensionality::Curves as i64),
    ("SURFACES_AND_SOLIDS", Dimensionality::SurfacesAndSolids as i64),
    ("CURVES_SURFACES_AND_SOLIDS", Dimensionality::CurvesSurfacesAndSolids as i64),
];

const ITERATOR_OUTPUT_VARIANTS: &[(&str, i64)] = &[
    ("SERIALIZED", IteratorOutput::Serialized as i64),
    ("TRIANGULATED", IteratorOutput::Triangulated as i64),
];

impl Registry {
    fn from_defs(defs: Vec<OptionDef>) -> Self {
        let mut index = FxHashMap::default();
        for (i, def) in defs.iter().enumerate() {
            let previous = index.insert(def.name, i);
            debug_assert!(previous.is_none(), "duplicate option {}", def.name);
        }
        Self { defs, index }
    }

    /// Options consumed by the geometry iterator and single-shape requests
    pub fn geometry() -> &'static Registry {
        static GEOMETRY: OnceLock<Registry> = OnceLock::new();
        GEOMETRY.get_or_init(|| Registry::from_defs(geometry_defs()))
    }

    /// Options consumed by output serializers
    pub fn serializer() -> &'static Registry {
        static SERIALIZER: OnceLock<Registry> = OnceLock::new();
        SERIALIZER.get_or_init(|| Registry::from_defs(serializer_defs()))
    }

    /// Look up an option definition by name
    pub fn lookup(&self, name: &str) -> Result<&OptionDef> {
        self.index
            .get(name)
            .map(|&i| &self.defs[i])
            .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn all_names(&self) -> BTreeSet<&'static str> {
        self.defs.iter().map(|d| d.name).collect()
    }

    /// Definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &OptionDef> {
        self.defs.iter()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

fn geometry_defs() -> Vec<OptionDef> {
    use names::*;

    vec![
        OptionDef::shared(
            WELD_VERTICES,
            OptionValue::Bool(true),
            "Merge vertices sharing a position and drop per-face normals",
        )
        .with_cli_default(OptionValue::Bool(false)),
        OptionDef::shared(
            USE_WORLD_COORDS,
            OptionValue::Bool(false),
            "Apply the element placement to vertices instead of returning it as a matrix",
        ),
        OptionDef::shared(
            CONVERT_BACK_UNITS,
            OptionValue::Bool(false),
            "Emit coordinates in model length units instead of metres",
        ),
        OptionDef::shared(
            ITERATOR_OUTPUT,
            IteratorOutput::Triangulated.into(),
            "Triangulated mesh or serialized boundary representation",
        )
        .with_variants(ITERATOR_OUTPUT_VARIANTS),
        OptionDef::shared(
            DISABLE_OPENING_SUBTRACTIONS,
            OptionValue::Bool(false),
            "Skip subtracting opening geometry from host elements",
        ),
        OptionDef::shared(
            APPLY_DEFAULT_MATERIALS,
            OptionValue::Bool(true),
            "Assign a per-entity-type material to elements without a style",
        ),
        OptionDef::shared(
            DIMENSIONALITY,
            Dimensionality::SurfacesAndSolids.into(),
            "Geometry classes to emit",
        )
        .with_variants(DIMENSIONALITY_VARIANTS),
        OptionDef::shared(
            LAYERSET_FIRST,
            OptionValue::Bool(false),
            "Use the first material layer as the element's representative material",
        ),
        OptionDef::shared(
            APPLY_LAYERSETS,
            OptionValue::Bool(false),
            "Slice elements with a material layer set into one part per layer",
        ),
        OptionDef::shared(
            MODEL_OFFSET,
            OptionValue::DoubleArray(vec![0.0, 0.0, 0.0]),
            "Translation X,Y,Z applied to every placement before the rotation",
        )
        .with_arity(3),
        OptionDef::shared(
            MODEL_ROTATION,
            OptionValue::DoubleArray(vec![0.0, 0.0, 0.0, 1.0]),
            "Quaternion X,Y,Z,W applied to every placement after the offset",
        )
        .with_arity(4),
        OptionDef::shared(
            PRECISION,
            OptionValue::Double(0.0),
            "Absolute geometric tolerance; overrides the model precision when non-zero",
        )
        .with_minimum(0.0),
        OptionDef::shared(
            PRECISION_FACTOR,
            OptionValue::Double(1.0),
            "Multiplier applied to the model precision",
        )
        .with_minimum(0.0),
        OptionDef::shared(
            CONTEXT_IDENTIFIERS,
            OptionValue::StringList(Vec::new()),
            "Representation context identifiers to process (e.g. Body, Axis)",
        ),
        OptionDef::shared(
            CONTEXT_IDS,
            OptionValue::IntList(Vec::new()),
            "Representation context instance ids to process",
        ),
        OptionDef::shared(
            CONTEXT_TYPES,
            OptionValue::StringList(Vec::new()),
            "Representation context types to process (e.g. Model, Plan)",
        ),
        OptionDef::shared(
            NO_PARALLEL_MAPPING,
            OptionValue::Bool(false),
            "Resolve placements and materials in a single-threaded pass before triangulation",
        ),
        OptionDef::shared(
            CIRCLE_SEGMENTS,
            OptionValue::Int(16),
            "Number of segments used to approximate full circles",
        )
        .with_minimum(3.0),
        OptionDef::instance(
            NUM_THREADS,
            OptionValue::Int(1),
            "Number of parallel workers",
        )
        .with_minimum(1.0),
        OptionDef::instance(
            INCLUDE,
            OptionValue::ObjectRefList(Vec::new()),
            "Only process these elements",
        ),
        OptionDef::instance(
            EXCLUDE,
            OptionValue::ObjectRefList(Vec::new()),
            "Skip these elements",
        ),
    ]
}

fn serializer_defs() -> Vec<OptionDef> {
    use names::*;

    vec![
        OptionDef::shared(
            USE_ELEMENT_NAMES,
            OptionValue::Bool(false),
            "Name output objects after element names",
        ),
        OptionDef::shared(
            USE_ELEMENT_GUIDS,
            OptionValue::Bool(false),
            "Name output objects after element GUIDs",
        ),
        OptionDef::shared(
            USE_ELEMENT_STEP_IDS,
            OptionValue::Bool(false),
            "Name output objects after element instance ids",
        ),
        OptionDef::shared(
            USE_MATERIAL_NAMES,
            OptionValue::Bool(false),
            "Name output materials after material names",
        ),
        OptionDef::shared(
            UNIT_NAME,
            OptionValue::String("METER".to_string()),
            "Length unit written to the output header",
        ),
        OptionDef::shared(
            UNIT_MAGNITUDE,
            OptionValue::Double(1.0),
            "Length unit magnitude written to the output header",
        ),
    ]
}
