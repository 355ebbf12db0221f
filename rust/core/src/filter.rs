// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Include / exclude element filters

use crate::error::{ConfigError, Result};
use crate::model::{Element, Model};
use crate::value::ObjectRef;
use rustc_hash::FxHashSet;

/// Entity types skipped when no filter is given
pub const DEFAULT_EXCLUDED_TYPES: &[&str] = &["IfcOpeningElement", "IfcSpace"];

/// What a filter matches on
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Entity type names, matching subtypes too
    EntityTypes(Vec<String>),
    /// Presentation layer names
    Layers(Vec<String>),
    /// Elements whose attribute `name` equals `value`
    Attribute { name: String, value: String },
    /// Explicit element instances
    Elements(Vec<ObjectRef>),
}

/// A filter, optionally extended to decomposed and contained children
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub kind: FilterKind,
    /// Also match children via IsDecomposedBy, HasOpenings, FillsVoid and
    /// ContainedInStructure, transitively
    pub deep: bool,
}

impl FilterSpec {
    pub fn entities<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FilterKind::EntityTypes(types.into_iter().map(Into::into).collect()))
    }

    pub fn layers<I, S>(layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(FilterKind::Layers(layers.into_iter().map(Into::into).collect()))
    }

    pub fn attribute(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(FilterKind::Attribute {
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn elements(elements: impl IntoIterator<Item = ObjectRef>) -> Self {
        Self::new(FilterKind::Elements(elements.into_iter().collect()))
    }

    pub fn new(kind: FilterKind) -> Self {
        Self { kind, deep: false }
    }

    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    /// Direct match, ignoring `deep`
    pub fn matches(&self, element: &Element) -> bool {
        match &self.kind {
            FilterKind::EntityTypes(types) => types.iter().any(|t| element.is_a(t)),
            FilterKind::Layers(layers) => element.layers.iter().any(|l| layers.contains(l)),
            FilterKind::Attribute { name, value } => element.attribute(name) == Some(value.as_str()),
            FilterKind::Elements(ids) => ids.contains(&ObjectRef(element.id)),
        }
    }

    /// Resolve against a model: direct matches plus, when deep, all children
    pub fn resolve(&self, model: &Model) -> FxHashSet<ObjectRef> {
        let mut matched: FxHashSet<ObjectRef> = model
            .elements
            .iter()
            .filter(|e| self.matches(e))
            .map(|e| ObjectRef(e.id))
            .collect();

        if self.deep {
            let mut stack: Vec<ObjectRef> = matched.iter().copied().collect();
            while let Some(id) = stack.pop() {
                let Some(element) = model.get(id) else { continue };
                let children = element
                    .decomposed_by
                    .iter()
                    .chain(&element.openings)
                    .chain(&element.contained_elements)
                    .chain(&element.filled_by);
                for child in children {
                    if matched.insert(*child) {
                        stack.push(*child);
                    }
                }
            }
        }

        matched
    }
}

/// Element eligibility for one run
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ElementFilter {
    /// Everything except [`DEFAULT_EXCLUDED_TYPES`]
    #[default]
    Default,
    Include(FilterSpec),
    Exclude(FilterSpec),
}

impl ElementFilter {
    /// Combine optional include and exclude filters; both at once is an error
    pub fn from_parts(include: Option<FilterSpec>, exclude: Option<FilterSpec>) -> Result<Self> {
        match (include, exclude) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingFilters),
            (Some(include), None) => Ok(Self::Include(include)),
            (None, Some(exclude)) => Ok(Self::Exclude(exclude)),
            (None, None) => Ok(Self::Default),
        }
    }

    /// Precompute the filter against a model
    pub fn resolve(&self, model: &Model) -> ResolvedFilter {
        match self {
            Self::Default => ResolvedFilter::Exclude(
                model
                    .elements
                    .iter()
                    .filter(|e| DEFAULT_EXCLUDED_TYPES.iter().any(|t| e.is_a(t)))
                    .map(|e| ObjectRef(e.id))
                    .collect(),
            ),
            Self::Include(spec) => ResolvedFilter::Include(spec.resolve(model)),
            Self::Exclude(spec) => ResolvedFilter::Exclude(spec.resolve(model)),
        }
    }
}

/// A filter resolved to element ids
#[derive(Debug, Clone)]
pub enum ResolvedFilter {
    Include(FxHashSet<ObjectRef>),
    Exclude(FxHashSet<ObjectRef>),
}

impl ResolvedFilter {
    pub fn admits(&self, id: ObjectRef) -> bool {
        match self {
            Self::Include(ids) => ids.contains(&id),
            Self::Exclude(ids) => !ids.contains(&id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> Model {
        Model::from_json_str(
            r#"{"elements": [
                {"id": 1, "entity": "IfcBuildingStorey", "contained_elements": [2, 5]},
                {"id": 2, "entity": "IfcWallStandardCase", "layers": ["A-WALL"], "openings": [3]},
                {"id": 3, "entity": "IfcOpeningElement", "filled_by": [4]},
                {"id": 4, "entity": "IfcDoor", "attributes": {"Tag": "D1"}},
                {"id": 5, "entity": "IfcSlab", "layers": ["A-FLOOR"]},
                {"id": 6, "entity": "IfcSpace"}
            ]}"#,
        )
        .unwrap()
    }

    fn ids(set: &FxHashSet<ObjectRef>) -> Vec<u32> {
        let mut ids: Vec<u32> = set.iter().map(|r| r.0).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_conflicting_filters() {
        let result = ElementFilter::from_parts(
            Some(FilterSpec::entities(["IfcWall"])),
            Some(FilterSpec::entities(["IfcSlab"])),
        );
        assert_eq!(result, Err(ConfigError::ConflictingFilters));
    }

    #[test]
    fn test_entity_filter_matches_subtypes() {
        let model = model();
        let spec = FilterSpec::entities(["IfcWall"]);
        assert_eq!(ids(&spec.resolve(&model)), vec![2]);
    }

    #[test]
    fn test_deep_filter_follows_relationships() {
        let model = model();
        let spec = FilterSpec::entities(["IfcWall"]).deep();
        // Wall -> HasOpenings -> opening -> HasFillings -> door
        assert_eq!(ids(&spec.resolve(&model)), vec![2, 3, 4]);

        let storey = FilterSpec::entities(["IfcBuildingStorey"]).deep();
        assert_eq!(ids(&storey.resolve(&model)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_layer_and_attribute_filters() {
        let model = model();
        assert_eq!(ids(&FilterSpec::layers(["A-FLOOR"]).resolve(&model)), vec![5]);
        assert_eq!(
            ids(&FilterSpec::attribute("Tag", "D1").resolve(&model)),
            vec![4]
        );
        assert_eq!(
            ids(&FilterSpec::elements([ObjectRef(5), ObjectRef(1)]).resolve(&model)),
            vec![1, 5]
        );
    }

    #[test]
    fn test_default_excludes_openings_and_spaces() {
        let model = model();
        let resolved = ElementFilter::Default.resolve(&model);
        assert!(resolved.admits(ObjectRef(2)));
        assert!(!resolved.admits(ObjectRef(3)));
        assert!(!resolved.admits(ObjectRef(6)));
    }

    #[test]
    fn test_exclude_deep() {
        let model = model();
        let filter = ElementFilter::Exclude(FilterSpec::entities(["IfcWall"]).deep());
        let resolved = filter.resolve(&model);
        assert!(!resolved.admits(ObjectRef(4)));
        assert!(resolved.admits(ObjectRef(5)));
    }
}
