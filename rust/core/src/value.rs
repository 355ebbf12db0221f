// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Option kinds and tagged option values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a model element (its STEP instance id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(pub u32);

impl ObjectRef {
    #[inline]
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for ObjectRef {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// The kind of value an option holds. Never changes after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Bool,
    Int,
    Double,
    String,
    StringList,
    IntList,
    ObjectRefList,
    DoubleArray,
    Enum,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Double => "double",
            Self::String => "string",
            Self::StringList => "list<string>",
            Self::IntList => "list<int>",
            Self::ObjectRefList => "list<entity>",
            Self::DoubleArray => "array<double>",
            Self::Enum => "enum",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged option value
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    StringList(Vec<String>),
    IntList(Vec<i64>),
    ObjectRefList(Vec<ObjectRef>),
    DoubleArray(Vec<f64>),
    Enum(i64),
}

impl OptionValue {
    /// Kind tag of this value
    pub fn kind(&self) -> OptionKind {
        match self {
            Self::Bool(_) => OptionKind::Bool,
            Self::Int(_) => OptionKind::Int,
            Self::Double(_) => OptionKind::Double,
            Self::String(_) => OptionKind::String,
            Self::StringList(_) => OptionKind::StringList,
            Self::IntList(_) => OptionKind::IntList,
            Self::ObjectRefList(_) => OptionKind::ObjectRefList,
            Self::DoubleArray(_) => OptionKind::DoubleArray,
            Self::Enum(_) => OptionKind::Enum,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<i64> {
        match self {
            Self::Enum(v) => Some(*v),
            _ => None,
        }
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Formats values the way the text parser reads them back
impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) | Self::Enum(i) => write!(f, "{}", i),
            Self::Double(d) => write!(f, "{}", d),
            Self::String(s) => f.write_str(s),
            Self::StringList(v) => join(f, v),
            Self::IntList(v) => join(f, v),
            Self::ObjectRefList(v) => join(f, &v.iter().map(|r| r.0).collect::<Vec<_>>()),
            Self::DoubleArray(v) => join(f, v),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringList(v)
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(v: Vec<&str>) -> Self {
        Self::StringList(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<i64>> for OptionValue {
    fn from(v: Vec<i64>) -> Self {
        Self::IntList(v)
    }
}

impl From<Vec<ObjectRef>> for OptionValue {
    fn from(v: Vec<ObjectRef>) -> Self {
        Self::ObjectRefList(v)
    }
}

impl From<Vec<f64>> for OptionValue {
    fn from(v: Vec<f64>) -> Self {
        Self::DoubleArray(v)
    }
}

impl<const N: usize> From<[f64; N]> for OptionValue {
    fn from(v: [f64; N]) -> Self {
        Self::DoubleArray(v.to_vec())
    }
}

/// Geometry classes emitted for an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimensionality {
    Curves = 0,
    #[default]
    SurfacesAndSolids = 1,
    CurvesSurfacesAndSolids = 2,
}

impl Dimensionality {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Self::Curves),
            1 => Some(Self::SurfacesAndSolids),
            2 => Some(Self::CurvesSurfacesAndSolids),
            _ => None,
        }
    }

    #[inline]
    pub fn includes_curves(self) -> bool {
        matches!(self, Self::Curves | Self::CurvesSurfacesAndSolids)
    }

    #[inline]
    pub fn includes_surfaces(self) -> bool {
        matches!(self, Self::SurfacesAndSolids | Self::CurvesSurfacesAndSolids)
    }
}

impl From<Dimensionality> for OptionValue {
    fn from(v: Dimensionality) -> Self {
        Self::Enum(v as i64)
    }
}

/// Form of the result geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IteratorOutput {
    /// Boundary representation serialized to text
    Serialized = 1,
    /// Triangulated mesh
    #[default]
    Triangulated = 2,
}

impl IteratorOutput {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            1 => Some(Self::Serialized),
            2 => Some(Self::Triangulated),
            _ => None,
        }
    }
}

impl From<IteratorOutput> for OptionValue {
    fn from(v: IteratorOutput) -> Self {
        Self::Enum(v as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(OptionValue::from(true).kind(), OptionKind::Bool);
        assert_eq!(OptionValue::from(3i64).kind(), OptionKind::Int);
        assert_eq!(OptionValue::from(0.5).kind(), OptionKind::Double);
        assert_eq!(OptionValue::from([0.0, 1.0, 2.0]).kind(), OptionKind::DoubleArray);
        assert_eq!(OptionValue::from(Dimensionality::Curves).kind(), OptionKind::Enum);
        assert_eq!(
            OptionValue::from(vec![ObjectRef(1)]).kind(),
            OptionKind::ObjectRefList
        );
    }

    #[test]
    fn test_display_is_comma_separated() {
        assert_eq!(OptionValue::from([1.0, -2.5, 3.0]).to_string(), "1,-2.5,3");
        assert_eq!(OptionValue::from(vec!["Body", "Axis"]).to_string(), "Body,Axis");
        assert_eq!(OptionValue::from(vec![ObjectRef(7), ObjectRef(9)]).to_string(), "7,9");
    }

    #[test]
    fn test_dimensionality_classes() {
        assert!(!Dimensionality::Curves.includes_surfaces());
        assert!(Dimensionality::Curves.includes_curves());
        assert!(Dimensionality::CurvesSurfacesAndSolids.includes_surfaces());
        assert_eq!(Dimensionality::from_i64(3), None);
    }
}
