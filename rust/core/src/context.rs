// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Representation context selection

use crate::model::{Element, Representation, RepresentationContext};
use crate::settings::{keys, Settings};

/// Context type processed when no selector is given
pub const DEFAULT_CONTEXT_TYPE: &str = "Model";

/// Restricts which representation contexts are processed.
///
/// Identifiers, ids and types are alternative selectors over the same set of
/// contexts. When more than one is supplied a context must satisfy all of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSelector {
    pub identifiers: Vec<String>,
    pub ids: Vec<i64>,
    pub types: Vec<String>,
}

impl ContextSelector {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            identifiers: settings.value(keys::CONTEXT_IDENTIFIERS),
            ids: settings.value(keys::CONTEXT_IDS),
            types: settings.value(keys::CONTEXT_TYPES),
        }
    }

    pub fn identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identifiers: identifiers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty() && self.ids.is_empty() && self.types.is_empty()
    }

    pub fn matches(&self, context: &RepresentationContext) -> bool {
        if self.is_empty() {
            return context.context_type.eq_ignore_ascii_case(DEFAULT_CONTEXT_TYPE);
        }

        let identifier_ok = self.identifiers.is_empty()
            || self
                .identifiers
                .iter()
                .any(|i| i.eq_ignore_ascii_case(&context.identifier));
        let id_ok = self.ids.is_empty() || self.ids.contains(&(context.id as i64));
        let type_ok = self.types.is_empty()
            || self
                .types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&context.context_type));

        identifier_ok && id_ok && type_ok
    }

    /// Representations of `element` in selected contexts, in element order
    pub fn select<'a>(&'a self, element: &'a Element) -> impl Iterator<Item = &'a Representation> + 'a {
        element
            .representations
            .iter()
            .filter(move |r| self.matches(&r.context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::names;

    fn ctx(id: u32, identifier: &str, context_type: &str) -> RepresentationContext {
        RepresentationContext {
            id,
            identifier: identifier.into(),
            context_type: context_type.into(),
        }
    }

    #[test]
    fn test_default_selects_model_contexts() {
        let selector = ContextSelector::default();
        assert!(selector.matches(&ctx(1, "Body", "Model")));
        assert!(selector.matches(&ctx(2, "Axis", "model")));
        assert!(!selector.matches(&ctx(3, "Annotation", "Plan")));
    }

    #[test]
    fn test_single_selector() {
        let selector = ContextSelector::identifiers(["body"]);
        assert!(selector.matches(&ctx(1, "Body", "Model")));
        assert!(!selector.matches(&ctx(2, "Axis", "Model")));
        // An explicit selector is not restricted to Model contexts
        assert!(selector.matches(&ctx(3, "Body", "Plan")));
    }

    #[test]
    fn test_multiple_selectors_intersect() {
        let selector = ContextSelector {
            identifiers: vec!["Body".into()],
            ids: vec![1, 3],
            types: Vec::new(),
        };
        assert!(selector.matches(&ctx(1, "Body", "Model")));
        assert!(!selector.matches(&ctx(2, "Body", "Model")));
        assert!(!selector.matches(&ctx(3, "Axis", "Model")));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::new();
        settings
            .set(names::CONTEXT_TYPES, vec!["Plan"])
            .unwrap();
        let selector = ContextSelector::from_settings(&settings);
        assert_eq!(selector.types, vec!["Plan".to_string()]);
        assert!(selector.matches(&ctx(4, "FootPrint", "Plan")));
        assert!(!selector.matches(&ctx(1, "Body", "Model")));
    }
}
