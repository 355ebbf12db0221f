// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Iterator run parameters

use ifcgeom_core::{
    names, ConfigError, ContextSelector, ElementFilter, FilterSpec, OptionValue, Registry, Scope,
    SettingsSnapshot,
};

/// Everything a batch run reads; frozen for the duration of the run
#[derive(Debug, Clone)]
pub struct RunParameters {
    pub settings: SettingsSnapshot,
    pub filter: ElementFilter,
    pub thread_count: usize,
    pub context: ContextSelector,
}

impl RunParameters {
    pub fn builder(settings: SettingsSnapshot) -> RunParametersBuilder {
        RunParametersBuilder::new(settings)
    }

    /// Default filter, one thread, contexts from the settings
    pub fn new(settings: SettingsSnapshot) -> Self {
        let context = ContextSelector::from_settings(&settings);
        Self {
            settings,
            filter: ElementFilter::Default,
            thread_count: 1,
            context,
        }
    }
}

/// Collects run parameters; validation happens in [`RunParametersBuilder::build`]
#[derive(Debug, Clone)]
pub struct RunParametersBuilder {
    settings: SettingsSnapshot,
    include: Option<FilterSpec>,
    exclude: Option<FilterSpec>,
    thread_count: i64,
    context: Option<ContextSelector>,
}

impl RunParametersBuilder {
    pub fn new(settings: SettingsSnapshot) -> Self {
        Self {
            settings,
            include: None,
            exclude: None,
            thread_count: 1,
            context: None,
        }
    }

    pub fn include(mut self, filter: FilterSpec) -> Self {
        self.include = Some(filter);
        self
    }

    pub fn exclude(mut self, filter: FilterSpec) -> Self {
        self.exclude = Some(filter);
        self
    }

    pub fn threads(mut self, count: i64) -> Self {
        self.thread_count = count;
        self
    }

    /// Override the context selection of the settings for this run
    pub fn context(mut self, selector: ContextSelector) -> Self {
        self.context = Some(selector);
        self
    }

    /// Set a per-run option by name (`num-threads`, `include`, `exclude`)
    pub fn option(mut self, name: &str, value: impl Into<OptionValue>) -> Result<Self, ConfigError> {
        let def = Registry::geometry().lookup(name)?;
        if def.scope != Scope::Instance {
            return Err(ConfigError::WrongScope(def.name.to_string()));
        }
        let value = value.into();
        def.validate(&value)?;

        match (def.name, value) {
            (names::NUM_THREADS, OptionValue::Int(n)) => self.thread_count = n,
            (names::INCLUDE, OptionValue::ObjectRefList(ids)) => {
                self.include = Some(FilterSpec::elements(ids))
            }
            (names::EXCLUDE, OptionValue::ObjectRefList(ids)) => {
                self.exclude = Some(FilterSpec::elements(ids))
            }
            (other, _) => return Err(ConfigError::UnknownOption(other.to_string())),
        }
        Ok(self)
    }

    pub fn build(self) -> Result<RunParameters, ConfigError> {
        if self.thread_count < 1 {
            return Err(ConfigError::InvalidThreadCount(self.thread_count));
        }
        let filter = ElementFilter::from_parts(self.include, self.exclude)?;
        let context = self
            .context
            .unwrap_or_else(|| ContextSelector::from_settings(&self.settings));

        Ok(RunParameters {
            settings: self.settings,
            filter,
            thread_count: self.thread_count as usize,
            context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifcgeom_core::{ObjectRef, Settings};

    fn snapshot() -> SettingsSnapshot {
        Settings::new().snapshot()
    }

    #[test]
    fn test_defaults() {
        let params = RunParameters::builder(snapshot()).build().unwrap();
        assert_eq!(params.thread_count, 1);
        assert_eq!(params.filter, ElementFilter::Default);
        assert!(params.context.is_empty());
    }

    #[test]
    fn test_conflicting_filters() {
        let err = RunParameters::builder(snapshot())
            .include(FilterSpec::entities(["IfcWall"]))
            .exclude(FilterSpec::entities(["IfcSlab"]))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::ConflictingFilters);
    }

    #[test]
    fn test_thread_count_must_be_positive() {
        let err = RunParameters::builder(snapshot()).threads(0).build().unwrap_err();
        assert_eq!(err, ConfigError::InvalidThreadCount(0));
    }

    #[test]
    fn test_instance_options_by_name() {
        let params = RunParameters::builder(snapshot())
            .option(names::NUM_THREADS, 4i64)
            .unwrap()
            .option(names::INCLUDE, vec![ObjectRef(7)])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(params.thread_count, 4);
        assert_eq!(
            params.filter,
            ElementFilter::Include(FilterSpec::elements([ObjectRef(7)]))
        );

        let err = RunParameters::builder(snapshot())
            .option(names::NUM_THREADS, true)
            .unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch { .. }));

        let err = RunParameters::builder(snapshot())
            .option(names::WELD_VERTICES, true)
            .unwrap_err();
        assert_eq!(err, ConfigError::WrongScope(names::WELD_VERTICES.to_string()));
    }

    #[test]
    fn test_context_from_settings() {
        let settings = Settings::new()
            .with(names::CONTEXT_IDENTIFIERS, vec!["Axis"])
            .unwrap();
        let params = RunParameters::builder(settings.snapshot()).build().unwrap();
        assert_eq!(params.context, ContextSelector::identifiers(["Axis"]));
    }
}
