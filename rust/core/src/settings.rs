// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Settings objects
//!
//! A [`Settings`] holds the explicitly set options on top of a registry's
//! profile defaults. Every `set` is validated against the registry, so the
//! stored table can only ever contain registered names with matching kinds.
//! Runs and shape requests read a frozen [`SettingsSnapshot`].

use crate::error::{ConfigError, Result};
use crate::registry::{names, OptionDef, Profile, Registry, Scope};
use crate::value::{Dimensionality, IteratorOutput, OptionValue};
use rustc_hash::FxHashMap;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

/// Prefix of environment variables that override option defaults
pub const ENV_PREFIX: &str = "IFCGEOM_";

/// Rust types that an option value converts to
pub trait OptionType: Sized {
    fn from_value(value: &OptionValue) -> Option<Self>;
}

impl OptionType for bool {
    fn from_value(value: &OptionValue) -> Option<Self> {
        value.as_bool()
    }
}

impl OptionType for i64 {
    fn from_value(value: &OptionValue) -> Option<Self> {
        value.as_int()
    }
}

impl OptionType for f64 {
    fn from_value(value: &OptionValue) -> Option<Self> {
        value.as_double()
    }
}

impl OptionType for String {
    fn from_value(value: &OptionValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl OptionType for Vec<String> {
    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::StringList(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl OptionType for Vec<i64> {
    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::IntList(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl<const N: usize> OptionType for [f64; N] {
    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::DoubleArray(v) => v.as_slice().try_into().ok(),
            _ => None,
        }
    }
}

impl OptionType for Dimensionality {
    fn from_value(value: &OptionValue) -> Option<Self> {
        value.as_enum().and_then(Dimensionality::from_i64)
    }
}

impl OptionType for IteratorOutput {
    fn from_value(value: &OptionValue) -> Option<Self> {
        value.as_enum().and_then(IteratorOutput::from_i64)
    }
}

/// Marker for the registry a settings object and its keys belong to
pub trait OptionSet: Clone + std::fmt::Debug + Send + Sync + 'static {
    fn registry() -> &'static Registry;
}

/// Options of the geometry pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryOptions;

impl OptionSet for GeometryOptions {
    fn registry() -> &'static Registry {
        Registry::geometry()
    }
}

/// Options of the output serializers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializerOptions;

impl OptionSet for SerializerOptions {
    fn registry() -> &'static Registry {
        Registry::serializer()
    }
}

/// Compile-time typed handle to a registered option.
///
/// Keys only exist for registered names and carry their registry, so a key
/// can only be read from settings of the same registry.
#[derive(Debug)]
pub struct Key<T, R = GeometryOptions> {
    pub name: &'static str,
    _type: PhantomData<fn() -> (T, R)>,
}

impl<T, R> Key<T, R> {
    const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }
}

impl<T, R> Clone for Key<T, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, R> Copy for Key<T, R> {}

/// Typed keys for every shared geometry option
pub mod keys {
    use super::Key;
    use crate::registry::names;
    use crate::value::{Dimensionality, IteratorOutput};

    pub const WELD_VERTICES: Key<bool> = Key::new(names::WELD_VERTICES);
    pub const USE_WORLD_COORDS: Key<bool> = Key::new(names::USE_WORLD_COORDS);
    pub const CONVERT_BACK_UNITS: Key<bool> = Key::new(names::CONVERT_BACK_UNITS);
    pub const ITERATOR_OUTPUT: Key<IteratorOutput> = Key::new(names::ITERATOR_OUTPUT);
    pub const DISABLE_OPENING_SUBTRACTIONS: Key<bool> =
        Key::new(names::DISABLE_OPENING_SUBTRACTIONS);
    pub const APPLY_DEFAULT_MATERIALS: Key<bool> = Key::new(names::APPLY_DEFAULT_MATERIALS);
    pub const DIMENSIONALITY: Key<Dimensionality> = Key::new(names::DIMENSIONALITY);
    pub const LAYERSET_FIRST: Key<bool> = Key::new(names::LAYERSET_FIRST);
    pub const APPLY_LAYERSETS: Key<bool> = Key::new(names::APPLY_LAYERSETS);
    pub const MODEL_OFFSET: Key<[f64; 3]> = Key::new(names::MODEL_OFFSET);
    pub const MODEL_ROTATION: Key<[f64; 4]> = Key::new(names::MODEL_ROTATION);
    pub const PRECISION: Key<f64> = Key::new(names::PRECISION);
    pub const PRECISION_FACTOR: Key<f64> = Key::new(names::PRECISION_FACTOR);
    pub const CONTEXT_IDENTIFIERS: Key<Vec<String>> = Key::new(names::CONTEXT_IDENTIFIERS);
    pub const CONTEXT_IDS: Key<Vec<i64>> = Key::new(names::CONTEXT_IDS);
    pub const CONTEXT_TYPES: Key<Vec<String>> = Key::new(names::CONTEXT_TYPES);
    pub const NO_PARALLEL_MAPPING: Key<bool> = Key::new(names::NO_PARALLEL_MAPPING);
    pub const CIRCLE_SEGMENTS: Key<i64> = Key::new(names::CIRCLE_SEGMENTS);

    /// Typed keys for every serializer option
    pub mod serializer {
        use crate::registry::names;
        use crate::settings::{Key, SerializerOptions};

        pub const USE_ELEMENT_NAMES: Key<bool, SerializerOptions> =
            Key::new(names::USE_ELEMENT_NAMES);
        pub const USE_ELEMENT_GUIDS: Key<bool, SerializerOptions> =
            Key::new(names::USE_ELEMENT_GUIDS);
        pub const USE_ELEMENT_STEP_IDS: Key<bool, SerializerOptions> =
            Key::new(names::USE_ELEMENT_STEP_IDS);
        pub const USE_MATERIAL_NAMES: Key<bool, SerializerOptions> =
            Key::new(names::USE_MATERIAL_NAMES);
        pub const UNIT_NAME: Key<String, SerializerOptions> = Key::new(names::UNIT_NAME);
        pub const UNIT_MAGNITUDE: Key<f64, SerializerOptions> = Key::new(names::UNIT_MAGNITUDE);
    }
}

/// Mutable settings object seeded from registry defaults.
///
/// `Settings` alone means geometry settings; serializer settings are
/// [`SerializerSettings`].
#[derive(Debug, Clone)]
pub struct Settings<R = GeometryOptions> {
    profile: Profile,
    values: FxHashMap<&'static str, OptionValue>,
    _options: PhantomData<fn() -> R>,
}

/// Settings of the output serializers
pub type SerializerSettings = Settings<SerializerOptions>;

impl Settings<GeometryOptions> {
    /// Geometry settings with the embedding API defaults
    pub fn new() -> Self {
        Self::with_profile(Profile::Embedded)
    }

    /// Geometry settings with the defaults of a named profile
    pub fn with_profile(profile: Profile) -> Self {
        Self::for_profile(profile)
    }

    /// Geometric tolerance: `precision` when non-zero, otherwise the model
    /// precision scaled by `precision-factor`
    pub fn tolerance(&self, model_precision: f64) -> f64 {
        let absolute = self.value(keys::PRECISION);
        if absolute > 0.0 {
            absolute
        } else {
            model_precision * self.value(keys::PRECISION_FACTOR)
        }
    }
}

impl Settings<SerializerOptions> {
    /// Serializer settings
    pub fn serializer() -> Self {
        Self::for_profile(Profile::Embedded)
    }
}

impl<R: OptionSet> Settings<R> {
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            profile,
            values: FxHashMap::default(),
            _options: PhantomData,
        }
    }

    pub fn registry(&self) -> &'static Registry {
        R::registry()
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    fn shared_def(&self, name: &str) -> Result<&'static OptionDef> {
        let def = self.registry().lookup(name)?;
        if def.scope == Scope::Instance {
            return Err(ConfigError::WrongScope(def.name.to_string()));
        }
        Ok(def)
    }

    /// Set an option. On error the stored value is left unchanged.
    pub fn set(&mut self, name: &str, value: impl Into<OptionValue>) -> Result<()> {
        let def = self.shared_def(name)?;
        let value = value.into();
        def.validate(&value)?;
        self.values.insert(def.name, value);
        Ok(())
    }

    /// Builder-style `set`
    pub fn with(mut self, name: &str, value: impl Into<OptionValue>) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Parse `text` according to the option's kind and set it
    pub fn set_from_str(&mut self, name: &str, text: &str) -> Result<()> {
        let def = self.shared_def(name)?;
        let value = def.parse(text)?;
        self.values.insert(def.name, value);
        Ok(())
    }

    /// Current value, or the profile default if never set
    pub fn get(&self, name: &str) -> Result<OptionValue> {
        let def = self.registry().lookup(name)?;
        Ok(self
            .values
            .get(def.name)
            .unwrap_or_else(|| def.default_for(self.profile))
            .clone())
    }

    /// Typed accessor for a registered option
    pub fn value<T: OptionType + Default>(&self, key: Key<T, R>) -> T {
        self.registry()
            .lookup(key.name)
            .ok()
            .and_then(|def| {
                let value = self
                    .values
                    .get(def.name)
                    .unwrap_or_else(|| def.default_for(self.profile));
                T::from_value(value)
            })
            .unwrap_or_default()
    }

    /// Whether an option was explicitly set
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Explicitly set options in registration order
    pub fn overrides(&self) -> impl Iterator<Item = (&'static str, &OptionValue)> {
        self.registry()
            .iter()
            .filter_map(|def| self.values.get(def.name).map(|v| (def.name, v)))
    }

    /// Apply `IFCGEOM_<NAME>` environment variables for every shared option
    pub fn apply_env(&mut self) -> Result<usize> {
        self.apply_vars(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<usize> {
        let mut applied = 0;
        for def in self.registry().iter().filter(|d| d.scope == Scope::Shared) {
            let var = env_var_name(def.name);
            if let Some(text) = lookup(&var) {
                self.set_from_str(def.name, &text)?;
                tracing::debug!(option = def.name, value = %text, "Option set from environment");
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Freeze into a shareable read-only snapshot
    pub fn snapshot(&self) -> SettingsSnapshot<R> {
        SettingsSnapshot(Arc::new(self.clone()))
    }
}

impl Default for Settings<GeometryOptions> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: OptionSet> PartialEq for Settings<R> {
    /// Two settings are equal when every option resolves to the same value
    fn eq(&self, other: &Self) -> bool {
        self.registry()
            .iter()
            .all(|def| self.get(def.name).ok() == other.get(def.name).ok())
    }
}

/// `weld-vertices` -> `IFCGEOM_WELD_VERTICES`
pub fn env_var_name(option: &str) -> String {
    format!(
        "{}{}",
        ENV_PREFIX,
        option.replace('-', "_").to_ascii_uppercase()
    )
}

/// Immutable, cheaply clonable view of a [`Settings`] object.
///
/// Shared by all workers of a run without locking.
#[derive(Debug, Clone)]
pub struct SettingsSnapshot<R = GeometryOptions>(Arc<Settings<R>>);

impl<R> Deref for SettingsSnapshot<R> {
    type Target = Settings<R>;

    fn deref(&self) -> &Settings<R> {
        &self.0
    }
}

impl<R> From<Settings<R>> for SettingsSnapshot<R> {
    fn from(settings: Settings<R>) -> Self {
        Self(Arc::new(settings))
    }
}

impl Default for SettingsSnapshot<GeometryOptions> {
    fn default() -> Self {
        Settings::new().snapshot()
    }
}
