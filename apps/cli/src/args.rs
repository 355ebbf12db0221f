// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line arguments
//!
//! Fixed flags are declared with clap's derive API. Every SHARED option of the
//! geometry and serializer registries additionally gets a `--<option-name>`
//! flag generated from its definition, so the flag set and the settings
//! object cannot drift apart.

use crate::config::{Config, LogFormat};
use anyhow::{bail, Context as _};
use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory, FromArgMatches, Parser};
use ifcgeom_core::{
    FilterKind, FilterSpec, ObjectRef, OptionKind, OptionSet, Profile, Registry, Scope,
    SerializerSettings, Settings,
};
use ifcgeom_processing::RunParameters;
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ifcgeom", version, about = "Generate element geometry from a building model")]
pub struct Cli {
    /// Input model (JSON)
    pub input: Option<PathBuf>,

    /// Output file: `.obj` (with a sibling `.mtl`) or `.json`
    pub output: Option<PathBuf>,

    /// Worker threads [env: IFCGEOM_THREADS, default: number of CPUs]
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Process only matching elements: `entities|layers|elements <VALUES..>` or
    /// `attribute <NAME> <VALUE>`. Values run up to the next flag, so give the
    /// input and output paths first.
    #[arg(long, num_args = 2.., value_names = ["KIND", "VALUES"], conflicts_with = "include_deep")]
    pub include: Option<Vec<String>>,

    /// Like `--include`, also matching decomposed, contained and filling children
    #[arg(long, num_args = 2.., value_names = ["KIND", "VALUES"])]
    pub include_deep: Option<Vec<String>>,

    /// Skip matching elements; same syntax as `--include`
    #[arg(long, num_args = 2.., value_names = ["KIND", "VALUES"], conflicts_with = "exclude_deep")]
    pub exclude: Option<Vec<String>>,

    /// Like `--exclude`, also skipping decomposed, contained and filling children
    #[arg(long, num_args = 2.., value_names = ["KIND", "VALUES"])]
    pub exclude_deep: Option<Vec<String>>,

    /// Print the effective settings and exit if no input is given
    #[arg(long)]
    pub print_settings: bool,

    /// Log format [env: IFCGEOM_LOG_FORMAT]
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Exit with code 1 if any error was logged
    #[arg(long)]
    pub validate: bool,
}

/// Fully resolved invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub settings: Settings,
    pub serializer: SerializerSettings,
    pub params: RunParameters,
    pub print_settings: bool,
    pub log_format: LogFormat,
    pub validate: bool,
}

/// Registries whose SHARED options become flags
fn flag_registries() -> [&'static Registry; 2] {
    [Registry::geometry(), Registry::serializer()]
}

/// Full command: derived flags plus generated option flags
pub fn command() -> Command {
    let mut command = Cli::command();
    for registry in flag_registries() {
        for def in registry.iter().filter(|d| d.scope == Scope::Shared) {
            let mut arg = Arg::new(def.name)
                .long(def.name)
                .help(def.description)
                .action(ArgAction::Set)
                .value_name(value_name(def.kind));
            if def.kind == OptionKind::Bool {
                // `--flag` or `--flag=false`; a separate word stays positional
                arg = arg
                    .num_args(0..=1)
                    .require_equals(true)
                    .default_missing_value("true");
            }
            if def.kind == OptionKind::Enum {
                let variants: Vec<&str> = def.variants.iter().map(|(name, _)| *name).collect();
                arg = arg.long_help(format!("{} [{}]", def.description, variants.join(", ")));
            }
            command = command.arg(arg);
        }
    }
    command
}

fn value_name(kind: OptionKind) -> &'static str {
    match kind {
        OptionKind::Bool => "BOOL",
        OptionKind::Int => "N",
        OptionKind::Double => "NUMBER",
        OptionKind::String => "TEXT",
        OptionKind::StringList => "A,B,..",
        OptionKind::IntList | OptionKind::ObjectRefList => "ID,ID,..",
        OptionKind::DoubleArray => "X,Y,..",
        OptionKind::Enum => "VARIANT",
    }
}

/// Parse arguments into an invocation. `config` supplies env-driven defaults
/// and `env` the `IFCGEOM_<OPTION>` overrides.
pub fn parse_from<I, T>(
    args: I,
    config: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command().try_get_matches_from(args)?;
    let cli = Cli::from_arg_matches(&matches)?;

    let mut settings = Settings::with_profile(Profile::CommandLine);
    settings.apply_vars(&env)?;
    let mut serializer = SerializerSettings::serializer();
    serializer.apply_vars(&env)?;

    apply_flags(&matches, &mut settings)?;
    apply_flags(&matches, &mut serializer)?;

    let include = filter_arg(cli.include.as_deref(), cli.include_deep.as_deref())?;
    let exclude = filter_arg(cli.exclude.as_deref(), cli.exclude_deep.as_deref())?;

    let mut builder = RunParameters::builder(settings.snapshot())
        .threads(cli.threads.unwrap_or(config.threads) as i64);
    if let Some(include) = include {
        builder = builder.include(include);
    }
    if let Some(exclude) = exclude {
        builder = builder.exclude(exclude);
    }
    let params = builder.build()?;

    Ok(Invocation {
        input: cli.input,
        output: cli.output,
        settings,
        serializer,
        params,
        print_settings: cli.print_settings,
        log_format: cli.log_format.unwrap_or(config.log_format),
        validate: cli.validate,
    })
}

/// Set every option that was given on the command line
fn apply_flags<R: OptionSet>(
    matches: &ArgMatches,
    settings: &mut Settings<R>,
) -> anyhow::Result<()> {
    let names: Vec<&'static str> = settings
        .registry()
        .iter()
        .filter(|d| d.scope == Scope::Shared)
        .map(|d| d.name)
        .collect();

    for name in names {
        if let Some(text) = matches.get_one::<String>(name) {
            settings
                .set_from_str(name, text)
                .with_context(|| format!("--{} {}", name, text))?;
        }
    }
    Ok(())
}

fn filter_arg(
    shallow: Option<&[String]>,
    deep: Option<&[String]>,
) -> anyhow::Result<Option<FilterSpec>> {
    match (shallow, deep) {
        (Some(values), _) => parse_filter(values).map(Some),
        (None, Some(values)) => parse_filter(values).map(|f| Some(f.deep())),
        (None, None) => Ok(None),
    }
}

/// `entities IfcWall IfcSlab`, `layers A-WALL`, `elements 12 #34`,
/// `attribute Name Wall-01`
pub fn parse_filter(values: &[String]) -> anyhow::Result<FilterSpec> {
    let Some((kind, rest)) = values.split_first() else {
        bail!("filter needs a kind and at least one value");
    };

    let kind = match kind.as_str() {
        "entities" => FilterKind::EntityTypes(rest.to_vec()),
        "layers" => FilterKind::Layers(rest.to_vec()),
        "elements" => FilterKind::Elements(
            rest.iter()
                .map(|v| {
                    v.trim_start_matches('#')
                        .parse()
                        .map(ObjectRef)
                        .with_context(|| format!("invalid element id '{}'", v))
                })
                .collect::<anyhow::Result<_>>()?,
        ),
        "attribute" => match rest {
            [name, value] => FilterKind::Attribute {
                name: name.clone(),
                value: value.clone(),
            },
            _ => bail!("attribute filter takes exactly a name and a value"),
        },
        other => bail!(
            "unknown filter kind '{}', expected entities, layers, elements or attribute",
            other
        ),
    };
    Ok(FilterSpec::new(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifcgeom_core::{keys, names, ConfigError, Dimensionality, ElementFilter};

    fn config() -> Config {
        Config {
            threads: 2,
            log_format: LogFormat::Pretty,
        }
    }

    fn parse(args: &[&str]) -> anyhow::Result<Invocation> {
        parse_from(
            std::iter::once("ifcgeom").chain(args.iter().copied()),
            &config(),
            |_| None,
        )
    }

    #[test]
    fn test_command_line_profile_defaults() {
        let invocation = parse(&["model.json"]).unwrap();
        assert!(!invocation.settings.value(keys::WELD_VERTICES));
        assert_eq!(invocation.params.thread_count, 2);
        assert_eq!(invocation.params.filter, ElementFilter::Default);
    }

    #[test]
    fn test_option_flags() {
        let invocation = parse(&[
            "--weld-vertices",
            "--circle-segments",
            "24",
            "--model-offset",
            "1,2,3",
            "--dimensionality",
            "curves-surfaces-and-solids",
            "--use-element-guids=true",
            "-j",
            "4",
            "model.json",
            "out.obj",
        ])
        .unwrap();

        let settings = &invocation.settings;
        assert!(settings.value(keys::WELD_VERTICES));
        assert_eq!(settings.value(keys::CIRCLE_SEGMENTS), 24);
        assert_eq!(settings.value(keys::MODEL_OFFSET), [1.0, 2.0, 3.0]);
        assert_eq!(
            settings.value(keys::DIMENSIONALITY),
            Dimensionality::CurvesSurfacesAndSolids
        );
        assert!(invocation.serializer.value(keys::serializer::USE_ELEMENT_GUIDS));
        assert_eq!(invocation.params.thread_count, 4);
        assert_eq!(invocation.output, Some(PathBuf::from("out.obj")));
    }

    #[test]
    fn test_bool_flag_explicit_false() {
        let invocation = parse(&["--apply-default-materials=false", "model.json"]).unwrap();
        assert!(!invocation.settings.value(keys::APPLY_DEFAULT_MATERIALS));
    }

    #[test]
    fn test_env_overrides_below_flags() {
        let env = |name: &str| match name {
            "IFCGEOM_CIRCLE_SEGMENTS" => Some("12".to_string()),
            "IFCGEOM_PRECISION_FACTOR" => Some("10".to_string()),
            _ => None,
        };
        let invocation = parse_from(
            ["ifcgeom", "--circle-segments", "32", "model.json"],
            &config(),
            env,
        )
        .unwrap();
        assert_eq!(invocation.settings.value(keys::CIRCLE_SEGMENTS), 32);
        assert_eq!(invocation.settings.value(keys::PRECISION_FACTOR), 10.0);
    }

    #[test]
    fn test_invalid_option_value() {
        let err = parse(&["--circle-segments", "many", "model.json"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_filters() {
        let invocation = parse(&["model.json", "--include-deep", "elements", "#1", "2"]).unwrap();
        assert_eq!(
            invocation.params.filter,
            ElementFilter::Include(
                FilterSpec::elements([ObjectRef(1), ObjectRef(2)]).deep()
            )
        );

        let invocation = parse(&["model.json", "--exclude", "attribute", "Name", "Wall-01"]).unwrap();
        assert_eq!(
            invocation.params.filter,
            ElementFilter::Exclude(FilterSpec::attribute("Name", "Wall-01"))
        );
    }

    #[test]
    fn test_conflicting_filters() {
        let err = parse(&[
            "model.json",
            "--include",
            "entities",
            "IfcWall",
            "--exclude",
            "layers",
            "A-FURN",
        ])
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::ConflictingFilters)
        );
    }

    #[test]
    fn test_unknown_filter_kind() {
        assert!(parse_filter(&["colours".to_string(), "red".to_string()]).is_err());
    }

    #[test]
    fn test_every_shared_option_has_a_flag() {
        let command = command();
        let long = |name: &str| command.get_arguments().find(|a| a.get_long() == Some(name));
        for registry in flag_registries() {
            for def in registry.iter().filter(|d| d.scope == Scope::Shared) {
                let flag = long(def.name).unwrap_or_else(|| panic!("no flag for {}", def.name));
                assert_eq!(flag.get_id().as_str(), def.name);
            }
        }

        // Instance options map to the dedicated run flags
        assert!(long(names::NUM_THREADS).is_none());
        assert_eq!(long("threads").unwrap().get_short(), Some('j'));
        assert_eq!(long(names::INCLUDE).unwrap().get_id().as_str(), "include");
        assert_eq!(long(names::EXCLUDE).unwrap().get_id().as_str(), "exclude");
    }
}
