// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch run driven by an [`Invocation`]

use crate::args::Invocation;
use anyhow::{bail, Context as _};
use ifcgeom_core::{OptionSet, OptionValue, SerializerSettings, Settings};
use ifcgeom_processing::{ElementShape, Geometry, GeometryIterator, ObjSerializer, RunSummary};
use serde_json::{json, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output file formats, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Obj,
    Json,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase) {
            Some(ext) if ext == "obj" => Ok(Self::Obj),
            Some(ext) if ext == "json" => Ok(Self::Json),
            _ => bail!("unsupported output format: {}", path.display()),
        }
    }
}

/// `name = value` lines for every option, explicit values marked with `*`
pub fn describe_settings<R: OptionSet>(settings: &Settings<R>) -> String {
    let mut out = String::new();
    for def in settings.registry().iter() {
        let Ok(value) = settings.get(def.name) else {
            continue;
        };
        let marker = if settings.is_set(def.name) { "*" } else { " " };
        let text = match value {
            OptionValue::Enum(v) => def.variant_name(v).map_or_else(|| v.to_string(), str::to_string),
            other => other.to_string(),
        };
        out.push_str(&format!("{}{} = {}\n", marker, def.name, text));
    }
    out
}

/// Process the input model and write the requested output
pub fn execute(invocation: &Invocation) -> anyhow::Result<RunSummary> {
    let Some(input) = &invocation.input else {
        bail!("no input model given");
    };
    let format = invocation
        .output
        .as_deref()
        .map(OutputFormat::from_path)
        .transpose()?;

    let mut iterator = GeometryIterator::open(input, invocation.params.clone())
        .with_context(|| format!("cannot start run on {}", input.display()))?;
    if !iterator.initialize()? {
        tracing::warn!(input = %input.display(), "No elements selected");
    }

    match (invocation.output.as_deref(), format) {
        (Some(path), Some(OutputFormat::Obj)) => {
            write_obj(&mut iterator, path, invocation.serializer.clone())?
        }
        (Some(path), Some(OutputFormat::Json)) => write_json(&mut iterator, path)?,
        _ => iterator.by_ref().for_each(drop),
    }

    Ok(iterator.summary())
}

fn write_obj(
    iterator: &mut GeometryIterator,
    path: &Path,
    settings: SerializerSettings,
) -> anyhow::Result<()> {
    let mtl_path = path.with_extension("mtl");
    let obj = BufWriter::new(
        File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
    );
    let mtl = BufWriter::new(
        File::create(&mtl_path).with_context(|| format!("cannot create {}", mtl_path.display()))?,
    );

    let mut serializer = ObjSerializer::new(obj, mtl, settings);
    if let Some(name) = mtl_path.file_name().and_then(|n| n.to_str()) {
        serializer = serializer.with_mtl_file_name(name);
    }
    serializer.write_header()?;
    for shape in iterator {
        serializer.write(&shape)?;
    }
    serializer.finalize()?;

    tracing::info!(
        path = %path.display(),
        elements = serializer.elements_written(),
        "OBJ written"
    );
    Ok(())
}

fn write_json(iterator: &mut GeometryIterator, path: &Path) -> anyhow::Result<()> {
    let shapes: Vec<Value> = iterator.map(|shape| shape_json(&shape)).collect::<anyhow::Result<_>>()?;
    let count = shapes.len();

    let mut out = BufWriter::new(
        File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
    );
    serde_json::to_writer(&mut out, &json!({ "elements": shapes }))?;
    out.flush()?;

    tracing::info!(path = %path.display(), elements = count, "JSON written");
    Ok(())
}

/// JSON record of one shape
pub fn shape_json(shape: &ElementShape) -> anyhow::Result<Value> {
    let geometry = match &shape.geometry {
        Geometry::Triangulated(mesh) => json!({
            "positions": mesh.positions,
            "normals": mesh.normals,
            "indices": mesh.indices,
            "material_ids": mesh.material_ids,
            "edges": mesh.edges,
        }),
        Geometry::Serialized(brep) => serde_json::from_str(brep)?,
    };

    Ok(json!({
        "id": shape.id,
        "guid": shape.guid,
        "name": shape.name,
        "type": shape.entity,
        "context": shape.context,
        "matrix": shape.matrix().to_vec(),
        "materials": shape.materials,
        "geometry": geometry,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifcgeom_core::names;

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::from_path(Path::new("a/b.OBJ")).unwrap(), OutputFormat::Obj);
        assert_eq!(OutputFormat::from_path(Path::new("b.json")).unwrap(), OutputFormat::Json);
        assert!(OutputFormat::from_path(Path::new("b.glb")).is_err());
        assert!(OutputFormat::from_path(Path::new("b")).is_err());
    }

    #[test]
    fn test_describe_settings() {
        let settings = Settings::new().with(names::CIRCLE_SEGMENTS, 32i64).unwrap();
        let text = describe_settings(&settings);
        assert!(text.contains("*circle-segments = 32"));
        assert!(text.contains(" weld-vertices = true"));
        assert!(text.contains(" iterator-output = TRIANGULATED"));
    }
}
