// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line behaviour and its equivalence with the programmatic API

use ifcgeom_cli::args::parse_from;
use ifcgeom_cli::config::{Config, LogFormat};
use ifcgeom_cli::run;
use ifcgeom_core::{names, Model, ObjectRef, Profile, Settings};
use ifcgeom_processing::create_shape;
use std::fs;
use std::path::Path;
use std::process::Command;

const MODEL: &str = r#"{
    "elements": [
        {
            "id": 1,
            "guid": "0K7w7JLLr3Bwd$Z1Kt9ZoR",
            "name": "Wall A",
            "entity": "IfcWall",
            "placement": {"location": [0, 5, 0]},
            "representations": [{
                "id": 10,
                "context": {"id": 1, "identifier": "Body", "type": "Model"},
                "items": [{"kind": "box", "min": [0, 0, 0], "max": [4, 0.2, 3]}]
            }]
        },
        {
            "id": 2,
            "entity": "IfcColumn",
            "representations": [{
                "id": 20,
                "context": {"id": 1, "identifier": "Body", "type": "Model"},
                "items": [{"kind": "circle_extrusion", "radius": 0.15, "depth": 3}]
            }]
        }
    ]
}"#;

/// Same model plus an element whose profile crosses itself
const BROKEN_MODEL: &str = r#"{
    "elements": [
        {
            "id": 1,
            "entity": "IfcWall",
            "representations": [{
                "id": 10,
                "context": {"id": 1, "identifier": "Body", "type": "Model"},
                "items": [{"kind": "box", "min": [0, 0, 0], "max": [4, 0.2, 3]}]
            }]
        },
        {
            "id": 3,
            "entity": "IfcBeam",
            "representations": [{
                "id": 30,
                "context": {"id": 1, "identifier": "Body", "type": "Model"},
                "items": [{
                    "kind": "extrusion",
                    "profile": [[0, 0], [1, 1], [1, 0], [0, 1]],
                    "depth": 1
                }]
            }]
        }
    ]
}"#;

fn config() -> Config {
    Config {
        threads: 1,
        log_format: LogFormat::Pretty,
    }
}

fn write_model(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

fn ifcgeom() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_ifcgeom"));
    // The error counter must not depend on what is displayed
    command.env("RUST_LOG", "off");
    command
}

#[test]
fn test_flags_match_settings_api() {
    let invocation = parse_from(
        [
            "ifcgeom",
            "model.json",
            "--weld-vertices",
            "--circle-segments",
            "8",
            "--model-rotation",
            "0,0,0.7071068,0.7071068",
            "--context-identifiers",
            "Body,Axis",
        ],
        &config(),
        |_| None,
    )
    .unwrap();

    let expected = Settings::with_profile(Profile::CommandLine)
        .with(names::WELD_VERTICES, true)
        .unwrap()
        .with(names::CIRCLE_SEGMENTS, 8i64)
        .unwrap()
        .with(names::MODEL_ROTATION, [0.0, 0.0, 0.7071068, 0.7071068])
        .unwrap()
        .with(names::CONTEXT_IDENTIFIERS, vec!["Body", "Axis"])
        .unwrap();

    assert_eq!(invocation.settings, expected);
    assert_eq!(invocation.params.context.identifiers, vec!["Body", "Axis"]);
}

#[test]
fn test_json_output_matches_single_shape_request() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_model(dir.path(), "model.json", MODEL);
    let output = dir.path().join("out.json");

    let invocation = parse_from(
        [
            "ifcgeom",
            input.as_str(),
            output.to_str().unwrap(),
            "--circle-segments",
            "12",
        ],
        &config(),
        |_| None,
    )
    .unwrap();
    let summary = run::execute(&invocation).unwrap();
    assert_eq!(summary.succeeded, 2);

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let elements = written["elements"].as_array().unwrap();
    assert_eq!(elements.len(), 2);

    let model = Model::open(&input).unwrap();
    let direct = create_shape(&invocation.settings, &model, ObjectRef(2)).unwrap();
    let column = elements.iter().find(|e| e["id"] == 2).unwrap();
    let positions: Vec<f64> = serde_json::from_value(column["geometry"]["positions"].clone()).unwrap();
    assert_eq!(positions, direct.mesh().unwrap().positions);

    let wall = elements.iter().find(|e| e["id"] == 1).unwrap();
    assert_eq!(wall["type"], "IfcWall");
    assert_eq!(wall["matrix"][7], 5.0);
}

#[test]
fn test_obj_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_model(dir.path(), "model.json", MODEL);
    let output = dir.path().join("model.obj");

    let status = ifcgeom()
        .arg(&input)
        .arg(&output)
        .arg("--use-element-names")
        .status()
        .unwrap();
    assert!(status.success());

    let obj = fs::read_to_string(&output).unwrap();
    assert!(obj.contains("mtllib model.mtl"));
    assert!(obj.contains("g Wall_A"));
    assert!(obj.contains("g product-2"));
    assert!(dir.path().join("model.mtl").exists());
}

#[test]
fn test_validate_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let broken = write_model(dir.path(), "broken.json", BROKEN_MODEL);
    let clean = write_model(dir.path(), "clean.json", MODEL);

    let status = ifcgeom().arg(&broken).arg("--validate").status().unwrap();
    assert_eq!(status.code(), Some(1));

    // Without --validate a per-element failure does not fail the run
    let status = ifcgeom().arg(&broken).status().unwrap();
    assert_eq!(status.code(), Some(0));

    let status = ifcgeom().arg(&clean).arg("--validate").status().unwrap();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn test_fatal_errors_exit_code() {
    let dir = tempfile::tempdir().unwrap();

    let status = ifcgeom()
        .arg(dir.path().join("missing.json"))
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));

    let input = write_model(dir.path(), "model.json", MODEL);
    let status = ifcgeom()
        .arg(&input)
        .args(["--include", "entities", "IfcWall", "--exclude", "layers", "X"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));

    let status = ifcgeom()
        .arg(&input)
        .args(["--model-offset", "1,2"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(2));
}

#[test]
fn test_print_settings() {
    let output = ifcgeom()
        .args(["--print-settings", "--circle-segments", "20"])
        .env("IFCGEOM_USE_WORLD_COORDS", "true")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(" weld-vertices = false"));
    assert!(stdout.contains("*circle-segments = 20"));
    assert!(stdout.contains("*use-world-coords = true"));
    assert!(stdout.contains(" unit-name = METER"));
}
