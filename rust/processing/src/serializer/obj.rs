// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ + MTL writer

use crate::materials::OutputMaterial;
use crate::output::ElementShape;
use ifcgeom_core::keys::serializer as keys;
use ifcgeom_core::SerializerSettings;
use std::io::{self, Write};

/// Material name for faces without a style
pub const DEFAULT_MATERIAL: &str = "default";

/// Writes triangulated element shapes to an OBJ stream and their materials
/// to a companion MTL stream
pub struct ObjSerializer<W: Write> {
    obj: W,
    mtl: W,
    settings: SerializerSettings,
    mtl_file_name: Option<String>,
    /// Next 1-based OBJ vertex index
    vertex_base: usize,
    /// (material, emitted name) in first-use order
    materials: Vec<(OutputMaterial, String)>,
    uses_default: bool,
    written: usize,
}

impl<W: Write> ObjSerializer<W> {
    pub fn new(obj: W, mtl: W, settings: SerializerSettings) -> Self {
        Self {
            obj,
            mtl,
            settings,
            mtl_file_name: None,
            vertex_base: 1,
            materials: Vec::new(),
            uses_default: false,
            written: 0,
        }
    }

    /// Reference the MTL file by name from the OBJ header
    pub fn with_mtl_file_name(mut self, name: impl Into<String>) -> Self {
        self.mtl_file_name = Some(name.into());
        self
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.obj, "# File generated by ifcgeom {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(
            self.obj,
            "# Units: {} ({})",
            self.settings.value(keys::UNIT_NAME),
            self.settings.value(keys::UNIT_MAGNITUDE)
        )?;
        if let Some(name) = &self.mtl_file_name {
            writeln!(self.obj, "mtllib {}", name)?;
        }
        writeln!(self.mtl, "# File generated by ifcgeom {}", env!("CARGO_PKG_VERSION"))?;
        Ok(())
    }

    /// Append one element. Shapes in local coordinates are moved to world
    /// coordinates; serialized shapes are skipped.
    pub fn write(&mut self, shape: &ElementShape) -> io::Result<()> {
        let Some(mesh) = shape.world_mesh() else {
            tracing::warn!(element = shape.id, "OBJ output needs triangulated geometry, element skipped");
            return Ok(());
        };

        writeln!(self.obj, "g {}", self.object_name(shape))?;

        for p in mesh.positions.chunks_exact(3) {
            writeln!(self.obj, "v {} {} {}", p[0], p[1], p[2])?;
        }
        let has_normals = !mesh.normals.is_empty();
        for n in mesh.normals.chunks_exact(3) {
            writeln!(self.obj, "vn {} {} {}", n[0], n[1], n[2])?;
        }

        let base = self.vertex_base;
        let mut active: Option<i32> = None;
        for (tri, &material) in mesh.indices.chunks_exact(3).zip(&mesh.material_ids) {
            if active != Some(material) {
                let name = self.material_name(shape, material);
                writeln!(self.obj, "usemtl {}", name)?;
                active = Some(material);
            }
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| i as usize + base);
            if has_normals {
                writeln!(self.obj, "f {a}//{a} {b}//{b} {c}//{c}")?;
            } else {
                writeln!(self.obj, "f {a} {b} {c}")?;
            }
        }

        for edge in mesh.edges.chunks_exact(2) {
            writeln!(self.obj, "l {} {}", edge[0] as usize + base, edge[1] as usize + base)?;
        }

        self.vertex_base += mesh.vertex_count();
        self.written += 1;
        Ok(())
    }

    /// Write the MTL stream and flush both outputs
    pub fn finalize(&mut self) -> io::Result<()> {
        if self.uses_default {
            writeln!(self.mtl, "newmtl {}", DEFAULT_MATERIAL)?;
            writeln!(self.mtl, "Kd 0.8 0.8 0.8")?;
            writeln!(self.mtl, "d 1")?;
        }
        for (material, name) in &self.materials {
            let [r, g, b, a] = material.color;
            writeln!(self.mtl, "newmtl {}", name)?;
            writeln!(self.mtl, "Kd {} {} {}", r, g, b)?;
            writeln!(self.mtl, "d {}", a)?;
        }

        self.obj.flush()?;
        self.mtl.flush()?;
        tracing::debug!(
            elements = self.written,
            materials = self.materials.len(),
            "OBJ output finalized"
        );
        Ok(())
    }

    pub fn elements_written(&self) -> usize {
        self.written
    }

    fn object_name(&self, shape: &ElementShape) -> String {
        let name = if self.settings.value(keys::USE_ELEMENT_GUIDS) && !shape.guid.is_empty() {
            shape.guid.clone()
        } else if let Some(name) = shape
            .name
            .as_ref()
            .filter(|_| self.settings.value(keys::USE_ELEMENT_NAMES))
        {
            name.clone()
        } else if self.settings.value(keys::USE_ELEMENT_STEP_IDS) {
            format!("id{}", shape.id)
        } else {
            format!("product-{}", shape.id)
        };
        sanitize(&name)
    }

    fn material_name(&mut self, shape: &ElementShape, material: i32) -> String {
        let Some(material) = usize::try_from(material)
            .ok()
            .and_then(|i| shape.materials.get(i))
        else {
            self.uses_default = true;
            return DEFAULT_MATERIAL.to_string();
        };

        if let Some((_, name)) = self.materials.iter().find(|(m, _)| m == material) {
            return name.clone();
        }

        let index = self.materials.len();
        let base = sanitize(&material.name);
        let name = if self.settings.value(keys::USE_MATERIAL_NAMES) {
            if self.materials.iter().any(|(_, n)| *n == base) {
                format!("{}-{}", base, index)
            } else {
                base
            }
        } else {
            format!("surface-style-{}-{}", index, base)
        };
        self.materials.push((material.clone(), name.clone()));
        name
    }
}

/// OBJ names cannot contain whitespace
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Geometry;
    use ifcgeom_core::names;
    use ifcgeom_geometry::{box_shape, Matrix4, Mesh, Point3, Vector3};

    fn element_shape(id: u32, material: i32, materials: Vec<OutputMaterial>) -> ElementShape {
        let shape = box_shape(Point3::origin(), Point3::new(1.0, 1.0, 1.0), material).unwrap();
        ElementShape {
            id,
            guid: format!("GUID{}", id),
            name: Some(format!("Wall {}", id)),
            entity: "IfcWall".to_string(),
            context: "Body".to_string(),
            transformation: Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0)),
            geometry: Geometry::Triangulated(Mesh::from_shape(&shape, true, 1e-6).unwrap()),
            materials,
        }
    }

    fn concrete() -> OutputMaterial {
        OutputMaterial {
            name: "Concrete C30".to_string(),
            color: [0.5, 0.5, 0.5, 1.0],
        }
    }

    fn serialize(settings: SerializerSettings, shapes: &[ElementShape]) -> (String, String) {
        let mut obj = Vec::new();
        let mut mtl = Vec::new();
        {
            let mut serializer = ObjSerializer::new(&mut obj, &mut mtl, settings);
            serializer.write_header().unwrap();
            for shape in shapes {
                serializer.write(shape).unwrap();
            }
            serializer.finalize().unwrap();
        }
        (String::from_utf8(obj).unwrap(), String::from_utf8(mtl).unwrap())
    }

    #[test]
    fn test_obj_output() {
        let shapes = [element_shape(1, 0, vec![concrete()]), element_shape(2, 0, vec![concrete()])];
        let (obj, mtl) = serialize(SerializerSettings::serializer(), &shapes);

        assert!(obj.contains("g product-1"));
        assert!(obj.contains("g product-2"));
        assert_eq!(obj.lines().filter(|l| l.starts_with("v ")).count(), 16);
        assert_eq!(obj.lines().filter(|l| l.starts_with("f ")).count(), 24);
        // Second element indices continue after the first element's 8 vertices
        assert!(obj.lines().filter(|l| l.starts_with("f ")).skip(12).all(|l| {
            l[2..].split(' ').all(|i| i.parse::<usize>().unwrap() > 8)
        }));
        // World coordinates applied
        assert!(obj.lines().any(|l| l.starts_with("v 10 ")));

        assert_eq!(mtl.matches("newmtl").count(), 1);
        assert!(mtl.contains("newmtl surface-style-0-Concrete_C30"));
        assert!(mtl.contains("Kd 0.5 0.5 0.5"));
    }

    #[test]
    fn test_names_from_settings() {
        let settings = SerializerSettings::serializer()
            .with(names::USE_ELEMENT_GUIDS, true)
            .unwrap()
            .with(names::USE_MATERIAL_NAMES, true)
            .unwrap();
        let (obj, mtl) = serialize(settings, &[element_shape(3, 0, vec![concrete()])]);
        assert!(obj.contains("g GUID3"));
        assert!(obj.contains("usemtl Concrete_C30"));
        assert!(mtl.contains("newmtl Concrete_C30"));

        let settings = SerializerSettings::serializer().with(names::USE_ELEMENT_NAMES, true).unwrap();
        let (obj, _) = serialize(settings, &[element_shape(3, 0, vec![concrete()])]);
        assert!(obj.contains("g Wall_3"));
    }

    #[test]
    fn test_unstyled_faces_use_default_material() {
        let (obj, mtl) = serialize(SerializerSettings::serializer(), &[element_shape(4, -1, Vec::new())]);
        assert!(obj.contains("usemtl default"));
        assert!(mtl.contains("newmtl default"));
    }
}
