//! A typed parameter dictionary used by the shape `create` paths. The
//! scene loader fills one in from the description file; the shape
//! constructors look parameters up by name with a default for anything
//! left unspecified.

use log::warn;

use crate::core::geometry::{Normal3f, Point2f, Point3f, Vector3f};
use crate::core::glint::Float;

#[derive(Debug, Default, Clone)]
pub struct ParamSetItem<T> {
    pub name: String,
    pub values: Vec<T>,
}

#[derive(Debug, Default, Clone)]
pub struct ParamSet {
    pub ints: Vec<ParamSetItem<i32>>,
    pub floats: Vec<ParamSetItem<Float>>,
    pub point2fs: Vec<ParamSetItem<Point2f>>,
    pub point3fs: Vec<ParamSetItem<Point3f>>,
    pub vector3fs: Vec<ParamSetItem<Vector3f>>,
    pub normals: Vec<ParamSetItem<Normal3f>>,
    pub strings: Vec<ParamSetItem<String>>,
}

impl ParamSet {
    pub fn add_int(&mut self, name: &str, value: i32) {
        self.ints.push(ParamSetItem {
            name: name.to_string(),
            values: vec![value],
        });
    }
    pub fn add_ints(&mut self, name: &str, values: Vec<i32>) {
        self.ints.push(ParamSetItem {
            name: name.to_string(),
            values,
        });
    }
    pub fn add_float(&mut self, name: &str, value: Float) {
        self.floats.push(ParamSetItem {
            name: name.to_string(),
            values: vec![value],
        });
    }
    pub fn add_string(&mut self, name: &str, value: &str) {
        self.strings.push(ParamSetItem {
            name: name.to_string(),
            values: vec![value.to_string()],
        });
    }
    /// Interpret a flat float list as (u, v) pairs.
    pub fn add_point2fs(&mut self, name: &str, values: Vec<Float>) {
        if values.len() % 2 != 0 {
            warn!("excess value given with point2 parameter \"{}\"", name);
        }
        let points = values
            .chunks_exact(2)
            .map(|c| Point2f { x: c[0], y: c[1] })
            .collect();
        self.point2fs.push(ParamSetItem {
            name: name.to_string(),
            values: points,
        });
    }
    /// Interpret a flat float list as (x, y, z) triples.
    pub fn add_point3fs(&mut self, name: &str, values: Vec<Float>) {
        if values.len() % 3 != 0 {
            warn!("excess values given with point3 parameter \"{}\"", name);
        }
        let points = values
            .chunks_exact(3)
            .map(|c| Point3f {
                x: c[0],
                y: c[1],
                z: c[2],
            })
            .collect();
        self.point3fs.push(ParamSetItem {
            name: name.to_string(),
            values: points,
        });
    }
    pub fn add_vector3fs(&mut self, name: &str, values: Vec<Float>) {
        if values.len() % 3 != 0 {
            warn!("excess values given with vector3 parameter \"{}\"", name);
        }
        let vectors = values
            .chunks_exact(3)
            .map(|c| Vector3f {
                x: c[0],
                y: c[1],
                z: c[2],
            })
            .collect();
        self.vector3fs.push(ParamSetItem {
            name: name.to_string(),
            values: vectors,
        });
    }
    pub fn add_normal3fs(&mut self, name: &str, values: Vec<Float>) {
        if values.len() % 3 != 0 {
            warn!("excess values given with normal parameter \"{}\"", name);
        }
        let normals = values
            .chunks_exact(3)
            .map(|c| Normal3f {
                x: c[0],
                y: c[1],
                z: c[2],
            })
            .collect();
        self.normals.push(ParamSetItem {
            name: name.to_string(),
            values: normals,
        });
    }
    pub fn find_one_int(&self, name: &str, d: i32) -> i32 {
        find_one(&self.ints, name).unwrap_or(d)
    }
    pub fn find_one_float(&self, name: &str, d: Float) -> Float {
        find_one(&self.floats, name).unwrap_or(d)
    }
    pub fn find_one_string(&self, name: &str, d: &str) -> String {
        find_one(&self.strings, name).unwrap_or_else(|| d.to_string())
    }
    pub fn find_int(&self, name: &str) -> Vec<i32> {
        find_all(&self.ints, name)
    }
    pub fn find_float(&self, name: &str) -> Vec<Float> {
        find_all(&self.floats, name)
    }
    pub fn find_point2f(&self, name: &str) -> Vec<Point2f> {
        find_all(&self.point2fs, name)
    }
    pub fn find_point3f(&self, name: &str) -> Vec<Point3f> {
        find_all(&self.point3fs, name)
    }
    pub fn find_vector3f(&self, name: &str) -> Vec<Vector3f> {
        find_all(&self.vector3fs, name)
    }
    pub fn find_normal3f(&self, name: &str) -> Vec<Normal3f> {
        find_all(&self.normals, name)
    }
}

fn find_one<T: Clone>(items: &[ParamSetItem<T>], name: &str) -> Option<T> {
    items
        .iter()
        .find(|item| item.name == name)
        .and_then(|item| item.values.first().cloned())
}

fn find_all<T: Clone>(items: &[ParamSetItem<T>], name: &str) -> Vec<T> {
    items
        .iter()
        .find(|item| item.name == name)
        .map(|item| item.values.clone())
        .unwrap_or_default()
}
