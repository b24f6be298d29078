//! The six primitive families. All of them answer the same nine
//! questions - bounds, normal bounds, two intersection queries, area,
//! and four sampling/density queries - dispatched through the
//! [`Shape`](crate::core::shape::Shape) handle.
//!
//! ## Spheres, disks, cylinders
//!
//! The quadrics live at canonical positions in their own object space
//! (a sphere about the origin, a disk in the z = height plane, a
//! cylinder around the z axis) and carry a pair of transforms between
//! object and render space. Each supports an axial clip range and an
//! azimuthal wedge.
//!
//! ## Triangle meshes and bilinear patch meshes
//!
//! Rather than storing vertex positions per primitive, entire meshes
//! are registered once in process-wide tables and each triangle or
//! patch is a pair of indices into them, which keeps the per-primitive
//! footprint at eight bytes across scenes with millions of primitives.
//! Mesh vertex data is baked into render space at registration.
//!
//! ## Curves
//!
//! Thin sweeps of a cubic Bezier spine, for hair and fur. One described
//! curve is split into segments that are intersected by recursive
//! subdivision in a ray-aligned coordinate system.

pub mod bilinear;
pub mod curve;
pub mod cylinder;
pub mod disk;
pub mod sphere;
pub mod triangle;
