//! # Scene Management Module
//!
//! Hierarchical scene objects. Each [`SceneObject`] carries a local
//! [`Transform`](crate::gfx::transform::Transform) and an optional parent
//! key; the [`Scene`] arena resolves world matrices by walking parent keys
//! upward.
//!
//! ## Key Components
//!
//! - [`Scene`] - slot-map arena owning every object
//! - [`SceneObject`] - name, local transform, parent key, optional mesh binding
//! - [`ObjectId`] - stable key; stale keys resolve to nothing
//!
//! ## Usage
//!
//! ```
//! use cgmath::Vector3;
//! use tartan::gfx::scene::{Scene, SceneObject};
//! use tartan::gfx::transform::Transform;
//!
//! let mut scene = Scene::new();
//! let sun = scene.add_object(SceneObject::new("sun", Transform::default()));
//! let earth = scene.add_object(
//!     SceneObject::new("earth", Transform::from_position(Vector3::new(5.0, 0.0, 0.0)))
//!         .with_parent(sun),
//! );
//! assert!(scene.world_matrix(earth).is_some());
//! ```

pub mod object;
pub mod scene;

// Re-export main types
pub use object::{MeshBinding, ObjectId, SceneObject};
pub use scene::{Scene, SceneStatistics};
