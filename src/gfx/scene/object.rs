use crate::gfx::geometry::GeometryId;
use crate::gfx::resources::MaterialId;
use crate::gfx::transform::Transform;

slotmap::new_key_type! {
    /// Key of an object stored in a [`Scene`](super::Scene).
    pub struct ObjectId;
}

/// Geometry and material drawn for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBinding {
    pub geometry: GeometryId,
    pub material: MaterialId,
}

/// A named entity with a local transform and an optional parent.
///
/// The parent is a key into the owning scene, never an owning reference.
/// Objects only know their parent; children are not tracked.
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    pub(super) parent: Option<ObjectId>,
    pub mesh: Option<MeshBinding>,
}

impl Default for SceneObject {
    fn default() -> Self {
        Self::new("untitled object", Transform::default())
    }
}

impl SceneObject {
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            parent: None,
            mesh: None,
        }
    }

    /// Builder pattern: Attach to a parent at creation
    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Builder pattern: Make the object drawable
    pub fn with_mesh(mut self, geometry: GeometryId, material: MaterialId) -> Self {
        self.mesh = Some(MeshBinding { geometry, material });
        self
    }

    /// Parent key as stored. It may no longer resolve; use
    /// [`Scene::parent`](super::Scene::parent) for the resolved parent.
    pub fn parent_key(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn is_renderable(&self) -> bool {
        self.mesh.is_some()
    }
}
