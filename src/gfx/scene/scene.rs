use cgmath::Matrix4;
use slotmap::SlotMap;

use crate::error::{GfxError, GfxResult};

use super::object::{ObjectId, SceneObject};

/// Arena of scene objects addressed by [`ObjectId`].
///
/// Removing an object never touches the objects that named it as their
/// parent. Their parent key simply stops resolving and they behave as roots.
#[derive(Debug, Default)]
pub struct Scene {
    objects: SlotMap<ObjectId, SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: SlotMap::with_key(),
        }
    }

    /// Adds an object and returns its key.
    ///
    /// A parent set through [`SceneObject::with_parent`] already exists in
    /// the arena, so hierarchies built this way are acyclic.
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        if let Some(parent) = object.parent {
            if !self.objects.contains_key(parent) {
                log::debug!(
                    "object '{}' added with a parent that does not resolve",
                    object.name
                );
            }
        }
        self.objects.insert(object)
    }

    /// Removes an object. Its children keep their now dangling parent key.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        self.objects.remove(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter()
    }

    /// Resolved parent of `id`, `None` for roots and dangling parents.
    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.objects
            .get(id)?
            .parent
            .filter(|parent| self.objects.contains_key(*parent))
    }

    /// Re-parents an object.
    ///
    /// Rejects a parent that is the object itself or one of its descendants,
    /// since that would close a cycle.
    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> GfxResult<()> {
        if !self.objects.contains_key(child) {
            return Err(GfxError::StaleKey("scene object"));
        }

        let mut ancestor = parent;
        while let Some(id) = ancestor {
            if id == child {
                return Err(GfxError::ParentCycle);
            }
            ancestor = self.objects.get(id).and_then(|o| o.parent);
        }

        if let Some(object) = self.objects.get_mut(child) {
            object.parent = parent;
        }
        Ok(())
    }

    pub fn local_matrix(&self, id: ObjectId) -> Option<Matrix4<f32>> {
        self.objects.get(id).map(|o| o.transform.local_matrix())
    }

    /// Cumulative transform from the object's local space to world space.
    ///
    /// Walks the parent chain upward, prepending each ancestor's local
    /// matrix, and stops at a root or at a parent key that no longer
    /// resolves. The chain is assumed acyclic.
    pub fn world_matrix(&self, id: ObjectId) -> Option<Matrix4<f32>> {
        let object = self.objects.get(id)?;
        let mut matrix = object.transform.local_matrix();
        let mut parent = object.parent;

        while let Some(parent_id) = parent {
            let Some(ancestor) = self.objects.get(parent_id) else {
                break;
            };
            matrix = ancestor.transform.local_matrix() * matrix;
            parent = ancestor.parent;
        }

        Some(matrix)
    }

    /// Number of resolvable ancestors.
    pub fn depth(&self, id: ObjectId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Gets statistics about the scene
    pub fn get_statistics(&self) -> SceneStatistics {
        SceneStatistics {
            object_count: self.objects.len(),
            renderable_count: self.objects.values().filter(|o| o.is_renderable()).count(),
            root_count: self
                .objects
                .keys()
                .filter(|id| self.parent(*id).is_none())
                .count(),
            max_depth: self.objects.keys().map(|id| self.depth(id)).max().unwrap_or(0),
        }
    }
}

/// Scene statistics for debugging and display
#[derive(Debug, PartialEq, Eq)]
pub struct SceneStatistics {
    pub object_count: usize,
    pub renderable_count: usize,
    pub root_count: usize,
    pub max_depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::transform::{assert_matrix_near, Transform};
    use cgmath::Vector3;

    fn transform(x: f32, yaw: f32, scale: f32) -> Transform {
        Transform::from_position(Vector3::new(x, 0.5, -1.0))
            .with_rotation(Vector3::new(0.1, yaw, 0.0))
            .with_uniform_scale(scale)
    }

    #[test]
    fn test_root_world_matrix_is_local() {
        let mut scene = Scene::new();
        let root = scene.add_object(SceneObject::new("sun", transform(1.0, 0.4, 2.0)));

        assert_matrix_near(
            scene.world_matrix(root).unwrap(),
            scene.local_matrix(root).unwrap(),
        );
    }

    #[test]
    fn test_child_world_matrix_composes_parent_first() {
        let mut scene = Scene::new();
        let sun = scene.add_object(SceneObject::new("sun", transform(0.0, 0.2, 2.0)));
        let earth = scene
            .add_object(SceneObject::new("earth", transform(5.0, 0.5, 0.4)).with_parent(sun));
        let moon = scene
            .add_object(SceneObject::new("moon", transform(0.5, 1.0, 0.25)).with_parent(earth));

        for (child, parent) in [(earth, sun), (moon, earth)] {
            let expected =
                scene.world_matrix(parent).unwrap() * scene.local_matrix(child).unwrap();
            assert_matrix_near(scene.world_matrix(child).unwrap(), expected);
        }
        assert_eq!(scene.depth(moon), 2);
    }

    #[test]
    fn test_dangling_parent_is_treated_as_root() {
        let mut scene = Scene::new();
        let parent = scene.add_object(SceneObject::new("parent", transform(3.0, 0.0, 1.0)));
        let child =
            scene.add_object(SceneObject::new("child", transform(1.0, 0.3, 1.0)).with_parent(parent));

        scene.remove_object(parent);

        assert_eq!(scene.parent(child), None);
        assert_eq!(scene.object(child).unwrap().parent_key(), Some(parent));
        assert_matrix_near(
            scene.world_matrix(child).unwrap(),
            scene.local_matrix(child).unwrap(),
        );
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let mut scene = Scene::new();
        let a = scene.add_object(SceneObject::default());
        let b = scene.add_object(SceneObject::default().with_parent(a));
        let c = scene.add_object(SceneObject::default().with_parent(b));

        assert!(matches!(scene.set_parent(a, Some(c)), Err(GfxError::ParentCycle)));
        assert!(matches!(scene.set_parent(a, Some(a)), Err(GfxError::ParentCycle)));
        assert_eq!(scene.parent(a), None);

        scene.set_parent(c, Some(a)).unwrap();
        assert_eq!(scene.parent(c), Some(a));
        scene.set_parent(c, None).unwrap();
        assert_eq!(scene.depth(c), 0);
    }

    #[test]
    fn test_missing_object_has_no_matrix() {
        let mut scene = Scene::new();
        let id = scene.add_object(SceneObject::default());
        scene.remove_object(id);

        assert!(scene.world_matrix(id).is_none());
        assert!(matches!(
            scene.set_parent(id, None),
            Err(GfxError::StaleKey(_))
        ));
    }

    #[test]
    fn test_statistics() {
        let mut scene = Scene::new();
        let root = scene.add_object(SceneObject::new("planet", Transform::default()));
        scene.add_object(SceneObject::new("moon", Transform::default()).with_parent(root));

        assert_eq!(
            scene.get_statistics(),
            SceneStatistics {
                object_count: 2,
                renderable_count: 0,
                root_count: 1,
                max_depth: 1,
            }
        );
        assert_eq!(SceneObject::default().name, "untitled object");
    }
}
