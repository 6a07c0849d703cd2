//! Scene graph boundary: named spawn points in world space

use glam::Vec3;

/// Upper bound on spawn point indices checked in one discovery pass
pub const MAX_SPAWN_POINTS: usize = 64;

/// Spawn point lookup provided by the loaded level
pub trait SceneGraph: Send {
    /// World-space position of spawn point `index`, or `None` past the last
    /// one (or while the level is not loaded)
    fn spawn_point(&self, index: usize) -> Option<Vec3>;
}

/// Walk spawn points in index order until the scene runs out
pub fn discover(scene: &dyn SceneGraph) -> Vec<Vec3> {
    (0..MAX_SPAWN_POINTS)
        .map_while(|index| scene.spawn_point(index))
        .collect()
}

/// The arena level: fixed spawn markers around the map
#[derive(Debug, Clone)]
pub struct ArenaScene {
    spawn_points: Vec<Vec3>,
}

impl ArenaScene {
    pub fn new(spawn_points: Vec<Vec3>) -> Self {
        Self { spawn_points }
    }
}

impl Default for ArenaScene {
    fn default() -> Self {
        Self::new(vec![
            Vec3::new(-12.0, 0.0, -12.0),
            Vec3::new(0.0, 0.0, -14.0),
            Vec3::new(12.0, 0.0, -12.0),
            Vec3::new(14.0, 0.0, 0.0),
            Vec3::new(12.0, 0.0, 12.0),
            Vec3::new(0.0, 0.0, 14.0),
            Vec3::new(-12.0, 0.0, 12.0),
            Vec3::new(-14.0, 0.0, 0.0),
        ])
    }
}

impl SceneGraph for ArenaScene {
    fn spawn_point(&self, index: usize) -> Option<Vec3> {
        self.spawn_points.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Endless;

    impl SceneGraph for Endless {
        fn spawn_point(&self, index: usize) -> Option<Vec3> {
            Some(Vec3::new(index as f32, 0.0, 0.0))
        }
    }

    #[test]
    fn test_discover_reads_in_index_order() {
        let points = discover(&ArenaScene::default());
        assert_eq!(points.len(), 8);
        assert_eq!(points[0], Vec3::new(-12.0, 0.0, -12.0));
    }

    #[test]
    fn test_discover_is_bounded() {
        assert_eq!(discover(&Endless).len(), MAX_SPAWN_POINTS);
    }
}
