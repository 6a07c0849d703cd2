//! Spawn point allocation (host only)
//!
//! Respawns draw from a queue built out of whole shuffled passes over the
//! level's spawn points, so every point is used once before any repeats.

use glam::Vec3;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use super::scene::{discover, SceneGraph};
use super::{MAX_LIVES, MAX_PLAYERS_SUPPORTED};

/// Where a combatant lands when the level exposes no spawn points at all
pub const DEFAULT_SPAWN: Vec3 = Vec3::new(0.0, 0.0, 0.0);

/// One spawn per life for a full room
pub const ROUND_CAPACITY: usize = MAX_PLAYERS_SUPPORTED * MAX_LIVES as usize;

/// Concatenate independent permutations of `points` until `capacity` is
/// covered, then cut to exactly `capacity`.
pub fn generate<R: Rng + ?Sized>(points: &[Vec3], capacity: usize, rng: &mut R) -> Vec<Vec3> {
    if points.is_empty() {
        return Vec::new();
    }

    let mut queue = Vec::with_capacity(capacity + points.len());
    while queue.len() < capacity {
        let mut pass = points.to_vec();
        pass.shuffle(rng);
        queue.extend(pass);
    }
    queue.truncate(capacity);
    queue
}

/// Host-private spawn queue for the current round
pub struct SpawnAllocator {
    scene: Box<dyn SceneGraph>,
    /// Points seen in the last successful discovery
    known: Vec<Vec3>,
    queue: Vec<Vec3>,
    stale: bool,
    capacity: usize,
    rng: ChaCha8Rng,
}

impl SpawnAllocator {
    pub fn new(scene: Box<dyn SceneGraph>, capacity: usize, seed: u64) -> Self {
        Self {
            scene,
            known: Vec::new(),
            queue: Vec::new(),
            stale: true,
            capacity,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Mark the queue stale; the next pop rebuilds it
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Positions left before the next regeneration
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Rebuild the queue from the scene. Returns the new queue length, zero
    /// if the scene exposed no points (the queue then stays stale).
    pub fn regenerate(&mut self) -> usize {
        let discovered = discover(self.scene.as_ref());
        if discovered.is_empty() {
            self.queue.clear();
            return 0;
        }

        self.queue = generate(&discovered, self.capacity, &mut self.rng);
        // popped from the back, so keep passes in generated order
        self.queue.reverse();
        self.known = discovered;
        self.stale = false;
        debug!(
            points = self.known.len(),
            capacity = self.queue.len(),
            "Spawn queue generated"
        );
        self.queue.len()
    }

    /// Next spawn position. Never fails: falls back to a uniform draw over
    /// previously known points, then to [`DEFAULT_SPAWN`].
    pub fn next(&mut self) -> Vec3 {
        if self.stale || self.queue.is_empty() {
            self.regenerate();
        }

        if let Some(position) = self.queue.pop() {
            return position;
        }

        if let Some(position) = self.known.choose(&mut self.rng) {
            warn!("Spawn scene unavailable, drawing from known points");
            return *position;
        }

        warn!("No spawn points known, using default spawn");
        DEFAULT_SPAWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::scene::ArenaScene;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Scene whose spawn markers can be unloaded mid-test
    #[derive(Clone, Default)]
    struct SharedScene(Arc<Mutex<Vec<Vec3>>>);

    impl SceneGraph for SharedScene {
        fn spawn_point(&self, index: usize) -> Option<Vec3> {
            self.0.lock().get(index).copied()
        }
    }

    fn points(n: usize) -> Vec<Vec3> {
        (0..n).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect()
    }

    fn count(queue: &[Vec3]) -> HashMap<u32, usize> {
        let mut counts = HashMap::new();
        for p in queue {
            *counts.entry(p.x as u32).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_generate_balances_every_point() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let n = 8;
        let queue = generate(&points(n), ROUND_CAPACITY, &mut rng);
        assert_eq!(queue.len(), ROUND_CAPACITY);

        let (lo, hi) = (ROUND_CAPACITY / n, ROUND_CAPACITY.div_ceil(n));
        let counts = count(&queue);
        assert_eq!(counts.len(), n);
        for uses in counts.values() {
            assert!(*uses == lo || *uses == hi, "point used {uses} times");
        }
    }

    #[test]
    fn test_generate_no_repeat_within_a_pass() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let n = 7;
        let queue = generate(&points(n), 30, &mut rng);
        for pass in queue.chunks(n) {
            let distinct = count(pass);
            assert_eq!(distinct.len(), pass.len());
        }
    }

    #[test]
    fn test_generate_with_no_points_is_empty() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(generate(&[], 30, &mut rng).is_empty());
    }

    #[test]
    fn test_next_walks_whole_passes_before_repeating() {
        let mut spawns = SpawnAllocator::new(Box::new(ArenaScene::new(points(5))), 10, 4);
        let first: Vec<Vec3> = (0..5).map(|_| spawns.next()).collect();
        assert_eq!(count(&first).len(), 5);
        assert_eq!(spawns.remaining(), 5);
    }

    #[test]
    fn test_exhausted_queue_regenerates() {
        let mut spawns = SpawnAllocator::new(Box::new(ArenaScene::new(points(3))), 3, 5);
        for _ in 0..3 {
            spawns.next();
        }
        assert_eq!(spawns.remaining(), 0);
        spawns.next();
        assert_eq!(spawns.remaining(), 2);
    }

    #[test]
    fn test_invalidate_forces_fresh_queue() {
        let mut spawns = SpawnAllocator::new(Box::new(ArenaScene::new(points(4))), 12, 6);
        spawns.next();
        assert_eq!(spawns.remaining(), 11);

        spawns.invalidate();
        spawns.next();
        assert_eq!(spawns.remaining(), 11);
    }

    #[test]
    fn test_unloaded_scene_falls_back_to_known_points() {
        let scene = SharedScene::default();
        *scene.0.lock() = points(2);
        let mut spawns = SpawnAllocator::new(Box::new(scene.clone()), 2, 7);
        spawns.next();

        scene.0.lock().clear();
        spawns.invalidate();
        for _ in 0..10 {
            let p = spawns.next();
            assert!(p.x == 0.0 || p.x == 1.0);
        }
    }

    #[test]
    fn test_no_points_ever_uses_default() {
        let mut spawns = SpawnAllocator::new(Box::new(SharedScene::default()), 30, 8);
        assert_eq!(spawns.next(), DEFAULT_SPAWN);
        assert_eq!(spawns.next(), DEFAULT_SPAWN);
    }
}
