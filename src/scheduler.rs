//! Cooperative per-step task scheduler.
//!
//! Long-running behaviours that would otherwise suspend across frames (the
//! mismatch-spark loop and the follow-while-held pull) are explicit tasks
//! stored in [`CableScheduler`].  Every physics step [`tick_tasks`] re-evaluates
//! each task's continuation condition; a task whose condition fails removes
//! itself.  Anyone holding a [`TaskId`] can [`CableScheduler::cancel`] it
//! immediately, without waiting for the next tick.
//!
//! Tasks run in creation order so a run is reproducible for a given seed.

use crate::config::CableConfig;
use crate::connector::tick_mismatch;
use crate::draggable::tick_follow;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

/// A cooperative task.  Holds only the state it needs between ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum CableTask {
    /// Periodic spark cue while a connector stays linked to a wrong partner.
    MismatchFeedback {
        connector: Entity,
        /// Seconds until the next spark; `<= 0` fires on the next tick.
        countdown: f32,
    },
    /// Pull the adjacent chain point after a held endpoint.
    FollowHeld {
        endpoint: Entity,
        point: Entity,
        /// Velocity of the critically-damped follow spring.
        velocity: Vec3,
    },
}

/// Outcome of one task tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStep {
    /// Keep running with the updated state.
    Continue(CableTask),
    /// Continuation condition failed; drop the task.
    Finish,
}

/// Resource owning every live task.
#[derive(Resource, Debug)]
pub struct CableScheduler {
    tasks: BTreeMap<TaskId, CableTask>,
    next_id: u64,
    rng: StdRng,
}

impl Default for CableScheduler {
    fn default() -> Self {
        Self::with_seed(crate::constants::MISMATCH_RNG_SEED)
    }
}

impl CableScheduler {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_id: 1,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Register a task; it first runs on the next [`tick_tasks`].
    pub fn spawn(&mut self, task: CableTask) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(id, task);
        id
    }

    /// Remove a task immediately.  Returns `false` if it had already ended.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    pub fn is_active(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn get(&self, id: TaskId) -> Option<&CableTask> {
        self.tasks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Snapshot of live task ids in run order.
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.keys().copied().collect()
    }

    /// Draw a spark interval in `[min, max)`.
    pub fn next_period(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    fn store(&mut self, id: TaskId, task: CableTask) {
        // A task cancelled during its own tick must stay cancelled.
        if let Some(slot) = self.tasks.get_mut(&id) {
            *slot = task;
        }
    }
}

/// Advance every live task by `dt` seconds.
///
/// Tasks may cancel each other (or themselves) while running: each id is
/// looked up again right before it runs.
pub fn tick_tasks(world: &mut World, dt: f32) {
    if !world.contains_resource::<CableScheduler>() {
        return;
    }
    let ids = world.resource::<CableScheduler>().task_ids();
    for id in ids {
        let Some(task) = world.resource::<CableScheduler>().get(id).cloned() else {
            continue;
        };
        let step = match task {
            CableTask::MismatchFeedback {
                connector,
                countdown,
            } => tick_mismatch(world, id, connector, countdown, dt),
            CableTask::FollowHeld {
                endpoint,
                point,
                velocity,
            } => tick_follow(world, endpoint, point, velocity, dt),
        };
        let mut scheduler = world.resource_mut::<CableScheduler>();
        match step {
            TaskStep::Continue(next) => scheduler.store(id, next),
            TaskStep::Finish => {
                scheduler.cancel(id);
            }
        }
    }
}

/// System wrapper: ticks the scheduler with the current step's delta.
pub fn run_cable_tasks_system(world: &mut World) {
    let dt = world.resource::<Time>().delta_secs();
    tick_tasks(world, dt);
}

/// Reseed the scheduler from config at startup so `mismatch_rng_seed` applies.
pub fn seed_scheduler_system(config: Res<CableConfig>, mut scheduler: ResMut<CableScheduler>) {
    if scheduler.is_empty() {
        *scheduler = CableScheduler::with_seed(config.mismatch_rng_seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_removes_immediately() {
        let mut scheduler = CableScheduler::default();
        let id = scheduler.spawn(CableTask::MismatchFeedback {
            connector: Entity::PLACEHOLDER,
            countdown: 0.0,
        });
        assert!(scheduler.is_active(id));
        assert!(scheduler.cancel(id));
        assert!(!scheduler.is_active(id));
        assert!(!scheduler.cancel(id), "second cancel is a no-op");
    }

    #[test]
    fn ids_are_unique_and_ordered() {
        let mut scheduler = CableScheduler::default();
        let task = CableTask::MismatchFeedback {
            connector: Entity::PLACEHOLDER,
            countdown: 1.0,
        };
        let a = scheduler.spawn(task.clone());
        let b = scheduler.spawn(task);
        assert!(a < b);
        assert_eq!(scheduler.task_ids(), vec![a, b]);
    }

    #[test]
    fn periods_stay_in_range_and_are_reproducible() {
        let mut a = CableScheduler::with_seed(7);
        let mut b = CableScheduler::with_seed(7);
        for _ in 0..50 {
            let pa = a.next_period(0.6, 0.8);
            let pb = b.next_period(0.6, 0.8);
            assert!((0.6..0.8).contains(&pa));
            assert_eq!(pa, pb);
        }
    }

    #[test]
    fn tick_without_scheduler_is_noop() {
        let mut world = World::new();
        tick_tasks(&mut world, 0.1);
    }
}
