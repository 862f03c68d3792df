//! Lifting bodies by hand, and the cable-specific pick-up/drop protocol.
//!
//! [`Liftable`] is the generic capability: while lifted, every collider in the
//! entity's subtree is moved to the holder's layer, gravity is off and
//! interpolation is on.  [`drop_lifted`] undoes exactly what [`pick_up`] did.
//!
//! An entity that is also a [`CableEndpoint`] additionally unplugs on pick-up,
//! hands its neighbouring chain point over to a follow task, and on drop tries
//! to plug into whatever the holder points at before re-creating the spring to
//! that neighbour.

use crate::cable::{attach_spring, detach_spring, CableChain};
use crate::config::CableConfig;
use crate::constants::LAYER_COUNT;
use crate::connector::{
    can_connect, connect, connection_pose, disconnect, is_kinematic, outward_axis, set_kinematic,
    Connector,
};
use crate::cues::CuePolicy;
use crate::error::{report, CableError, CableResult};
use crate::interaction::{Holder, Interactable};
use crate::scheduler::{CableScheduler, CableTask, TaskId, TaskStep};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use std::f32::consts::TAU;

/// Can be carried by a [`Holder`].
#[derive(Component, Debug, Clone, Default)]
pub struct Liftable {
    lifted: bool,
    holder: Option<Entity>,
    /// Collision groups of every collider in the subtree before the lift.
    /// `None` means the collider had no explicit groups.
    saved_layers: Vec<(Entity, Option<CollisionGroups>)>,
    saved_gravity: Option<f32>,
    had_interpolation: bool,
    /// Euler offset (degrees, YXZ) applied to the holder's target rotation.
    pub lift_direction_offset: Vec3,
}

impl Liftable {
    #[inline]
    pub fn is_lifted(&self) -> bool {
        self.lifted
    }

    #[inline]
    pub fn holder(&self) -> Option<Entity> {
        self.holder
    }
}

/// A cable terminus that can be carried around.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct CableEndpoint {
    pub cable: Entity,
    /// Adjacent chain point and the task pulling it, while held.
    follow: Option<(Entity, TaskId)>,
}

impl CableEndpoint {
    pub fn new(cable: Entity) -> Self {
        Self {
            cable,
            follow: None,
        }
    }

    #[inline]
    pub fn following(&self) -> Option<(Entity, TaskId)> {
        self.follow
    }
}

// ── Pick-up ───────────────────────────────────────────────────────────────────

/// Lift `entity` into `holder`'s hand on physics layer `layer`.
pub fn pick_up(world: &mut World, entity: Entity, holder: Entity, layer: u32) -> CableResult<()> {
    let Some(liftable) = world.get::<Liftable>(entity) else {
        return Err(CableError::InvalidArgument {
            context: "pick_up: entity is missing or not liftable",
        });
    };
    if liftable.lifted {
        return Err(CableError::RedundantTransition {
            context: "pick_up: already lifted",
        });
    }
    if world.get::<Holder>(holder).is_none() {
        return Err(CableError::InvalidArgument {
            context: "pick_up: holder is missing",
        });
    }
    if layer >= LAYER_COUNT {
        return Err(CableError::InvalidArgument {
            context: "pick_up: layer must be below 32",
        });
    }

    lift(world, entity, holder, layer);
    if let Some(mut h) = world.get_mut::<Holder>(holder) {
        h.held = Some(entity);
    }

    if world.get::<Connector>(entity).is_some() {
        disconnect(world, entity, None, CuePolicy::Play);
    }
    if world.get::<CableEndpoint>(entity).is_some() {
        // A malformed chain only costs us the follow phase.
        report(begin_follow(world, entity));
    }
    debug!("[drag] {:?} picked up by {:?}", entity, holder);
    Ok(())
}

fn lift(world: &mut World, entity: Entity, holder: Entity, layer: u32) {
    let colliders = subtree_colliders(world, entity);
    let saved_layers: Vec<(Entity, Option<CollisionGroups>)> = colliders
        .iter()
        .map(|&e| (e, world.get::<CollisionGroups>(e).cloned()))
        .collect();
    let groups = layer_groups(layer);
    for &collider in &colliders {
        world.entity_mut(collider).insert(groups);
    }

    let saved_gravity = world.get::<GravityScale>(entity).map(|g| g.0);
    let had_interpolation = world.get::<TransformInterpolation>(entity).is_some();
    world
        .entity_mut(entity)
        .insert((GravityScale(0.0), TransformInterpolation::default()));

    if let Some(mut liftable) = world.get_mut::<Liftable>(entity) {
        liftable.lifted = true;
        liftable.holder = Some(holder);
        liftable.saved_layers = saved_layers;
        liftable.saved_gravity = saved_gravity;
        liftable.had_interpolation = had_interpolation;
    }
}

/// Collision groups placing a collider on exactly `layer`, colliding with all.
///
/// A layer outside `0..32` yields no membership at all.
pub fn layer_groups(layer: u32) -> CollisionGroups {
    let bits = 1u32.checked_shl(layer).unwrap_or(0);
    CollisionGroups::new(Group::from_bits_truncate(bits), Group::ALL)
}

/// `root` and all its descendants that carry a collider.
fn subtree_colliders(world: &World, root: Entity) -> Vec<Entity> {
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(entity) = stack.pop() {
        if world.get::<Collider>(entity).is_some() {
            found.push(entity);
        }
        if let Some(children) = world.get::<Children>(entity) {
            stack.extend(children.iter());
        }
    }
    found
}

fn begin_follow(world: &mut World, endpoint: Entity) -> CableResult<()> {
    let Some(cable) = world.get::<CableEndpoint>(endpoint).map(|e| e.cable) else {
        return Ok(());
    };
    let Some(chain) = world.get::<CableChain>(cable) else {
        return Err(CableError::InconsistentChainTopology {
            endpoint,
            reason: "cable root has no chain",
        });
    };
    let Some((point, spring_index)) = chain.adjacent_to(endpoint) else {
        return Err(CableError::InconsistentChainTopology {
            endpoint,
            reason: "no chain point next to this endpoint",
        });
    };
    // A one-point cable shares its only point between both ends.
    let other_end = if chain.start == endpoint { chain.end } else { chain.start };
    let already_followed = world
        .get::<CableEndpoint>(other_end)
        .and_then(CableEndpoint::following)
        .is_some_and(|(followed, _)| followed == point);
    if already_followed {
        return Err(CableError::InconsistentChainTopology {
            endpoint,
            reason: "neighbour point is already following the other end",
        });
    }
    if !world.contains_resource::<CableScheduler>() {
        return Err(CableError::EntityNotFound {
            context: "begin_follow: no task scheduler",
        });
    }

    detach_spring(world, cable, spring_index);
    set_kinematic(world, point, true);
    let id = world
        .resource_mut::<CableScheduler>()
        .spawn(CableTask::FollowHeld {
            endpoint,
            point,
            velocity: Vec3::ZERO,
        });
    if let Some(mut ep) = world.get_mut::<CableEndpoint>(endpoint) {
        ep.follow = Some((point, id));
    }
    Ok(())
}

// ── Follow task ───────────────────────────────────────────────────────────────

/// Closed-form critically-damped spring step toward `target`.
///
/// Returns the new position and velocity.  `frequency` is in Hz.
pub fn critically_damped_step(
    current: Vec3,
    target: Vec3,
    velocity: Vec3,
    frequency: f32,
    dt: f32,
) -> (Vec3, Vec3) {
    let omega = TAU * frequency;
    let offset = current - target;
    let c = velocity + offset * omega;
    let decay = (-omega * dt).exp();
    let position = target + (offset + c * dt) * decay;
    let velocity = (velocity - c * omega * dt) * decay;
    (position, velocity)
}

/// One tick of the follow-while-held pull.
pub(crate) fn tick_follow(
    world: &mut World,
    endpoint: Entity,
    point: Entity,
    velocity: Vec3,
    dt: f32,
) -> TaskStep {
    let Some(liftable) = world.get::<Liftable>(endpoint) else {
        // Endpoint is gone: physics takes the point back.
        set_kinematic(world, point, false);
        return TaskStep::Finish;
    };
    if !liftable.lifted || !is_kinematic(world, point) {
        return TaskStep::Finish;
    }
    let Some(target) = world.get::<Transform>(endpoint).map(|t| t.translation) else {
        return TaskStep::Finish;
    };
    let frequency = world
        .get_resource::<CableConfig>()
        .map_or(crate::constants::FOLLOW_FREQUENCY_HZ, |c| c.follow_frequency_hz);
    let Some(mut transform) = world.get_mut::<Transform>(point) else {
        return TaskStep::Finish;
    };
    let (position, velocity) =
        critically_damped_step(transform.translation, target, velocity, frequency, dt);
    transform.translation = position;
    TaskStep::Continue(CableTask::FollowHeld {
        endpoint,
        point,
        velocity,
    })
}

// ── Drop ──────────────────────────────────────────────────────────────────────

/// Put `entity` down.  A cable endpoint tries to plug into the holder's
/// current selection first.
pub fn drop_lifted(world: &mut World, entity: Entity) -> CableResult<()> {
    let Some(liftable) = world.get::<Liftable>(entity) else {
        return Err(CableError::InvalidArgument {
            context: "drop: entity is missing or not liftable",
        });
    };
    if !liftable.lifted {
        return Err(CableError::RedundantTransition {
            context: "drop: not lifted",
        });
    }
    let holder = liftable.holder;

    restore(world, entity);
    let target = holder.and_then(|h| {
        let mut holder = world.get_mut::<Holder>(h)?;
        if holder.held == Some(entity) {
            holder.held = None;
        }
        holder.selection
    });

    if let Some(target) = target {
        if world.get::<Connector>(entity).is_some() {
            try_plug(world, entity, target);
        }
    }
    if world.get::<CableEndpoint>(entity).is_some() {
        end_follow(world, entity);
    }
    debug!("[drag] {:?} dropped", entity);
    Ok(())
}

fn restore(world: &mut World, entity: Entity) {
    let Some(mut liftable) = world.get_mut::<Liftable>(entity) else {
        return;
    };
    liftable.lifted = false;
    liftable.holder = None;
    let saved_layers = std::mem::take(&mut liftable.saved_layers);
    let saved_gravity = liftable.saved_gravity.take();
    let had_interpolation = liftable.had_interpolation;

    for (collider, groups) in saved_layers {
        let Ok(mut collider) = world.get_entity_mut(collider) else {
            continue;
        };
        match groups {
            Some(groups) => {
                collider.insert(groups);
            }
            None => {
                collider.remove::<CollisionGroups>();
            }
        }
    }

    let mut entity_mut = world.entity_mut(entity);
    match saved_gravity {
        Some(scale) => {
            entity_mut.insert(GravityScale(scale));
        }
        None => {
            entity_mut.remove::<GravityScale>();
        }
    }
    if !had_interpolation {
        entity_mut.remove::<TransformInterpolation>();
    }
}

/// Plug into `target` if the pairing is allowed, otherwise rest beside it.
fn try_plug(world: &mut World, endpoint: Entity, target: Entity) {
    if target == endpoint || world.get::<Connector>(target).is_none() {
        return;
    }
    if !world.get::<Interactable>(target).is_none_or(|i| i.enabled) {
        return;
    }

    if can_connect(world, endpoint, target) {
        // The stationary side initiates and owns the joint.
        report(connect(world, target, endpoint, CuePolicy::Play));
        return;
    }

    let offset = world
        .get_resource::<CableConfig>()
        .map_or(crate::constants::SNAP_OUT_OFFSET, |c| c.snap_out_offset);
    let (Some((anchor, anchor_rotation)), Some(out)) = (
        connection_pose(world, target),
        outward_axis(world, target),
    ) else {
        return;
    };
    let Some(own_anchor) = world.get::<Connector>(endpoint).map(|c| c.anchor) else {
        return;
    };
    // Mated orientation, with our own connection point backed off along `out`.
    if let Some(mut transform) = world.get_mut::<Transform>(endpoint) {
        transform.rotation = anchor_rotation * own_anchor.rotation;
        let own_offset = transform.transform_point(own_anchor.translation) - transform.translation;
        transform.translation = anchor + out * offset - own_offset;
    }
}

/// Hand the neighbour point back to physics and re-create its spring.
fn end_follow(world: &mut World, endpoint: Entity) {
    let Some(mut ep) = world.get_mut::<CableEndpoint>(endpoint) else {
        return;
    };
    let cable = ep.cable;
    let follow = ep.follow.take();
    if let Some((point, task)) = follow {
        if let Some(mut scheduler) = world.get_resource_mut::<CableScheduler>() {
            scheduler.cancel(task);
        }
        set_kinematic(world, point, false);
        if let Some(mut velocity) = world.get_mut::<Velocity>(point) {
            *velocity = Velocity::zero();
        }
    }

    let Some(spring_index) = world
        .get::<CableChain>(cable)
        .and_then(|chain| chain.adjacent_to(endpoint))
        .map(|(_, index)| index)
    else {
        return;
    };
    let missing = world
        .get::<CableChain>(cable)
        .is_some_and(|chain| chain.springs().get(spring_index).is_some_and(Option::is_none));
    if missing {
        attach_spring(world, cable, spring_index);
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Queue lift transitions from ordinary systems.
pub trait DraggableCommandsExt {
    fn pick_up_endpoint(&mut self, entity: Entity, holder: Entity, layer: u32);
    fn drop_endpoint(&mut self, entity: Entity);
}

impl DraggableCommandsExt for Commands<'_, '_> {
    fn pick_up_endpoint(&mut self, entity: Entity, holder: Entity, layer: u32) {
        self.queue(move |world: &mut World| {
            report(pick_up(world, entity, holder, layer));
        });
    }

    fn drop_endpoint(&mut self, entity: Entity) {
        self.queue(move |world: &mut World| {
            report(drop_lifted(world, entity));
        });
    }
}
