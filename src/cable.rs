//! Procedural cable chains: layout, springs, segment visuals, and breaking.
//!
//! A cable is a root entity carrying [`CableChain`] plus an ordered list of
//! point bodies `[start, p0, …, p(n-1), end]`.  `start` and `end` are the two
//! connector endpoints; the `n` intermediate points are generated.  Consecutive
//! points are tied by a spring joint (`springs[i]` links `points[i]` to
//! `points[i + 1]`), and each pair has a purely derived visual segment.
//!
//! ## Breaking
//!
//! While at least one end is plugged in, the summed point separation is checked
//! against `break_length` every step.  Staying over it for `min_grace` seconds
//! in a row snaps the cable: both ends are unplugged and a
//! [`CableCue::Snapped`] is written.  Dropping back under the threshold resets
//! the grace timer in full.

use crate::config::CableConfig;
use crate::connector::{despawn_if_exists, disconnect, linked_partner, Connector};
use crate::cues::{emit_cue, CableCue, CuePolicy};
use crate::draggable::{CableEndpoint, Liftable};
use crate::error::{CableError, CableResult};
use crate::interaction::Interactable;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

// ── Components ────────────────────────────────────────────────────────────────

/// Chain state, stored on the cable root.  Its `Transform` forward axis is the
/// direction points are laid out along.
#[derive(Component, Debug, Clone)]
pub struct CableChain {
    /// Number of generated intermediate points.
    pub segment_count: usize,
    pub spacing: f32,
    pub thickness: f32,
    pub stiffness: f32,
    pub damping: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub break_length_multiplier: f32,
    pub break_slack: f32,
    pub min_grace: f32,
    break_length: f32,
    grace_timer: f32,
    pub start: Entity,
    pub end: Entity,
    points: Vec<Entity>,
    segments: Vec<Entity>,
    springs: Vec<Option<Entity>>,
}

impl CableChain {
    pub fn new(start: Entity, end: Entity, config: &CableConfig) -> Self {
        let mut chain = Self {
            segment_count: config.segment_count,
            spacing: config.segment_spacing,
            thickness: config.segment_thickness,
            stiffness: config.spring_stiffness,
            damping: config.spring_damping,
            linear_damping: config.point_linear_damping,
            angular_damping: config.point_angular_damping,
            break_length_multiplier: config.break_length_multiplier,
            break_slack: config.break_slack,
            min_grace: config.min_break_secs,
            break_length: 0.0,
            grace_timer: config.min_break_secs,
            start,
            end,
            points: vec![start, end],
            segments: Vec::new(),
            springs: Vec::new(),
        };
        chain.recompute_break_length();
        chain
    }

    fn recompute_break_length(&mut self) {
        self.break_length =
            self.spacing * self.segment_count as f32 * self.break_length_multiplier
                + self.break_slack;
    }

    /// Override the derived threshold.  Recomputed again on the next rebuild.
    pub fn set_break_length(&mut self, length: f32) {
        self.break_length = length;
    }

    #[inline]
    pub fn break_length(&self) -> f32 {
        self.break_length
    }

    #[inline]
    pub fn grace_timer(&self) -> f32 {
        self.grace_timer
    }

    #[inline]
    pub fn points(&self) -> &[Entity] {
        &self.points
    }

    #[inline]
    pub fn segments(&self) -> &[Entity] {
        &self.segments
    }

    #[inline]
    pub fn springs(&self) -> &[Option<Entity>] {
        &self.springs
    }

    /// Chain point inboard of `endpoint` and the index of the spring between them.
    pub fn adjacent_to(&self, endpoint: Entity) -> Option<(Entity, usize)> {
        let len = self.points.len();
        if len < 3 {
            return None;
        }
        if endpoint == self.start && self.points.first() == Some(&endpoint) {
            Some((self.points[1], 0))
        } else if endpoint == self.end && self.points.last() == Some(&endpoint) {
            Some((self.points[len - 2], len - 2))
        } else {
            None
        }
    }

    /// Feed one step of stress data.  Returns `true` when the cable should snap.
    pub fn monitor(&mut self, length: f32, connected: bool, dt: f32) -> bool {
        if !connected {
            return false;
        }
        if length > self.break_length {
            self.grace_timer -= dt;
            if self.grace_timer <= 0.0 {
                self.grace_timer = self.min_grace;
                return true;
            }
        } else {
            self.grace_timer = self.min_grace;
        }
        false
    }
}

/// A generated intermediate chain point.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CablePoint {
    pub cable: Entity,
}

/// Visual segment between `points[index]` and `points[index + 1]`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CableSegment {
    pub cable: Entity,
    pub index: usize,
}

/// Spring joint entity tying two consecutive points.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct CableSpring {
    pub cable: Entity,
    pub rest_length: f32,
    pub a: Entity,
    pub b: Entity,
}

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Pose of the visual segment between two points.
///
/// Midpoint, local +Z toward `b`, scale `(thickness, thickness, distance / 2)`.
/// Coincident points collapse to zero scale.
pub fn segment_pose(a: Vec3, b: Vec3, thickness: f32) -> Transform {
    let delta = b - a;
    let distance = delta.length();
    let midpoint = (a + b) * 0.5;
    if distance <= f32::EPSILON {
        return Transform {
            translation: midpoint,
            rotation: Quat::IDENTITY,
            scale: Vec3::ZERO,
        };
    }
    Transform {
        translation: midpoint,
        rotation: Quat::from_rotation_arc(Vec3::Z, delta / distance),
        scale: Vec3::new(thickness, thickness, distance * 0.5),
    }
}

/// Sum of consecutive separations.
pub fn total_length(positions: &[Vec3]) -> f32 {
    positions.windows(2).map(|w| w[0].distance(w[1])).sum()
}

// ── Springs ───────────────────────────────────────────────────────────────────

/// (Re)create the spring between `points[index]` and `points[index + 1]`.
pub fn attach_spring(world: &mut World, cable: Entity, index: usize) -> Option<Entity> {
    let chain = world.get::<CableChain>(cable)?;
    let a = *chain.points.get(index)?;
    let b = *chain.points.get(index + 1)?;
    let rest_length = chain.spacing;
    let joint = SpringJointBuilder::new(rest_length, chain.stiffness, chain.damping);
    let spring = world
        .spawn((
            CableSpring {
                cable,
                rest_length,
                a,
                b,
            },
            ImpulseJoint::new(a, joint),
            ChildOf(b),
        ))
        .id();

    let previous = {
        let mut chain = world.get_mut::<CableChain>(cable)?;
        if chain.springs.len() <= index {
            chain.springs.resize(index + 1, None);
        }
        chain.springs[index].replace(spring)
    };
    if let Some(previous) = previous {
        despawn_if_exists(world, previous);
    }
    Some(spring)
}

/// Remove the spring at `index`, leaving the slot empty.
pub fn detach_spring(world: &mut World, cable: Entity, index: usize) {
    let spring = world
        .get_mut::<CableChain>(cable)
        .and_then(|mut chain| chain.springs.get_mut(index).and_then(Option::take));
    if let Some(spring) = spring {
        despawn_if_exists(world, spring);
    }
}

// ── Build ─────────────────────────────────────────────────────────────────────

fn spawn_point(world: &mut World, cable: Entity, at: Vec3, chain: &CableChain) -> Entity {
    world
        .spawn((
            CablePoint { cable },
            Transform::from_translation(at),
            RigidBody::Dynamic,
            Collider::ball(chain.thickness * 0.5),
            Velocity::zero(),
            Damping {
                linear_damping: chain.linear_damping,
                angular_damping: chain.angular_damping,
            },
            GravityScale(1.0),
        ))
        .id()
}

fn spawn_segment(world: &mut World, cable: Entity, index: usize) -> Entity {
    world
        .spawn((CableSegment { cable, index }, Transform::IDENTITY))
        .id()
}

/// Despawn every generated part, keeping the two endpoints.
fn clear_generated(world: &mut World, cable: Entity) {
    let Some(mut chain) = world.get_mut::<CableChain>(cable) else {
        return;
    };
    let (start, end) = (chain.start, chain.end);
    let springs = std::mem::take(&mut chain.springs);
    let segments = std::mem::take(&mut chain.segments);
    let points = std::mem::replace(&mut chain.points, vec![start, end]);

    for spring in springs.into_iter().flatten() {
        despawn_if_exists(world, spring);
    }
    for segment in segments {
        despawn_if_exists(world, segment);
    }
    for point in points {
        if point != start && point != end {
            despawn_if_exists(world, point);
        }
    }
}

fn cable_forward(world: &World, cable: Entity) -> Vec3 {
    world
        .get::<Transform>(cable)
        .map_or(Vec3::NEG_Z, |t| t.forward().as_vec3())
}

/// Lay out `n` intermediate points along the cable's forward axis, replacing
/// whatever was generated before.
///
/// The start endpoint stays put; the end endpoint is moved to the far end of
/// the layout.  Calling it twice with the same `n` yields the same chain.
pub fn rebuild(world: &mut World, cable: Entity, n: usize) -> CableResult<()> {
    if n == 0 {
        return Err(CableError::InvalidArgument {
            context: "rebuild: a cable needs at least one point",
        });
    }
    if world.get::<CableChain>(cable).is_none() {
        return Err(CableError::InvalidArgument {
            context: "rebuild: entity is not a cable",
        });
    }
    clear_generated(world, cable);

    let Some(chain) = world.get::<CableChain>(cable).cloned() else {
        return Ok(());
    };
    let forward = cable_forward(world, cable);
    let origin = world
        .get::<Transform>(chain.start)
        .map_or(Vec3::ZERO, |t| t.translation);

    let mut points = Vec::with_capacity(n + 2);
    points.push(chain.start);
    for k in 0..n {
        let at = origin + forward * chain.spacing * (k + 1) as f32;
        points.push(spawn_point(world, cable, at, &chain));
    }
    points.push(chain.end);
    if let Some(mut transform) = world.get_mut::<Transform>(chain.end) {
        transform.translation = origin + forward * chain.spacing * (n + 1) as f32;
    }

    let segments: Vec<Entity> = (0..=n).map(|i| spawn_segment(world, cable, i)).collect();

    if let Some(mut chain) = world.get_mut::<CableChain>(cable) {
        chain.segment_count = n;
        chain.points = points;
        chain.segments = segments;
        chain.springs = vec![None; n + 1];
        chain.grace_timer = chain.min_grace;
        chain.recompute_break_length();
    }
    for i in 0..=n {
        attach_spring(world, cable, i);
    }
    sync_segments(world, cable);
    debug!("[cable] {:?} rebuilt with {} points", cable, n);
    Ok(())
}

/// Insert one point next to the end terminus; the end moves one spacing out.
pub fn add_segment(world: &mut World, cable: Entity) -> CableResult<()> {
    let Some(chain) = world.get::<CableChain>(cable).cloned() else {
        return Err(CableError::InvalidArgument {
            context: "add_segment: entity is not a cable",
        });
    };
    let Some(end_pose) = world.get::<Transform>(chain.end).copied() else {
        return Err(CableError::EntityNotFound {
            context: "add_segment: end endpoint has no transform",
        });
    };
    let forward = cable_forward(world, cable);
    let last_spring = chain.points.len() - 2;
    detach_spring(world, cable, last_spring);

    let point = spawn_point(world, cable, end_pose.translation, &chain);
    if let Some(mut transform) = world.get_mut::<Transform>(chain.end) {
        transform.translation = end_pose.translation + forward * chain.spacing;
    }
    let segment = spawn_segment(world, cable, chain.segments.len());

    if let Some(mut chain) = world.get_mut::<CableChain>(cable) {
        let end_index = chain.points.len() - 1;
        chain.points.insert(end_index, point);
        chain.segments.push(segment);
        chain.springs.push(None);
        chain.segment_count += 1;
        chain.recompute_break_length();
    }
    attach_spring(world, cable, last_spring);
    attach_spring(world, cable, last_spring + 1);
    sync_segments(world, cable);
    Ok(())
}

/// Remove the point next to the end terminus; the end takes its pose.
pub fn remove_segment(world: &mut World, cable: Entity) -> CableResult<()> {
    let Some(chain) = world.get::<CableChain>(cable).cloned() else {
        return Err(CableError::InvalidArgument {
            context: "remove_segment: entity is not a cable",
        });
    };
    if chain.segment_count <= 1 || chain.points.len() < 4 {
        return Err(CableError::InvalidArgument {
            context: "remove_segment: a cable keeps at least one point",
        });
    }
    let len = chain.points.len();
    let removed = chain.points[len - 2];
    let removed_pose = world.get::<Transform>(removed).copied();

    detach_spring(world, cable, len - 3);
    detach_spring(world, cable, len - 2);
    despawn_if_exists(world, removed);
    if let Some(segment) = chain.segments.last() {
        despawn_if_exists(world, *segment);
    }
    if let (Some(pose), Some(mut transform)) = (removed_pose, world.get_mut::<Transform>(chain.end))
    {
        transform.translation = pose.translation;
        transform.rotation = pose.rotation;
    }

    if let Some(mut chain) = world.get_mut::<CableChain>(cable) {
        chain.points.remove(len - 2);
        chain.segments.pop();
        chain.springs.pop();
        chain.segment_count -= 1;
        chain.recompute_break_length();
    }
    attach_spring(world, cable, len - 3);
    sync_segments(world, cable);
    Ok(())
}

// ── Authoring ─────────────────────────────────────────────────────────────────

/// Everything needed to spawn a cable with its two connector ends.
#[derive(Debug, Clone)]
pub struct CableDescriptor {
    /// Root pose.  `translation` is where the start endpoint goes and the
    /// forward axis is the layout direction.
    pub transform: Transform,
    pub start: Connector,
    pub end: Connector,
    /// Intermediate points; `None` uses the configured count.
    pub segment_count: Option<usize>,
}

/// Entities created by [`spawn_cable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CableHandles {
    pub root: Entity,
    pub start: Entity,
    pub end: Entity,
}

fn spawn_endpoint(
    world: &mut World,
    cable: Entity,
    connector: Connector,
    at: Transform,
    config: &CableConfig,
) -> Entity {
    world
        .spawn((
            connector,
            Liftable::default(),
            Interactable::default(),
            CableEndpoint::new(cable),
            at,
            RigidBody::Dynamic,
            Collider::ball(config.segment_thickness * 0.5),
            Velocity::zero(),
            Damping {
                linear_damping: config.point_linear_damping,
                angular_damping: config.point_angular_damping,
            },
            GravityScale(1.0),
        ))
        .id()
}

/// Spawn a cable root, both endpoints, and the generated chain.
pub fn spawn_cable(
    world: &mut World,
    descriptor: &CableDescriptor,
    config: &CableConfig,
) -> CableResult<CableHandles> {
    config.validate()?;
    let n = descriptor.segment_count.unwrap_or(config.segment_count);
    if n == 0 {
        return Err(CableError::InvalidArgument {
            context: "spawn_cable: a cable needs at least one point",
        });
    }

    let root = world.spawn(descriptor.transform).id();
    let endpoint_pose = Transform::from_translation(descriptor.transform.translation)
        .with_rotation(descriptor.transform.rotation);
    let start = spawn_endpoint(world, root, descriptor.start.clone(), endpoint_pose, config);
    let end = spawn_endpoint(world, root, descriptor.end.clone(), endpoint_pose, config);
    world.entity_mut(root).insert(CableChain::new(start, end, config));

    rebuild(world, root, n)?;
    info!("Spawned cable {:?} with {} points", root, n);
    Ok(CableHandles { root, start, end })
}

/// Despawn a cable, its generated parts, and both endpoints.
pub fn despawn_cable(world: &mut World, cable: Entity) {
    let Some(chain) = world.get::<CableChain>(cable).cloned() else {
        return;
    };
    clear_generated(world, cable);
    for endpoint in [chain.start, chain.end] {
        disconnect(world, endpoint, None, CuePolicy::Silent);
        despawn_if_exists(world, endpoint);
    }
    despawn_if_exists(world, cable);
}

// ── Step ──────────────────────────────────────────────────────────────────────

fn sync_segments(world: &mut World, cable: Entity) -> Option<Vec<Vec3>> {
    let chain = world.get::<CableChain>(cable)?;
    let positions: Vec<Vec3> = chain
        .points
        .iter()
        .map(|&p| world.get::<Transform>(p).map_or(Vec3::ZERO, |t| t.translation))
        .collect();
    let thickness = chain.thickness;
    let segments = chain.segments.clone();

    for (index, segment) in segments.into_iter().enumerate() {
        let (Some(&a), Some(&b)) = (positions.get(index), positions.get(index + 1)) else {
            continue;
        };
        if let Some(mut transform) = world.get_mut::<Transform>(segment) {
            *transform = segment_pose(a, b, thickness);
        }
    }
    Some(positions)
}

/// Update one cable's segment visuals and run the break check.
///
/// Returns `true` if the cable snapped this step.
pub fn step_cable(world: &mut World, cable: Entity, dt: f32) -> bool {
    let Some(positions) = sync_segments(world, cable) else {
        return false;
    };
    let Some((start, end)) = world.get::<CableChain>(cable).map(|c| (c.start, c.end)) else {
        return false;
    };
    let connected = linked_partner(world, start).is_some() || linked_partner(world, end).is_some();
    let length = if connected {
        total_length(&positions)
    } else {
        0.0
    };
    let snapped = world
        .get_mut::<CableChain>(cable)
        .is_some_and(|mut chain| chain.monitor(length, connected, dt));
    if !snapped {
        return false;
    }

    disconnect(world, start, None, CuePolicy::Silent);
    disconnect(world, end, None, CuePolicy::Silent);
    let position = positions
        .get(positions.len() / 2)
        .copied()
        .unwrap_or_default();
    emit_cue(world, CableCue::Snapped { cable, position });
    info!("Cable {:?} snapped at length {:.2}", cable, length);
    true
}

/// Step every cable in the world.
pub fn step_all_cables(world: &mut World, dt: f32) {
    let mut cables = world.query_filtered::<Entity, With<CableChain>>();
    let all: Vec<Entity> = cables.iter(world).collect();
    for cable in all {
        step_cable(world, cable, dt);
    }
}

pub fn cable_step_system(world: &mut World) {
    let dt = world.resource::<Time>().delta_secs();
    step_all_cables(world, dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{Polarity, SignalColor};

    fn descriptor(n: usize) -> CableDescriptor {
        CableDescriptor {
            transform: Transform::IDENTITY,
            start: Connector::new(Polarity::Male, SignalColor::Red),
            end: Connector::new(Polarity::Male, SignalColor::Red),
            segment_count: Some(n),
        }
    }

    #[test]
    fn segment_pose_spans_the_pair() {
        let pose = segment_pose(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0), 0.3);
        assert!(pose.translation.distance(Vec3::new(0.0, 0.0, 1.0)) < 1e-6);
        assert!((pose.scale - Vec3::new(0.3, 0.3, 1.0)).length() < 1e-6);
        let local_z = pose.rotation * Vec3::Z;
        assert!(local_z.distance(Vec3::Z) < 1e-5);
    }

    #[test]
    fn degenerate_segment_collapses() {
        let pose = segment_pose(Vec3::ONE, Vec3::ONE, 0.3);
        assert_eq!(pose.scale, Vec3::ZERO);
        assert!(pose.rotation.is_finite());
    }

    #[test]
    fn monitor_ignores_stress_while_unplugged() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let mut chain = CableChain::new(a, b, &CableConfig::default());
        for _ in 0..100 {
            assert!(!chain.monitor(1000.0, false, 0.1));
        }
    }

    #[test]
    fn monitor_hysteresis() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        let mut chain = CableChain::new(a, b, &CableConfig::default());
        chain.set_break_length(10.0);
        chain.min_grace = 1.0;

        // 0.9 s over, then relax: no break, timer fully reset.
        for _ in 0..9 {
            assert!(!chain.monitor(12.0, true, 0.1));
        }
        assert!(!chain.monitor(9.0, true, 0.1));
        assert_eq!(chain.grace_timer(), 1.0);

        // 1.1 s continuously over: breaks.
        let broke = (0..11).any(|_| chain.monitor(12.0, true, 0.1));
        assert!(broke);
    }

    #[test]
    fn rebuild_lays_out_points_along_forward() {
        let mut world = World::new();
        let config = CableConfig::default();
        let handles = spawn_cable(&mut world, &descriptor(3), &config).unwrap();

        let chain = world.get::<CableChain>(handles.root).unwrap().clone();
        assert_eq!(chain.points().len(), 5);
        assert_eq!(chain.segments().len(), 4);
        assert_eq!(chain.springs().len(), 4);
        assert!(chain.springs().iter().all(Option::is_some));
        assert_eq!(chain.points()[0], handles.start);
        assert_eq!(chain.points()[4], handles.end);

        for (k, &point) in chain.points().iter().enumerate() {
            let expected = Vec3::NEG_Z * config.segment_spacing * k as f32;
            let actual = world.get::<Transform>(point).unwrap().translation;
            assert!(actual.distance(expected) < 1e-5, "point {k}: {actual:?}");
        }
        assert!((chain.break_length() - config.break_length(3)).abs() < 1e-6);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut world = World::new();
        let handles = spawn_cable(&mut world, &descriptor(4), &CableConfig::default()).unwrap();
        rebuild(&mut world, handles.root, 4).unwrap();

        let mut points = world.query::<&CablePoint>();
        assert_eq!(points.iter(&world).count(), 4);
        let mut springs = world.query::<&CableSpring>();
        assert_eq!(springs.iter(&world).count(), 5);
        let mut segments = world.query::<&CableSegment>();
        assert_eq!(segments.iter(&world).count(), 5);
    }

    #[test]
    fn add_and_remove_segment_rewire_springs() {
        let mut world = World::new();
        let handles = spawn_cable(&mut world, &descriptor(2), &CableConfig::default()).unwrap();

        add_segment(&mut world, handles.root).unwrap();
        let chain = world.get::<CableChain>(handles.root).unwrap().clone();
        assert_eq!(chain.segment_count, 3);
        assert_eq!(chain.points().len(), 5);
        for (i, spring) in chain.springs().iter().enumerate() {
            let spring = world.get::<CableSpring>(spring.unwrap()).unwrap();
            assert_eq!(spring.a, chain.points()[i]);
            assert_eq!(spring.b, chain.points()[i + 1]);
        }

        remove_segment(&mut world, handles.root).unwrap();
        remove_segment(&mut world, handles.root).unwrap();
        assert!(remove_segment(&mut world, handles.root).is_err());
        let chain = world.get::<CableChain>(handles.root).unwrap();
        assert_eq!(chain.points().len(), 3);
        assert_eq!(chain.springs().len(), 2);
        let mut springs = world.query::<&CableSpring>();
        assert_eq!(springs.iter(&world).count(), 2);
    }

    #[test]
    fn total_length_sums_separations() {
        let length = total_length(&[Vec3::ZERO, Vec3::X, Vec3::new(1.0, 2.0, 0.0)]);
        assert!((length - 3.0).abs() < 1e-6);
    }
}
