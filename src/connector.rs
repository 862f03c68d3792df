//! Connector pairing state machine.
//!
//! A [`Connector`] is one polarized end of a connection.  Two connectors are
//! either both unlinked or linked to each other: `A.linked_to == Some(B)` iff
//! `B.linked_to == Some(A)` once any operation here returns.
//!
//! ## Recursion discipline
//!
//! [`disconnect`] clears its own `linked_to` *before* asking the partner to
//! disconnect from it.  The partner's reciprocal call then finds this side
//! already unlinked and returns immediately, so the mutual back-reference never
//! recurses more than one level.  A `debug_assert!` guards the ordering.
//!
//! ## Ownership
//!
//! The side that initiates [`connect`] owns the physical fixed joint (a
//! [`ConnectorJoint`] child entity).  Only that side ever despawns it.

use crate::config::CableConfig;
use crate::cues::{emit_cue, CableCue, CuePolicy};
use crate::error::{report, CableError, CableResult};
use crate::interaction::Interactable;
use crate::scheduler::{CableScheduler, CableTask, TaskId, TaskStep};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use serde::{Deserialize, Serialize};

// ── Data ──────────────────────────────────────────────────────────────────────

/// Only opposite polarities can pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Polarity {
    #[default]
    Male,
    Female,
}

/// Signal colour of a connector.  Used for matching and feedback, never physics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignalColor {
    #[default]
    White,
    Red,
    Green,
    Yellow,
    Blue,
    Cyan,
    Magenta,
}

impl SignalColor {
    /// Display colour used by the renderer.
    pub fn display_color(self) -> Color {
        match self {
            SignalColor::White => Color::WHITE,
            SignalColor::Red => Color::srgb(1.0, 0.0, 0.0),
            SignalColor::Green => Color::srgb(0.0, 1.0, 0.0),
            SignalColor::Yellow => Color::srgb(1.0, 0.92, 0.016),
            SignalColor::Blue => Color::srgb(0.0, 0.0, 1.0),
            SignalColor::Cyan => Color::srgb(0.0, 1.0, 1.0),
            SignalColor::Magenta => Color::srgb(1.0, 0.0, 1.0),
        }
    }
}

/// One end of a connection.
#[derive(Component, Debug, Clone)]
pub struct Connector {
    pub polarity: Polarity,
    pub color: SignalColor,
    /// Lets this connector pair with any colour.
    pub allow_color_mismatch: bool,
    /// When this side initiates a connection, make the partner body kinematic
    /// for as long as the link lasts.
    pub make_partner_kinematic: bool,
    /// Disable this connector's collider and interactable while linked.
    pub hide_when_connected: bool,
    /// Emit periodic spark cues while linked to an incompatible colour.
    pub mismatch_feedback: bool,
    /// Local pose of the connection point relative to the body.
    /// Its +X axis is the outward direction.
    pub anchor: Transform,
    linked_to: Option<Entity>,
    joint: Option<Entity>,
    partner_was_kinematic: bool,
    forced_partner_kinematic: bool,
    mismatch_task: Option<TaskId>,
}

impl Default for Connector {
    fn default() -> Self {
        Self::new(Polarity::Male, SignalColor::White)
    }
}

impl Connector {
    pub fn new(polarity: Polarity, color: SignalColor) -> Self {
        Self {
            polarity,
            color,
            allow_color_mismatch: false,
            make_partner_kinematic: false,
            hide_when_connected: false,
            mismatch_feedback: true,
            anchor: Transform::IDENTITY,
            linked_to: None,
            joint: None,
            partner_was_kinematic: false,
            forced_partner_kinematic: false,
            mismatch_task: None,
        }
    }

    pub fn with_anchor(mut self, anchor: Transform) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_color_mismatch_allowed(mut self, allow: bool) -> Self {
        self.allow_color_mismatch = allow;
        self
    }

    pub fn with_partner_kinematic(mut self, force: bool) -> Self {
        self.make_partner_kinematic = force;
        self
    }

    pub fn with_hide_when_connected(mut self, hide: bool) -> Self {
        self.hide_when_connected = hide;
        self
    }

    pub fn with_mismatch_feedback(mut self, enabled: bool) -> Self {
        self.mismatch_feedback = enabled;
        self
    }

    #[inline]
    pub fn linked_to(&self) -> Option<Entity> {
        self.linked_to
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.linked_to.is_some()
    }

    /// The fixed joint entity this side owns, if it initiated the link.
    #[inline]
    pub fn owned_joint(&self) -> Option<Entity> {
        self.joint
    }

    #[inline]
    pub fn mismatch_task(&self) -> Option<TaskId> {
        self.mismatch_task
    }

    /// Kinematic state of the partner body recorded when the link was made.
    #[inline]
    pub fn partner_was_kinematic(&self) -> bool {
        self.partner_was_kinematic
    }

    /// Colours match, or either side tolerates a mismatch.
    pub fn colors_compatible(&self, other: &Connector) -> bool {
        self.allow_color_mismatch || other.allow_color_mismatch || self.color == other.color
    }

    /// Pure pairing predicate on the data of two *distinct* connectors.
    pub fn can_pair(&self, other: &Connector) -> bool {
        !self.is_connected()
            && !other.is_connected()
            && self.polarity != other.polarity
            && self.colors_compatible(other)
    }
}

/// Marker on the child entity that carries a connection's fixed joint.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorJoint {
    pub owner: Entity,
    pub partner: Entity,
}

/// Authored connection to restore on the first step, without a cue.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLink(pub Entity);

// ── Queries ───────────────────────────────────────────────────────────────────

/// `true` iff both are connectors, distinct, unlinked, of opposite polarity, and
/// colour-compatible.  Side-effect free.
pub fn can_connect(world: &World, a: Entity, b: Entity) -> bool {
    if a == b {
        return false;
    }
    match (world.get::<Connector>(a), world.get::<Connector>(b)) {
        (Some(a), Some(b)) => a.can_pair(b),
        _ => false,
    }
}

/// Current partner of `entity`, if it is a linked connector.
pub fn linked_partner(world: &World, entity: Entity) -> Option<Entity> {
    world.get::<Connector>(entity).and_then(Connector::linked_to)
}

/// Linked to a live partner of the same colour.
///
/// A link made through `allow_color_mismatch` is allowed but not correct, and
/// keeps sparking for as long as it lasts.
pub fn is_correctly_paired(world: &World, entity: Entity) -> bool {
    let Some(this) = world.get::<Connector>(entity) else {
        return false;
    };
    let Some(partner) = this.linked_to.and_then(|p| world.get::<Connector>(p)) else {
        return false;
    };
    this.color == partner.color
}

/// World-space position and rotation of a connector's connection point.
pub fn connection_pose(world: &World, entity: Entity) -> Option<(Vec3, Quat)> {
    let connector = world.get::<Connector>(entity)?;
    let transform = world.get::<Transform>(entity)?;
    Some((
        transform.transform_point(connector.anchor.translation),
        transform.rotation * connector.anchor.rotation,
    ))
}

/// World-space outward axis of a connector's connection point.
pub fn outward_axis(world: &World, entity: Entity) -> Option<Vec3> {
    connection_pose(world, entity).map(|(_, rotation)| rotation * Vec3::X)
}

// ── Transitions ───────────────────────────────────────────────────────────────

/// Plug `other` into `this`.  `this` becomes the joint owner.
///
/// Any existing link on either side is replaced.  `other` is moved so the two
/// connection points coincide; its rotation becomes `this`'s connection rotation
/// composed with `other`'s own anchor rotation.  Callers gate with
/// [`can_connect`]; this function does not re-check polarity or colour.
pub fn connect(world: &mut World, this: Entity, other: Entity, cue: CuePolicy) -> CableResult<()> {
    if this == other {
        return Err(CableError::InvalidArgument {
            context: "connect: a connector cannot pair with itself",
        });
    }
    if world.get::<Connector>(this).is_none() {
        return Err(CableError::InvalidArgument {
            context: "connect: initiator is missing or not a connector",
        });
    }
    if world.get::<Connector>(other).is_none() {
        return Err(CableError::InvalidArgument {
            context: "connect: partner is missing or not a connector",
        });
    }

    // Connecting again steals both ends out of their old pairings.
    disconnect(world, this, None, CuePolicy::Silent);
    disconnect(world, other, None, CuePolicy::Silent);

    mate_transforms(world, this, other);
    let joint = spawn_fixed_joint(world, this, other);

    // Partner side first, then ours.
    let this_kinematic = is_kinematic(world, this);
    if let Some(mut partner) = world.get_mut::<Connector>(other) {
        partner.linked_to = Some(this);
        partner.partner_was_kinematic = this_kinematic;
    }
    apply_visibility_policy(world, other);

    let other_kinematic = is_kinematic(world, other);
    let force_kinematic = world
        .get::<Connector>(this)
        .is_some_and(|c| c.make_partner_kinematic);
    if force_kinematic {
        set_kinematic(world, other, true);
    }
    if let Some(mut connector) = world.get_mut::<Connector>(this) {
        connector.linked_to = Some(other);
        connector.joint = Some(joint);
        connector.partner_was_kinematic = other_kinematic;
        connector.forced_partner_kinematic = force_kinematic;
    }

    start_mismatch_feedback(world, this);
    apply_visibility_policy(world, this);

    if cue.plays() {
        if let Some((position, _)) = connection_pose(world, this) {
            emit_cue(
                world,
                CableCue::Connected {
                    connector: this,
                    position,
                },
            );
        }
    }
    debug!("[connector] {:?} linked to {:?}", this, other);
    Ok(())
}

/// Unplug `this`.  Returns `true` if a link was actually removed.
///
/// No-op when `this` is unlinked, or when `only_if` names someone other than
/// the current partner (a stale caller racing a newer connection).
pub fn disconnect(
    world: &mut World,
    this: Entity,
    only_if: Option<Entity>,
    cue: CuePolicy,
) -> bool {
    let Some(connector) = world.get::<Connector>(this) else {
        return false;
    };
    let Some(partner) = connector.linked_to else {
        return false;
    };
    if only_if.is_some_and(|expected| expected != partner) {
        return false;
    }

    let joint = connector.joint;
    let forced = connector.forced_partner_kinematic;
    let partner_was_kinematic = connector.partner_was_kinematic;
    let task = connector.mismatch_task;

    if let Some(mut connector) = world.get_mut::<Connector>(this) {
        connector.linked_to = None;
        connector.joint = None;
        connector.forced_partner_kinematic = false;
        connector.mismatch_task = None;
    }
    if let Some(joint) = joint {
        despawn_if_exists(world, joint);
    }
    if forced {
        set_kinematic(world, partner, partner_was_kinematic);
    }

    debug_assert!(
        linked_partner(world, this).is_none(),
        "link must be cleared before the partner is asked to disconnect"
    );
    disconnect(world, partner, Some(this), CuePolicy::Silent);

    if let Some(task) = task {
        if let Some(mut scheduler) = world.get_resource_mut::<CableScheduler>() {
            scheduler.cancel(task);
        }
    }
    apply_visibility_policy(world, this);

    if cue.plays() {
        if let Some((position, _)) = connection_pose(world, this) {
            emit_cue(
                world,
                CableCue::Disconnected {
                    connector: this,
                    position,
                },
            );
        }
    }
    debug!("[connector] {:?} unlinked from {:?}", this, partner);
    true
}

fn mate_transforms(world: &mut World, this: Entity, other: Entity) {
    let Some((anchor_position, anchor_rotation)) = connection_pose(world, this) else {
        return;
    };
    let Some(other_anchor) = world.get::<Connector>(other).map(|c| c.anchor) else {
        return;
    };
    let Some(mut transform) = world.get_mut::<Transform>(other) else {
        return;
    };
    transform.rotation = anchor_rotation * other_anchor.rotation;
    let offset = transform.transform_point(other_anchor.translation) - transform.translation;
    transform.translation = anchor_position - offset;
}

/// Fixed joint holding the two bodies at their current relative pose.
fn spawn_fixed_joint(world: &mut World, this: Entity, other: Entity) -> Entity {
    let this_pose = world.get::<Transform>(this).copied().unwrap_or_default();
    let other_pose = world.get::<Transform>(other).copied().unwrap_or_default();
    let inverse = other_pose.rotation.inverse();
    let joint = FixedJointBuilder::new()
        .local_anchor1(inverse * (this_pose.translation - other_pose.translation))
        .local_basis1(inverse * this_pose.rotation);
    world
        .spawn((
            ConnectorJoint {
                owner: this,
                partner: other,
            },
            ImpulseJoint::new(other, joint),
            ChildOf(this),
        ))
        .id()
}

fn apply_visibility_policy(world: &mut World, entity: Entity) {
    let Some(connector) = world.get::<Connector>(entity) else {
        return;
    };
    if !connector.hide_when_connected {
        return;
    }
    let connected = connector.is_connected();
    if let Some(mut interactable) = world.get_mut::<Interactable>(entity) {
        interactable.enabled = !connected;
        if connected {
            interactable.deselect();
        }
    }
    if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
        if connected {
            entity_mut.insert(ColliderDisabled);
        } else {
            entity_mut.remove::<ColliderDisabled>();
        }
    }
}

// ── Body helpers ──────────────────────────────────────────────────────────────

/// Kinematic bodies are moved by code, not by the solver.
pub fn is_kinematic(world: &World, entity: Entity) -> bool {
    matches!(
        world.get::<RigidBody>(entity),
        Some(RigidBody::KinematicPositionBased | RigidBody::KinematicVelocityBased)
    )
}

/// Toggle between dynamic and position-based kinematic.  Fixed bodies and
/// entities without a body are left alone.
pub fn set_kinematic(world: &mut World, entity: Entity, kinematic: bool) {
    let Some(mut body) = world.get_mut::<RigidBody>(entity) else {
        return;
    };
    match (*body, kinematic) {
        (RigidBody::Dynamic, true) => *body = RigidBody::KinematicPositionBased,
        (RigidBody::KinematicPositionBased | RigidBody::KinematicVelocityBased, false) => {
            *body = RigidBody::Dynamic
        }
        _ => {}
    }
}

pub(crate) fn despawn_if_exists(world: &mut World, entity: Entity) {
    if let Ok(entity_mut) = world.get_entity_mut(entity) {
        entity_mut.despawn();
    }
}

// ── Mismatch feedback ─────────────────────────────────────────────────────────

fn start_mismatch_feedback(world: &mut World, this: Entity) {
    let Some(connector) = world.get::<Connector>(this) else {
        return;
    };
    if !connector.mismatch_feedback || connector.mismatch_task.is_some() {
        return;
    }
    if !connector.is_connected() || is_correctly_paired(world, this) {
        return;
    }
    let Some(mut scheduler) = world.get_resource_mut::<CableScheduler>() else {
        return;
    };
    let id = scheduler.spawn(CableTask::MismatchFeedback {
        connector: this,
        countdown: 0.0,
    });
    if let Some(mut connector) = world.get_mut::<Connector>(this) {
        connector.mismatch_task = Some(id);
    }
}

/// One tick of the spark loop: stop unless still linked and still mismatched.
pub(crate) fn tick_mismatch(
    world: &mut World,
    id: TaskId,
    connector: Entity,
    countdown: f32,
    dt: f32,
) -> TaskStep {
    let still_wrong = linked_partner(world, connector).is_some()
        && !is_correctly_paired(world, connector);
    if !still_wrong {
        if let Some(mut c) = world.get_mut::<Connector>(connector) {
            if c.mismatch_task == Some(id) {
                c.mismatch_task = None;
            }
        }
        return TaskStep::Finish;
    }

    let mut countdown = countdown - dt;
    if countdown <= 0.0 {
        if let Some((position, _)) = connection_pose(world, connector) {
            emit_cue(
                world,
                CableCue::MismatchSpark {
                    connector,
                    position,
                },
            );
        }
        let (min, max) = world
            .get_resource::<CableConfig>()
            .map(|c| (c.mismatch_period_min, c.mismatch_period_max))
            .unwrap_or((
                crate::constants::MISMATCH_PERIOD_MIN,
                crate::constants::MISMATCH_PERIOD_MAX,
            ));
        countdown = world
            .resource_mut::<CableScheduler>()
            .next_period(min, max);
    }
    TaskStep::Continue(CableTask::MismatchFeedback {
        connector,
        countdown,
    })
}

// ── Systems & commands ────────────────────────────────────────────────────────

/// Connect authored pre-links once, silently.
pub fn resolve_pending_links_system(world: &mut World) {
    let mut query = world.query::<(Entity, &PendingLink)>();
    let pending: Vec<(Entity, Entity)> = query.iter(world).map(|(e, p)| (e, p.0)).collect();
    for (entity, target) in pending {
        if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
            entity_mut.remove::<PendingLink>();
        }
        if linked_partner(world, entity) == Some(target) {
            continue;
        }
        report(connect(world, entity, target, CuePolicy::Silent));
    }
}

/// Sever links whose partner lost its `Connector` (despawned or stripped), and
/// despawn fixed joints no longer owned by a live link.
pub fn connector_teardown_system(world: &mut World) {
    let mut connectors = world.query::<(Entity, &Connector)>();
    let linked: Vec<(Entity, Entity)> = connectors
        .iter(world)
        .filter_map(|(e, c)| c.linked_to.map(|p| (e, p)))
        .collect();
    for (entity, partner) in linked {
        if world.get::<Connector>(partner).is_none() {
            debug!("[connector] {:?} lost partner {:?}; severing", entity, partner);
            disconnect(world, entity, None, CuePolicy::Silent);
        }
    }

    let mut joints = world.query::<(Entity, &ConnectorJoint)>();
    let all_joints: Vec<(Entity, ConnectorJoint)> =
        joints.iter(world).map(|(e, j)| (e, *j)).collect();
    for (entity, joint) in all_joints {
        let owned = world
            .get::<Connector>(joint.owner)
            .is_some_and(|c| c.joint == Some(entity) && c.linked_to == Some(joint.partner));
        if !owned {
            despawn_if_exists(world, entity);
        }
    }
}

/// Queue connector transitions from ordinary systems.
pub trait ConnectorCommandsExt {
    fn connect_connectors(&mut self, this: Entity, other: Entity, cue: CuePolicy);
    fn disconnect_connector(&mut self, this: Entity, cue: CuePolicy);
}

impl ConnectorCommandsExt for Commands<'_, '_> {
    fn connect_connectors(&mut self, this: Entity, other: Entity, cue: CuePolicy) {
        self.queue(move |world: &mut World| {
            report(connect(world, this, other, cue));
        });
    }

    fn disconnect_connector(&mut self, this: Entity, cue: CuePolicy) {
        self.queue(move |world: &mut World| {
            disconnect(world, this, None, cue);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector_world() -> World {
        let mut world = World::new();
        world.insert_resource(CableScheduler::default());
        world.insert_resource(CableConfig::default());
        world
    }

    fn spawn_connector(world: &mut World, connector: Connector, at: Vec3) -> Entity {
        world
            .spawn((
                connector,
                Transform::from_translation(at),
                RigidBody::Dynamic,
                Interactable::default(),
            ))
            .id()
    }

    #[test]
    fn can_pair_requires_opposite_polarity_and_compatible_colour() {
        let male = Connector::new(Polarity::Male, SignalColor::Red);
        let female = Connector::new(Polarity::Female, SignalColor::Red);
        let blue_female = Connector::new(Polarity::Female, SignalColor::Blue);

        assert!(male.can_pair(&female));
        assert!(!male.can_pair(&male.clone()));
        assert!(!male.can_pair(&blue_female));
        assert!(male
            .clone()
            .with_color_mismatch_allowed(true)
            .can_pair(&blue_female));
    }

    #[test]
    fn connect_moves_partner_onto_anchor() {
        let mut world = connector_world();
        let socket = spawn_connector(
            &mut world,
            Connector::new(Polarity::Female, SignalColor::White)
                .with_anchor(Transform::from_xyz(0.0, 0.0, 0.5)),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let plug = spawn_connector(
            &mut world,
            Connector::new(Polarity::Male, SignalColor::White)
                .with_anchor(Transform::from_xyz(0.0, 0.0, -0.25)),
            Vec3::new(10.0, 0.0, 0.0),
        );

        connect(&mut world, socket, plug, CuePolicy::Silent).unwrap();

        let (socket_anchor, _) = connection_pose(&world, socket).unwrap();
        let (plug_anchor, _) = connection_pose(&world, plug).unwrap();
        assert!(
            socket_anchor.distance(plug_anchor) < 1e-5,
            "anchors must coincide, got {socket_anchor:?} vs {plug_anchor:?}"
        );
    }

    #[test]
    fn initiator_owns_the_joint() {
        let mut world = connector_world();
        let a = spawn_connector(&mut world, Connector::new(Polarity::Male, SignalColor::White), Vec3::ZERO);
        let b = spawn_connector(&mut world, Connector::new(Polarity::Female, SignalColor::White), Vec3::X);

        connect(&mut world, a, b, CuePolicy::Silent).unwrap();

        let joint = world.get::<Connector>(a).unwrap().owned_joint().expect("initiator owns joint");
        assert!(world.get::<Connector>(b).unwrap().owned_joint().is_none());
        assert_eq!(
            world.get::<ConnectorJoint>(joint),
            Some(&ConnectorJoint { owner: a, partner: b })
        );
        assert_eq!(world.get::<ImpulseJoint>(joint).unwrap().parent, b);

        disconnect(&mut world, b, None, CuePolicy::Silent);
        assert!(world.get_entity(joint).is_err(), "joint despawned by its owner");
    }

    #[test]
    fn forced_kinematic_partner_is_restored() {
        let mut world = connector_world();
        let a = spawn_connector(
            &mut world,
            Connector::new(Polarity::Male, SignalColor::White).with_partner_kinematic(true),
            Vec3::ZERO,
        );
        let b = spawn_connector(&mut world, Connector::new(Polarity::Female, SignalColor::White), Vec3::X);

        connect(&mut world, a, b, CuePolicy::Silent).unwrap();
        assert!(is_kinematic(&world, b));

        disconnect(&mut world, a, None, CuePolicy::Silent);
        assert!(!is_kinematic(&world, b));
        assert_eq!(world.get::<RigidBody>(b), Some(&RigidBody::Dynamic));
    }

    #[test]
    fn hide_policy_disables_collider_and_selection() {
        let mut world = connector_world();
        let a = spawn_connector(&mut world, Connector::new(Polarity::Male, SignalColor::White), Vec3::ZERO);
        let b = spawn_connector(
            &mut world,
            Connector::new(Polarity::Female, SignalColor::White).with_hide_when_connected(true),
            Vec3::X,
        );

        connect(&mut world, a, b, CuePolicy::Silent).unwrap();
        assert!(world.get::<ColliderDisabled>(b).is_some());
        assert!(!world.get::<Interactable>(b).unwrap().enabled);
        assert!(world.get::<ColliderDisabled>(a).is_none());

        disconnect(&mut world, a, None, CuePolicy::Silent);
        assert!(world.get::<ColliderDisabled>(b).is_none());
        assert!(world.get::<Interactable>(b).unwrap().enabled);
    }

    #[test]
    fn stale_disconnect_is_ignored() {
        let mut world = connector_world();
        let a = spawn_connector(&mut world, Connector::new(Polarity::Male, SignalColor::White), Vec3::ZERO);
        let b = spawn_connector(&mut world, Connector::new(Polarity::Female, SignalColor::White), Vec3::X);
        let stranger = spawn_connector(&mut world, Connector::new(Polarity::Female, SignalColor::White), Vec3::Y);

        connect(&mut world, a, b, CuePolicy::Silent).unwrap();
        assert!(!disconnect(&mut world, a, Some(stranger), CuePolicy::Silent));
        assert_eq!(linked_partner(&world, a), Some(b));
    }

    #[test]
    fn teardown_severs_links_to_despawned_partner() {
        let mut world = connector_world();
        let a = spawn_connector(&mut world, Connector::new(Polarity::Male, SignalColor::White), Vec3::ZERO);
        let b = spawn_connector(&mut world, Connector::new(Polarity::Female, SignalColor::White), Vec3::X);
        connect(&mut world, b, a, CuePolicy::Silent).unwrap();

        world.despawn(b);
        connector_teardown_system(&mut world);

        assert_eq!(linked_partner(&world, a), None);
        let mut joints = world.query::<&ConnectorJoint>();
        assert_eq!(joints.iter(&world).count(), 0);
    }

    #[test]
    fn pending_links_connect_once() {
        let mut world = connector_world();
        let a = spawn_connector(&mut world, Connector::new(Polarity::Male, SignalColor::White), Vec3::ZERO);
        let b = spawn_connector(&mut world, Connector::new(Polarity::Female, SignalColor::White), Vec3::X);
        world.entity_mut(a).insert(PendingLink(b));
        world.entity_mut(b).insert(PendingLink(a));

        resolve_pending_links_system(&mut world);

        assert_eq!(linked_partner(&world, a), Some(b));
        assert_eq!(linked_partner(&world, b), Some(a));
        assert!(world.get::<PendingLink>(a).is_none());
        assert!(world.get::<PendingLink>(b).is_none());
    }
}
