//! Selection and holding: the narrow contract between a "hand" and the cable core.
//!
//! ## Components
//!
//! | Component       | Role |
//! |-----------------|------|
//! | [`Interactable`] | selection state + enable flag, one per pickable/pluggable entity |
//! | [`Holder`]       | a hand: current selection, target pose, held entity, hold layer |
//!
//! Finding *what* the hand points at (ray/sphere casts, cursors) belongs to the
//! caller, which reports it through [`update_selection`].  Input is reduced to
//! two messages: [`HoldRequest`] toggles pick-up/drop and [`HolderTeleported`]
//! forces a drop.  Both are scoped to the app that registered them, so several
//! independent simulations can coexist in one process.

use crate::config::CableConfig;
use crate::draggable::{drop_lifted, pick_up, Liftable};
use crate::error::{report, CableError, CableResult};
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;

// ── Components ────────────────────────────────────────────────────────────────

/// Selection state shared by everything a holder can point at.
///
/// A disabled interactable can still be pointed at but never becomes selected
/// and is never treated as a connection target.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interactable {
    pub enabled: bool,
    selected: bool,
}

impl Default for Interactable {
    fn default() -> Self {
        Self {
            enabled: true,
            selected: false,
        }
    }
}

impl Interactable {
    #[inline]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn select(&mut self) {
        self.selected = true;
    }

    pub fn deselect(&mut self) {
        self.selected = false;
    }
}

/// A hand that can select, lift, and drop things.
#[derive(Component, Debug, Clone)]
pub struct Holder {
    /// Whatever the hand currently points at, enabled or not.
    pub selection: Option<Entity>,
    /// Entity currently held, if any.
    pub held: Option<Entity>,
    /// Physics layer colliders of a held body are moved to.
    pub hold_layer: u32,
    /// Pose the held body is driven toward.
    pub target: Transform,
}

impl Holder {
    pub fn new(hold_layer: u32) -> Self {
        Self {
            selection: None,
            held: None,
            hold_layer,
            target: Transform::IDENTITY,
        }
    }

    #[inline]
    pub fn current_selection(&self) -> Option<Entity> {
        self.selection
    }

    #[inline]
    pub fn target_pose(&self) -> Transform {
        self.target
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// Toggle: drop what `holder` holds, or pick up its current selection.
#[derive(Message, Debug, Clone, Copy)]
pub struct HoldRequest {
    pub holder: Entity,
}

/// The holder jumped somewhere (portal, respawn); whatever it holds is dropped.
#[derive(Message, Debug, Clone, Copy)]
pub struct HolderTeleported {
    pub holder: Entity,
}

// ── Operations ────────────────────────────────────────────────────────────────

/// Point `holder` at `found` (or at nothing), updating selection flags.
///
/// The previous selection is always deselected; the new one is selected only
/// if its [`Interactable`] is enabled.
pub fn update_selection(
    world: &mut World,
    holder: Entity,
    found: Option<Entity>,
) -> CableResult<()> {
    let Some(current) = world.get::<Holder>(holder).map(|h| h.selection) else {
        return Err(CableError::InvalidArgument {
            context: "update_selection: entity is not a holder",
        });
    };
    if current == found {
        return Ok(());
    }

    if let Some(previous) = current {
        if let Some(mut interactable) = world.get_mut::<Interactable>(previous) {
            interactable.deselect();
        }
    }

    if let Some(mut h) = world.get_mut::<Holder>(holder) {
        h.selection = found;
    }

    if let Some(next) = found {
        if let Some(mut interactable) = world.get_mut::<Interactable>(next) {
            if interactable.enabled {
                interactable.select();
            }
        }
    }
    Ok(())
}

/// Drop the held entity, or pick up the current selection if it is liftable.
pub fn toggle_hold(world: &mut World, holder: Entity) -> CableResult<()> {
    let Some(h) = world.get::<Holder>(holder).cloned() else {
        return Err(CableError::InvalidArgument {
            context: "toggle_hold: entity is not a holder",
        });
    };

    if let Some(held) = h.held {
        release_held(world, holder);
        if world.get::<Liftable>(held).is_some() {
            return drop_lifted(world, held);
        }
        // The held body was despawned: the hand is simply empty again.
        debug!("[hold] {:?} lost its held {:?}", holder, held);
    }

    let Some(selected) = h.selection else {
        return Ok(());
    };
    if world.get::<Liftable>(selected).is_none() {
        return Ok(());
    }
    pick_up(world, selected, holder, h.hold_layer)
}

/// Drop whatever `holder` holds.  No-op when its hand is empty.
pub fn drop_held(world: &mut World, holder: Entity) -> CableResult<()> {
    let held = world.get::<Holder>(holder).and_then(|h| h.held);
    match held {
        Some(held) => {
            release_held(world, holder);
            if world.get::<Liftable>(held).is_none() {
                return Ok(());
            }
            drop_lifted(world, held)
        }
        None => Ok(()),
    }
}

fn release_held(world: &mut World, holder: Entity) {
    if let Some(mut h) = world.get_mut::<Holder>(holder) {
        h.held = None;
    }
}

// ── Systems ───────────────────────────────────────────────────────────────────

/// Turn [`HoldRequest`] messages into pick-ups and drops.
pub fn hold_request_system(mut requests: MessageReader<HoldRequest>, mut commands: Commands) {
    for request in requests.read() {
        let holder = request.holder;
        commands.queue(move |world: &mut World| {
            report(toggle_hold(world, holder));
        });
    }
}

/// Drop held objects of holders that teleported this step.
pub fn teleport_drop_system(
    mut teleports: MessageReader<HolderTeleported>,
    mut commands: Commands,
) {
    for teleport in teleports.read() {
        let holder = teleport.holder;
        commands.queue(move |world: &mut World| {
            report(drop_held(world, holder));
        });
    }
}

/// Drive every held body toward its holder's target pose.
///
/// Velocity is proportional to the remaining offset, so the body lags a little
/// behind fast hand motion instead of teleporting through obstacles.  Pitch is
/// clamped so a held cable end can't be flipped upside down.
pub fn drive_held_system(
    holders: Query<&Holder>,
    mut held: Query<(&mut Transform, &mut Velocity, &Liftable)>,
    config: Res<CableConfig>,
) {
    for holder in holders.iter() {
        let Some(entity) = holder.held else {
            continue;
        };
        let Ok((mut transform, mut velocity, liftable)) = held.get_mut(entity) else {
            continue;
        };
        if !liftable.is_lifted() {
            continue;
        }
        let target = holder.target_pose();
        velocity.linvel = (target.translation - transform.translation) * config.holding_gain;
        velocity.angvel = Vec3::ZERO;
        transform.rotation = clamped_hold_rotation(
            target.rotation,
            config.max_held_pitch_deg,
            liftable.lift_direction_offset,
        );
    }
}

/// Target rotation with its pitch clamped to `±max_pitch_deg`, then offset by
/// the liftable's preferred direction (Euler degrees, YXZ).
pub fn clamped_hold_rotation(target: Quat, max_pitch_deg: f32, offset_deg: Vec3) -> Quat {
    let (yaw, pitch, roll) = target.to_euler(EulerRot::YXZ);
    let limit = max_pitch_deg.to_radians();
    let pitch = pitch.clamp(-limit, limit);
    let offset = Quat::from_euler(
        EulerRot::YXZ,
        offset_deg.y.to_radians(),
        offset_deg.x.to_radians(),
        offset_deg.z.to_radians(),
    );
    Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll) * offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_holder() -> (World, Entity) {
        let mut world = World::new();
        let holder = world.spawn(Holder::new(3)).id();
        (world, holder)
    }

    #[test]
    fn selection_moves_between_interactables() {
        let (mut world, holder) = world_with_holder();
        let a = world.spawn(Interactable::default()).id();
        let b = world.spawn(Interactable::default()).id();

        update_selection(&mut world, holder, Some(a)).unwrap();
        assert!(world.get::<Interactable>(a).unwrap().is_selected());

        update_selection(&mut world, holder, Some(b)).unwrap();
        assert!(!world.get::<Interactable>(a).unwrap().is_selected());
        assert!(world.get::<Interactable>(b).unwrap().is_selected());
        assert_eq!(world.get::<Holder>(holder).unwrap().current_selection(), Some(b));
    }

    #[test]
    fn disabled_interactable_is_pointed_at_but_not_selected() {
        let (mut world, holder) = world_with_holder();
        let disabled = world
            .spawn(Interactable {
                enabled: false,
                ..Default::default()
            })
            .id();

        update_selection(&mut world, holder, Some(disabled)).unwrap();
        assert!(!world.get::<Interactable>(disabled).unwrap().is_selected());
        assert_eq!(
            world.get::<Holder>(holder).unwrap().current_selection(),
            Some(disabled)
        );
    }

    #[test]
    fn selection_on_non_holder_is_invalid() {
        let mut world = World::new();
        let not_a_holder = world.spawn_empty().id();
        assert!(matches!(
            update_selection(&mut world, not_a_holder, None),
            Err(CableError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn toggle_with_non_liftable_selection_does_nothing() {
        let (mut world, holder) = world_with_holder();
        let socket = world.spawn(Interactable::default()).id();
        update_selection(&mut world, holder, Some(socket)).unwrap();

        toggle_hold(&mut world, holder).unwrap();
        assert_eq!(world.get::<Holder>(holder).unwrap().held, None);
    }

    #[test]
    fn despawned_held_body_empties_the_hand() {
        let (mut world, holder) = world_with_holder();
        let gone = world.spawn(Liftable::default()).id();
        let next = world.spawn((Liftable::default(), Interactable::default())).id();
        world.get_mut::<Holder>(holder).unwrap().held = Some(gone);
        world.despawn(gone);
        update_selection(&mut world, holder, Some(next)).unwrap();

        // No error for the dead id; the toggle goes on to lift the selection.
        toggle_hold(&mut world, holder).unwrap();
        assert_eq!(world.get::<Holder>(holder).unwrap().held, Some(next));
        assert!(world.get::<Liftable>(next).unwrap().is_lifted());

        world.get_mut::<Holder>(holder).unwrap().held = Some(gone);
        drop_held(&mut world, holder).unwrap();
        assert_eq!(world.get::<Holder>(holder).unwrap().held, None);
    }

    #[test]
    fn hold_rotation_clamps_pitch() {
        let steep = Quat::from_euler(EulerRot::YXZ, 0.3, 80f32.to_radians(), 0.0);
        let clamped = clamped_hold_rotation(steep, 45.0, Vec3::ZERO);
        let (yaw, pitch, _) = clamped.to_euler(EulerRot::YXZ);
        assert!((pitch - 45f32.to_radians()).abs() < 1e-4);
        assert!((yaw - 0.3).abs() < 1e-4);
    }
}
