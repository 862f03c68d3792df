//! Headless tests for [`CablePlugin`] wiring.
//!
//! These use [`MinimalPlugins`] with no window, rendering, or Rapier plugin.
//! The fixed-step schedule is run by hand so each test controls exactly how
//! many steps happen.

use bevy::ecs::message::Messages;
use bevy::prelude::*;
use cableworks::cable::{spawn_cable, CableDescriptor};
use cableworks::config::CableConfig;
use cableworks::connector::{linked_partner, Connector, PendingLink, Polarity, SignalColor};
use cableworks::cues::{CableCue, CuePolicy};
use cableworks::draggable::Liftable;
use cableworks::interaction::{update_selection, HoldRequest, Holder, HolderTeleported};
use cableworks::scheduler::CableScheduler;
use cableworks::simulation::CablePlugin;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn headless_app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, CablePlugin));
    app.update(); // run Startup
    app
}

fn fixed_step(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn spawn_connector(app: &mut App, polarity: Polarity) -> Entity {
    app.world_mut()
        .spawn((Connector::new(polarity, SignalColor::Red), Transform::IDENTITY))
        .id()
}

/// A cable plus a holder already pointing at its start endpoint.
fn cable_and_holder(app: &mut App) -> (Entity, Entity) {
    let world = app.world_mut();
    let config = world.resource::<CableConfig>().clone();
    let descriptor = CableDescriptor {
        transform: Transform::IDENTITY,
        start: Connector::new(Polarity::Male, SignalColor::Red),
        end: Connector::new(Polarity::Male, SignalColor::Red),
        segment_count: Some(2),
    };
    let handles = spawn_cable(world, &descriptor, &config).unwrap();
    let holder = world.spawn(Holder::new(config.held_layer)).id();
    update_selection(world, holder, Some(handles.start)).unwrap();
    (handles.start, holder)
}

fn is_lifted(app: &App, entity: Entity) -> bool {
    app.world()
        .get::<Liftable>(entity)
        .is_some_and(Liftable::is_lifted)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[test]
fn plugin_registers_resources_and_messages() {
    let app = headless_app();
    let world = app.world();
    assert!(world.contains_resource::<CableConfig>());
    assert!(world.contains_resource::<CableScheduler>());
    assert!(world.contains_resource::<Messages<CableCue>>());
    assert!(world.contains_resource::<Messages<HoldRequest>>());
    assert!(world.contains_resource::<Messages<HolderTeleported>>());
}

#[test]
fn pending_links_connect_silently_on_first_step() {
    let mut app = headless_app();
    let socket = spawn_connector(&mut app, Polarity::Female);
    let plug = spawn_connector(&mut app, Polarity::Male);
    app.world_mut().entity_mut(socket).insert(PendingLink(plug));

    fixed_step(&mut app);

    assert_eq!(linked_partner(app.world(), socket), Some(plug));
    assert_eq!(linked_partner(app.world(), plug), Some(socket));
    assert!(app.world().get::<PendingLink>(socket).is_none());
    let connected = app
        .world_mut()
        .resource_mut::<Messages<CableCue>>()
        .drain()
        .filter(|cue| matches!(cue, CableCue::Connected { .. }))
        .count();
    assert_eq!(connected, 0);
}

#[test]
fn hold_requests_toggle_lifting() {
    let mut app = headless_app();
    let (start, holder) = cable_and_holder(&mut app);

    app.world_mut().write_message(HoldRequest { holder });
    fixed_step(&mut app);
    assert!(is_lifted(&app, start));
    assert_eq!(app.world().get::<Holder>(holder).unwrap().held, Some(start));

    app.world_mut().write_message(HoldRequest { holder });
    fixed_step(&mut app);
    assert!(!is_lifted(&app, start));
    assert_eq!(app.world().get::<Holder>(holder).unwrap().held, None);
}

#[test]
fn teleporting_holder_drops_what_it_holds() {
    let mut app = headless_app();
    let (start, holder) = cable_and_holder(&mut app);
    app.world_mut().write_message(HoldRequest { holder });
    fixed_step(&mut app);
    assert!(is_lifted(&app, start));

    app.world_mut().write_message(HolderTeleported { holder });
    fixed_step(&mut app);
    assert!(!is_lifted(&app, start));
}

#[test]
fn teleport_of_another_holder_is_ignored() {
    let mut app = headless_app();
    let (start, holder) = cable_and_holder(&mut app);
    let bystander = app.world_mut().spawn(Holder::new(3)).id();
    app.world_mut().write_message(HoldRequest { holder });
    fixed_step(&mut app);

    app.world_mut().write_message(HolderTeleported { holder: bystander });
    fixed_step(&mut app);
    assert!(is_lifted(&app, start));
}

#[test]
fn despawned_partner_is_severed_next_step() {
    let mut app = headless_app();
    let socket = spawn_connector(&mut app, Polarity::Female);
    let plug = spawn_connector(&mut app, Polarity::Male);
    cableworks::connector::connect(app.world_mut(), plug, socket, CuePolicy::Silent).unwrap();

    app.world_mut().despawn(socket);
    fixed_step(&mut app);

    assert_eq!(linked_partner(app.world(), plug), None);
    assert!(app
        .world()
        .get::<Connector>(plug)
        .unwrap()
        .owned_joint()
        .is_none());
}
