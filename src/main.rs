use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier3d::prelude::*;
use cableworks::cable::{spawn_cable, CableDescriptor};
use cableworks::config::{self, CableConfig};
use cableworks::connector::{Connector, PendingLink, Polarity, SignalColor};
use cableworks::error::report;
use cableworks::interaction::{update_selection, HoldRequest, Holder, Interactable};
use cableworks::rendering::CableRenderPlugin;
use cableworks::simulation::CablePlugin;

/// How close the hand must be to select something.
const SELECT_RADIUS: f32 = 0.6;
/// Hand movement speed in units per second.
const HAND_SPEED: f32 = 2.0;

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 3.0, 5.0).looking_at(Vec3::new(0.0, 0.5, -1.0), Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..Default::default()
        },
        Transform::from_xyz(3.0, 6.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(10.0, 0.2, 10.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.35, 0.4, 0.35))),
        Transform::from_xyz(0.0, -0.1, 0.0),
        RigidBody::Fixed,
        Collider::cuboid(5.0, 0.1, 5.0),
    ));
}

/// One cable, plugged into a red socket at start-up, and a blue socket to try.
fn spawn_demo_cable(world: &mut World) {
    let config = world.resource::<CableConfig>().clone();
    let socket_anchor = Transform::from_xyz(0.15, 0.0, 0.0);

    let red_socket = world
        .spawn((
            Connector::new(Polarity::Female, SignalColor::Red)
                .with_anchor(socket_anchor)
                .with_partner_kinematic(true),
            Interactable::default(),
            Transform::from_xyz(-1.5, 1.0, -1.0),
            RigidBody::Fixed,
            Collider::cuboid(0.15, 0.15, 0.15),
        ))
        .id();
    world.spawn((
        Connector::new(Polarity::Female, SignalColor::Blue).with_anchor(socket_anchor),
        Interactable::default(),
        Transform::from_xyz(1.5, 1.0, -1.0),
        RigidBody::Fixed,
        Collider::cuboid(0.15, 0.15, 0.15),
    ));

    let descriptor = CableDescriptor {
        transform: Transform::from_xyz(-1.2, 1.0, -1.0)
            .looking_to(Vec3::X, Vec3::Y),
        start: Connector::new(Polarity::Male, SignalColor::Red)
            .with_anchor(Transform::from_xyz(-0.15, 0.0, 0.0)),
        end: Connector::new(Polarity::Male, SignalColor::Red)
            .with_anchor(Transform::from_xyz(0.15, 0.0, 0.0)),
        segment_count: None,
    };
    match spawn_cable(world, &descriptor, &config) {
        Ok(handles) => {
            // The socket initiates so the cable end is the body that moves.
            world.entity_mut(red_socket).insert(PendingLink(handles.start));
        }
        Err(e) => error!("Failed to spawn demo cable: {e}"),
    }

    world.spawn((
        Holder::new(config.held_layer),
        Transform::from_xyz(0.0, 1.0, -1.0),
    ));
}

/// Move the hand with WASD/QZ, toggle holding with E.
fn hand_input_system(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut holders: Query<(Entity, &mut Holder, &mut Transform)>,
    mut requests: MessageWriter<HoldRequest>,
) {
    let step = HAND_SPEED * time.delta_secs();
    for (entity, mut holder, mut transform) in holders.iter_mut() {
        let mut delta = Vec3::ZERO;
        for (key, dir) in [
            (KeyCode::KeyW, Vec3::NEG_Z),
            (KeyCode::KeyS, Vec3::Z),
            (KeyCode::KeyA, Vec3::NEG_X),
            (KeyCode::KeyD, Vec3::X),
            (KeyCode::KeyQ, Vec3::Y),
            (KeyCode::KeyZ, Vec3::NEG_Y),
        ] {
            if keys.pressed(key) {
                delta += dir;
            }
        }
        transform.translation += delta * step;
        holder.target = *transform;

        if keys.just_pressed(KeyCode::KeyE) {
            requests.write(HoldRequest { holder: entity });
        }
    }
}

/// Select the nearest interactable within reach of each hand.
fn proximity_selection_system(
    mut commands: Commands,
    holders: Query<(Entity, &Holder, &Transform)>,
    candidates: Query<(Entity, &Transform), With<Interactable>>,
) {
    for (holder_entity, holder, hand) in holders.iter() {
        let nearest = candidates
            .iter()
            .filter(|(e, _)| Some(*e) != holder.held)
            .map(|(e, t)| (e, t.translation.distance(hand.translation)))
            .filter(|(_, d)| *d <= SELECT_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(e, _)| e);
        if nearest != holder.current_selection() {
            commands.queue(move |world: &mut World| {
                report(update_selection(world, holder_entity, nearest));
            });
        }
    }
}

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Cableworks".into(),
            resolution: WindowResolution::new(1200, 680),
            ..Default::default()
        }),
        ..Default::default()
    }))
    .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
    .add_plugins(CablePlugin)
    .add_plugins(CableRenderPlugin)
    .add_systems(
        Startup,
        (
            setup_scene,
            spawn_demo_cable.after(config::load_cable_config),
        ),
    )
    .add_systems(Update, (hand_input_system, proximity_selection_system).chain());

    app.run();
}
