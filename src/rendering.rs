//! Rendering: meshes for chain parts and connectors, plus gizmo flashes for cues.
//!
//! ## Layer Model
//!
//! | Layer             | Technology | Source of pose                    |
//! |-------------------|------------|-----------------------------------|
//! | Chain points      | `Mesh3d`   | Rapier body transform             |
//! | Chain segments    | `Mesh3d`   | `segment_pose`, written each step |
//! | Connectors        | `Mesh3d`   | Rapier body transform             |
//! | Selection marker  | Gizmos     | selected `Interactable`           |
//! | Cue flashes       | Gizmos     | `CableCue` messages               |
//!
//! ## System Responsibilities
//!
//! | System                   | Schedule | Purpose                                  |
//! |--------------------------|----------|------------------------------------------|
//! | `setup_cable_render_assets` | Startup | Build shared meshes and materials       |
//! | `attach_cable_visuals`   | Update   | Give new points/segments/connectors meshes |
//! | `collect_cue_flashes`    | Update   | Turn cue messages into short flashes     |
//! | `cable_gizmo_system`     | Update   | Draw flashes and the selection marker    |

use crate::cable::{CablePoint, CableSegment};
use crate::config::CableConfig;
use crate::connector::Connector;
use crate::cues::CableCue;
use crate::interaction::Interactable;
use bevy::prelude::*;

/// How long a cue flash stays on screen, in seconds.
const FLASH_SECS: f32 = 0.25;

pub struct CableRenderPlugin;

impl Plugin for CableRenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CueFlashes>()
            .add_systems(Startup, setup_cable_render_assets)
            .add_systems(
                Update,
                (attach_cable_visuals, collect_cue_flashes, cable_gizmo_system).chain(),
            );
    }
}

// ── Assets ────────────────────────────────────────────────────────────────────

#[derive(Resource, Debug, Clone)]
pub struct CableRenderAssets {
    pub point_mesh: Handle<Mesh>,
    /// Unit-thickness box two units long; segment scale stretches it.
    pub segment_mesh: Handle<Mesh>,
    pub connector_mesh: Handle<Mesh>,
    pub cable_material: Handle<StandardMaterial>,
}

pub fn setup_cable_render_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<CableConfig>,
) {
    let radius = config.segment_thickness * 0.5;
    commands.insert_resource(CableRenderAssets {
        point_mesh: meshes.add(Sphere::new(radius)),
        segment_mesh: meshes.add(Cuboid::new(1.0, 1.0, 2.0)),
        connector_mesh: meshes.add(Cuboid::new(radius * 3.0, radius * 2.0, radius * 2.0)),
        cable_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.15, 0.15, 0.18),
            perceptual_roughness: 0.8,
            ..Default::default()
        }),
    });
}

/// Give meshes to chain parts and connectors spawned since the last frame.
#[allow(clippy::type_complexity)]
pub fn attach_cable_visuals(
    mut commands: Commands,
    assets: Option<Res<CableRenderAssets>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    points: Query<Entity, (Added<CablePoint>, Without<Mesh3d>)>,
    segments: Query<Entity, (Added<CableSegment>, Without<Mesh3d>)>,
    connectors: Query<(Entity, &Connector), (Added<Connector>, Without<Mesh3d>)>,
) {
    let Some(assets) = assets else {
        return;
    };
    for entity in points.iter() {
        commands.entity(entity).insert((
            Mesh3d(assets.point_mesh.clone()),
            MeshMaterial3d(assets.cable_material.clone()),
        ));
    }
    for entity in segments.iter() {
        commands.entity(entity).insert((
            Mesh3d(assets.segment_mesh.clone()),
            MeshMaterial3d(assets.cable_material.clone()),
        ));
    }
    for (entity, connector) in connectors.iter() {
        let material = materials.add(StandardMaterial {
            base_color: connector.color.display_color(),
            ..Default::default()
        });
        commands.entity(entity).insert((
            Mesh3d(assets.connector_mesh.clone()),
            MeshMaterial3d(material),
        ));
    }
}

// ── Cue flashes ───────────────────────────────────────────────────────────────

#[derive(Resource, Debug, Default)]
pub struct CueFlashes {
    /// `(position, colour, seconds left)`
    active: Vec<(Vec3, Color, f32)>,
}

pub fn collect_cue_flashes(
    mut cues: MessageReader<CableCue>,
    mut flashes: ResMut<CueFlashes>,
    time: Res<Time>,
) {
    let dt = time.delta_secs();
    flashes.active.retain_mut(|(_, _, left)| {
        *left -= dt;
        *left > 0.0
    });
    for cue in cues.read() {
        let color = match cue {
            CableCue::Connected { .. } => Color::srgb(0.3, 1.0, 0.3),
            CableCue::Disconnected { .. } => Color::srgb(0.6, 0.6, 0.6),
            CableCue::MismatchSpark { .. } => Color::srgb(1.0, 0.85, 0.2),
            CableCue::Snapped { .. } => Color::srgb(1.0, 0.2, 0.2),
        };
        flashes.active.push((cue.position(), color, FLASH_SECS));
    }
}

pub fn cable_gizmo_system(
    mut gizmos: Gizmos,
    flashes: Res<CueFlashes>,
    selected: Query<(&Transform, &Interactable)>,
) {
    for &(position, color, left) in &flashes.active {
        let size = 0.1 + 0.4 * (left / FLASH_SECS);
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            gizmos.line(position - axis * size, position + axis * size, color);
        }
    }
    for (transform, interactable) in selected.iter() {
        if !interactable.is_selected() {
            continue;
        }
        let p = transform.translation + Vec3::Y * 0.3;
        gizmos.line(p, p + Vec3::Y * 0.2, Color::WHITE);
    }
}
