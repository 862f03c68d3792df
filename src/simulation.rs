//! Cable plugin: registers messages and resources and orders the per-step systems.

use crate::cable::cable_step_system;
use crate::config::{load_cable_config, CableConfig};
use crate::connector::{connector_teardown_system, resolve_pending_links_system};
use crate::cues::CableCue;
use crate::interaction::{
    drive_held_system, hold_request_system, teleport_drop_system, HoldRequest, HolderTeleported,
};
use crate::scheduler::{run_cable_tasks_system, seed_scheduler_system, CableScheduler};
use bevy::prelude::*;

/// Connector, cable, and holding systems.  Physics itself comes from Rapier's
/// plugin, which the app adds separately.
pub struct CablePlugin;

impl Plugin for CablePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CableConfig>()
            .init_resource::<CableScheduler>()
            .add_message::<CableCue>()
            .add_message::<HoldRequest>()
            .add_message::<HolderTeleported>()
            .add_systems(
                Startup,
                (load_cable_config, seed_scheduler_system).chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    resolve_pending_links_system,
                    connector_teardown_system,
                    hold_request_system,
                    teleport_drop_system,
                    drive_held_system,
                    run_cable_tasks_system,
                    // Last, so break checks see this step's connects and disconnects.
                    cable_step_system,
                )
                    .chain(),
            );
    }
}
