//! Fire-and-forget audio/VFX cue requests.
//!
//! The core never plays sounds or particles itself.  It writes [`CableCue`]
//! messages; whatever owns the audio and particle systems reads them and may
//! ignore any of them.

use bevy::prelude::*;

/// Whether an operation should request a cue.
///
/// Load-time restoration of authored links and the reciprocal half of a
/// disconnect run [`CuePolicy::Silent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CuePolicy {
    #[default]
    Silent,
    Play,
}

impl CuePolicy {
    #[inline]
    pub fn plays(self) -> bool {
        matches!(self, CuePolicy::Play)
    }
}

/// A cue request.  Positions are world-space.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub enum CableCue {
    /// Two connectors were plugged together.
    Connected { connector: Entity, position: Vec3 },
    /// A connector was unplugged on request.
    Disconnected { connector: Entity, position: Vec3 },
    /// One tick of the mismatch feedback loop (sparks + crackle).
    MismatchSpark { connector: Entity, position: Vec3 },
    /// A cable was overstretched for too long and both ends let go.
    Snapped { cable: Entity, position: Vec3 },
}

impl CableCue {
    /// World-space position where the cue should play.
    pub fn position(&self) -> Vec3 {
        match *self {
            CableCue::Connected { position, .. }
            | CableCue::Disconnected { position, .. }
            | CableCue::MismatchSpark { position, .. }
            | CableCue::Snapped { position, .. } => position,
        }
    }
}

/// Write a cue into the world's message queue.
///
/// If no reader registered the message type the cue is simply dropped.
pub fn emit_cue(world: &mut World, cue: CableCue) {
    if world.contains_resource::<Messages<CableCue>>() {
        world.write_message(cue);
    }
}
