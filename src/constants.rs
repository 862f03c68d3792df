//! Centralised cable, connector, and interaction constants.
//!
//! All tuneable values live here so they can be found, reasoned-about, and
//! modified in one place.  [`crate::config::CableConfig::default`] reads every
//! value from this file; `assets/cable.toml` can override any subset at startup.

// ── Cable Geometry ────────────────────────────────────────────────────────────

/// Number of intermediate point bodies in a freshly spawned cable.
pub const DEFAULT_SEGMENT_COUNT: usize = 3;

/// Rest distance between two consecutive chain bodies (world units).
///
/// Also used as the rest length of every spring, so the chain behaves like a
/// string of near-rigid elastic struts rather than loose springs.
pub const SEGMENT_SPACING: f32 = 0.3;

/// Visual thickness of a segment and diameter of a point body.
pub const SEGMENT_THICKNESS: f32 = 0.3;

// ── Cable Springs ─────────────────────────────────────────────────────────────

/// Spring stiffness between consecutive chain bodies.
///
/// Lower values make the cable visibly stretch under its own weight; much
/// higher values need more solver iterations to stay stable.
pub const SPRING_STIFFNESS: f32 = 200.0;

/// Spring damping between consecutive chain bodies.
pub const SPRING_DAMPING: f32 = 0.2;

/// Linear damping applied to generated point bodies.
pub const POINT_LINEAR_DAMPING: f32 = 0.5;

/// Angular damping applied to generated point bodies.
pub const POINT_ANGULAR_DAMPING: f32 = 0.5;

// ── Cable Breaking ────────────────────────────────────────────────────────────

/// Multiplier on the authored rest length (`spacing × segment_count`) beyond
/// which a plugged-in cable is considered overstretched.
pub const BREAK_LENGTH_MULTIPLIER: f32 = 2.0;

/// Fixed slack added on top of the scaled rest length (world units).
///
/// Keeps very short cables from snapping on the first tug.
pub const BREAK_SLACK: f32 = 2.0;

/// Seconds a cable must stay overstretched before both ends are unplugged.
///
/// Any tick back under the threshold restores the full grace period.
pub const MIN_BREAK_SECS: f32 = 1.0;

// ── Connector Feedback ────────────────────────────────────────────────────────

/// Lower bound of the random interval between two mismatch sparks (s).
pub const MISMATCH_PERIOD_MIN: f32 = 0.6;

/// Upper bound of the random interval between two mismatch sparks (s).
pub const MISMATCH_PERIOD_MAX: f32 = 0.8;

/// Seed for the scheduler's spark-interval RNG.
pub const MISMATCH_RNG_SEED: u64 = 0x00C0_FFEE;

/// Distance along the target's outward axis at which a refused connector is
/// parked when dropped on an incompatible socket.
pub const SNAP_OUT_OFFSET: f32 = 0.2;

// ── Holding ───────────────────────────────────────────────────────────────────

/// Natural frequency (Hz) of the critically-damped spring that pulls the
/// adjacent chain point after a held endpoint.
///
/// 8 Hz settles within ~0.1 s, fast enough to hide popping without snapping.
pub const FOLLOW_FREQUENCY_HZ: f32 = 8.0;

/// Velocity gain applied by a holder to its held body: `v = (target - pos) × gain`.
pub const HOLDING_GAIN: f32 = 12.0;

/// Maximum pitch (degrees) a held body may be tilted to, either direction.
pub const MAX_HELD_PITCH_DEG: f32 = 45.0;

/// Physics layer assigned to colliders of a held body.
pub const HELD_LAYER: u32 = 7;

/// Number of collision layers Rapier offers (`Group` is a 32-bit mask).
pub const LAYER_COUNT: u32 = 32;
