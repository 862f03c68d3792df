//! Physically simulated cables with pluggable connector ends.
//!
//! Connectors pair male to female (colour-checked), cables are spring-linked
//! point chains that snap when overstretched while plugged in, and cable ends
//! can be carried by a holder and plugged into sockets.

pub mod cable;
pub mod config;
pub mod connector;
pub mod constants;
pub mod cues;
pub mod draggable;
pub mod error;
pub mod interaction;
pub mod rendering;
pub mod scheduler;
pub mod simulation;

pub use cable::{CableChain, CableDescriptor, CableHandles};
pub use config::CableConfig;
pub use connector::{Connector, Polarity, SignalColor};
pub use cues::{CableCue, CuePolicy};
pub use error::{CableError, CableResult};
pub use simulation::CablePlugin;
