//! RDA5807 FM Tuner Driver
//!
//! Driver library for the RDA5807 single-chip broadcast FM receiver,
//! covering tuner control (power sequencing, tuning, seeking, audio
//! settings) and decoding of the RDS side channel (station name, program
//! identification, radio text, alternative frequencies).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     APPLICATION                          │
//! │     owns the tuner and decoder, drives the tick loop     │
//! ├────────────────────────────┬─────────────────────────────┤
//! │       TUNER ENGINE         │        RDS DECODER          │
//! │  power / tune / seek /     │  group parser with          │
//! │  resumable async tasks     │  double-buffered fields     │
//! ├────────────────────────────┴─────────────────────────────┤
//! │                    REGISTER MODEL                        │
//! │       typed 16-bit registers, shadow register bank       │
//! ├──────────────────────────────────────────────────────────┤
//! │                      BUS ACCESS                          │
//! │    sequential / random-access register transfer (I2C)    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The tuner and the decoder never call each other: the application feeds
//! groups from [`Rda5807::read_rds_group`] into [`RdsParser::update`] and
//! resets the parser whenever it changes frequency.
//!
//! # Design Principles
//!
//! - **Cooperative, non-blocking core**: tune and seek are resumable tasks
//!   advanced by caller-driven ticks; the blocking variants are thin
//!   sleep-and-tick wrappers.
//! - **Type-driven register access**: named bitfield accessors instead of
//!   shift-and-mask arithmetic at call sites.
//! - **No hidden state**: one explicitly owned driver instance per chip,
//!   no globals, hardware-free unit testing through the bus trait.
//! - **Mirrored state only on confirmed writes**: a failed bus transfer
//!   never leaves the driver believing a setting took effect.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Bus Access
///
/// The register transfer trait and the bundled I2C implementation.
pub mod bus;

/// Driver configuration constants
pub mod config;

/// Register Model
///
/// Typed views of the chip's 16-bit registers. Pure bit arithmetic.
pub mod regs;

/// RDS Decoder
///
/// Reassembles broadcast data fields from 4-word RDS groups.
pub mod rds;

/// Tuner Control Engine
///
/// Power sequencing, device settings, and the resumable task machinery.
pub mod tuner;

/// Shared types used across modules
pub mod types;

pub use bus::{I2cTunerBus, TunerBus};
pub use rds::{RdsGroup, RdsParser};
pub use tuner::Rda5807;
pub use types::{
    Band, ChannelSpacing, Deemphasis, FrequencyRange, SeekDirection, TaskProgress, TaskResult,
    TunerConfig,
};

/// Driver error type.
///
/// `E` is the transport error of the [`TunerBus`] implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The bus transport reported a failure.
    Bus(E),
    /// The identity register did not read back as the RDA5807 signature.
    ///
    /// Raised once during power-up and never retried: a wrong identity
    /// means wrong wiring or a dead part, and register writes to an
    /// unverified chip have undefined effect.
    BadChipId(u16),
}

impl<E> From<E> for Error<E> {
    fn from(err: E) -> Self {
        Self::Bus(err)
    }
}
