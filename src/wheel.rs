//! Filter Wheel Module
//!
//! The server drives the wheel through the [`FilterWheel`] capability. The
//! only implementation shipped here is [`SimulatedWheel`]; real hardware
//! drivers live outside this crate.
//!
//! ## Position Semantics
//! - `position()` returns the current slot, or [`MOVING`] while in motion
//! - `begin_move()` starts a move and returns immediately

use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{MoverError, Result};

/// Position reported while the wheel is between slots
pub const MOVING: i32 = -1;

/// A filter wheel the server can drive
pub trait FilterWheel: Send + Sync {
    /// Names the wheel itself reports, one per slot
    fn names(&self) -> Vec<String>;

    /// Current slot, or [`MOVING`]
    fn position(&self) -> Result<i32>;

    /// Start moving to `slot`
    fn begin_move(&self, slot: i32) -> Result<()>;

    /// Number of slots on the wheel
    fn slot_count(&self) -> usize {
        self.names().len()
    }
}

#[derive(Debug)]
struct Motion {
    target: i32,
    arrives_at: Instant,
}

#[derive(Debug)]
struct WheelState {
    position: i32,
    motion: Option<Motion>,
}

/// In-memory wheel that takes `travel_per_slot` per slot moved
#[derive(Debug)]
pub struct SimulatedWheel {
    names: Vec<String>,
    travel_per_slot: Duration,
    state: Mutex<WheelState>,
}

impl SimulatedWheel {
    /// Wheel with `slots` generically named filters, parked at slot 0
    pub fn new(slots: usize, travel_per_slot: Duration) -> Self {
        let names = (0..slots).map(|i| format!("Filter {i}")).collect();
        Self::with_names(names, travel_per_slot)
    }

    pub fn with_names(names: Vec<String>, travel_per_slot: Duration) -> Self {
        Self {
            names,
            travel_per_slot,
            state: Mutex::new(WheelState {
                position: 0,
                motion: None,
            }),
        }
    }

    /// Settle a finished move. Caller holds the lock.
    fn settle(state: &mut WheelState) {
        if let Some(motion) = &state.motion {
            if Instant::now() >= motion.arrives_at {
                state.position = motion.target;
                state.motion = None;
            }
        }
    }
}

impl FilterWheel for SimulatedWheel {
    fn names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn position(&self) -> Result<i32> {
        let mut state = self.state.lock();
        Self::settle(&mut state);
        Ok(if state.motion.is_some() {
            MOVING
        } else {
            state.position
        })
    }

    fn begin_move(&self, slot: i32) -> Result<()> {
        if slot < 0 || slot as usize >= self.names.len() {
            return Err(MoverError::Wheel(format!(
                "slot {} out of range 0-{}",
                slot,
                self.names.len().saturating_sub(1)
            )));
        }

        let mut state = self.state.lock();
        Self::settle(&mut state);
        if state.motion.is_some() {
            return Err(MoverError::Wheel("wheel is already moving".to_string()));
        }

        let distance = (slot - state.position).unsigned_abs();
        let arrives_at = self
            .travel_per_slot
            .checked_mul(distance)
            .and_then(|travel| Instant::now().checked_add(travel))
            .ok_or_else(|| {
                MoverError::Wheel(format!(
                    "travel time to slot {slot} is out of range ({:?} per slot)",
                    self.travel_per_slot
                ))
            })?;
        state.motion = Some(Motion {
            target: slot,
            arrives_at,
        });
        tracing::debug!("simulated wheel moving {} -> {}", state.position, slot);
        Ok(())
    }

    fn slot_count(&self) -> usize {
        self.names.len()
    }
}
