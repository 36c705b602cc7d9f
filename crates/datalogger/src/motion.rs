//! Motion detection from ground speed.
//!
//! Motion is confirmed only after several consecutive status ticks above the
//! speed threshold, and dropped on the first tick below it.

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;

use crate::config::MotionConfig;

/// What a single motion tick changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    /// Nothing changed.
    None,
    /// Motion was just confirmed.
    BecameMoving,
    /// The vehicle was moving and has now stopped.
    BecameStationary,
}

/// Motion state with its confirmation counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    /// Not moving; holds the number of consecutive above-threshold ticks.
    Stationary(u32),
    /// Motion confirmed.
    Moving,
}

impl Default for MotionState {
    fn default() -> Self {
        Self::Stationary(0)
    }
}

impl MotionState {
    const MOVING: u32 = u32::MAX;

    /// Next state and event for one ground-speed sample.
    #[must_use]
    pub fn step(self, ground_speed: f64, config: &MotionConfig) -> (Self, MotionEvent) {
        let above = whole_units(ground_speed) > config.ground_speed_threshold;
        match (self, above) {
            (Self::Stationary(count), true) => {
                let count = count.saturating_add(1);
                if count >= config.moving_ticks {
                    (Self::Moving, MotionEvent::BecameMoving)
                } else {
                    (Self::Stationary(count), MotionEvent::None)
                }
            }
            (Self::Stationary(_), false) => (Self::Stationary(0), MotionEvent::None),
            (Self::Moving, true) => (Self::Moving, MotionEvent::None),
            (Self::Moving, false) => (Self::Stationary(0), MotionEvent::BecameStationary),
        }
    }

    fn to_bits(self) -> u32 {
        match self {
            // Counts never reach MOVING: confirmation happens first
            Self::Stationary(count) => count.min(Self::MOVING - 1),
            Self::Moving => Self::MOVING,
        }
    }

    fn from_bits(bits: u32) -> Self {
        if bits == Self::MOVING {
            Self::Moving
        } else {
            Self::Stationary(bits)
        }
    }
}

/// Ground speed truncated toward zero; NaN reads as 0.
#[allow(clippy::cast_possible_truncation)]
fn whole_units(ground_speed: f64) -> i64 {
    ground_speed as i64
}

/// Motion detector driven by the status tick.
///
/// The state lives in a single atomic cell so the detector can be shared by
/// reference with every host callback.
#[derive(Debug)]
pub struct MotionDetector {
    config: MotionConfig,
    state: AtomicU32,
}

impl MotionDetector {
    /// Create a stationary detector.
    #[must_use]
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            state: AtomicU32::new(MotionState::default().to_bits()),
        }
    }

    /// Feed one ground-speed sample.
    pub fn tick(&self, ground_speed: f64) -> MotionEvent {
        let step = |bits| MotionState::from_bits(bits).step(ground_speed, &self.config);
        let previous = match self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some(step(bits).0.to_bits())
            }) {
            Ok(bits) | Err(bits) => bits,
        };
        let (_, event) = step(previous);
        if event != MotionEvent::None {
            debug!("Motion {event:?} at ground speed {ground_speed}");
        }
        event
    }

    /// Return to stationary with a cleared counter.
    pub fn reset(&self) {
        self.state
            .store(MotionState::default().to_bits(), Ordering::SeqCst);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> MotionState {
        MotionState::from_bits(self.state.load(Ordering::SeqCst))
    }

    /// Whether motion is confirmed.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.state() == MotionState::Moving
    }
}
