//! Telemetry reads consumed by the core.
//!
//! The host exposes the vehicle state as named scalar channels. The core only
//! needs four of them, and treats any channel the host cannot provide as 0.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A telemetry channel the core reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Speed over ground.
    GroundSpeed,
    /// Latitude in degrees.
    Latitude,
    /// Longitude in degrees.
    Longitude,
    /// Elevation above sea level.
    Elevation,
}

impl Channel {
    /// The simulator's name for this channel.
    #[must_use]
    pub fn dataref(self) -> &'static str {
        match self {
            Self::GroundSpeed => "sim/flightmodel/position/groundspeed",
            Self::Latitude => "sim/flightmodel/position/latitude",
            Self::Longitude => "sim/flightmodel/position/longitude",
            Self::Elevation => "sim/flightmodel/position/elevation",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::GroundSpeed => 0,
            Self::Latitude => 1,
            Self::Longitude => 2,
            Self::Elevation => 3,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dataref())
    }
}

/// A raw position sample, recorded verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Latitude as reported.
    pub latitude: f64,
    /// Longitude as reported.
    pub longitude: f64,
    /// Altitude as reported.
    pub altitude: f64,
}

impl Position {
    /// Create a position from its three components.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

/// Source of telemetry values, implemented by the host adapter.
pub trait TelemetrySource: Send + Sync {
    /// Read one channel, or `None` if the host cannot provide it.
    fn read(&self, channel: Channel) -> Option<f64>;

    /// Current ground speed, 0 when unavailable.
    fn ground_speed(&self) -> f64 {
        self.read(Channel::GroundSpeed).unwrap_or_default()
    }

    /// Current position; unavailable components read as 0.
    fn position(&self) -> Position {
        Position {
            latitude: self.read(Channel::Latitude).unwrap_or_default(),
            longitude: self.read(Channel::Longitude).unwrap_or_default(),
            altitude: self.read(Channel::Elevation).unwrap_or_default(),
        }
    }
}

/// Telemetry cells that one context writes and the tick callbacks read.
///
/// Each channel is stored as the bit pattern of an `f64` in its own atomic,
/// so readers never block the writer.
#[derive(Debug)]
pub struct SharedTelemetry {
    cells: [AtomicU64; 4],
}

impl Default for SharedTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedTelemetry {
    /// Create telemetry with every channel at 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: std::array::from_fn(|_| AtomicU64::new(0f64.to_bits())),
        }
    }

    /// Store a new value for one channel.
    pub fn set(&self, channel: Channel, value: f64) {
        self.cells[channel.index()].store(value.to_bits(), Ordering::Relaxed);
    }

    /// Store ground speed and position in one call.
    pub fn update(&self, ground_speed: f64, position: Position) {
        self.set(Channel::GroundSpeed, ground_speed);
        self.set(Channel::Latitude, position.latitude);
        self.set(Channel::Longitude, position.longitude);
        self.set(Channel::Elevation, position.altitude);
    }
}

impl TelemetrySource for SharedTelemetry {
    fn read(&self, channel: Channel) -> Option<f64> {
        Some(f64::from_bits(
            self.cells[channel.index()].load(Ordering::Relaxed),
        ))
    }
}
