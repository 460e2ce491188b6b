//! Telescope Device
//!
//! A minimal telescope exposing pulse-guide properties to planetarium or
//! guiding software. Only pulse guiding does anything; the rest is state
//! that clients read and write.
//!
//! ## Locking
//! Every mutable property has its own lock. A read or write of one property
//! is atomic; reads of two different properties may interleave with writes.
//! Fixed capabilities are plain immutable fields.

use std::fmt;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{MoverError, Result};

/// Value of a named property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Float(f64),
    Text(Option<String>),
}

impl PropertyValue {
    fn as_bool(&self, name: &str) -> Result<bool> {
        match self {
            PropertyValue::Bool(b) => Ok(*b),
            _ => Err(type_error(name, "boolean")),
        }
    }

    fn as_float(&self, name: &str) -> Result<f64> {
        match self {
            PropertyValue::Float(f) => Ok(*f),
            PropertyValue::Int(i) => Ok(f64::from(*i)),
            _ => Err(type_error(name, "numeric")),
        }
    }
}

fn type_error(name: &str, expected: &'static str) -> MoverError {
    MoverError::PropertyType {
        name: name.to_string(),
        expected,
    }
}

/// Named get/set access to a device's properties
pub trait Telescope: Send + Sync {
    fn get(&self, name: &str) -> Result<PropertyValue>;

    fn set(&self, name: &str, value: PropertyValue) -> Result<()>;
}

/// One independently locked property
#[derive(Debug, Default)]
pub struct Guarded<T>(Mutex<T>);

impl<T: Clone> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self(Mutex::new(value))
    }

    pub fn get(&self) -> T {
        self.0.lock().clone()
    }

    pub fn set(&self, value: T) {
        *self.0.lock() = value;
    }

    /// Read-modify-write under one lock
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.lock())
    }
}

/// Pulse-guide direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideDirection {
    North = 0,
    South = 1,
    East = 2,
    West = 3,
}

impl TryFrom<i32> for GuideDirection {
    type Error = MoverError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(GuideDirection::North),
            1 => Ok(GuideDirection::South),
            2 => Ok(GuideDirection::East),
            3 => Ok(GuideDirection::West),
            other => Err(MoverError::Device(format!("invalid guide direction {other}"))),
        }
    }
}

impl fmt::Display for GuideDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GuideDirection::North => "N",
            GuideDirection::South => "S",
            GuideDirection::East => "E",
            GuideDirection::West => "W",
        })
    }
}

/// Fixed characteristics of the telescope
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub alignment_mode: i32,
    pub aperture_area: f64,
    pub aperture_diameter: f64,
    pub can_find_home: bool,
    pub can_park: bool,
    pub can_pulse_guide: bool,
    pub can_set_declination_rate: bool,
    pub can_set_guide_rates: bool,
    pub can_set_park: bool,
    pub can_set_pier_side: bool,
    pub can_set_right_ascension_rate: bool,
    pub can_set_tracking: bool,
    pub can_slew: bool,
    pub can_slew_alt_az: bool,
    pub can_slew_async: bool,
    pub can_sync: bool,
    pub can_unpark: bool,
    pub declination_rate: f64,
    pub does_refraction: bool,
    /// 2 = J2000
    pub equatorial_system: i32,
    pub focal_length: f64,
    pub right_ascension_rate: f64,
    pub side_of_pier: i32,
    pub site_elevation: f64,
    pub site_latitude: f64,
    pub site_longitude: f64,
    pub slew_settling_time: f64,
    /// 0 = sidereal
    pub tracking_rate: i32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            alignment_mode: 0,
            aperture_area: 0.196,
            aperture_diameter: 0.5,
            can_find_home: false,
            can_park: false,
            can_pulse_guide: true,
            can_set_declination_rate: false,
            can_set_guide_rates: true,
            can_set_park: false,
            can_set_pier_side: false,
            can_set_right_ascension_rate: false,
            can_set_tracking: false,
            can_slew: true,
            can_slew_alt_az: false,
            can_slew_async: true,
            can_sync: true,
            can_unpark: false,
            declination_rate: 0.0,
            does_refraction: false,
            equatorial_system: 2,
            focal_length: 2.0,
            right_ascension_rate: 0.0,
            side_of_pier: 0,
            site_elevation: 144.0,
            site_latitude: 50.0,
            site_longitude: 70.0,
            slew_settling_time: 0.5,
            tracking_rate: 0,
        }
    }
}

impl Capabilities {
    fn lookup(&self, name: &str) -> Option<PropertyValue> {
        use PropertyValue::{Bool, Float, Int};
        Some(match name {
            "alignment_mode" => Int(self.alignment_mode),
            "aperture_area" => Float(self.aperture_area),
            "aperture_diameter" => Float(self.aperture_diameter),
            "can_find_home" => Bool(self.can_find_home),
            "can_park" => Bool(self.can_park),
            "can_pulse_guide" => Bool(self.can_pulse_guide),
            "can_set_declination_rate" => Bool(self.can_set_declination_rate),
            "can_set_guide_rates" => Bool(self.can_set_guide_rates),
            "can_set_park" => Bool(self.can_set_park),
            "can_set_pier_side" => Bool(self.can_set_pier_side),
            "can_set_right_ascension_rate" => Bool(self.can_set_right_ascension_rate),
            "can_set_tracking" => Bool(self.can_set_tracking),
            "can_slew" => Bool(self.can_slew),
            "can_slew_alt_az" => Bool(self.can_slew_alt_az),
            "can_slew_async" => Bool(self.can_slew_async),
            "can_sync" => Bool(self.can_sync),
            "can_unpark" => Bool(self.can_unpark),
            "declination_rate" => Float(self.declination_rate),
            "does_refraction" => Bool(self.does_refraction),
            "equatorial_system" => Int(self.equatorial_system),
            "focal_length" => Float(self.focal_length),
            "right_ascension_rate" => Float(self.right_ascension_rate),
            "side_of_pier" => Int(self.side_of_pier),
            "site_elevation" => Float(self.site_elevation),
            "site_latitude" => Float(self.site_latitude),
            "site_longitude" => Float(self.site_longitude),
            "slew_settling_time" => Float(self.slew_settling_time),
            "tracking_rate" => Int(self.tracking_rate),
            _ => return None,
        })
    }
}

/// Telescope whose state properties are each guarded separately
#[derive(Debug)]
pub struct TelescopeDevice {
    name: String,
    capabilities: Capabilities,

    connected: Guarded<bool>,
    altitude: Guarded<f64>,
    azimuth: Guarded<f64>,
    at_home: Guarded<bool>,
    at_park: Guarded<bool>,
    declination: Guarded<f64>,
    right_ascension: Guarded<f64>,
    guide_rate_declination: Guarded<f64>,
    guide_rate_right_ascension: Guarded<f64>,
    /// Pulses in flight; guiding while non-zero
    active_pulses: Guarded<u32>,
    sidereal_time: Guarded<f64>,
    slewing: Guarded<bool>,
    tracking: Guarded<bool>,
    target_declination: Guarded<f64>,
    target_right_ascension: Guarded<f64>,
    utc_date: Guarded<Option<String>>,
}

impl Default for TelescopeDevice {
    fn default() -> Self {
        Self::new("Telescope", Capabilities::default())
    }
}

impl TelescopeDevice {
    pub fn new(name: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            name: name.into(),
            capabilities,
            connected: Guarded::new(false),
            altitude: Guarded::new(0.0),
            azimuth: Guarded::new(0.0),
            at_home: Guarded::new(true),
            at_park: Guarded::new(true),
            declination: Guarded::new(0.0),
            right_ascension: Guarded::new(0.0),
            guide_rate_declination: Guarded::new(0.1),
            guide_rate_right_ascension: Guarded::new(0.1),
            active_pulses: Guarded::new(0),
            sidereal_time: Guarded::new(0.1),
            slewing: Guarded::new(false),
            tracking: Guarded::new(true),
            target_declination: Guarded::new(0.0),
            target_right_ascension: Guarded::new(0.0),
            utc_date: Guarded::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    pub fn is_pulse_guiding(&self) -> bool {
        self.active_pulses.get() > 0
    }

    /// Connect or disconnect. Refuses to disconnect mid-slew or mid-guide.
    pub fn set_connected(&self, connected: bool) -> Result<()> {
        if !connected && self.connected.get() {
            if self.slewing.get() {
                return Err(MoverError::Device(
                    "cannot disconnect while telescope is moving".to_string(),
                ));
            }
            if self.is_pulse_guiding() {
                return Err(MoverError::Device(
                    "cannot disconnect while guider is tracking".to_string(),
                ));
            }
        }

        self.connected.set(connected);
        tracing::info!("{}", if connected { "[connected]" } else { "[disconnected]" });
        Ok(())
    }

    /// Guide in `direction` for `duration`, blocking the caller meanwhile
    pub fn pulse_guide(&self, direction: GuideDirection, duration: Duration) -> Result<()> {
        if !self.capabilities.can_pulse_guide {
            return Err(MoverError::Device("pulse guiding not supported".to_string()));
        }
        if !self.connected.get() {
            return Err(MoverError::Device("not connected".to_string()));
        }

        self.active_pulses.update(|n| *n += 1);
        tracing::info!("Pulse guide: {}", direction);
        tracing::info!("Pulse guide: {} ms", duration.as_millis());
        thread::sleep(duration);
        self.active_pulses.update(|n| *n = n.saturating_sub(1));
        Ok(())
    }
}

impl Telescope for TelescopeDevice {
    fn get(&self, name: &str) -> Result<PropertyValue> {
        use PropertyValue::{Bool, Float, Text};
        Ok(match name {
            "connected" => Bool(self.connected.get()),
            "altitude" => Float(self.altitude.get()),
            "azimuth" => Float(self.azimuth.get()),
            "at_home" => Bool(self.at_home.get()),
            "at_park" => Bool(self.at_park.get()),
            "declination" => Float(self.declination.get()),
            "right_ascension" => Float(self.right_ascension.get()),
            "guide_rate_declination" => Float(self.guide_rate_declination.get()),
            "guide_rate_right_ascension" => Float(self.guide_rate_right_ascension.get()),
            "is_pulse_guiding" => Bool(self.is_pulse_guiding()),
            "sidereal_time" => Float(self.sidereal_time.get()),
            "slewing" => Bool(self.slewing.get()),
            "tracking" => Bool(self.tracking.get()),
            "target_declination" => Float(self.target_declination.get()),
            "target_right_ascension" => Float(self.target_right_ascension.get()),
            "utc_date" => Text(self.utc_date.get()),
            other => self
                .capabilities
                .lookup(other)
                .ok_or_else(|| MoverError::UnknownProperty(other.to_string()))?,
        })
    }

    fn set(&self, name: &str, value: PropertyValue) -> Result<()> {
        match name {
            "connected" => self.set_connected(value.as_bool(name)?)?,
            "altitude" => self.altitude.set(value.as_float(name)?),
            "azimuth" => self.azimuth.set(value.as_float(name)?),
            "at_home" => self.at_home.set(value.as_bool(name)?),
            "at_park" => self.at_park.set(value.as_bool(name)?),
            "declination" => self.declination.set(value.as_float(name)?),
            "right_ascension" => self.right_ascension.set(value.as_float(name)?),
            "guide_rate_declination" => self.guide_rate_declination.set(value.as_float(name)?),
            "guide_rate_right_ascension" => {
                self.guide_rate_right_ascension.set(value.as_float(name)?)
            }
            "sidereal_time" => self.sidereal_time.set(value.as_float(name)?),
            "slewing" => self.slewing.set(value.as_bool(name)?),
            "tracking" => self.tracking.set(value.as_bool(name)?),
            "target_declination" => self.target_declination.set(value.as_float(name)?),
            "target_right_ascension" => self.target_right_ascension.set(value.as_float(name)?),
            // Read-only to clients
            "utc_date" | "is_pulse_guiding" => {
                return Err(MoverError::ReadOnlyProperty(name.to_string()))
            }
            other if self.capabilities.lookup(other).is_some() => {
                return Err(MoverError::ReadOnlyProperty(other.to_string()))
            }
            other => return Err(MoverError::UnknownProperty(other.to_string())),
        }
        Ok(())
    }
}
