//! Defines the unit systems a host record can be expressed in, and the physical
//! quantities Wetternetz Sachsen expects together with the conversions into its units.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The unit system tag carried by every observation record (`usUnits`).
///
/// The numeric codes are the ones used by the host application:
/// `0x01` for US customary, `0x10` for metric and `0x11` for the
/// "weather metric" variant that reports wind in m/s and rain in mm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum UnitSystem {
    /// °F, inHg, mph, inches.
    Us,
    /// °C, mbar, km/h, cm.
    Metric,
    /// °C, mbar, m/s, mm.
    MetricWx,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown unit system code {0:#04x}")]
pub struct UnknownUnitSystem(pub u8);

impl UnitSystem {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(UnitSystem::Us),
            0x10 => Some(UnitSystem::Metric),
            0x11 => Some(UnitSystem::MetricWx),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            UnitSystem::Us => 0x01,
            UnitSystem::Metric => 0x10,
            UnitSystem::MetricWx => 0x11,
        }
    }
}

impl TryFrom<u8> for UnitSystem {
    type Error = UnknownUnitSystem;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        UnitSystem::from_code(code).ok_or(UnknownUnitSystem(code))
    }
}

impl From<UnitSystem> for u8 {
    fn from(system: UnitSystem) -> Self {
        system.code()
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitSystem::Us => "US",
            UnitSystem::Metric => "METRIC",
            UnitSystem::MetricWx => "METRICWX",
        };
        f.write_str(name)
    }
}

/// The physical quantity a WNS parameter reports, which fixes the unit the
/// value must be sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// Air, soil or wind chill temperature in °C.
    Temperature,
    /// A temperature difference or sum in K (no offset applied).
    TemperatureChange,
    /// Relative values in %, sent as they are.
    Percent,
    /// Unitless values, sent as they are.
    Plain,
    /// Wind direction in degrees.
    Direction,
    /// Precipitation or evaporation in mm.
    Rain,
    /// Snow depth in cm.
    Length,
    /// Wind speed or gust in km/h.
    WindSpeed,
    /// Air pressure in hPa.
    Pressure,
    /// Air pressure tendency in hPa.
    PressureChange,
    /// Solar radiation in W/m².
    Radiation,
    UvIndex,
    /// Sunshine duration in hours. Hosts report durations in seconds.
    Duration,
    /// Cloud base in m.
    Altitude,
    /// Visibility in km.
    Distance,
    /// A calendar day, given as Unix epoch seconds.
    Date,
}

impl Quantity {
    /// The unit WNS expects for this quantity.
    pub fn unit(self) -> &'static str {
        match self {
            Quantity::Temperature => "°C",
            Quantity::TemperatureChange => "K",
            Quantity::Percent => "%",
            Quantity::Plain => "",
            Quantity::Direction => "°",
            Quantity::Rain => "mm",
            Quantity::Length => "cm",
            Quantity::WindSpeed => "km/h",
            Quantity::Pressure | Quantity::PressureChange => "hPa",
            Quantity::Radiation => "W/m²",
            Quantity::UvIndex => "",
            Quantity::Duration => "h",
            Quantity::Altitude => "m",
            Quantity::Distance => "km",
            Quantity::Date => "dd.mm.YYYY",
        }
    }

    /// `(scale, offset)` with `destination = (value + offset) * scale`.
    fn affine(self, system: UnitSystem) -> (f64, f64) {
        use UnitSystem::*;
        match (self, system) {
            (Quantity::Temperature, Us) => (5.0 / 9.0, -32.0),
            (Quantity::TemperatureChange, Us) => (5.0 / 9.0, 0.0),
            (Quantity::Rain, Us) => (25.4, 0.0),
            (Quantity::Rain, Metric) => (10.0, 0.0),
            (Quantity::Length, Us) => (2.54, 0.0),
            (Quantity::Length, MetricWx) => (0.1, 0.0),
            (Quantity::WindSpeed, Us) => (1.609344, 0.0),
            (Quantity::WindSpeed, MetricWx) => (3.6, 0.0),
            (Quantity::Pressure | Quantity::PressureChange, Us) => (33.8639, 0.0),
            (Quantity::Duration, _) => (1.0 / 3600.0, 0.0),
            (Quantity::Altitude, Us) => (0.3048, 0.0),
            (Quantity::Distance, Us) => (1.609344, 0.0),
            _ => (1.0, 0.0),
        }
    }

    /// Converts `value`, expressed in `system`, into the unit WNS expects.
    ///
    /// # Examples
    ///
    /// ```
    /// use wns::{Quantity, UnitSystem};
    ///
    /// let celsius = Quantity::Temperature.to_destination(212.0, UnitSystem::Us);
    /// assert!((celsius - 100.0).abs() < 1e-9);
    ///
    /// let kmh = Quantity::WindSpeed.to_destination(10.0, UnitSystem::MetricWx);
    /// assert!((kmh - 36.0).abs() < 1e-9);
    /// ```
    pub fn to_destination(self, value: f64, system: UnitSystem) -> f64 {
        let (scale, offset) = self.affine(system);
        (value + offset) * scale
    }

    /// Inverse of [`Quantity::to_destination`].
    pub fn from_destination(self, value: f64, system: UnitSystem) -> f64 {
        let (scale, offset) = self.affine(system);
        value / scale - offset
    }
}
