//! The fixed table of Wetternetz Sachsen parameters: for every parameter the
//! observation type it is filled from by default, the quantity (and so the unit)
//! it is sent in, and how its value is written.

use crate::types::unit_system::Quantity::{self, *};
use chrono::DateTime;

/// How a parameter value is written into the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// Fixed-point with the given number of decimals.
    Decimals(usize),
    /// `dd.mm.YYYY` of a Unix timestamp, in UTC.
    Date,
}

/// One parameter understood by the WNS ingestion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    /// The parameter name as sent, e.g. `T2AKT_`.
    pub name: &'static str,
    /// The host observation type used when the configuration does not override it.
    pub default_source: Option<&'static str>,
    pub quantity: Quantity,
    pub format: ValueFormat,
}

impl Parameter {
    const fn new(
        name: &'static str,
        default_source: Option<&'static str>,
        quantity: Quantity,
        decimals: usize,
    ) -> Self {
        Self {
            name,
            default_source,
            quantity,
            format: ValueFormat::Decimals(decimals),
        }
    }

    const fn date(name: &'static str) -> Self {
        Self {
            name,
            default_source: None,
            quantity: Quantity::Date,
            format: ValueFormat::Date,
        }
    }

    /// Writes an already converted value the way WNS expects it.
    ///
    /// Returns `None` for values that cannot be represented (non-finite numbers,
    /// timestamps out of range), in which case the parameter is left out.
    ///
    /// # Examples
    ///
    /// ```
    /// use wns::parameter;
    ///
    /// let humidity = parameter("LFAKT_").unwrap();
    /// assert_eq!(humidity.format_value(64.6).as_deref(), Some("65"));
    ///
    /// let temperature = parameter("T2AKT_").unwrap();
    /// assert_eq!(temperature.format_value(-3.04).as_deref(), Some("-3.0"));
    /// ```
    pub fn format_value(&self, value: f64) -> Option<String> {
        if !value.is_finite() {
            return None;
        }
        match self.format {
            ValueFormat::Decimals(decimals) => {
                let mut text = format!("{value:.decimals$}");
                // values that round to zero are sent unsigned
                if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
                    text.remove(0);
                }
                Some(text)
            }
            ValueFormat::Date => DateTime::from_timestamp(value.trunc() as i64, 0)
                .map(|date| date.format("%d.%m.%Y").to_string()),
        }
    }
}

/// Every observation parameter of the WNS 2.3 template, in the order they are sent.
pub const PARAMETERS: &[Parameter] = &[
    Parameter::new("T2AKT_", Some("outTemp"), Temperature, 1),
    Parameter::new("T2MIN_", Some("outTempDayMin"), Temperature, 1),
    Parameter::new("T2MAX_", Some("outTempDayMax"), Temperature, 1),
    Parameter::new("T2D1H_", Some("outTempDiff1h"), TemperatureChange, 1),
    Parameter::new("T5AKT_", None, Temperature, 1),
    Parameter::new("T5MIN_", None, Temperature, 1),
    Parameter::new("LFAKT_", Some("outHumidity"), Percent, 0),
    Parameter::new("RRD05_", None, Rain, 1),
    Parameter::new("RRD10_", None, Rain, 1),
    Parameter::new("RRD1H_", Some("hourRain"), Rain, 1),
    Parameter::new("RRD3H_", None, Rain, 1),
    Parameter::new("RRD24H", Some("rain24"), Rain, 1),
    Parameter::new("RRD1D_", Some("dayRain"), Rain, 1),
    Parameter::new("WSAKT_", Some("windSpeed"), WindSpeed, 1),
    Parameter::new("WRAKT_", Some("windDir"), Direction, 0),
    Parameter::new("WBAKT_", Some("windGust"), WindSpeed, 1),
    Parameter::new("WSM10_", None, WindSpeed, 1),
    Parameter::new("WRM10_", None, Direction, 0),
    Parameter::new("WSMX1H", None, WindSpeed, 1),
    Parameter::new("WSMX1D", None, WindSpeed, 1),
    Parameter::new("WBMX1H", None, WindSpeed, 1),
    Parameter::new("WBMX1D", None, WindSpeed, 1),
    Parameter::new("WCAKT_", Some("windchill"), Temperature, 1),
    Parameter::new("WCMN1H", Some("windchill1hMin"), Temperature, 1),
    Parameter::new("WCMN1D", Some("windchillDayMin"), Temperature, 1),
    Parameter::new("LDAKT_", Some("barometer"), Pressure, 1),
    Parameter::new("LDABS_", Some("pressure"), Pressure, 1),
    Parameter::new("LDD1H_", Some("barometerDiff1h"), PressureChange, 1),
    Parameter::new("LDD3H_", None, PressureChange, 1),
    Parameter::new("LDD24H", None, PressureChange, 1),
    Parameter::new("EVA1D_", None, Rain, 1),
    Parameter::new("SOD1H_", None, Duration, 1),
    Parameter::new("SOD1D_", None, Duration, 1),
    Parameter::new("BEDGRA", None, Plain, 0),
    Parameter::new("SSAKT_", Some("radiation"), Radiation, 0),
    Parameter::new("SSMX1H", None, Radiation, 0),
    Parameter::new("SSMX1D", Some("maxSolarRad"), Radiation, 0),
    Parameter::new("SSSUMG", None, Plain, 1),
    Parameter::new("UVINDX", Some("UV"), UvIndex, 1),
    Parameter::new("UVMX1D", Some("UVDayMax"), UvIndex, 1),
    Parameter::new("WOLKUG", None, Altitude, 0),
    Parameter::new("SIWEIT", None, Distance, 1),
    Parameter::new("SNEHOE", None, Length, 1),
    Parameter::date("SNEDAT"),
    Parameter::new("SNEFGR", None, Length, 1),
    Parameter::new("T2M1M_", None, Temperature, 1),
    Parameter::new("T2M1MA", None, TemperatureChange, 1),
    Parameter::date("RRDATU"),
    Parameter::new("RRGEST", None, Rain, 1),
    Parameter::new("RRD1M_", None, Rain, 1),
    Parameter::new("RRD1MR", None, Percent, 1),
    Parameter::new("RRD1A_", None, Rain, 1),
    Parameter::new("RRD1AR", None, Percent, 1),
    Parameter::new("EVAD1M", None, Rain, 1),
    Parameter::new("EVAD1A", None, Rain, 1),
    Parameter::new("SOD1M_", None, Duration, 1),
    Parameter::new("SOD1MR", None, Percent, 1),
    Parameter::new("SOD1A_", None, Duration, 1),
    Parameter::new("SOD1AR", None, Percent, 1),
    Parameter::new("KLTSUM", None, TemperatureChange, 1),
    Parameter::new("WRMSUM", None, TemperatureChange, 1),
    Parameter::new("GRASUM", None, TemperatureChange, 1),
    Parameter::date("GRADAT"),
    Parameter::new("TSOI10", None, Temperature, 1),
    Parameter::new("TSOI20", None, Temperature, 1),
    Parameter::new("TSOI50", None, Temperature, 1),
];

/// Looks up a WNS parameter by its exact name.
pub fn parameter(name: &str) -> Option<&'static Parameter> {
    PARAMETERS.iter().find(|p| p.name == name)
}
