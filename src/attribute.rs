//! Attributes: one named property of one domain instance
//!
//! The controller ships every attribute either as a bare string or as a
//! small record:
//!
//! ```json
//! "temp_heat": {"val": "250", "unit": "?C", "factor": "0.1", "min": "100.0", "max": "400.0"}
//! ```
//!
//! [`Attribute::new`] coerces such a record into typed fields once, and the
//! read side ([`Attribute::value`]) and write side
//! ([`ControllableAttribute::generate_new_value`]) work from those.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::choices::{ChoiceTable, OFF_ON_TEXT};
use crate::domain::DomainKey;
use crate::error::{Error, Result};

/// Key prefix the controller uses for read-only attributes
pub const READ_ONLY_PREFIX: &str = "L_";

const THIRDPARTY_DOMAIN: &str = "thirdparty";
const THIRDPARTY_STATE_KEY: &str = "L_state";

/// A typed attribute value, either as coerced from the wire or as rendered
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numeric view; booleans count as 0/1
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Text(_))
    }

    /// Interpret user input: integers, floats, `true`/`false`, otherwise text
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
        match trimmed {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Text(input.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{v:.1}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Scalar as it may appear in a wire record; firmware sends strings, but
/// numbers and booleans are tolerated
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WireScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl WireScalar {
    fn to_f64(&self) -> Option<f64> {
        match self {
            WireScalar::Bool(_) => None,
            WireScalar::Int(i) => Some(*i as f64),
            WireScalar::Float(f) => Some(*f),
            WireScalar::Text(s) => s.trim().parse().ok(),
        }
    }

    fn to_i64(&self) -> Option<i64> {
        match self {
            WireScalar::Bool(b) => Some(i64::from(*b)),
            WireScalar::Int(i) => Some(*i),
            WireScalar::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            WireScalar::Float(_) => None,
            WireScalar::Text(s) => s.trim().parse().ok(),
        }
    }

    fn describe(&self) -> String {
        match self {
            WireScalar::Bool(b) => b.to_string(),
            WireScalar::Int(i) => i.to_string(),
            WireScalar::Float(f) => f.to_string(),
            WireScalar::Text(s) => format!("'{s}'"),
        }
    }
}

/// Wire record for one attribute
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawAttribute {
    #[serde(rename = "val")]
    pub value: Option<WireScalar>,
    pub format: Option<String>,
    pub unit: Option<String>,
    pub factor: Option<WireScalar>,
    pub min: Option<WireScalar>,
    pub max: Option<WireScalar>,
    pub length: Option<WireScalar>,
}

impl RawAttribute {
    /// Shorthand for `{"val": text}`
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: Some(WireScalar::Text(value.into())),
            ..Self::default()
        }
    }

    /// Accept either a bare scalar or a metadata record
    pub fn from_json(key: &str, raw: &JsonValue) -> Result<Self> {
        match raw {
            JsonValue::String(s) => Ok(Self::text(s.clone())),
            JsonValue::Object(_) => serde_json::from_value(raw.clone())
                .map_err(|err| Error::malformed_attribute(key, err.to_string())),
            JsonValue::Null => Ok(Self::default()),
            JsonValue::Bool(_) | JsonValue::Number(_) => {
                let value = serde_json::from_value(raw.clone())
                    .map_err(|err| Error::malformed_attribute(key, err.to_string()))?;
                Ok(Self {
                    value: Some(value),
                    ..Self::default()
                })
            }
            JsonValue::Array(_) => Err(Error::malformed_attribute(key, "unexpected array")),
        }
    }
}

/// Whether an attribute may be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    ReadOnly,
    Controllable,
}

impl Access {
    pub fn for_key(key: &str) -> Self {
        if key.starts_with(READ_ONLY_PREFIX) {
            Access::ReadOnly
        } else {
            Access::Controllable
        }
    }
}

/// Value semantics, decided from which metadata keys are present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// factor, min or max present
    Numeric,
    /// length present
    Text,
    /// format is the on/off table
    Switch,
    /// any other format
    Choice,
    /// no metadata at all
    Plain,
}

/// Fields of the third-party (Shelly) temperature/humidity sensor status,
/// shipped as `type|dev|dev2|capable|temp|hum|battery|timestamp|ip`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorReading {
    pub type_id: String,
    pub device_id: String,
    pub device_id_2: String,
    pub temp_capable: String,
    pub temperature: String,
    pub humidity: String,
    pub battery: String,
    pub timestamp: String,
    pub device_ip: String,
}

impl SensorReading {
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split('|').collect();
        if parts.len() < 9 {
            return None;
        }
        Some(Self {
            type_id: parts[0].to_string(),
            device_id: parts[1].to_string(),
            device_id_2: parts[2].to_string(),
            temp_capable: parts[3].to_string(),
            temperature: parts[4].to_string(),
            humidity: parts[5].to_string(),
            battery: parts[6].to_string(),
            timestamp: parts[7].to_string(),
            device_ip: parts[8].to_string(),
        })
    }

    /// Temperature in °C; the sensor reports tenths of a degree
    pub fn temperature_celsius(&self) -> Option<f64> {
        self.temperature
            .trim()
            .parse::<i64>()
            .ok()
            .map(|t| t as f64 / 10.0)
    }
}

/// One property of one domain instance
#[derive(Debug, Clone)]
pub struct Attribute {
    domain: DomainKey,
    key: String,
    access: Access,
    kind: Kind,
    format: Option<String>,
    choices: Option<Arc<ChoiceTable>>,
    raw_value: Option<Value>,
    unit: Option<String>,
    factor: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
    length: Option<usize>,
    sensor: Option<SensorReading>,
}

impl Attribute {
    pub fn new(domain: DomainKey, key: &str, raw: RawAttribute) -> Result<Self> {
        let RawAttribute {
            value,
            format,
            unit,
            factor,
            min,
            max,
            length,
        } = raw;

        let access = Access::for_key(key);
        let kind = if factor.is_some() || min.is_some() || max.is_some() {
            Kind::Numeric
        } else if length.is_some() {
            Kind::Text
        } else if format.as_deref() == Some(OFF_ON_TEXT) {
            Kind::Switch
        } else if format.is_some() {
            Kind::Choice
        } else {
            Kind::Plain
        };

        let choices = format.as_deref().map(ChoiceTable::shared).transpose()?;
        let unit = unit.map(fix_unit);

        let number = |field: &str, scalar: &WireScalar| {
            scalar.to_f64().ok_or_else(|| {
                Error::malformed_attribute(
                    key,
                    format!("{field} {} is not a number", scalar.describe()),
                )
            })
        };

        let factor = factor.as_ref().map(|f| number("factor", f)).transpose()?;
        let min = min.as_ref().map(|m| number("min", m)).transpose()?;
        let max = max.as_ref().map(|m| number("max", m)).transpose()?;
        let length = length
            .as_ref()
            .map(|l| {
                l.to_i64()
                    .and_then(|l| usize::try_from(l).ok())
                    .ok_or_else(|| {
                        Error::malformed_attribute(
                            key,
                            format!("length {} is not a count", l.describe()),
                        )
                    })
            })
            .transpose()?;

        let raw_value = match value {
            None => None,
            Some(scalar) => Some(coerce_raw(key, scalar, factor, kind, format.is_some())?),
        };

        let sensor = match &raw_value {
            Some(Value::Text(text))
                if domain.name == THIRDPARTY_DOMAIN
                    && key == THIRDPARTY_STATE_KEY
                    && text.contains('|') =>
            {
                let sensor = SensorReading::parse(text);
                if sensor.is_none() {
                    log::warn!("{domain}.{key}: sensor status '{text}' has too few fields");
                }
                sensor
            }
            _ => None,
        };

        Ok(Self {
            domain,
            key: key.to_string(),
            access,
            kind,
            format,
            choices,
            raw_value,
            unit,
            factor,
            min,
            max,
            length,
            sensor,
        })
    }

    pub fn domain(&self) -> &DomainKey {
        &self.domain
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Composite address, e.g. `hk1.temp_heat`
    pub fn path(&self) -> String {
        self.domain.attribute_path(&self.key)
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn choices(&self) -> Option<&ChoiceTable> {
        self.choices.as_deref()
    }

    pub fn raw_value(&self) -> Option<&Value> {
        self.raw_value.as_ref()
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn factor(&self) -> Option<f64> {
        self.factor
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn length(&self) -> Option<usize> {
        self.length
    }

    pub fn sensor(&self) -> Option<&SensorReading> {
        self.sensor.as_ref()
    }

    /// Write view, only for controllable keys
    pub fn as_controllable(&self) -> Option<ControllableAttribute<'_>> {
        match self.access {
            Access::Controllable => Some(ControllableAttribute { attribute: self }),
            Access::ReadOnly => None,
        }
    }

    /// Human value of the raw wire value
    pub fn value(&self) -> Option<Value> {
        if let Some(sensor) = &self.sensor {
            return sensor.temperature_celsius().map(Value::Float);
        }
        self.raw_value.as_ref().map(|v| self.render(v))
    }

    /// Render an arbitrary value (e.g. a bound) with this attribute's rules
    pub fn render(&self, value: &Value) -> Value {
        if let Some(factor) = self.factor {
            if let Some(number) = value.as_f64() {
                return Value::Float(round2(number * factor));
            }
        }
        if self.format.as_deref() == Some(OFF_ON_TEXT) {
            if let Some(number) = value.as_f64() {
                return Value::Bool(number != 0.0);
            }
        }
        value.clone()
    }

    /// `"48.6 °C"`, or the bare value when there is no unit
    pub fn value_with_unit(&self) -> Option<String> {
        let value = self.value()?;
        Some(match &self.unit {
            Some(unit) => format!("{value} {unit}"),
            None => value.to_string(),
        })
    }

    /// Label for the raw code in the choice table
    pub fn choice_label(&self) -> Option<&str> {
        let choices = self.choices.as_ref()?;
        match self.raw_value.as_ref()? {
            Value::Int(code) => choices.decode(*code),
            Value::Float(code) if code.is_finite() && code.fract() == 0.0 => {
                choices.decode(*code as i64)
            }
            _ => None,
        }
    }

    pub fn min_rendered(&self) -> Option<Value> {
        self.min.map(|m| self.render(&Value::Float(m)))
    }

    pub fn max_rendered(&self) -> Option<Value> {
        self.max.map(|m| self.render(&Value::Float(m)))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value_with_unit() {
            Some(v) => write!(f, "{}={}", self.key, v),
            None => write!(f, "{}=", self.key),
        }
    }
}

/// Write view of an [`Attribute`] whose key is not read-only
#[derive(Debug, Clone, Copy)]
pub struct ControllableAttribute<'a> {
    attribute: &'a Attribute,
}

impl<'a> ControllableAttribute<'a> {
    pub fn attribute(&self) -> &'a Attribute {
        self.attribute
    }

    /// Inclusive device-unit bounds: choice codes first, then min/max
    pub fn writable_range(&self) -> Option<(f64, f64)> {
        let attr = self.attribute;
        if let Some(choices) = &attr.choices {
            if let (Some(lo), Some(hi)) = (choices.min_code(), choices.max_code()) {
                return Some((lo as f64, hi as f64));
            }
        }
        match (attr.min, attr.max) {
            (Some(lo), Some(hi)) => Some((lo, hi)),
            _ => None,
        }
    }

    /// Validate `input` and turn it into the value the controller expects.
    ///
    /// With `input_is_human_format`, numeric input is divided by the
    /// factor (`25.0 °C` becomes `250`). Numeric results are device-unit
    /// integers checked against [`Self::writable_range`]; text longer than
    /// `length` is truncated.
    pub fn generate_new_value(&self, input: &Value, input_is_human_format: bool) -> Result<Value> {
        let attr = self.attribute;

        // labels are accepted for choice attributes
        if let (Some(label), Some(choices)) = (input.as_str(), &attr.choices) {
            if let Some(code) = choices.code_for(label) {
                return self.check_numeric(code as f64);
            }
        }

        match (&attr.raw_value, input) {
            (Some(raw), input) if raw.is_numeric() && input.is_numeric() => {
                let number = input.as_f64().unwrap_or(f64::NAN);
                if !number.is_finite() {
                    return Err(self.incompatible(input, "a finite number"));
                }
                match attr.factor.filter(|f| *f != 0.0) {
                    Some(factor) if input_is_human_format => {
                        self.check_numeric((number / factor).round())
                    }
                    _ if number.fract() != 0.0 => {
                        Err(self.incompatible(input, "a whole number in device units"))
                    }
                    _ => self.check_numeric(number),
                }
            }
            (Some(Value::Text(_)), Value::Text(text)) => match attr.length {
                Some(length) if text.chars().count() > length => {
                    Ok(Value::Text(text.chars().take(length).collect()))
                }
                _ => Ok(Value::Text(text.clone())),
            },
            (raw, input) => Err(self.incompatible(
                input,
                match raw {
                    Some(Value::Text(_)) => "text",
                    Some(_) => "a number",
                    None => "nothing, the attribute has no value",
                },
            )),
        }
    }

    fn incompatible(&self, input: &Value, expected: &'static str) -> Error {
        Error::IncompatibleInput {
            key: self.attribute.path(),
            input: input.to_string(),
            expected,
        }
    }

    /// `number` is a finite whole number of device units
    fn check_numeric(&self, number: f64) -> Result<Value> {
        let device = number as i64;
        let (min, max) = self.writable_range().ok_or_else(|| Error::NoWritableRange {
            key: self.attribute.path(),
        })?;

        let candidate = device as f64;
        if min <= candidate && candidate <= max {
            log::info!(
                "{}: accepted value {device} (min={min}, max={max})",
                self.attribute.path()
            );
            Ok(Value::Int(device))
        } else {
            Err(Error::ValueOutOfBoundary {
                value: device,
                min,
                max,
            })
        }
    }
}

fn fix_unit(unit: String) -> String {
    match unit.as_str() {
        "?C" | "\u{fffd}C" => "°C".to_string(),
        _ => unit,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn coerce_raw(
    key: &str,
    scalar: WireScalar,
    factor: Option<f64>,
    kind: Kind,
    has_format: bool,
) -> Result<Value> {
    let bad = |what: &str, scalar: &WireScalar| {
        Error::malformed_attribute(key, format!("value {} is not {what}", scalar.describe()))
    };

    if let Some(factor) = factor {
        if factor == 1.0 {
            if let Some(i) = scalar.to_i64() {
                return Ok(Value::Int(i));
            }
        }
        return scalar
            .to_f64()
            .map(Value::Float)
            .ok_or_else(|| bad("a number", &scalar));
    }

    // bounds without a factor: numeric when it parses, text otherwise
    if kind == Kind::Numeric {
        if let Some(i) = scalar.to_i64() {
            return Ok(Value::Int(i));
        }
        if let Some(f) = scalar.to_f64() {
            return Ok(Value::Float(f));
        }
    }

    if has_format {
        // firmware sends boolean-looking text for some coded values
        return match &scalar {
            WireScalar::Text(s) if s == "false" => Ok(Value::Int(0)),
            WireScalar::Text(s) if s == "true" => Ok(Value::Int(1)),
            _ => scalar
                .to_i64()
                .map(Value::Int)
                .ok_or_else(|| bad("an integer code", &scalar)),
        };
    }

    Ok(match scalar {
        WireScalar::Bool(b) => Value::Bool(b),
        WireScalar::Int(i) => Value::Int(i),
        WireScalar::Float(f) => Value::Float(f),
        WireScalar::Text(s) => Value::Text(s),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attr(domain: &str, key: &str, raw: JsonValue) -> Attribute {
        let raw = RawAttribute::from_json(key, &raw).unwrap();
        Attribute::new(DomainKey::parse(domain), key, raw).unwrap()
    }

    #[test]
    fn test_factor_rendering() {
        let a = attr(
            "hk1",
            "L_flowtemp_act",
            json!({"val": "486", "unit": "?C", "factor": "0.1", "min": "-32768", "max": "32767"}),
        );
        assert_eq!(a.kind(), Kind::Numeric);
        assert_eq!(a.access(), Access::ReadOnly);
        assert_eq!(a.raw_value(), Some(&Value::Float(486.0)));
        assert_eq!(a.value(), Some(Value::Float(48.6)));
        assert_eq!(a.unit(), Some("°C"));
        assert_eq!(a.value_with_unit().as_deref(), Some("48.6 °C"));
        assert_eq!(a.min_rendered(), Some(Value::Float(-3276.8)));
        assert_eq!(a.max_rendered(), Some(Value::Float(3276.7)));
    }

    #[test]
    fn test_factor_one_keeps_integer_raw() {
        let a = attr(
            "pe1",
            "L_starts",
            json!({"val": "14191", "factor": "1"}),
        );
        assert_eq!(a.raw_value(), Some(&Value::Int(14191)));
        assert_eq!(a.value(), Some(Value::Float(14191.0)));
        assert_eq!(a.value_with_unit().as_deref(), Some("14191.0"));
    }

    #[test]
    fn test_negative_values_round() {
        let a = attr(
            "system",
            "L_ambient",
            json!({"val": "-25", "unit": "?C", "factor": "0.1"}),
        );
        assert_eq!(a.value(), Some(Value::Float(-2.5)));
    }

    #[test]
    fn test_switch_from_text_booleans() {
        let off = attr("system", "L_usb_stick", json!({"val": "false", "format": "0:Aus|1:Ein"}));
        assert_eq!(off.kind(), Kind::Switch);
        assert_eq!(off.raw_value(), Some(&Value::Int(0)));
        assert_eq!(off.value(), Some(Value::Bool(false)));
        assert_eq!(off.choice_label(), Some("Aus"));

        let on = attr("hk1", "L_pump", json!({"val": "true", "format": "0:Aus|1:Ein"}));
        assert_eq!(on.value(), Some(Value::Bool(true)));
        assert_eq!(on.choice_label(), Some("Ein"));
    }

    #[test]
    fn test_choice_keeps_code() {
        let a = attr(
            "hk1",
            "mode_auto",
            json!({"val": "1", "format": "0:Aus|1:Auto|2:Heizen|3:Absenken"}),
        );
        assert_eq!(a.kind(), Kind::Choice);
        assert_eq!(a.value(), Some(Value::Int(1)));
        assert_eq!(a.choice_label(), Some("Auto"));
    }

    #[test]
    fn test_unknown_choice_code() {
        let a = attr(
            "hk1",
            "autocomfort",
            json!({"val": "-1", "format": "0:Aus|1:Ein|2:Morgens|3:Abends"}),
        );
        assert_eq!(a.value(), Some(Value::Int(-1)));
        assert_eq!(a.choice_label(), None);
    }

    #[test]
    fn test_bare_string_is_plain_text() {
        let a = attr("hk1", "L_statetext", json!("Heizbetrieb aktiv"));
        assert_eq!(a.kind(), Kind::Plain);
        assert_eq!(a.value(), Some(Value::Text("Heizbetrieb aktiv".to_string())));
        assert_eq!(a.value_with_unit().as_deref(), Some("Heizbetrieb aktiv"));
        assert!(a.choices().is_none());
    }

    #[test]
    fn test_text_attribute_length() {
        let a = attr("hk1", "name", json!({"val": "", "length": "20"}));
        assert_eq!(a.kind(), Kind::Text);
        assert_eq!(a.length(), Some(20));
    }

    #[test]
    fn test_malformed_metadata() {
        let raw = RawAttribute::from_json("temp_heat", &json!({"val": "x", "factor": "0.1"})).unwrap();
        assert!(matches!(
            Attribute::new(DomainKey::parse("hk1"), "temp_heat", raw),
            Err(Error::MalformedAttribute { .. })
        ));

        let raw = RawAttribute::from_json("mode", &json!({"val": "on", "format": "0:Aus|1:Ein"})).unwrap();
        assert!(Attribute::new(DomainKey::parse("sk1"), "mode", raw).is_err());
    }

    #[test]
    fn test_thirdparty_sensor() {
        let a = attr(
            "thirdparty1",
            "L_state",
            json!({"val": "1|shellyht-1234|abcd|1|215|48|87|1675800000|192.168.1.50"}),
        );
        let sensor = a.sensor().unwrap();
        assert_eq!(sensor.device_id, "shellyht-1234");
        assert_eq!(sensor.humidity, "48");
        assert_eq!(sensor.device_ip, "192.168.1.50");
        assert_eq!(a.value(), Some(Value::Float(21.5)));
    }

    #[test]
    fn test_pipes_elsewhere_are_plain_text() {
        let a = attr("weather", "L_location", json!({"val": "Kropp|DE|6551974", "length": "20"}));
        assert!(a.sensor().is_none());
        assert_eq!(a.value(), Some(Value::Text("Kropp|DE|6551974".to_string())));
    }

    #[test]
    fn test_read_only_has_no_write_view() {
        let a = attr("pe1", "L_temp_act", json!({"val": "631", "factor": "0.1"}));
        assert!(a.as_controllable().is_none());
    }

    #[test]
    fn test_generate_human_value() {
        let a = attr(
            "hk1",
            "temp_heat",
            json!({"val": "2500", "factor": "0.1", "min": "1000", "max": "4000"}),
        );
        let c = a.as_controllable().unwrap();
        assert_eq!(
            c.generate_new_value(&Value::Float(250.0), true).unwrap(),
            Value::Int(2500)
        );
        assert!(matches!(
            c.generate_new_value(&Value::Float(1000.1), true),
            Err(Error::ValueOutOfBoundary { value: 10001, .. })
        ));
    }

    #[test]
    fn test_generate_rounds_to_device_units() {
        let a = attr(
            "hk1",
            "temp_heat",
            json!({"val": "250", "unit": "?C", "factor": "0.1", "min": "100.0", "max": "400.0"}),
        );
        let c = a.as_controllable().unwrap();
        assert_eq!(
            c.generate_new_value(&Value::Float(21.5), true).unwrap(),
            Value::Int(215)
        );
        assert_eq!(
            c.generate_new_value(&Value::Int(300), false).unwrap(),
            Value::Int(300)
        );
    }

    #[test]
    fn test_range_is_inclusive() {
        let a = attr(
            "hk1",
            "temp_heat",
            json!({"val": "250", "factor": "0.1", "min": "100.0", "max": "400.0"}),
        );
        let c = a.as_controllable().unwrap();
        assert!(c.generate_new_value(&Value::Float(10.0), true).is_ok());
        assert!(c.generate_new_value(&Value::Float(40.0), true).is_ok());
        assert!(c.generate_new_value(&Value::Float(40.1), true).is_err());
    }

    #[test]
    fn test_non_finite_input_is_rejected() {
        let a = attr(
            "hk1",
            "mode_auto",
            json!({"val": "1", "format": "0:Aus|1:Auto|2:Heizen|3:Absenken"}),
        );
        let c = a.as_controllable().unwrap();
        for input in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                c.generate_new_value(&Value::Float(input), true),
                Err(Error::IncompatibleInput { .. })
            ));
        }

        let a = attr(
            "hk1",
            "temp_heat",
            json!({"val": "250", "factor": "0.1", "min": "-300.0", "max": "400.0"}),
        );
        let c = a.as_controllable().unwrap();
        assert!(matches!(
            c.generate_new_value(&Value::Float(f64::NAN), true),
            Err(Error::IncompatibleInput { .. })
        ));
        assert!(matches!(
            c.generate_new_value(&Value::Float(f64::INFINITY), false),
            Err(Error::IncompatibleInput { .. })
        ));
    }

    #[test]
    fn test_device_units_must_be_whole() {
        let a = attr(
            "hk1",
            "temp_heat",
            json!({"val": "250", "factor": "0.1", "min": "100.0", "max": "400.0"}),
        );
        let c = a.as_controllable().unwrap();
        assert!(matches!(
            c.generate_new_value(&Value::Float(270.7), false),
            Err(Error::IncompatibleInput { .. })
        ));
        assert_eq!(
            c.generate_new_value(&Value::Float(270.0), false).unwrap(),
            Value::Int(270)
        );

        let a = attr("ww1", "heat_once", json!({"val": "3", "min": "0", "max": "10"}));
        let c = a.as_controllable().unwrap();
        assert!(matches!(
            c.generate_new_value(&Value::Float(2.7), true),
            Err(Error::IncompatibleInput { .. })
        ));
    }

    #[test]
    fn test_choice_label_with_factor() {
        let a = attr(
            "pe1",
            "mode",
            json!({"val": "1", "factor": "1", "format": "0:Aus|1:Auto|2:Ein"}),
        );
        assert_eq!(a.choice_label(), Some("Auto"));

        let a = attr(
            "pe1",
            "mode",
            json!({"val": "2.0", "factor": "0.5", "format": "0:Aus|1:Auto|2:Ein"}),
        );
        assert_eq!(a.raw_value(), Some(&Value::Float(2.0)));
        assert_eq!(a.choice_label(), Some("Ein"));
    }

    #[test]
    fn test_choice_range_and_labels() {
        let a = attr(
            "hk1",
            "mode_auto",
            json!({"val": "1", "format": "0:Aus|1:Auto|2:Heizen|3:Absenken"}),
        );
        let c = a.as_controllable().unwrap();
        assert_eq!(c.writable_range(), Some((0.0, 3.0)));
        assert_eq!(
            c.generate_new_value(&Value::Int(3), true).unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            c.generate_new_value(&Value::Text("Heizen".to_string()), true).unwrap(),
            Value::Int(2)
        );
        assert!(c.generate_new_value(&Value::Int(4), true).is_err());
    }

    #[test]
    fn test_switch_accepts_bool() {
        let a = attr("ww1", "heat_once", json!({"val": "false", "format": "0:Aus|1:Ein"}));
        let c = a.as_controllable().unwrap();
        assert_eq!(
            c.generate_new_value(&Value::Bool(true), true).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn test_text_truncates() {
        let a = attr("hk1", "name", json!({"val": "", "length": "20"}));
        let c = a.as_controllable().unwrap();
        let input = "Fussbodenheizung Obergeschoss".to_string();
        assert_eq!(input.chars().count(), 29);
        assert_eq!(
            c.generate_new_value(&Value::Text(input), true).unwrap(),
            Value::Text("Fussbodenheizung Obe".to_string())
        );
        assert_eq!(
            c.generate_new_value(&Value::Text("Bad".to_string()), true).unwrap(),
            Value::Text("Bad".to_string())
        );
    }

    #[test]
    fn test_incompatible_input_fails() {
        let a = attr("hk1", "name", json!({"val": "", "length": "20"}));
        let c = a.as_controllable().unwrap();
        assert!(matches!(
            c.generate_new_value(&Value::Int(3), true),
            Err(Error::IncompatibleInput { .. })
        ));

        let a = attr("hk1", "temp_heat", json!({"val": "250", "factor": "0.1", "min": "100.0", "max": "400.0"}));
        let c = a.as_controllable().unwrap();
        assert!(c
            .generate_new_value(&Value::Text("warm".to_string()), true)
            .is_err());
    }

    #[test]
    fn test_numeric_without_range() {
        let a = attr("pe1", "counter", json!({"val": "5", "factor": "1"}));
        let c = a.as_controllable().unwrap();
        assert!(matches!(
            c.generate_new_value(&Value::Int(6), true),
            Err(Error::NoWritableRange { .. })
        ));
    }

    #[test]
    fn test_bounds_without_factor_are_numeric() {
        let a = attr("ww1", "heat_once", json!({"val": "3", "min": "0", "max": "10"}));
        assert_eq!(a.raw_value(), Some(&Value::Int(3)));
        let c = a.as_controllable().unwrap();
        assert_eq!(c.generate_new_value(&Value::Int(7), true).unwrap(), Value::Int(7));

        let a = attr("ww1", "label", json!({"val": "n/a", "min": "0", "max": "10"}));
        assert_eq!(a.raw_value(), Some(&Value::Text("n/a".to_string())));
    }

    #[test]
    fn test_value_from_input() {
        assert_eq!(Value::from_input("21"), Value::Int(21));
        assert_eq!(Value::from_input("21.5"), Value::Float(21.5));
        assert_eq!(Value::from_input("true"), Value::Bool(true));
        assert_eq!(Value::from_input("Auto"), Value::Text("Auto".to_string()));
        assert_eq!(Value::Float(25.0).to_string(), "25.0");
    }
}
