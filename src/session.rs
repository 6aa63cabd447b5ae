//! Device session: refresh cycle, flattened data and write path
//!
//! A refresh fetches `all??`, rebuilds every [`Domain`] from scratch and
//! flattens the result into one map keyed the way the controller addresses
//! its values:
//!
//! ```text
//! "hk1.hk_info"                 -> "heating circuit data"
//! "hk1.L_roomtemp_act"          -> 0.0
//! "hk1.L_roomtemp_act_min"      -> -3276.8
//! "hk1.L_roomtemp_act_max"      -> 3276.7
//! "hk1.mode_auto_choice"        -> "Auto"
//! "hk_indexes"                  -> [1]
//! "meta.ip_host"                -> "192.168.178.222"
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::Local;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::attribute::{Attribute, Value};
use crate::burner::BurnerState;
use crate::csv_log::{self, LogRecord};
use crate::domain::{Domain, DomainKey};
use crate::error::{Error, Result};
use crate::transport::{Expect, Transport};

pub const FULL_STATUS_PATH: &str = "all??";
pub const VERSION_PATH: &str = "??";
pub const LOG_PATH: &str = "log";

/// Present only in genuine full-status responses
pub const SENTINEL_KEY: &str = "system.system_info";

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_INSTALLER_CODE_FORMAT: &str = "%H%M";

const VERSION_SEPARATOR: &str = "   ";

/// Domains without an index; their index list holds a single empty slot
const SINGLETON_DOMAINS: [&str; 5] = ["system", "weather", "forecast", "error", "meta"];
/// Domains whose index list exists even when the device has none of them
const INDEXED_DOMAINS: [&str; 6] = ["hk", "pu", "ww", "circ", "pe", "sk"];

/// Entry of a `<domain>_indexes` list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSlot {
    /// serialized as `""`
    Singleton,
    Index(u32),
}

impl Serialize for IndexSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            IndexSlot::Singleton => serializer.serialize_str(""),
            IndexSlot::Index(i) => serializer.serialize_u32(*i),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlatValue {
    Value(Value),
    Indexes(Vec<IndexSlot>),
    Null,
}

impl From<Option<Value>> for FlatValue {
    fn from(value: Option<Value>) -> Self {
        value.map_or(FlatValue::Null, FlatValue::Value)
    }
}

/// Composite key to rendered value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlatMap(BTreeMap<String, FlatValue>);

impl FlatMap {
    pub fn get(&self, key: &str) -> Option<&FlatValue> {
        self.0.get(key)
    }

    /// Rendered value, `None` for missing keys, nulls and index lists
    pub fn value(&self, key: &str) -> Option<&Value> {
        match self.0.get(key)? {
            FlatValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Contents of `<domain>_indexes`
    pub fn indexes(&self, domain: &str) -> Option<&[IndexSlot]> {
        match self.0.get(&format!("{domain}_indexes"))? {
            FlatValue::Indexes(slots) => Some(slots),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FlatValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, key: String, value: FlatValue) {
        self.0.insert(key, value);
    }

    fn push_index(&mut self, domain: &str, index: u32) {
        let entry = self
            .0
            .entry(format!("{domain}_indexes"))
            .or_insert_with(|| FlatValue::Indexes(Vec::new()));
        if let FlatValue::Indexes(slots) = entry {
            let slot = IndexSlot::Index(index);
            if !slots.contains(&slot) {
                slots.push(slot);
            }
        }
    }
}

/// What a call to [`Session::refresh`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New payload accepted, state replaced
    Updated,
    /// Cache still fresh, nothing fetched
    Cached,
    /// Payload lacked the sentinel key, previous state kept
    Rejected,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub update_interval: Duration,
    /// chrono format for the installer code placed under `meta.`
    pub installer_code_format: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            installer_code_format: DEFAULT_INSTALLER_CODE_FORMAT.to_string(),
        }
    }
}

/// Client state for one controller
pub struct Session<T> {
    transport: T,
    host: String,
    options: SessionOptions,
    raw: Map<String, JsonValue>,
    domains: BTreeMap<String, Vec<Domain>>,
    data: FlatMap,
    last_fetch: Option<Instant>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, host: impl Into<String>) -> Self {
        Self::with_options(transport, host, SessionOptions::default())
    }

    pub fn with_options(transport: T, host: impl Into<String>, options: SessionOptions) -> Self {
        Self {
            transport,
            host: host.into(),
            options,
            raw: Map::new(),
            domains: BTreeMap::new(),
            data: FlatMap::default(),
            last_fetch: None,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Flattened data from the last accepted refresh
    pub fn data(&self) -> &FlatMap {
        &self.data
    }

    /// Raw payload from the last accepted refresh
    pub fn raw(&self) -> &Map<String, JsonValue> {
        &self.raw
    }

    /// All instances of one domain, in payload order
    pub fn domains(&self, name: &str) -> &[Domain] {
        self.domains.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn domain_names(&self) -> impl Iterator<Item = &str> {
        self.domains.keys().map(String::as_str)
    }

    fn is_fresh(&self) -> bool {
        if self.raw.is_empty() {
            return false;
        }
        self.last_fetch
            .is_some_and(|at| at.elapsed() < self.options.update_interval)
    }

    /// Force the next [`Self::refresh`] to fetch
    pub fn invalidate(&mut self) {
        self.last_fetch = None;
    }

    /// Fetch and rebuild unless the cache is fresh.
    ///
    /// State is only replaced when the new payload decodes completely and
    /// carries [`SENTINEL_KEY`]; transport and decode errors leave the
    /// previous state untouched.
    pub async fn refresh(&mut self) -> Result<RefreshOutcome> {
        if self.is_fresh() {
            log::debug!("cached data for {} is still fresh", self.host);
            return Ok(RefreshOutcome::Cached);
        }

        let payload = self
            .transport
            .fetch(FULL_STATUS_PATH, Expect::Json)
            .await?
            .into_json()?;
        let JsonValue::Object(raw) = payload else {
            return Err(Error::UnexpectedPayload(
                "full status is not a JSON object".to_string(),
            ));
        };

        let metadata = [
            ("ip_host", self.host.clone()),
            ("installateur_code", self.installer_code()),
        ];
        let (domains, data) = build(&raw, &metadata)?;

        if !data.contains_key(SENTINEL_KEY) {
            log::warn!(
                "response from {} has no {SENTINEL_KEY}, keeping previous data",
                self.host
            );
            return Ok(RefreshOutcome::Rejected);
        }

        log::debug!(
            "refreshed {} domains, {} entries from {}",
            raw.len(),
            data.len(),
            self.host
        );
        self.raw = raw;
        self.domains = domains;
        self.data = data;
        self.last_fetch = Some(Instant::now());
        Ok(RefreshOutcome::Updated)
    }

    /// Attribute of instance `index` (1-based) of `domain`
    pub fn attribute(&self, domain: &str, attribute: &str, index: u32) -> Option<&Attribute> {
        if index < 1 {
            return None;
        }
        self.domains
            .get(domain)?
            .iter()
            .find(|d| d.key().slot() == index)?
            .attribute(attribute)
    }

    /// Rendered value; `None` for anything that does not exist
    pub fn value(&self, domain: &str, attribute: &str, index: u32) -> Option<Value> {
        self.attribute(domain, attribute, index)?.value()
    }

    /// Write a value given in human units (°C rather than tenths).
    ///
    /// Returns `Ok(None)` when the attribute is unknown or read-only, and
    /// the wire value otherwise.
    pub async fn set_value(
        &self,
        domain: &str,
        attribute: &str,
        index: u32,
        input: &Value,
    ) -> Result<Option<Value>> {
        self.write(domain, attribute, index, input, true).await
    }

    /// Write a value already in device units
    pub async fn set_device_value(
        &self,
        domain: &str,
        attribute: &str,
        index: u32,
        input: &Value,
    ) -> Result<Option<Value>> {
        self.write(domain, attribute, index, input, false).await
    }

    async fn write(
        &self,
        domain: &str,
        attribute: &str,
        index: u32,
        input: &Value,
        human: bool,
    ) -> Result<Option<Value>> {
        let Some(attr) = self.attribute(domain, attribute, index) else {
            log::debug!("no attribute {domain}{index}.{attribute} to write");
            return Ok(None);
        };
        let Some(control) = attr.as_controllable() else {
            log::debug!("{} is read-only", attr.path());
            return Ok(None);
        };

        let wire = control.generate_new_value(input, human)?;
        let request = format!(
            "{}={}",
            attr.path(),
            urlencoding::encode(&wire.to_string())
        );
        self.transport.fetch(&request, Expect::Text).await?;
        log::info!("set {} to {}", attr.path(), wire);
        Ok(Some(wire))
    }

    /// JSON interface version from the first line of `??`
    pub async fn version(&self) -> Result<Option<String>> {
        let text = self
            .transport
            .fetch(VERSION_PATH, Expect::Text)
            .await?
            .into_text()?;
        Ok(parse_version(&text))
    }

    /// Newest sample of the CSV log
    pub async fn fetch_log(&self) -> Result<LogRecord> {
        let text = self
            .transport
            .fetch(LOG_PATH, Expect::Text)
            .await?
            .into_text()?;
        csv_log::parse(&text, Local::now().date_naive())
    }

    pub fn installer_code(&self) -> String {
        Local::now()
            .format(&self.options.installer_code_format)
            .to_string()
    }

    pub fn name(&self) -> String {
        format!("Oekofen ({})", self.host)
    }

    /// Burner status text
    pub fn status(&self) -> Option<Value> {
        self.value("pe", "L_statetext", 1)
    }

    pub fn weather_temp(&self) -> Option<Value> {
        self.value("weather", "L_temp", 1)
    }

    pub fn heating_circuit_state(&self, index: u32) -> Option<Value> {
        self.value("hk", "L_statetext", index)
    }

    pub fn heating_circuit_temp(&self, index: u32) -> Option<Value> {
        self.value("hk", "temp_heat", index)
    }

    pub async fn set_heating_circuit_temp(&self, celsius: f64, index: u32) -> Result<Option<Value>> {
        self.set_value("hk", "temp_heat", index, &Value::Float(celsius))
            .await
    }

    /// Boiler model label, e.g. `"PES"`
    pub fn model(&self) -> Option<&str> {
        self.attribute("pe", "L_type", 1)?.choice_label()
    }

    /// `oekofen_<model>_<host>` with separators flattened to `_`
    pub fn uid(&self) -> Option<String> {
        let model = self.model()?.to_lowercase().replace(' ', "_");
        let host = self.host.replace('.', "_");
        Some(format!("oekofen_{model}_{host}"))
    }

    pub fn burner_state(&self, index: u32) -> Option<BurnerState> {
        match self.attribute("pe", "L_state", index)?.raw_value()? {
            Value::Int(code) => Some(BurnerState::from_code(*code)),
            Value::Float(code) => Some(BurnerState::from_code(code.round() as i64)),
            _ => None,
        }
    }
}

type Domains = BTreeMap<String, Vec<Domain>>;

fn build(raw: &Map<String, JsonValue>, metadata: &[(&str, String)]) -> Result<(Domains, FlatMap)> {
    let mut domains: Domains = BTreeMap::new();
    let mut data = FlatMap::default();

    for name in SINGLETON_DOMAINS {
        data.insert(
            format!("{name}_indexes"),
            FlatValue::Indexes(vec![IndexSlot::Singleton]),
        );
    }
    for name in INDEXED_DOMAINS {
        data.insert(format!("{name}_indexes"), FlatValue::Indexes(Vec::new()));
    }

    for (raw_key, raw_attributes) in raw {
        let key = DomainKey::parse(raw_key);
        let raw_attributes = raw_attributes.as_object().ok_or_else(|| {
            Error::UnexpectedPayload(format!("domain '{raw_key}' is not an object"))
        })?;

        let mut domain = Domain::new(key.clone());
        domain.apply(raw_attributes)?;

        if let Some(index) = key.index {
            data.push_index(&key.name, index);
        }

        for attribute in domain.attributes() {
            let path = attribute.path();
            if attribute.choices().is_some() {
                let label = attribute.choice_label().map(|l| Value::Text(l.to_string()));
                data.insert(format!("{path}_choice"), label.into());
            }
            if let Some(min) = attribute.min_rendered() {
                data.insert(format!("{path}_min"), FlatValue::Value(min));
            }
            if let Some(max) = attribute.max_rendered() {
                data.insert(format!("{path}_max"), FlatValue::Value(max));
            }
            data.insert(path, attribute.value().into());
        }

        domains.entry(key.name).or_default().push(domain);
    }

    for (name, value) in metadata {
        data.insert(format!("meta.{name}"), FlatValue::Value(Value::Text(value.clone())));
    }

    Ok((domains, data))
}

fn parse_version(text: &str) -> Option<String> {
    let first_line = text.lines().next()?;
    let parts: Vec<&str> = first_line.split(VERSION_SEPARATOR).collect();
    match parts.as_slice() {
        [_, version, _] => Some(version.trim().to_string()),
        _ => None,
    }
}
