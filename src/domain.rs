//! Domains: addressable subsystem instances such as `hk1` or `weather`

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::attribute::{Attribute, RawAttribute};
use crate::error::Result;

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));

/// `(name, index)` pair parsed from a top-level payload key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DomainKey {
    pub name: String,
    /// `None` for singleton domains like `system` or `weather`
    pub index: Option<u32>,
    /// key as the controller sent it; addresses are built from this
    raw: String,
}

impl DomainKey {
    fn new(raw: &str, name: impl Into<String>, index: Option<u32>) -> Self {
        Self {
            name: name.into(),
            index,
            raw: raw.to_string(),
        }
    }

    /// Split `hk1` into `hk` and `1`. The first run of digits is the index.
    pub fn parse(raw: &str) -> Self {
        let Some(m) = DIGIT_RUN.find(raw) else {
            return Self::new(raw, raw, None);
        };

        match m.as_str().parse::<u32>() {
            Ok(index) => {
                let name = format!("{}{}", &raw[..m.start()], &raw[m.end()..]);
                Self::new(raw, name, Some(index))
            }
            Err(_) => {
                log::warn!("index in domain key '{raw}' is out of range, treating as singleton");
                Self::new(raw, raw, None)
            }
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Index used for flattened keys and lookups; singletons count as 1
    pub fn slot(&self) -> u32 {
        self.index.unwrap_or(1)
    }

    /// `hk1.temp_heat`, or `system.L_ambient` for singletons
    pub fn attribute_path(&self, attribute: &str) -> String {
        format!("{}.{attribute}", self.raw)
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One subsystem instance and its attributes, in payload order
#[derive(Debug, Clone)]
pub struct Domain {
    key: DomainKey,
    attributes: Vec<Attribute>,
}

impl Domain {
    pub fn new(key: DomainKey) -> Self {
        Self {
            key,
            attributes: Vec::new(),
        }
    }

    pub fn key(&self) -> &DomainKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn index(&self) -> Option<u32> {
        self.key.index
    }

    /// Build attributes from one raw domain object, replacing entries with the same key
    pub fn apply(&mut self, raw_attributes: &Map<String, JsonValue>) -> Result<()> {
        for (key, raw) in raw_attributes {
            let raw = RawAttribute::from_json(key, raw)?;
            let attribute = Attribute::new(self.key.clone(), key, raw)?;

            match self.attributes.iter_mut().find(|a| a.key() == key) {
                Some(existing) => *existing = attribute,
                None => self.attributes.push(attribute),
            }
        }
        Ok(())
    }

    pub fn attribute(&self, key: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.key() == key)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Access;
    use serde_json::json;

    #[test]
    fn test_parse_indexed_key() {
        let key = DomainKey::parse("hk1");
        assert_eq!(key.name, "hk");
        assert_eq!(key.index, Some(1));
        assert_eq!(key.to_string(), "hk1");
        assert_eq!(key.slot(), 1);

        let key = DomainKey::parse("pu12");
        assert_eq!(key.name, "pu");
        assert_eq!(key.index, Some(12));
    }

    #[test]
    fn test_padded_key_keeps_device_spelling() {
        let key = DomainKey::parse("hk01");
        assert_eq!(key.name, "hk");
        assert_eq!(key.index, Some(1));
        assert_eq!(key.slot(), 1);
        assert_eq!(key.to_string(), "hk01");
        assert_eq!(key.attribute_path("temp_heat"), "hk01.temp_heat");
    }

    #[test]
    fn test_parse_singleton_key() {
        let key = DomainKey::parse("weather");
        assert_eq!(key.name, "weather");
        assert_eq!(key.index, None);
        assert_eq!(key.slot(), 1);
        assert_eq!(key.attribute_path("L_temp"), "weather.L_temp");
    }

    #[test]
    fn test_only_first_digit_run_is_removed() {
        let key = DomainKey::parse("thirdparty2x3");
        assert_eq!(key.name, "thirdpartyx3");
        assert_eq!(key.index, Some(2));
    }

    #[test]
    fn test_oversized_index_is_singleton() {
        let key = DomainKey::parse("hk99999999999");
        assert_eq!(key.index, None);
        assert_eq!(key.name, "hk99999999999");
    }

    #[test]
    fn test_apply_dispatches_on_prefix() {
        let raw = json!({
            "hk_info": "heating circuit data",
            "L_flowtemp_act": {"val": "486", "unit": "?C", "factor": "0.1", "min": "-32768", "max": "32767"},
            "temp_heat": {"val": "250", "unit": "?C", "factor": "0.1", "min": "100.0", "max": "400.0"}
        });

        let mut domain = Domain::new(DomainKey::parse("hk1"));
        domain.apply(raw.as_object().unwrap()).unwrap();

        assert_eq!(domain.len(), 3);
        assert_eq!(
            domain.attribute("L_flowtemp_act").unwrap().access(),
            Access::ReadOnly
        );
        assert_eq!(
            domain.attribute("temp_heat").unwrap().access(),
            Access::Controllable
        );
        let keys: Vec<&str> = domain.attributes().map(|a| a.key()).collect();
        assert_eq!(keys, vec!["hk_info", "L_flowtemp_act", "temp_heat"]);
    }

    #[test]
    fn test_apply_replaces_existing_key() {
        let mut domain = Domain::new(DomainKey::parse("ww1"));
        domain
            .apply(json!({"L_statetext": "Aus"}).as_object().unwrap())
            .unwrap();
        domain
            .apply(json!({"L_statetext": "Ein"}).as_object().unwrap())
            .unwrap();

        assert_eq!(domain.len(), 1);
        assert_eq!(
            domain.attribute("L_statetext").unwrap().value(),
            Some(crate::attribute::Value::Text("Ein".to_string()))
        );
    }

    #[test]
    fn test_apply_rejects_bad_format() {
        let mut domain = Domain::new(DomainKey::parse("hk1"));
        let raw = json!({"mode_auto": {"val": "1", "format": "0:Aus|Auto"}});
        assert!(domain.apply(raw.as_object().unwrap()).is_err());
    }
}
