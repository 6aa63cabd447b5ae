//! Value command implementations: list, get, set and dump

use anyhow::{bail, Context, Result};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use oekofen::{Access, Attribute, FlatValue, IndexSlot, Kind, Value};
use serde::Serialize;
use tabled::Tabled;

use crate::config::RuntimeContext;
use crate::output::{output_for_format, print_output, print_table, truncate};

#[derive(Debug, Tabled, Serialize)]
struct ValueRow {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct AttributeInfo {
    key: String,
    value: Option<Value>,
    unit: Option<String>,
    raw: Option<Value>,
    kind: Kind,
    access: Access,
    min: Option<Value>,
    max: Option<Value>,
    choice: Option<String>,
    choices: Vec<ChoiceRow>,
    writable_range: Option<(f64, f64)>,
}

#[derive(Debug, Tabled, Serialize)]
struct ChoiceRow {
    code: i64,
    label: String,
}

#[derive(Debug, Serialize)]
struct SetResult {
    key: String,
    sent: Value,
}

impl From<&Attribute> for AttributeInfo {
    fn from(attribute: &Attribute) -> Self {
        let choices = attribute
            .choices()
            .map(|table| {
                table
                    .iter()
                    .map(|(code, label)| ChoiceRow {
                        code,
                        label: label.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            key: attribute.path(),
            value: attribute.value(),
            unit: attribute.unit().map(str::to_string),
            raw: attribute.raw_value().cloned(),
            kind: attribute.kind(),
            access: attribute.access(),
            min: attribute.min_rendered(),
            max: attribute.max_rendered(),
            choice: attribute.choice_label().map(str::to_string),
            choices,
            writable_range: attribute
                .as_controllable()
                .and_then(|control| control.writable_range()),
        }
    }
}

fn display_flat(value: &FlatValue) -> String {
    match value {
        FlatValue::Value(v) => v.to_string(),
        FlatValue::Indexes(slots) => slots
            .iter()
            .map(|slot| match slot {
                IndexSlot::Singleton => "\"\"".to_string(),
                IndexSlot::Index(i) => i.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        FlatValue::Null => "-".to_string(),
    }
}

pub async fn list(ctx: &RuntimeContext, filter: Option<String>) -> Result<()> {
    let session = super::load(ctx).await?;

    let matcher = SkimMatcherV2::default();
    let mut filtered = serde_json::Map::new();
    for (key, value) in session.data().iter() {
        if let Some(ref filter) = filter {
            if matcher.fuzzy_match(key, filter).is_none() {
                continue;
            }
        }
        filtered.insert(key.clone(), serde_json::to_value(value)?);
    }

    output_for_format(ctx, &filtered, || {
        let rows: Vec<ValueRow> = session
            .data()
            .iter()
            .filter(|(key, _)| filtered.contains_key(key.as_str()))
            .map(|(key, value)| ValueRow {
                key: key.clone(),
                value: truncate(&display_flat(value), 60),
            })
            .collect();
        if rows.is_empty() {
            if filter.is_some() {
                println!("No values found matching filter");
            } else {
                println!("No values found");
            }
            Ok(())
        } else {
            print_table(ctx, &rows)
        }
    })
}

pub async fn get(ctx: &RuntimeContext, key: &str) -> Result<()> {
    let session = super::load(ctx).await?;
    let (domain, attribute) = super::split_key(key)?;

    let Some(found) = session.attribute(&domain.name, attribute, domain.slot()) else {
        bail!("Attribute not found: {key}");
    };
    let info = AttributeInfo::from(found);

    output_for_format(ctx, &info, || {
        println!("Attribute: {}", info.key);
        println!(
            "Value:     {}",
            found.value_with_unit().unwrap_or_else(|| "-".to_string())
        );
        if let Some(ref raw) = info.raw {
            println!("Raw:       {raw}");
        }
        println!("Kind:      {:?}", info.kind);
        println!("Access:    {:?}", info.access);
        if let Some(ref choice) = info.choice {
            println!("Choice:    {choice}");
        }
        if let (Some(min), Some(max)) = (&info.min, &info.max) {
            println!("Bounds:    {min} .. {max}");
        }
        if let Some((min, max)) = info.writable_range {
            println!("Writable:  {min} .. {max} (device units)");
        }
        if !info.choices.is_empty() {
            println!();
            print_table(ctx, &info.choices)?;
        }
        Ok(())
    })
}

pub async fn set(ctx: &RuntimeContext, key: &str, value: &str, raw: bool) -> Result<()> {
    let session = super::load(ctx).await?;
    let (domain, attribute) = super::split_key(key)?;
    let input = Value::from_input(value);

    let written = if raw {
        session
            .set_device_value(&domain.name, attribute, domain.slot(), &input)
            .await
    } else {
        session
            .set_value(&domain.name, attribute, domain.slot(), &input)
            .await
    }
    .with_context(|| format!("setting {key} to {value}"))?;

    let Some(sent) = written else {
        bail!("{key} is read-only or does not exist");
    };

    let result = SetResult {
        key: key.to_string(),
        sent,
    };
    output_for_format(ctx, &result, || {
        if !ctx.global.quiet {
            println!("Set {} (sent {})", result.key, result.sent);
        }
        Ok(())
    })
}

pub async fn dump(ctx: &RuntimeContext) -> Result<()> {
    let session = super::load(ctx).await?;
    print_output(ctx, session.data())
}
