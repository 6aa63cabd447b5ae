//! Log command implementation

use anyhow::{Context, Result};
use oekofen::csv_log::LogValue;
use serde::Serialize;
use tabled::Tabled;

use crate::config::RuntimeContext;
use crate::output::{output_for_format, print_table};

#[derive(Debug, Tabled, Serialize)]
struct ColumnRow {
    column: String,
    value: String,
}

fn display(value: &LogValue) -> String {
    match value {
        LogValue::Int(i) => i.to_string(),
        LogValue::Float(f) => f.to_string(),
        LogValue::Date(d) => d.format("%d.%m.%Y").to_string(),
        LogValue::Time(t) => t.format("%H:%M:%S").to_string(),
        LogValue::Text(s) => s.clone(),
    }
}

pub async fn run(ctx: &RuntimeContext) -> Result<()> {
    let session = ctx.session()?;
    let record = session
        .fetch_log()
        .await
        .with_context(|| format!("reading log from {}", session.host()))?;

    let mut columns = serde_json::Map::new();
    for (name, value) in &record.columns {
        columns.insert(name.clone(), serde_json::to_value(value)?);
    }
    let data = serde_json::json!({
        "timestamp": record.timestamp,
        "columns": columns,
    });

    output_for_format(ctx, &data, || {
        if let Some(timestamp) = record.timestamp {
            println!("Sample from {}", timestamp.format("%Y-%m-%d %H:%M:%S"));
        }
        let rows: Vec<ColumnRow> = record
            .columns
            .iter()
            .map(|(name, value)| ColumnRow {
                column: name.clone(),
                value: display(value),
            })
            .collect();
        print_table(ctx, &rows)
    })
}
