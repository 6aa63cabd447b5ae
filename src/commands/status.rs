//! Status command implementation

use anyhow::Result;
use oekofen::{BurnerState, HttpTransport, Session, Value};
use serde::Serialize;
use tabled::Tabled;

use crate::config::RuntimeContext;
use crate::output::{output_for_format, print_table};

#[derive(Debug, Serialize)]
struct StatusInfo {
    name: String,
    uid: Option<String>,
    model: Option<String>,
    burner_state: Option<BurnerState>,
    status: Option<Value>,
    outdoor_temp: Option<Value>,
    heating_circuits: Vec<CircuitRow>,
}

#[derive(Debug, Tabled, Serialize)]
struct CircuitRow {
    circuit: String,
    state: String,
    flow_temp: String,
    temp_heat: String,
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

fn circuits(session: &Session<HttpTransport>) -> Vec<CircuitRow> {
    session
        .domains("hk")
        .iter()
        .map(|hk| {
            let index = hk.key().slot();
            CircuitRow {
                circuit: hk.key().to_string(),
                state: or_dash(session.heating_circuit_state(index).map(|v| v.to_string())),
                flow_temp: or_dash(
                    hk.attribute("L_flowtemp_act")
                        .and_then(|a| a.value_with_unit()),
                ),
                temp_heat: or_dash(hk.attribute("temp_heat").and_then(|a| a.value_with_unit())),
            }
        })
        .collect()
}

pub async fn run(ctx: &RuntimeContext) -> Result<()> {
    let session = super::load(ctx).await?;

    let info = StatusInfo {
        name: session.name(),
        uid: session.uid(),
        model: session.model().map(str::to_string),
        burner_state: session.burner_state(1),
        status: session.status(),
        outdoor_temp: session.weather_temp(),
        heating_circuits: circuits(&session),
    };

    output_for_format(ctx, &info, || {
        println!("{}", info.name);
        println!("{}", "=".repeat(info.name.chars().count()));
        println!("Model:        {}", or_dash(info.model.clone()));
        println!(
            "Burner:       {}",
            or_dash(info.burner_state.map(|s| format!("{s:?}")))
        );
        println!(
            "Status:       {}",
            or_dash(info.status.as_ref().map(|v| v.to_string()))
        );
        println!(
            "Outdoor:      {}",
            or_dash(
                session
                    .attribute("weather", "L_temp", 1)
                    .and_then(|a| a.value_with_unit())
            )
        );
        println!();
        if info.heating_circuits.is_empty() {
            println!("No heating circuits found");
            Ok(())
        } else {
            print_table(ctx, &info.heating_circuits)
        }
    })
}
