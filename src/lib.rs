//! oekofen - client library for the Oekofen Pellematic JSON interface
//!
//! Polls the controller's `all??` endpoint, decodes its attribute records
//! into typed values and writes control values back through the same
//! interface.
//!
//! ```no_run
//! use std::time::Duration;
//! use oekofen::{base_url, HttpTransport, Session, Value};
//!
//! # async fn demo() -> oekofen::Result<()> {
//! let transport = HttpTransport::new(base_url("192.168.1.20", 4321, "eMlG"), Duration::from_secs(30))?;
//! let mut session = Session::new(transport, "192.168.1.20");
//! session.refresh().await?;
//! println!("{:?}", session.value("hk", "temp_heat", 1));
//! session.set_value("hk", "temp_heat", 1, &Value::Float(21.5)).await?;
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod burner;
pub mod choices;
pub mod csv_log;
pub mod domain;
pub mod error;
pub mod session;
pub mod transport;

pub use attribute::{Access, Attribute, ControllableAttribute, Kind, SensorReading, Value};
pub use burner::BurnerState;
pub use choices::{ChoiceTable, OFF_ON_TEXT};
pub use domain::{Domain, DomainKey};
pub use error::{Error, Result};
pub use session::{FlatMap, FlatValue, IndexSlot, RefreshOutcome, Session, SessionOptions};
pub use transport::{base_url, Expect, HttpTransport, Payload, Transport};
