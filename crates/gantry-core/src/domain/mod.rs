//! Domain model (apps, units, messages, errors).

pub mod app;
pub mod errors;
pub mod message;

pub use self::app::{App, AppState, EnvVar, MachineId, Unit};
pub use self::errors::ActionError;
pub use self::message::{ActionName, DeliveryId, Message};
