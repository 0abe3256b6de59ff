mod constants;
mod types;
mod telemetry;
pub mod config;
pub mod transport;
pub mod controller;
pub mod console;

pub use config::{ConfigError, PanelConfig};
pub use console::Console;
pub use controller::{Controller, ControllerError, PanelState};
pub use telemetry::{parse_line, LineKind, TelemetryError};
pub use transport::{Link, TransportError};
pub use types::{AngleState, Notice, NoticeLevel, Profile, SendOutcome, TelemetryReading};

// Re-export commonly used items
pub use constants::{DEFAULT_BAUD_RATE, DEFAULT_DEVICE, POWER_OFF_TOKEN, TELEMETRY_TAG};
