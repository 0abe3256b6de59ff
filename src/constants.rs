use std::time::Duration;

// Link defaults, matching the firmware's UART0 setup
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

// Wire protocol
pub const POWER_OFF_TOKEN: &str = "OFF";
pub const TELEMETRY_TAG: &str = "ADC:";

// Built-in angle sets
pub const CLASSIC_ALLOW_LIST: &[&str] = &["10", "45", "60", "80"];
pub const CLASSIC_DISPLAYABLE: &[u32] = &[10, 45, 60, 80];
pub const EXTENDED_ALLOW_LIST: &[&str] = &["30", "55", "65", "70", "75", "80"];
pub const EXTENDED_DISPLAYABLE: &[u32] = &[0, 30, 55, 65, 75, 80];

// Operator-facing text
pub const ANGLE_LABEL_PREFIX: &str = "Ângulo Atual";
pub const UNKNOWN_ANGLE: &str = "N/A";
pub const NO_RESPONSE_SUFFIX: &str = "Sem resposta do ESP32";
pub const POWER_OFF_CONFIRMATION: &str = "Comando OFF enviado";
