use crate::constants::*;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Built-in firmware configurations. Each carries its own sendable and
/// displayable angle sets, which are allowed to disagree.
#[derive(Debug, EnumIter, EnumString, Display, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Classic,  // 10 / 45 / 60 / 80
    Extended, // 30 / 55 / 65 / 70 / 75 / 80, 70 has no label
}

impl Profile {
    pub fn allow_list(self) -> Vec<String> {
        let values = match self {
            Profile::Classic => CLASSIC_ALLOW_LIST,
            Profile::Extended => EXTENDED_ALLOW_LIST,
        };
        values.iter().map(|v| v.to_string()).collect()
    }

    pub fn displayable(self) -> BTreeSet<u32> {
        let values = match self {
            Profile::Classic => CLASSIC_DISPLAYABLE,
            Profile::Extended => EXTENDED_DISPLAYABLE,
        };
        values.iter().copied().collect()
    }
}

/// Most recently sent angle, as far as the label is concerned.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum AngleState {
    #[default]
    Unknown,
    Degrees(u32),
}

impl AngleState {
    pub fn from_sent(value: &str, displayable: &BTreeSet<u32>) -> Self {
        match value.parse::<u32>() {
            Ok(angle) if displayable.contains(&angle) => AngleState::Degrees(angle),
            _ => AngleState::Unknown,
        }
    }

    pub fn label(&self) -> String {
        match self {
            AngleState::Degrees(angle) => format!("{}: {}°", ANGLE_LABEL_PREFIX, angle),
            AngleState::Unknown => format!("{}: {}", ANGLE_LABEL_PREFIX, UNKNOWN_ANGLE),
        }
    }
}

impl fmt::Display for AngleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Value carried by an `ADC:<n>` line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct TelemetryReading(pub i32);

impl fmt::Display for TelemetryReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Display, Clone, Copy, Eq, PartialEq)]
pub enum NoticeLevel {
    Info,
    Warning,
    #[strum(serialize = "Erro")]
    Error,
}

/// Message surfaced to the operator (the dialog-box equivalent).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice { level: NoticeLevel::Error, message: message.into() }
    }
}

/// Result of a command that made it onto the wire.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SendOutcome {
    Acknowledged { value: String, reply: String },
    NoResponse { value: String },
}

impl SendOutcome {
    pub fn value(&self) -> &str {
        match self {
            SendOutcome::Acknowledged { value, .. } | SendOutcome::NoResponse { value } => value,
        }
    }

    /// Only a missing reply is worth interrupting the operator for.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            SendOutcome::Acknowledged { .. } => None,
            SendOutcome::NoResponse { value } => Some(Notice::info(format!(
                "Mensagem enviada: {}\n{}",
                value, NO_RESPONSE_SUFFIX
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn profiles_parse_from_lowercase_names() {
        for profile in Profile::iter() {
            assert_eq!(Profile::from_str(&profile.to_string()).unwrap(), profile);
        }
        assert!(Profile::from_str("turbo").is_err());
    }

    #[test]
    fn extended_profile_sets_diverge() {
        let allow = Profile::Extended.allow_list();
        let displayable = Profile::Extended.displayable();
        assert!(allow.contains(&"70".to_string()));
        assert!(!displayable.contains(&70));
        assert!(displayable.contains(&0));
        assert!(!allow.contains(&"0".to_string()));
    }

    #[test]
    fn angle_label_for_displayable_value() {
        let state = AngleState::from_sent("45", &Profile::Classic.displayable());
        assert_eq!(state, AngleState::Degrees(45));
        assert_eq!(state.label(), "Ângulo Atual: 45°");
    }

    #[test]
    fn angle_label_falls_back_to_unknown() {
        let displayable = Profile::Extended.displayable();
        assert_eq!(AngleState::from_sent("70", &displayable).label(), "Ângulo Atual: N/A");
        assert_eq!(AngleState::from_sent("abc", &displayable), AngleState::Unknown);
        assert_eq!(AngleState::default().label(), "Ângulo Atual: N/A");
    }

    #[test]
    fn no_response_notice_mentions_value() {
        let outcome = SendOutcome::NoResponse { value: "70".into() };
        let notice = outcome.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Info);
        assert!(notice.message.contains("70"));

        let acked = SendOutcome::Acknowledged { value: "45".into(), reply: "OK".into() };
        assert!(acked.notice().is_none());
    }

    #[test]
    fn error_level_uses_operator_title() {
        assert_eq!(NoticeLevel::Error.to_string(), "Erro");
        assert_eq!(NoticeLevel::Warning.to_string(), "Warning");
    }
}
