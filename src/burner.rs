//! Pellematic burner states (`pe<n>.L_state`)

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnerState {
    Start,
    Ignition,
    Softstart,
    FullFire,
    Trailing,
    Off,
    /// ash full, out of pellets, general fault
    Fault,
    Other(i64),
}

impl BurnerState {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Start,
            2 => Self::Ignition,
            3 => Self::Softstart,
            4 => Self::FullFire,
            5 => Self::Trailing,
            6 | 97..=101 => Self::Off,
            8 | 9 | 11 => Self::Fault,
            other => Self::Other(other),
        }
    }

    pub fn is_firing(self) -> bool {
        matches!(self, Self::Ignition | Self::Softstart | Self::FullFire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(BurnerState::from_code(4), BurnerState::FullFire);
        assert_eq!(BurnerState::from_code(99), BurnerState::Off);
        assert_eq!(BurnerState::from_code(11), BurnerState::Fault);
        assert_eq!(BurnerState::from_code(0), BurnerState::Other(0));
        assert!(BurnerState::FullFire.is_firing());
        assert!(!BurnerState::Trailing.is_firing());
    }
}
