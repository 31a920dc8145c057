use std::fmt;

use serde::{Deserialize, Serialize};

/// Last recorded attendance state of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    ClockedIn,
    ClockedOut,
}

/// What a successful match does to an identity's attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ClockIn,
    ClockOut,
}

impl Action {
    /// Status the identity is in after this action is recorded.
    pub fn resulting_status(self) -> AttendanceStatus {
        match self {
            Action::ClockIn => AttendanceStatus::ClockedIn,
            Action::ClockOut => AttendanceStatus::ClockedOut,
        }
    }
}

/// Toggles attendance: anyone not clocked in clocks in, anyone clocked in
/// clocks out. An identity with no history counts as clocked out.
pub fn next_action(last: Option<AttendanceStatus>) -> Action {
    match last {
        None | Some(AttendanceStatus::ClockedOut) => Action::ClockIn,
        Some(AttendanceStatus::ClockedIn) => Action::ClockOut,
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClockedIn => write!(f, "clocked_in"),
            Self::ClockedOut => write!(f, "clocked_out"),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClockIn => write!(f, "clock_in"),
            Self::ClockOut => write!(f, "clock_out"),
        }
    }
}
