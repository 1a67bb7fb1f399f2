//! Staff models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::entry::VisitType;

/// Clinic employee role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Veterinarian,
    Groomer,
    Receptionist,
    ClinicManager,
    Administrative,
    KennelAssistant,
    LabTechnician,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Veterinarian => "veterinarian",
            StaffRole::Groomer => "groomer",
            StaffRole::Receptionist => "receptionist",
            StaffRole::ClinicManager => "clinic_manager",
            StaffRole::Administrative => "administrative",
            StaffRole::KennelAssistant => "kennel_assistant",
            StaffRole::LabTechnician => "lab_technician",
        }
    }
}

impl fmt::Display for StaffRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StaffRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "veterinarian" => Ok(StaffRole::Veterinarian),
            "groomer" => Ok(StaffRole::Groomer),
            "receptionist" => Ok(StaffRole::Receptionist),
            "clinic_manager" => Ok(StaffRole::ClinicManager),
            "administrative" => Ok(StaffRole::Administrative),
            "kennel_assistant" => Ok(StaffRole::KennelAssistant),
            "lab_technician" => Ok(StaffRole::LabTechnician),
            other => Err(format!("Unknown staff role: {}", other)),
        }
    }
}

/// A staff member with a single-assignment availability flag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffMember {
    /// Registry ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Role
    pub role: StaffRole,
    /// False while claimed by an entry or an open session
    pub available: bool,
}

impl StaffMember {
    /// Create a new, available staff member.
    pub fn new(name: String, role: StaffRole) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            role,
            available: true,
        }
    }

    /// Whether this member's role matches the visit type.
    pub fn can_serve(&self, visit_type: VisitType) -> bool {
        self.role == visit_type.required_role()
    }
}
