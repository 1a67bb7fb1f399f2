//! Booked appointments as read from the appointment source.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::entry::VisitType;

/// Kind of service an appointment was booked for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferingType {
    Consultation,
    Vaccination,
    Surgery,
    Emergency,
    Grooming,
    Medical,
}

impl OfferingType {
    /// Queue visit type for this offering.
    pub fn visit_type(&self) -> VisitType {
        match self {
            OfferingType::Grooming => VisitType::Grooming,
            OfferingType::Consultation
            | OfferingType::Vaccination
            | OfferingType::Surgery
            | OfferingType::Emergency
            | OfferingType::Medical => VisitType::Medical,
        }
    }
}

impl FromStr for OfferingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CONSULTATION" => Ok(OfferingType::Consultation),
            "VACCINATION" => Ok(OfferingType::Vaccination),
            "SURGERY" => Ok(OfferingType::Surgery),
            "EMERGENCY" => Ok(OfferingType::Emergency),
            "GROOMING" => Ok(OfferingType::Grooming),
            "MEDICAL" => Ok(OfferingType::Medical),
            other => Err(format!("Unknown offering type: {}", other)),
        }
    }
}

/// Appointment lifecycle status, owned by the booking system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    #[serde(alias = "PROGRAMADA")]
    Scheduled,
    #[serde(alias = "CONFIRMADA")]
    Confirmed,
    #[serde(alias = "EN_PROGRESO")]
    InProgress,
    #[serde(alias = "COMPLETADA")]
    Completed,
    #[serde(alias = "CANCELADA")]
    Cancelled,
    #[serde(alias = "NO_ASISTIO")]
    NoShow,
}

impl AppointmentStatus {
    /// Closed appointments never produce queue entries.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" | "PROGRAMADA" => Ok(AppointmentStatus::Scheduled),
            "CONFIRMED" | "CONFIRMADA" => Ok(AppointmentStatus::Confirmed),
            "IN_PROGRESS" | "EN_PROGRESO" => Ok(AppointmentStatus::InProgress),
            "COMPLETED" | "COMPLETADA" => Ok(AppointmentStatus::Completed),
            "CANCELLED" | "CANCELADA" => Ok(AppointmentStatus::Cancelled),
            "NO_SHOW" | "NO_ASISTIO" => Ok(AppointmentStatus::NoShow),
            other => Err(format!("Unknown appointment status: {}", other)),
        }
    }
}

/// A booked appointment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Booking system ID, used for logging only
    pub id: String,
    pub pet_id: Option<String>,
    pub client_id: Option<String>,
    pub start_time: NaiveDateTime,
    pub offering_type: OfferingType,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl Appointment {
    /// Both references present and non-empty.
    pub fn has_references(&self) -> bool {
        let present = |id: &Option<String>| id.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.pet_id) && present(&self.client_id)
    }
}
