//! Where booked appointments come from.

use chrono::NaiveDateTime;

use crate::error::FlowResult;
use crate::models::Appointment;

/// Read-only view of the appointment book.
pub trait AppointmentSource: Send + Sync {
    /// Appointments starting in `[start, end)`.
    fn list_appointments(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> FlowResult<Vec<Appointment>>;
}

/// A fixed list of appointments, filtered by window on read.
#[derive(Debug, Clone, Default)]
pub struct StaticAppointmentSource {
    appointments: Vec<Appointment>,
}

impl StaticAppointmentSource {
    pub fn new(appointments: Vec<Appointment>) -> Self {
        Self { appointments }
    }

    pub fn push(&mut self, appointment: Appointment) {
        self.appointments.push(appointment);
    }
}

impl AppointmentSource for StaticAppointmentSource {
    fn list_appointments(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> FlowResult<Vec<Appointment>> {
        Ok(self
            .appointments
            .iter()
            .filter(|a| a.start_time >= start && a.start_time < end)
            .cloned()
            .collect())
    }
}
