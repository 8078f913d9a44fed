use std::sync::Arc;

use tracing::{error, info, warn};

use doctor_cell::SlotAllocator;
use notification_cell::{AppointmentDetails, NotificationProducer};
use patient_cell::PatientService;

use crate::models::{BookingRecord, BookingTransaction, Decision, FinalizeOutcome};
use crate::services::ledger::LedgerService;

/// Commits or reverts a reserved booking.
///
/// Writes always happen before notifications are queued, and notification
/// problems never change the outcome.
pub struct BookingFinalizer {
    patients: Arc<PatientService>,
    slots: Arc<SlotAllocator>,
    ledger: Arc<LedgerService>,
    notifications: Arc<NotificationProducer>,
}

impl BookingFinalizer {
    pub fn new(
        patients: Arc<PatientService>,
        slots: Arc<SlotAllocator>,
        ledger: Arc<LedgerService>,
        notifications: Arc<NotificationProducer>,
    ) -> Self {
        Self {
            patients,
            slots,
            ledger,
            notifications,
        }
    }

    pub async fn finalize(&self, txn: &mut BookingTransaction, decision: &str) -> FinalizeOutcome {
        if txn.reservation.is_none() {
            warn!("Finalize requested without a confirmed reservation");
            return FinalizeOutcome::SkippedNoBooking;
        }

        match Decision::parse(decision) {
            Some(Decision::Confirm) => self.confirm(txn).await,
            Some(Decision::Cancel) => self.cancel(txn, true).await,
            None => FinalizeOutcome::InvalidDecision,
        }
    }

    /// Rolls back a reservation the patient walked away from before deciding:
    /// slots are released and a staged patient is removed, with no SMS.
    pub async fn abandon(&self, txn: &mut BookingTransaction) -> FinalizeOutcome {
        if txn.reservation.is_none() {
            return FinalizeOutcome::SkippedNoBooking;
        }
        self.cancel(txn, false).await
    }

    async fn confirm(&self, txn: &mut BookingTransaction) -> FinalizeOutcome {
        let Some(reservation) = txn.reservation.clone() else {
            return FinalizeOutcome::SkippedNoBooking;
        };
        let patient = txn.patient_record();

        if txn.classification.is_new() && !txn.patient_staged {
            if let Err(e) = self.patients.append(&patient).await {
                error!("Failed to add new patient {}: {}", patient.name, e);
                return FinalizeOutcome::WriteFailed {
                    store: "patient_db",
                    message: e.to_string(),
                };
            }
            txn.patient_staged = true;
        }

        let booking = BookingRecord::confirmed(&patient, &reservation);
        if let Err(e) = self.ledger.append(&booking).await {
            error!("Booking not confirmed, ledger write failed: {}", e);
            return FinalizeOutcome::WriteFailed {
                store: "ledger",
                message: e.to_string(),
            };
        }

        let details = AppointmentDetails {
            patient_name: patient.name.clone(),
            doctor: reservation.provider.clone(),
            date: reservation.date.clone(),
            time: reservation.time_label(),
        };
        self.notifications
            .booking_confirmed(&booking.phone_number, &details)
            .await;

        info!(
            "Appointment confirmed for {} with {} on {} at {}",
            patient.name, details.doctor, details.date, details.time
        );
        FinalizeOutcome::Confirmed { booking, patient }
    }

    async fn cancel(&self, txn: &mut BookingTransaction, notify: bool) -> FinalizeOutcome {
        let Some(reservation) = txn.reservation.clone() else {
            return FinalizeOutcome::SkippedNoBooking;
        };

        let released_slots = match self.slots.release(&reservation).await {
            Ok(released) => released,
            Err(e) => {
                error!("Failed to release reserved slots: {}", e);
                return FinalizeOutcome::WriteFailed {
                    store: "schedule",
                    message: e.to_string(),
                };
            }
        };

        let mut patient_removed = false;
        if txn.classification.is_new() && txn.patient_staged {
            let patient = txn.patient_record();
            match self.patients.remove_latest(&patient.name, &patient.dob).await {
                Ok(removed) => {
                    patient_removed = removed;
                    txn.patient_staged = false;
                }
                Err(e) => {
                    error!("Failed to remove staged patient {}: {}", patient.name, e);
                    return FinalizeOutcome::WriteFailed {
                        store: "patient_db",
                        message: e.to_string(),
                    };
                }
            }
        }

        if notify {
            let phone = txn.contact.phone.clone().unwrap_or_default();
            self.notifications.booking_cancelled(&phone).await;
        }

        info!(
            "Appointment with {} on {} cancelled, {} slot(s) released",
            reservation.provider, reservation.date, released_slots
        );
        FinalizeOutcome::Cancelled {
            released_slots,
            patient_removed,
        }
    }
}
