use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use appointment_cell::{BookingFinalizer, Decision, FinalizeOutcome, IntakeFormService};
use doctor_cell::{AllocationRequest, SlotAllocator, SlotOutcome};
use patient_cell::IdentityResolver;
use shared_utils::{format_dmy, parse_dmy};

use crate::models::{ConversationError, ExtractedInfo, Session, Stage};
use crate::services::extractor::InfoExtractor;
use crate::services::sessions::SessionStore;
use crate::services::validation::{validate_email, validate_phone};

pub const WELCOME_MESSAGE: &str =
    "Hey there! I'm Cura. Say the word, and I'll get your health check lined up.";

const DATE_RETRY: &str = "Please try another date (DD-MM-YYYY).";

/// Drives one session through the booking flow, one turn at a time.
pub struct ConversationService {
    extractor: Arc<dyn InfoExtractor>,
    resolver: Arc<IdentityResolver>,
    allocator: Arc<SlotAllocator>,
    finalizer: Arc<BookingFinalizer>,
    intake: Arc<IntakeFormService>,
    fallback_doctors: Vec<String>,
}

impl ConversationService {
    pub fn new(
        extractor: Arc<dyn InfoExtractor>,
        resolver: Arc<IdentityResolver>,
        allocator: Arc<SlotAllocator>,
        finalizer: Arc<BookingFinalizer>,
        intake: Arc<IntakeFormService>,
        fallback_doctors: Vec<String>,
    ) -> Self {
        Self {
            extractor,
            resolver,
            allocator,
            finalizer,
            intake,
            fallback_doctors,
        }
    }

    /// Consumes one user turn and returns the assistant's replies. The session
    /// either advances one stage or stays put with a corrective prompt.
    #[instrument(skip(self, session, text), fields(session_id = %session.id, stage = %session.stage))]
    pub async fn handle_turn(&self, session: &mut Session, text: &str) -> Vec<String> {
        session.touch();

        let reply = match session.stage {
            Stage::Greeting => self.greet(session).await,
            Stage::CollectingInfo => self.collect_info(session, text).await,
            Stage::CollectingInsuranceCarrier => {
                Self::collect_insurance(session, text, Stage::CollectingInsuranceMemberId)
            }
            Stage::CollectingInsuranceMemberId => {
                Self::collect_insurance(session, text, Stage::CollectingInsuranceGroupNumber)
            }
            Stage::CollectingInsuranceGroupNumber => {
                Self::collect_insurance(session, text, Stage::CollectingDate)
            }
            Stage::CollectingDate => self.collect_date(session, text).await,
            Stage::CollectingEmail => Self::collect_email(session, text),
            Stage::CollectingPhone => Self::collect_phone(session, text),
            Stage::CollectingDecision => self.collect_decision(session, text).await,
            Stage::Done => {
                session.reset();
                "I'm ready to help with a new booking. Just let me know!".to_string()
            }
        };

        debug!("Session {} now at {}", session.id, session.stage);
        vec![reply]
    }

    /// Starts the session over. A booking still awaiting CONFIRM/CANCEL is rolled
    /// back first; if that fails the session is left untouched.
    pub async fn reset(&self, session: &mut Session) -> Result<(), ConversationError> {
        self.release_pending(session).await?;
        session.reset();
        Ok(())
    }

    async fn release_pending(&self, session: &mut Session) -> Result<(), ConversationError> {
        if !session.has_pending_booking() {
            return Ok(());
        }
        match self.finalizer.abandon(&mut session.booking).await {
            FinalizeOutcome::WriteFailed { store, message } => {
                warn!("Could not roll back booking for session {}: {}", session.id, message);
                Err(ConversationError::Rollback(format!("{}: {}", store, message)))
            }
            outcome => {
                info!(
                    "Released pending booking for session {} ({})",
                    session.id,
                    outcome.status_code()
                );
                Ok(())
            }
        }
    }

    /// Discards idle sessions and releases whatever they were holding.
    pub async fn prune_idle(&self, sessions: &SessionStore, now: DateTime<Utc>) -> usize {
        let pruned = sessions.prune_idle(now).await;
        let count = pruned.len();
        for mut session in pruned {
            if let Err(e) = self.release_pending(&mut session).await {
                error!("Idle session {} left a booking behind: {}", session.id, e);
            }
        }
        count
    }

    pub async fn run_pruner(self: Arc<Self>, sessions: Arc<SessionStore>, interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.prune_idle(&sessions, Utc::now()).await;
        }
    }

    async fn available_doctors(&self) -> Vec<String> {
        match self.allocator.list_providers().await {
            Ok(doctors) if !doctors.is_empty() => doctors,
            Ok(_) => self.fallback_doctors.clone(),
            Err(e) => {
                warn!("Could not list doctors from schedule, using fallback: {}", e);
                self.fallback_doctors.clone()
            }
        }
    }

    async fn greet(&self, session: &mut Session) -> String {
        let doctors = self.available_doctors().await;
        session.stage = Stage::CollectingInfo;
        format!(
            "Let me help you out! I'm here to help you book a medical appointment.\n\n\
             Our available doctors are:\n- {}\n\n\
             To get started, could you please provide your **full name, date of birth (DD-MM-YYYY), \
             preferred doctor, and city**?",
            doctors.join("\n- ")
        )
    }

    async fn collect_info(&self, session: &mut Session, text: &str) -> String {
        let extracted = match self.extractor.extract(text).await {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Extraction failed, treating reply as incomplete: {}", e);
                ExtractedInfo::default()
            }
        };
        let dob_readable = session.info.merge(extracted);

        let mut notes = Vec::new();
        if !dob_readable {
            notes.push("I couldn't read that date of birth, please use DD-MM-YYYY.".to_string());
        }

        if let Some(requested) = session.info.doctor.clone() {
            match self.allocator.match_provider(&requested).await {
                Ok(Some(provider)) => session.info.doctor = Some(provider),
                Ok(None) => {
                    session.info.doctor = None;
                    let doctors = self.available_doctors().await;
                    notes.push(format!(
                        "I couldn't find {} in our schedule. Our available doctors are: {}.",
                        requested,
                        doctors.join(", ")
                    ));
                }
                Err(e) => warn!("Could not match doctor {}: {}", requested, e),
            }
        }

        let missing = session.info.missing_fields();
        if !missing.is_empty() {
            notes.push(format!("Could you please share your **{}**?", missing.join(", ")));
            return notes.join("\n\n");
        }

        let lookup = self
            .resolver
            .lookup(session.info.name.as_deref(), session.info.dob.as_deref())
            .await;
        info!(
            "Patient classified as {} ({})",
            lookup.status, lookup.reason
        );

        session.booking.classification = lookup.status;
        session.booking.name = session.info.name.clone();
        session.booking.dob = session.info.dob.clone();
        session.booking.location = session.info.location.clone();
        session.booking.matched = lookup.patient.clone();

        let reply = if lookup.is_returning() {
            let name = lookup
                .patient
                .as_ref()
                .map(|patient| patient.name.clone())
                .or_else(|| session.info.name.clone())
                .unwrap_or_default();
            session.stage = Stage::CollectingDate;
            format!(
                "Welcome back, {}! It's great to see you again.\n\n\
                 What date (DD-MM-YYYY) would you like to book your appointment for?",
                name
            )
        } else {
            session.stage = Stage::CollectingInsuranceCarrier;
            format!(
                "Thank you, {}. It looks like you're a new patient.\n\n\
                 To proceed, let's collect your insurance details step by step.\n\n\
                 First, could you please provide your **Insurance Carrier**?",
                session.info.name.as_deref().unwrap_or("patient")
            )
        };
        session.lookup = Some(lookup);
        reply
    }

    fn collect_insurance(session: &mut Session, text: &str, next: Stage) -> String {
        let value = text.trim();
        let field = match session.stage {
            Stage::CollectingInsuranceCarrier => "Insurance Carrier",
            Stage::CollectingInsuranceMemberId => "Member ID",
            _ => "Group Number",
        };
        if value.is_empty() {
            return format!("Could you please provide your **{}**?", field);
        }

        let insurance = &mut session.booking.insurance;
        match session.stage {
            Stage::CollectingInsuranceCarrier => insurance.carrier = Some(value.to_string()),
            Stage::CollectingInsuranceMemberId => insurance.member_id = Some(value.to_string()),
            _ => insurance.group_number = Some(value.to_string()),
        }
        session.stage = next;

        match next {
            Stage::CollectingInsuranceMemberId => {
                "Thanks! Now, could you please provide your **Member ID**?".to_string()
            }
            Stage::CollectingInsuranceGroupNumber => {
                "Great! Finally, could you provide your **Group Number**?".to_string()
            }
            _ => "Thank you! Now, what date (DD-MM-YYYY) would you like to book your appointment for?"
                .to_string(),
        }
    }

    async fn collect_date(&self, session: &mut Session, text: &str) -> String {
        let Some(date) = parse_dmy(text) else {
            return "That date doesn't look right. Please use the DD-MM-YYYY format, for example 08-09-2025."
                .to_string();
        };
        let Some(provider) = session.info.doctor.clone() else {
            session.stage = Stage::CollectingInfo;
            return "Which doctor would you like to see?".to_string();
        };

        let request = AllocationRequest {
            provider,
            date: format_dmy(date),
            patient_name: session.booking.patient_record().name,
            classification: session.classification(),
            location: session.info.location.clone(),
        };
        let outcome = self.allocator.allocate(&request).await;
        session.last_status = Some(outcome.status_code().to_string());

        match outcome {
            SlotOutcome::Confirmed(reservation) => {
                let reply = format!(
                    "Great! I've provisionally booked you a slot with **{}** on **{}** at **{}**.\n\n\
                     To finalize, please provide your **email address**.",
                    reservation.provider,
                    reservation.date,
                    reservation.time_label()
                );
                session.booking.reservation = Some(reservation);
                session.stage = Stage::CollectingEmail;
                reply
            }
            SlotOutcome::Unavailable { message } => {
                debug!("No availability: {}", message);
                format!(
                    "I'm sorry, but it looks like there are no available slots on that day.\n{}",
                    DATE_RETRY
                )
            }
            SlotOutcome::Error { message } => format!("{}.\n{}", message, DATE_RETRY),
        }
    }

    fn collect_email(session: &mut Session, text: &str) -> String {
        match validate_email(text) {
            Some(email) => {
                session.booking.contact.email = Some(email);
                session.stage = Stage::CollectingPhone;
                "Thanks! Now, could you please provide your **phone number**?".to_string()
            }
            None => "That doesn't look like a valid email address. Please enter it again.".to_string(),
        }
    }

    fn collect_phone(session: &mut Session, text: &str) -> String {
        match validate_phone(text) {
            Some(phone) => {
                session.booking.contact.phone = Some(phone);
                session.stage = Stage::CollectingDecision;
                "Almost done! Please type **CONFIRM** to confirm your appointment or **CANCEL** to cancel it."
                    .to_string()
            }
            None => "That doesn't look like a valid phone number. Please enter at least 7 digits.".to_string(),
        }
    }

    async fn collect_decision(&self, session: &mut Session, text: &str) -> String {
        if Decision::parse(text).is_none() {
            return "Invalid input. Please type **CONFIRM** or **CANCEL**.".to_string();
        }

        let outcome = self.finalizer.finalize(&mut session.booking, text).await;
        session.last_status = Some(outcome.status_code());

        match &outcome {
            FinalizeOutcome::Confirmed { .. } => {
                let intake = self.intake.send(&outcome).await;
                debug!("Intake form status: {}", intake.status_code());
                session.intake_form_status = Some(intake.status_code());
                session.stage = Stage::Done;
                "Thank you! Your appointment is confirmed. You will receive an SMS and an email with \
                 the intake form shortly. You will be reminded when the appointment date is getting near."
                    .to_string()
            }
            FinalizeOutcome::Cancelled { .. } => {
                session.stage = Stage::Done;
                "Your appointment has been cancelled. If you'd like to rebook, just start over!".to_string()
            }
            FinalizeOutcome::WriteFailed { message, .. } => {
                warn!("Finalize failed with {}: {}", outcome.status_code(), message);
                "Sorry, something went wrong while saving your booking. Please type **CONFIRM** to try \
                 again or **CANCEL** to cancel."
                    .to_string()
            }
            FinalizeOutcome::SkippedNoBooking => {
                session.stage = Stage::CollectingDate;
                format!("There is no reserved slot to confirm yet. {}", DATE_RETRY)
            }
            FinalizeOutcome::InvalidDecision => {
                "Invalid input. Please type **CONFIRM** or **CANCEL**.".to_string()
            }
        }
    }
}
