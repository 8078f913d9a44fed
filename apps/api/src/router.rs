use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::{
    appointment_routes, AppointmentState, BookingFinalizer, IntakeFormService, LedgerService,
    ReminderService,
};
use conversation_cell::{
    conversation_routes, ConversationService, ConversationState, PatternExtractor, SessionStore,
};
use doctor_cell::{doctor_routes, SlotAllocator};
use notification_cell::{notification_routes, NotificationProducer, OutboxQueue};
use patient_cell::{patient_routes, IdentityResolver, PatientService};
use shared_config::AppConfig;
use shared_database::open_file_table;

/// Every long-lived service the API and its background tasks share.
pub struct Services {
    pub resolver: Arc<IdentityResolver>,
    pub allocator: Arc<SlotAllocator>,
    pub ledger: Arc<LedgerService>,
    pub reminders: Arc<ReminderService>,
    pub outbox: Arc<OutboxQueue>,
    pub conversations: Arc<ConversationService>,
    pub sessions: Arc<SessionStore>,
}

impl Services {
    pub fn from_config(config: &AppConfig) -> Self {
        let patients = open_file_table("patient store", config.patient_store_path.clone());
        let schedule = open_file_table("doctor schedule", config.schedule_store_path.clone());
        let ledger_store = open_file_table("booking ledger", config.ledger_store_path.clone());

        let outbox = Arc::new(OutboxQueue::new());
        let producer = Arc::new(NotificationProducer::new(
            outbox.clone(),
            config.sms_country_code.clone(),
        ));

        let resolver = Arc::new(IdentityResolver::new(patients.clone(), config.fuzzy_threshold));
        let allocator = Arc::new(SlotAllocator::new(schedule));
        let ledger = Arc::new(LedgerService::new(ledger_store.clone()));
        let reminders = Arc::new(ReminderService::new(ledger_store, producer.clone()));

        let finalizer = Arc::new(BookingFinalizer::new(
            Arc::new(PatientService::new(patients)),
            allocator.clone(),
            ledger.clone(),
            producer.clone(),
        ));
        let intake = Arc::new(IntakeFormService::new(producer, config.intake_form_path.clone()));

        let conversations = Arc::new(ConversationService::new(
            Arc::new(PatternExtractor::new()),
            resolver.clone(),
            allocator.clone(),
            finalizer,
            intake,
            config.fallback_doctors.clone(),
        ));

        Self {
            resolver,
            allocator,
            ledger,
            reminders,
            outbox,
            conversations,
            sessions: Arc::new(SessionStore::new(config.session_idle_minutes)),
        }
    }
}

pub fn create_router(services: &Services) -> Router {
    Router::new()
        .route("/", get(|| async { "Cura booking API is running!" }))
        .nest(
            "/conversations",
            conversation_routes(ConversationState {
                service: services.conversations.clone(),
                sessions: services.sessions.clone(),
            }),
        )
        .nest("/patients", patient_routes(services.resolver.clone()))
        .nest("/doctors", doctor_routes(services.allocator.clone()))
        .nest(
            "/appointments",
            appointment_routes(AppointmentState {
                ledger: services.ledger.clone(),
                reminders: services.reminders.clone(),
            }),
        )
        .nest("/notifications", notification_routes(services.outbox.clone()))
}
