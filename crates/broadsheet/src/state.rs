//! Shared handler state.

use std::sync::Arc;
use std::time::Duration;

use broadsheet_core::{
    AttemptRepository, Database, Dispatcher, MailTransport, MessageRepository,
    NewsletterRepository, RecipientRepository, StatisticsRepository, UserRepository,
};

use crate::form::FieldStyles;

/// Repositories and services handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    /// User accounts.
    pub users: UserRepository,
    /// Recipient store.
    pub recipients: RecipientRepository,
    /// Message store.
    pub messages: MessageRepository,
    /// Newsletter aggregate.
    pub newsletters: NewsletterRepository,
    /// Attempt log.
    pub attempts: AttemptRepository,
    /// Statistics and dashboard.
    pub stats: StatisticsRepository,
    /// Send workflow.
    pub dispatcher: Dispatcher,
    /// Form field presentation.
    pub styles: Arc<FieldStyles>,
}

impl AppState {
    /// Build state over `db`, sending through `transport` as `from`.
    #[must_use]
    pub fn new(
        db: &Database,
        transport: Arc<dyn MailTransport>,
        from: &str,
        recipient_cache_ttl: Duration,
    ) -> Self {
        Self {
            users: UserRepository::new(db),
            recipients: RecipientRepository::with_cache_ttl(db, recipient_cache_ttl),
            messages: MessageRepository::new(db),
            newsletters: NewsletterRepository::new(db),
            attempts: AttemptRepository::new(db),
            stats: StatisticsRepository::new(db),
            dispatcher: Dispatcher::new(db, transport, from),
            styles: Arc::new(FieldStyles::default()),
        }
    }

    /// Replace the form field styling.
    #[must_use]
    pub fn with_styles(mut self, styles: FieldStyles) -> Self {
        self.styles = Arc::new(styles);
        self
    }
}
