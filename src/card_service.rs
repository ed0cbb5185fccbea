use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::card_store::CardStore;
use crate::catalog::{group_by_subject_then_theme, Catalog, CatalogCounts};
use crate::config::Config;
use crate::database::{Database, SnapshotStore};
use crate::errors::{ErrorContext, Result, ResultExt, StudyError};
use crate::generator::{CardGenerator, GenerationContext};
use crate::models::*;
use crate::review_session::ReviewSession;
use crate::scheduler::{ReviewLog, Sm2Scheduler};
use crate::selector::{select_review_queue, CardPredicate};
use crate::{log_performance, log_service_start, log_service_success, log_service_warn};

const SERVICE: &str = "card_service";

/// Library entry point: card CRUD, catalog browsing, queue selection and grading.
#[derive(Clone)]
pub struct CardService {
    store: Arc<CardStore>,
    scheduler: Sm2Scheduler,
    queue_limit: Option<usize>,
}

impl CardService {
    pub fn new(store: CardStore) -> Self {
        Self {
            store: Arc::new(store),
            scheduler: Sm2Scheduler::new(),
            queue_limit: None,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Sm2Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_queue_limit(mut self, limit: Option<usize>) -> Self {
        self.queue_limit = limit;
        self
    }

    /// Open the card store on top of any snapshot backend.
    pub async fn open(backend: Arc<dyn SnapshotStore>) -> Self {
        Self::new(CardStore::open(backend).await)
    }

    /// Validate `config`, connect to the configured database and load the card set.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| StudyError::Validation(e.to_string()))
            .log_err(|| ErrorContext::new("load_config", "configuration"))?;

        let db = Database::new(&config.storage.url)
            .await
            .log_err(|| ErrorContext::new("connect", "database"))?;

        Ok(Self::open(Arc::new(db))
            .await
            .with_scheduler(Sm2Scheduler::from_config(&config.scheduler))
            .with_queue_limit(config.review.queue_limit))
    }

    pub fn scheduler(&self) -> &Sm2Scheduler {
        &self.scheduler
    }

    // Card CRUD operations
    pub async fn create_card(&self, request: CreateCardRequest) -> Result<Card> {
        log_service_start!(SERVICE, "create_card");
        let card = self
            .store
            .create(request)
            .await
            .log_err(|| ErrorContext::new("create_card", "card"))?;

        log_service_success!(SERVICE, "create_card", card_id = card.id, "card created");
        Ok(card)
    }

    pub async fn get_card(&self, id: Uuid) -> Result<Card> {
        self.store
            .get(id)
            .await
            .log_err(|| ErrorContext::new("get_card", "card").with_id(id))
    }

    pub async fn update_card(&self, id: Uuid, request: UpdateCardRequest) -> Result<Card> {
        log_service_start!(SERVICE, "update_card", card_id = id);
        let card = self
            .store
            .update(id, request)
            .await
            .log_err(|| ErrorContext::new("update_card", "card").with_id(id))?;

        log_service_success!(SERVICE, "update_card", card_id = id, "card updated");
        Ok(card)
    }

    pub async fn delete_card(&self, id: Uuid) -> Result<()> {
        log_service_start!(SERVICE, "delete_card", card_id = id);
        self.store
            .delete(id)
            .await
            .log_err(|| ErrorContext::new("delete_card", "card").with_id(id))?;

        log_service_success!(SERVICE, "delete_card", card_id = id, "card deleted");
        Ok(())
    }

    /// Delete every card filed under `subject` / `theme`. Returns how many were removed.
    pub async fn delete_theme(&self, subject: &str, theme: &str) -> Result<usize> {
        log_service_start!(SERVICE, "delete_theme", subject = subject);
        let removed = self
            .store
            .delete_by_theme(subject, theme)
            .await
            .log_err(|| ErrorContext::new("delete_theme", "theme").with_id(format!("{}/{}", subject, theme)))?;

        log_service_success!(SERVICE, "delete_theme", count = removed, "theme cards removed");
        Ok(removed)
    }

    pub async fn delete_subject(&self, subject: &str) -> Result<usize> {
        log_service_start!(SERVICE, "delete_subject", subject = subject);
        let removed = self
            .store
            .delete_by_subject(subject)
            .await
            .log_err(|| ErrorContext::new("delete_subject", "subject").with_id(subject))?;

        log_service_success!(SERVICE, "delete_subject", count = removed, "subject cards removed");
        Ok(removed)
    }

    pub async fn list_cards(&self) -> Vec<Card> {
        self.store.list_all().await
    }

    pub async fn recent_cards(&self, limit: usize) -> Vec<Card> {
        self.store.recent(limit).await
    }

    // Catalog operations
    pub async fn group_catalog(&self) -> Catalog {
        let cards = self.store.list_all().await;
        let started = Instant::now();
        let catalog = group_by_subject_then_theme(&cards);
        log_performance!("group_catalog", duration_ms = started.elapsed().as_millis() as u64, count = cards.len());
        catalog
    }

    pub async fn catalog_counts(&self) -> CatalogCounts {
        self.group_catalog().await.counts()
    }

    // Generated card intake
    pub async fn import_pairs(
        &self,
        subject: Option<&str>,
        theme: Option<&str>,
        pairs: Vec<GeneratedPair>,
    ) -> Result<ImportReport> {
        log_service_start!(SERVICE, "import_pairs", card_count = pairs.len());
        let report = self
            .store
            .import(subject, theme, pairs)
            .await
            .log_err(|| ErrorContext::new("import_pairs", "card"))?;

        log_service_success!(
            SERVICE,
            "import_pairs",
            count = report.created.len(),
            "pairs imported"
        );
        if report.duplicates_skipped > 0 {
            log_service_warn!(
                SERVICE,
                "import_pairs",
                format!("{} duplicate pairs skipped", report.duplicates_skipped)
            );
        }
        Ok(report)
    }

    pub async fn generate_cards(
        &self,
        generator: &dyn CardGenerator,
        source_text: &str,
        context: GenerationContext,
    ) -> Result<ImportReport> {
        log_service_start!(SERVICE, "generate_cards");
        if source_text.trim().is_empty() {
            let error = StudyError::Validation("source text must not be empty".to_string());
            return Err(error.log_with_context(ErrorContext::new("generate_cards", "card")));
        }

        let pairs = generator
            .generate(source_text, &context)
            .await
            .map_err(|e| match e {
                StudyError::Generation(_) => e,
                other => StudyError::Generation(format!("{}: {}", generator.name(), other)),
            })
            .log_err(|| ErrorContext::new("generate_cards", "generator").with_id(generator.name()))?;

        self.import_pairs(context.subject.as_deref(), context.theme.as_deref(), pairs)
            .await
    }

    // Review operations
    pub async fn select_review_queue<P>(&self, filter: &P) -> Vec<Card>
    where
        P: CardPredicate + ?Sized,
    {
        let cards = self.store.list_all().await;
        let mut rng = rand::thread_rng();
        self.select_review_queue_at(&cards, filter, Utc::now(), &mut rng)
    }

    /// Deterministic variant for callers that control the clock and randomness.
    pub async fn select_review_queue_with<P, R>(&self, filter: &P, now: DateTime<Utc>, rng: &mut R) -> Vec<Card>
    where
        P: CardPredicate + ?Sized,
        R: Rng + ?Sized,
    {
        let cards = self.store.list_all().await;
        self.select_review_queue_at(&cards, filter, now, rng)
    }

    fn select_review_queue_at<P, R>(&self, cards: &[Card], filter: &P, now: DateTime<Utc>, rng: &mut R) -> Vec<Card>
    where
        P: CardPredicate + ?Sized,
        R: Rng + ?Sized,
    {
        let started = Instant::now();
        let queue = select_review_queue(cards, filter, now, self.queue_limit, rng);
        log_performance!(
            "select_review_queue",
            duration_ms = started.elapsed().as_millis() as u64,
            count = queue.len()
        );
        queue
    }

    pub async fn start_session<P>(&self, filter: &P) -> ReviewSession
    where
        P: CardPredicate + ?Sized,
    {
        ReviewSession::new(self.select_review_queue(filter).await)
    }

    /// Grade a card by raw quality (1 = hard, 3 = normal, 5 = easy) and persist the result.
    pub async fn grade_card(&self, card_id: Uuid, quality: i32) -> Result<Card> {
        let grade = Grade::from_quality(quality)
            .log_err(|| ErrorContext::new("grade_card", "card").with_id(card_id))?;
        let (card, _log) = self.review_card(card_id, grade).await?;
        Ok(card)
    }

    pub async fn review_card(&self, card_id: Uuid, grade: Grade) -> Result<(Card, ReviewLog)> {
        log_service_start!(SERVICE, "review_card", card_id = card_id);
        let context = || ErrorContext::new("review_card", "card").with_id(card_id);

        let scheduler = &self.scheduler;
        let (stored, log) = self
            .store
            .review(card_id, |card| Ok(scheduler.schedule_card(card, grade, Utc::now())))
            .await
            .log_err(context)?;

        log_service_success!(
            SERVICE,
            "review_card",
            card_id = card_id,
            format!("graded {} -> next review in {} days", grade, log.scheduled_days)
        );
        Ok((stored, log))
    }
}
