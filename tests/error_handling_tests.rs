use async_trait::async_trait;
use memo_deck::{
    CardGenerator, CardService, CreateCardRequest, Database, GeneratedPair, GenerationContext, SnapshotStore,
    StudyError, UpdateCardRequest,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory backend whose writes can be switched off.
#[derive(Default)]
struct FlakyStore {
    payload: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn set_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotStore for FlakyStore {
    async fn load(&self) -> memo_deck::Result<Option<String>> {
        Ok(self.payload.lock().unwrap().clone())
    }

    async fn save(&self, payload: &str) -> memo_deck::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StudyError::Storage("disk full".to_string()));
        }
        *self.payload.lock().unwrap() = Some(payload.to_string());
        Ok(())
    }
}

struct BrokenLoad;

#[async_trait]
impl SnapshotStore for BrokenLoad {
    async fn load(&self) -> memo_deck::Result<Option<String>> {
        Err(StudyError::Storage("unreadable".to_string()))
    }

    async fn save(&self, _payload: &str) -> memo_deck::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_database_connection_failure() {
    let result = Database::new("invalid://url").await;
    assert!(matches!(result, Err(StudyError::Storage(_))));
}

#[tokio::test]
async fn test_failed_write_keeps_previous_state() {
    let backend = Arc::new(FlakyStore::default());
    let service = CardService::open(backend.clone()).await;
    let card = service.create_card(CreateCardRequest::new("Q", "A")).await.unwrap();

    backend.set_failing(true);

    let created = service.create_card(CreateCardRequest::new("Q2", "A2")).await;
    assert!(matches!(created, Err(StudyError::Storage(_))));

    let graded = service.grade_card(card.id, 5).await;
    assert!(matches!(graded, Err(StudyError::Storage(_))));

    let edited = service
        .update_card(
            card.id,
            UpdateCardRequest {
                answer: Some("changed".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(edited, Err(StudyError::Storage(_))));

    let deleted = service.delete_card(card.id).await;
    assert!(matches!(deleted, Err(StudyError::Storage(_))));

    let cards = service.list_cards().await;
    assert_eq!(cards, vec![card.clone()]);

    backend.set_failing(false);
    let graded = service.grade_card(card.id, 5).await.unwrap();
    assert_eq!(graded.repetitions, 1);
}

#[tokio::test]
async fn test_unreadable_backend_opens_empty() {
    let service = CardService::open(Arc::new(BrokenLoad)).await;
    assert!(service.list_cards().await.is_empty());
    service.create_card(CreateCardRequest::new("Q", "A")).await.unwrap();
}

#[tokio::test]
async fn test_validation_errors() {
    let service = CardService::open(Arc::new(FlakyStore::default())).await;

    let result = service.create_card(CreateCardRequest::new("   ", "A")).await;
    assert!(matches!(result, Err(StudyError::Validation(_))));

    let result = service.create_card(CreateCardRequest::new("Q", "")).await;
    assert!(matches!(result, Err(StudyError::Validation(_))));

    let result = service
        .import_pairs(None, None, vec![GeneratedPair::new("Q", "A"), GeneratedPair::new("", "A")])
        .await;
    assert!(matches!(result, Err(StudyError::Validation(_))));

    assert!(service.list_cards().await.is_empty());
}

#[tokio::test]
async fn test_not_found_errors() {
    let service = CardService::open(Arc::new(FlakyStore::default())).await;
    let missing = uuid::Uuid::new_v4();

    assert!(service.get_card(missing).await.unwrap_err().is_not_found());
    assert!(service.delete_card(missing).await.unwrap_err().is_not_found());
    assert!(service
        .update_card(missing, UpdateCardRequest::default())
        .await
        .unwrap_err()
        .is_not_found());

    // Cascades over unknown labels simply remove nothing
    assert_eq!(service.delete_theme("Nope", "Nothing").await.unwrap(), 0);
    assert_eq!(service.delete_subject("Nope").await.unwrap(), 0);
}

struct FixedGenerator(Vec<GeneratedPair>);

#[async_trait]
impl CardGenerator for FixedGenerator {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _source_text: &str, _context: &GenerationContext) -> memo_deck::Result<Vec<GeneratedPair>> {
        Ok(self.0.clone())
    }
}

struct OfflineGenerator;

#[async_trait]
impl CardGenerator for OfflineGenerator {
    fn name(&self) -> &str {
        "offline"
    }

    async fn generate(&self, _source_text: &str, _context: &GenerationContext) -> memo_deck::Result<Vec<GeneratedPair>> {
        Err(StudyError::Storage("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_generate_cards_imports_pairs() {
    let service = CardService::open(Arc::new(FlakyStore::default())).await;
    let generator = FixedGenerator(vec![
        GeneratedPair::new("What is a noun?", "A naming word"),
        GeneratedPair::new("What is a verb?", "An action word"),
        GeneratedPair::new("What is a noun?", "A naming word"),
    ]);

    let report = service
        .generate_cards(&generator, "Nouns name things. Verbs describe actions.", GenerationContext::new("English", "Grammar"))
        .await
        .unwrap();

    assert_eq!(report.created.len(), 2);
    assert_eq!(report.duplicates_skipped, 1);
    assert!(report.created.iter().all(|c| c.belongs_to("English", "Grammar")));
}

#[tokio::test]
async fn test_generate_cards_errors() {
    let service = CardService::open(Arc::new(FlakyStore::default())).await;

    let result = service
        .generate_cards(&FixedGenerator(Vec::new()), "  ", GenerationContext::default())
        .await;
    assert!(matches!(result, Err(StudyError::Validation(_))));

    let result = service
        .generate_cards(&OfflineGenerator, "Some text", GenerationContext::default())
        .await;
    assert!(matches!(result, Err(StudyError::Generation(_))));

    assert!(service.list_cards().await.is_empty());
}
