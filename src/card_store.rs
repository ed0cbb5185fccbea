//! Authoritative card collection.
//!
//! The whole card set lives in memory in insertion order and is written to a
//! [`SnapshotStore`] after every mutation. Each mutation runs on a copy of the set;
//! the copy only becomes current once the snapshot write succeeded, so a failed write
//! leaves the previous state in place. The lock is held across the write, which keeps
//! at most one mutation in flight per store.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::database::SnapshotStore;
use crate::errors::{Result, StudyError};
use crate::models::{
    content_key, label_or_default, required_text, Card, ContentKey, CreateCardRequest, GeneratedPair,
    ImportReport, NewCard, UpdateCardRequest, DEFAULT_SUBJECT, DEFAULT_THEME, INITIAL_INTERVAL_DAYS,
    MIN_EASE_FACTOR,
};
use crate::{log_db_operation, log_system_event};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    cards: Vec<Card>,
}

/// Serialize a card set into the persisted snapshot document.
pub fn serialize_cards(cards: &[Card]) -> Result<String> {
    #[derive(Serialize)]
    struct SnapshotRef<'a> {
        version: u32,
        cards: &'a [Card],
    }

    Ok(serde_json::to_string(&SnapshotRef {
        version: SNAPSHOT_VERSION,
        cards,
    })?)
}

/// Parse a persisted snapshot document.
pub fn deserialize_cards(payload: &str) -> Result<Vec<Card>> {
    let snapshot: Snapshot = serde_json::from_str(payload)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(StudyError::Storage(format!(
            "snapshot version {} is newer than supported version {}",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    Ok(snapshot.cards)
}

pub struct CardStore {
    backend: Arc<dyn SnapshotStore>,
    cards: Mutex<Vec<Card>>,
}

impl CardStore {
    /// Load the card set from `backend`.
    ///
    /// Never fails: a missing, unreadable or corrupt snapshot yields an empty store.
    pub async fn open(backend: Arc<dyn SnapshotStore>) -> Self {
        let cards = match backend.load().await {
            Ok(Some(payload)) => match deserialize_cards(&payload) {
                Ok(cards) => normalize_loaded(cards),
                Err(e) => {
                    log_db_operation!(warn, "load_snapshot", format!("discarding corrupt snapshot: {}", e));
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log_db_operation!(error, "load_snapshot", error = e);
                Vec::new()
            }
        };

        log_system_event!(
            startup,
            component = "card_store",
            format!("opened with {} cards", cards.len())
        );

        Self {
            backend,
            cards: Mutex::new(cards),
        }
    }

    pub async fn create(&self, request: CreateCardRequest) -> Result<Card> {
        let new_card = NewCard::validate(
            &request.question,
            &request.answer,
            request.subject.as_deref(),
            request.theme.as_deref(),
        )?;
        let card = Card::new(new_card, Utc::now());

        let created = card.clone();
        self.mutate(move |cards| {
            cards.push(card);
            Ok(())
        })
        .await?;
        Ok(created)
    }

    /// Create one card per pair inside a single write.
    ///
    /// Every pair is validated before anything is stored. Pairs repeating an earlier
    /// pair of the batch, or a card already filed under the same subject and theme,
    /// are skipped.
    pub async fn import(
        &self,
        subject: Option<&str>,
        theme: Option<&str>,
        pairs: Vec<GeneratedPair>,
    ) -> Result<ImportReport> {
        let validated = pairs
            .iter()
            .map(|pair| NewCard::validate(&pair.question, &pair.answer, subject, theme))
            .collect::<Result<Vec<_>>>()?;

        let now = Utc::now();
        self.mutate(move |cards| {
            let mut report = ImportReport::default();
            let mut seen: HashSet<ContentKey> = HashSet::new();
            if let Some(first) = validated.first() {
                seen.extend(
                    cards
                        .iter()
                        .filter(|c| c.belongs_to(&first.subject, &first.theme))
                        .map(Card::content_key),
                );
            }

            for new_card in validated {
                if !seen.insert(content_key(&new_card.question, &new_card.answer)) {
                    report.duplicates_skipped += 1;
                    continue;
                }
                let card = Card::new(new_card, now);
                report.created.push(card.clone());
                cards.push(card);
            }
            Ok(report)
        })
        .await
    }

    pub async fn update(&self, id: Uuid, request: UpdateCardRequest) -> Result<Card> {
        self.mutate(move |cards| {
            let card = cards
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| StudyError::card_not_found(id))?;

            if let Some(question) = request.question.as_deref() {
                card.question = required_text("question", question)?;
            }
            if let Some(answer) = request.answer.as_deref() {
                card.answer = required_text("answer", answer)?;
            }
            if let Some(subject) = request.subject.as_deref() {
                card.subject = label_or_default(Some(subject), DEFAULT_SUBJECT);
            }
            if let Some(theme) = request.theme.as_deref() {
                card.theme = label_or_default(Some(theme), DEFAULT_THEME);
            }
            Ok(card.clone())
        })
        .await
    }

    /// Grade a stored card in place.
    ///
    /// `schedule` sees the card as currently stored and runs under the store lock, so
    /// concurrent reviews of one card apply one after the other. Only the scheduling
    /// fields of its result are kept.
    pub async fn review<T, F>(&self, id: Uuid, schedule: F) -> Result<(Card, T)>
    where
        F: FnOnce(&Card) -> Result<(Card, T)>,
    {
        self.mutate(move |cards| {
            let card = cards
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or_else(|| StudyError::card_not_found(id))?;

            let (reviewed, output) = schedule(card)?;
            card.ease_factor = reviewed.ease_factor;
            card.interval_days = reviewed.interval_days;
            card.repetitions = reviewed.repetitions;
            card.last_reviewed_at = reviewed.last_reviewed_at;
            card.next_review_at = reviewed.next_review_at;
            card.last_grade = reviewed.last_grade;
            Ok((card.clone(), output))
        })
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.mutate(move |cards| {
            let position = cards
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(|| StudyError::card_not_found(id))?;
            cards.remove(position);
            Ok(())
        })
        .await
    }

    /// Remove every card filed under exactly this subject and theme.
    pub async fn delete_by_theme(&self, subject: &str, theme: &str) -> Result<usize> {
        self.remove_where(|c| c.belongs_to(subject, theme)).await
    }

    pub async fn delete_by_subject(&self, subject: &str) -> Result<usize> {
        self.remove_where(|c| c.subject == subject).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Card> {
        let cards = self.cards.lock().await;
        cards
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StudyError::card_not_found(id))
    }

    /// All cards in insertion order.
    pub async fn list_all(&self) -> Vec<Card> {
        self.cards.lock().await.clone()
    }

    /// Newest cards first.
    pub async fn recent(&self, limit: usize) -> Vec<Card> {
        let mut cards = self.list_all().await;
        // Reversed first so cards sharing a timestamp still come out newest first
        cards.reverse();
        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        cards.truncate(limit);
        cards
    }

    pub async fn len(&self) -> usize {
        self.cards.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cards.lock().await.is_empty()
    }

    async fn remove_where<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&Card) -> bool + Send,
    {
        let mut cards = self.cards.lock().await;
        let before = cards.len();
        let remaining: Vec<Card> = cards.iter().filter(|c| !predicate(c)).cloned().collect();
        let removed = before - remaining.len();
        if removed == 0 {
            return Ok(0);
        }

        self.persist(&remaining).await?;
        *cards = remaining;
        Ok(removed)
    }

    /// Apply `change` to a copy of the card set, persist the copy, then make it current.
    async fn mutate<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Card>) -> Result<T>,
    {
        let mut cards = self.cards.lock().await;
        let mut next = cards.clone();
        let output = change(&mut next)?;

        self.persist(&next).await?;
        *cards = next;
        Ok(output)
    }

    async fn persist(&self, cards: &[Card]) -> Result<()> {
        let payload = serialize_cards(cards)?;
        self.backend.save(&payload).await
    }
}

/// Bring loaded records back within the card invariants.
///
/// Ease below the floor and zero intervals are raised, blank labels get the
/// defaults, and records with blank question or answer or a repeated id are dropped.
fn normalize_loaded(cards: Vec<Card>) -> Vec<Card> {
    let loaded = cards.len();
    let mut repaired = 0usize;
    let mut seen_ids = HashSet::new();
    let mut kept = Vec::with_capacity(loaded);

    for mut card in cards {
        if !seen_ids.insert(card.id) {
            continue;
        }
        let (Ok(question), Ok(answer)) = (
            required_text("question", &card.question),
            required_text("answer", &card.answer),
        ) else {
            continue;
        };

        let before = card.clone();
        card.question = question;
        card.answer = answer;
        card.subject = label_or_default(Some(&card.subject), DEFAULT_SUBJECT);
        card.theme = label_or_default(Some(&card.theme), DEFAULT_THEME);
        if card.ease_factor.is_nan() || card.ease_factor < MIN_EASE_FACTOR {
            card.ease_factor = MIN_EASE_FACTOR;
        }
        card.interval_days = card.interval_days.max(INITIAL_INTERVAL_DAYS);
        if card != before {
            repaired += 1;
        }
        kept.push(card);
    }

    let dropped = loaded - kept.len();
    if repaired > 0 || dropped > 0 {
        log_db_operation!(
            warn,
            "load_snapshot",
            format!("repaired {} and dropped {} invalid card records", repaired, dropped)
        );
    }
    kept
}
