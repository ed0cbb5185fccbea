//! Walk over a review queue one card at a time.
//!
//! ```text
//! Idle -> Presenting(i) -> AnswerRevealed(i) -> Presenting(i + 1) -> ... -> Complete
//! ```
//!
//! A grade is only accepted once the answer is revealed. Failed grading leaves the
//! session on the revealed card. Abandoning a session records nothing for the card
//! on screen; cards graded before that stay persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::card_service::CardService;
use crate::errors::{ErrorContext, Result, ResultExt, StudyError};
use crate::log_session_event;
use crate::models::{Card, Grade};
use crate::scheduler::ReviewLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "index", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Presenting(usize),
    AnswerRevealed(usize),
    Complete,
}

/// What a UI needs to show for the current card. `answer` is only present once revealed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub card_id: Uuid,
    pub subject: String,
    pub theme: String,
    pub question: String,
    pub answer: Option<String>,
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub card: Card,
    pub log: ReviewLog,
    pub phase: SessionPhase,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub total: usize,
    pub graded: usize,
    pub skipped: usize,
    pub remaining: usize,
    pub completed: bool,
}

impl SessionSummary {
    pub fn processed(&self) -> usize {
        self.graded + self.skipped
    }
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    id: Uuid,
    queue: Vec<Card>,
    phase: SessionPhase,
    graded: usize,
    skipped: usize,
    started_at: DateTime<Utc>,
}

impl ReviewSession {
    /// An empty queue produces a session that is already complete.
    pub fn new(queue: Vec<Card>) -> Self {
        let id = Uuid::new_v4();
        let phase = if queue.is_empty() {
            SessionPhase::Complete
        } else {
            SessionPhase::Idle
        };
        log_session_event!(started, session_id = id, queue_len = queue.len());

        Self {
            id,
            queue,
            phase,
            graded: 0,
            skipped: 0,
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Complete
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Cards in queue order, with graded cards reflecting their new schedule.
    pub fn queue(&self) -> &[Card] {
        &self.queue
    }

    fn index(&self) -> Option<usize> {
        match self.phase {
            SessionPhase::Idle => Some(0),
            SessionPhase::Presenting(i) | SessionPhase::AnswerRevealed(i) => Some(i),
            SessionPhase::Complete => None,
        }
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.index().and_then(|i| self.queue.get(i))
    }

    pub fn current_view(&self) -> Option<CardView> {
        let index = self.index()?;
        let card = self.queue.get(index)?;
        let revealed = matches!(self.phase, SessionPhase::AnswerRevealed(_));

        Some(CardView {
            card_id: card.id,
            subject: card.subject.clone(),
            theme: card.theme.clone(),
            question: card.question.clone(),
            answer: revealed.then(|| card.answer.clone()),
            position: index + 1,
            total: self.queue.len(),
        })
    }

    pub fn reveal(&mut self) -> Result<&Card> {
        let index = match self.phase {
            SessionPhase::Idle => 0,
            SessionPhase::Presenting(i) => i,
            SessionPhase::AnswerRevealed(_) => {
                return Err(self.invalid("reveal", "answer is already revealed"));
            }
            SessionPhase::Complete => {
                return Err(self.invalid("reveal", "session is complete"));
            }
        };

        self.phase = SessionPhase::AnswerRevealed(index);
        Ok(&self.queue[index])
    }

    /// Grade the revealed card, persist its new schedule and move on.
    ///
    /// On any error the session stays on the revealed card.
    pub async fn grade(&mut self, service: &CardService, quality: i32) -> Result<GradeOutcome> {
        let index = match self.phase {
            SessionPhase::AnswerRevealed(i) => i,
            SessionPhase::Idle | SessionPhase::Presenting(_) => {
                return Err(self.invalid("grade", "answer must be revealed before grading"));
            }
            SessionPhase::Complete => {
                return Err(self.invalid("grade", "session is complete"));
            }
        };

        let card_id = self.queue[index].id;
        let grade = Grade::from_quality(quality)
            .log_err(|| ErrorContext::new("session_grade", "card").with_id(card_id))?;
        let (card, log) = service.review_card(card_id, grade).await?;

        log_session_event!(
            graded,
            session_id = self.id,
            card_id = card_id,
            grade = grade,
            interval_days = card.interval_days
        );

        self.queue[index] = card.clone();
        self.graded += 1;
        self.advance(index);

        Ok(GradeOutcome {
            card,
            log,
            phase: self.phase,
        })
    }

    /// Move past the current card without recording a grade.
    pub fn skip(&mut self) -> Result<SessionPhase> {
        let index = match self.index() {
            Some(i) => i,
            None => return Err(self.invalid("skip", "session is complete")),
        };

        log_session_event!(skipped, session_id = self.id, card_id = self.queue[index].id);
        self.skipped += 1;
        self.advance(index);
        Ok(self.phase)
    }

    /// Stop the session early. Nothing is recorded for the card on screen.
    pub fn abandon(self) -> SessionSummary {
        let summary = self.summary();
        if !summary.completed {
            log_session_event!(finished, session_id = self.id, processed = summary.processed(), "abandoned");
        }
        summary
    }

    pub fn summary(&self) -> SessionSummary {
        let processed = self.graded + self.skipped;
        SessionSummary {
            session_id: self.id,
            total: self.queue.len(),
            graded: self.graded,
            skipped: self.skipped,
            remaining: self.queue.len() - processed,
            completed: self.is_complete(),
        }
    }

    fn advance(&mut self, index: usize) {
        let next = index + 1;
        if next < self.queue.len() {
            self.phase = SessionPhase::Presenting(next);
        } else {
            self.phase = SessionPhase::Complete;
            log_session_event!(
                finished,
                session_id = self.id,
                processed = self.graded + self.skipped,
                "completed"
            );
        }
    }

    fn invalid(&self, operation: &str, reason: &str) -> StudyError {
        StudyError::InvalidState(format!("cannot {} in phase {:?}: {}", operation, self.phase, reason))
            .log_with_context(ErrorContext::new(operation, "review_session").with_id(self.id))
    }
}
