//! Review queue selection: filter the card set, then shuffle.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{Card, Confidence};

/// Anything that can decide whether a card belongs in a review queue.
pub trait CardPredicate {
    fn matches(&self, card: &Card, now: DateTime<Utc>) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewFilter {
    All,
    /// Never scheduled, or scheduled at or before now.
    Due,
    /// Last recorded grade was Hard.
    LowConfidence,
    Custom(CustomFilter),
}

/// Conjunction of optional constraints. An empty set places no constraint on its axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFilter {
    #[serde(default)]
    pub subjects: HashSet<String>,
    #[serde(default)]
    pub themes: HashSet<String>,
    #[serde(default)]
    pub confidence: ConfidenceFilter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceFilter {
    #[default]
    Any,
    Level(Confidence),
}

impl CustomFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects.extend(subjects.into_iter().map(Into::into));
        self
    }

    pub fn themes<I, S>(mut self, themes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.themes.extend(themes.into_iter().map(Into::into));
        self
    }

    pub fn confidence(mut self, level: Confidence) -> Self {
        self.confidence = ConfidenceFilter::Level(level);
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.subjects.is_empty() && self.themes.is_empty() && self.confidence == ConfidenceFilter::Any
    }
}

impl CardPredicate for CustomFilter {
    fn matches(&self, card: &Card, _now: DateTime<Utc>) -> bool {
        let subject_ok = self.subjects.is_empty() || self.subjects.contains(&card.subject);
        let theme_ok = self.themes.is_empty() || self.themes.contains(&card.theme);
        let confidence_ok = match self.confidence {
            ConfidenceFilter::Any => true,
            ConfidenceFilter::Level(level) => card.confidence() == level,
        };
        subject_ok && theme_ok && confidence_ok
    }
}

impl CardPredicate for ReviewFilter {
    fn matches(&self, card: &Card, now: DateTime<Utc>) -> bool {
        match self {
            ReviewFilter::All => true,
            ReviewFilter::Due => card.is_due(now),
            ReviewFilter::LowConfidence => card.confidence() == Confidence::Low,
            ReviewFilter::Custom(custom) => custom.matches(card, now),
        }
    }
}

/// Select the cards matching `filter` and return them in a uniformly random order.
///
/// `limit` truncates the queue after shuffling. An empty result is a valid queue.
pub fn select_review_queue<P, R>(
    cards: &[Card],
    filter: &P,
    now: DateTime<Utc>,
    limit: Option<usize>,
    rng: &mut R,
) -> Vec<Card>
where
    P: CardPredicate + ?Sized,
    R: Rng + ?Sized,
{
    let mut queue: Vec<Card> = cards
        .iter()
        .filter(|card| filter.matches(card, now))
        .cloned()
        .collect();

    queue.shuffle(rng);
    if let Some(limit) = limit {
        queue.truncate(limit);
    }
    queue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, NewCard};
    use chrono::Duration;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn card(subject: &str, theme: &str, question: &str, now: DateTime<Utc>) -> Card {
        Card::new(
            NewCard::validate(question, "answer", Some(subject), Some(theme)).unwrap(),
            now,
        )
    }

    fn sample_cards(now: DateTime<Utc>) -> Vec<Card> {
        let mut cards = vec![
            card("Math", "Algebra", "m1", now),
            card("Math", "Geometry", "m2", now),
            card("Biology", "Cells", "b1", now),
            card("Biology", "Genetics", "b2", now),
            card("Chemistry", "Acids", "c1", now),
        ];
        cards[1].last_grade = Some(Grade::Hard);
        cards[1].last_reviewed_at = Some(now);
        cards[2].last_grade = Some(Grade::Easy);
        cards[2].repetitions = 1;
        cards[2].last_reviewed_at = Some(now);
        cards[2].next_review_at = Some(now + Duration::days(1));
        cards[3].next_review_at = None;
        cards
    }

    fn questions(queue: &[Card]) -> HashSet<String> {
        queue.iter().map(|c| c.question.clone()).collect()
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_all_returns_everything() {
        let now = Utc::now();
        let cards = sample_cards(now);
        let mut rng = StdRng::seed_from_u64(7);

        let queue = select_review_queue(&cards, &ReviewFilter::All, now, None, &mut rng);
        assert_eq!(queue.len(), cards.len());
        assert_eq!(questions(&queue), questions(&cards));
    }

    #[test]
    fn test_due_includes_boundary_and_unscheduled() {
        let now = Utc::now();
        let cards = sample_cards(now);
        let mut rng = StdRng::seed_from_u64(7);

        let queue = select_review_queue(&cards, &ReviewFilter::Due, now, None, &mut rng);
        // b1 is scheduled for tomorrow; m1/m2/c1 are due exactly now; b2 was never scheduled
        assert_eq!(questions(&queue), set(&["m1", "m2", "b2", "c1"]));
    }

    #[test]
    fn test_low_confidence() {
        let now = Utc::now();
        let cards = sample_cards(now);
        let mut rng = StdRng::seed_from_u64(7);

        let queue = select_review_queue(&cards, &ReviewFilter::LowConfidence, now, None, &mut rng);
        assert_eq!(questions(&queue), set(&["m2"]));
    }

    #[test]
    fn test_custom_subject_only() {
        let now = Utc::now();
        let cards = sample_cards(now);
        let mut rng = StdRng::seed_from_u64(7);

        let filter = ReviewFilter::Custom(CustomFilter::new().subjects(["Math"]));
        let queue = select_review_queue(&cards, &filter, now, None, &mut rng);

        assert_eq!(queue.len(), 2);
        assert_eq!(questions(&queue), set(&["m1", "m2"]));
    }

    #[test]
    fn test_custom_axes_are_conjunctive() {
        let now = Utc::now();
        let cards = sample_cards(now);
        let mut rng = StdRng::seed_from_u64(7);

        let filter = CustomFilter::new()
            .subjects(["Math", "Biology"])
            .themes(["Geometry", "Cells"])
            .confidence(Confidence::High);
        let queue = select_review_queue(&cards, &filter, now, None, &mut rng);
        assert_eq!(questions(&queue), set(&["b1"]));

        let unrated = CustomFilter::new().confidence(Confidence::Unrated);
        let queue = select_review_queue(&cards, &unrated, now, None, &mut rng);
        assert_eq!(questions(&queue), set(&["m1", "b2", "c1"]));
    }

    #[test]
    fn test_unconstrained_custom_matches_all() {
        let now = Utc::now();
        let cards = sample_cards(now);
        let mut rng = StdRng::seed_from_u64(7);

        let filter = CustomFilter::new();
        assert!(filter.is_unconstrained());
        let queue = select_review_queue(&cards, &ReviewFilter::Custom(filter), now, None, &mut rng);
        assert_eq!(queue.len(), cards.len());
    }

    #[test]
    fn test_empty_candidates_yield_empty_queue() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(7);

        let queue = select_review_queue(&[], &ReviewFilter::Due, now, None, &mut rng);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_limit_truncates_after_shuffle() {
        let now = Utc::now();
        let cards = sample_cards(now);
        let mut rng = StdRng::seed_from_u64(7);

        let queue = select_review_queue(&cards, &ReviewFilter::All, now, Some(2), &mut rng);
        assert_eq!(queue.len(), 2);
        assert!(questions(&queue).is_subset(&questions(&cards)));
    }

    #[test]
    fn test_shuffle_varies_order() {
        let now = Utc::now();
        let cards: Vec<Card> = (0..20).map(|i| card("Math", "Drill", &format!("q{}", i), now)).collect();
        let original: Vec<String> = cards.iter().map(|c| c.question.clone()).collect();
        let mut rng = StdRng::seed_from_u64(42);

        let reordered = (0..5).any(|_| {
            let queue = select_review_queue(&cards, &ReviewFilter::All, now, None, &mut rng);
            queue.iter().map(|c| c.question.clone()).collect::<Vec<_>>() != original
        });
        assert!(reordered);
    }

    #[test]
    fn test_filter_deserializes_from_tagged_json() {
        let filter: ReviewFilter = serde_json::from_str(r#"{"kind":"due"}"#).unwrap();
        assert_eq!(filter, ReviewFilter::Due);

        let filter: ReviewFilter =
            serde_json::from_str(r#"{"kind":"custom","subjects":["Math"],"confidence":"any"}"#).unwrap();
        assert_eq!(filter, ReviewFilter::Custom(CustomFilter::new().subjects(["Math"])));
    }
}
