//! Read-only subject → theme → cards grouping used for browsing.
//!
//! Groups keep the order in which their first card appears in the input; cards keep
//! their input order. Nothing is sorted and nothing is cached.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::Card;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Catalog {
    pub subjects: Vec<SubjectGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectGroup {
    pub subject: String,
    pub themes: Vec<ThemeGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeGroup {
    pub theme: String,
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogCounts {
    pub total: usize,
    pub subjects: Vec<SubjectCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectCount {
    pub subject: String,
    pub total: usize,
    pub themes: Vec<ThemeCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeCount {
    pub theme: String,
    pub total: usize,
}

pub fn group_by_subject_then_theme(cards: &[Card]) -> Catalog {
    let mut subjects: Vec<SubjectGroup> = Vec::new();
    let mut subject_index: HashMap<&str, usize> = HashMap::new();
    let mut theme_index: HashMap<(&str, &str), usize> = HashMap::new();

    for card in cards {
        let s = *subject_index.entry(card.subject.as_str()).or_insert_with(|| {
            subjects.push(SubjectGroup {
                subject: card.subject.clone(),
                themes: Vec::new(),
            });
            subjects.len() - 1
        });

        let themes = &mut subjects[s].themes;
        let t = *theme_index
            .entry((card.subject.as_str(), card.theme.as_str()))
            .or_insert_with(|| {
                themes.push(ThemeGroup {
                    theme: card.theme.clone(),
                    cards: Vec::new(),
                });
                themes.len() - 1
            });

        themes[t].cards.push(card.clone());
    }

    Catalog { subjects }
}

impl Catalog {
    pub fn counts(&self) -> CatalogCounts {
        let subjects: Vec<SubjectCount> = self
            .subjects
            .iter()
            .map(|group| {
                let themes: Vec<ThemeCount> = group
                    .themes
                    .iter()
                    .map(|theme| ThemeCount {
                        theme: theme.theme.clone(),
                        total: theme.cards.len(),
                    })
                    .collect();
                SubjectCount {
                    subject: group.subject.clone(),
                    total: themes.iter().map(|t| t.total).sum(),
                    themes,
                }
            })
            .collect();

        CatalogCounts {
            total: subjects.iter().map(|s| s.total).sum(),
            subjects,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn subject(&self, subject: &str) -> Option<&SubjectGroup> {
        self.subjects.iter().find(|g| g.subject == subject)
    }

    pub fn theme(&self, subject: &str, theme: &str) -> Option<&ThemeGroup> {
        self.subject(subject)?.themes.iter().find(|t| t.theme == theme)
    }

    pub fn subject_names(&self) -> Vec<&str> {
        self.subjects.iter().map(|g| g.subject.as_str()).collect()
    }

    pub fn theme_names(&self, subject: &str) -> Vec<&str> {
        self.subject(subject)
            .map(|g| g.themes.iter().map(|t| t.theme.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn total_cards(&self) -> usize {
        self.subjects
            .iter()
            .flat_map(|g| g.themes.iter())
            .map(|t| t.cards.len())
            .sum()
    }
}

impl SubjectGroup {
    pub fn card_count(&self) -> usize {
        self.themes.iter().map(|t| t.cards.len()).sum()
    }
}

impl CatalogCounts {
    pub fn subject_total(&self, subject: &str) -> usize {
        self.subjects
            .iter()
            .find(|s| s.subject == subject)
            .map_or(0, |s| s.total)
    }

    pub fn theme_total(&self, subject: &str, theme: &str) -> usize {
        self.subjects
            .iter()
            .find(|s| s.subject == subject)
            .and_then(|s| s.themes.iter().find(|t| t.theme == theme))
            .map_or(0, |t| t.total)
    }
}
