//! Flashcard domain types.

use cardcrafter_types::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Subject category of a flashcard.
///
/// Closed set: serialised as exactly `"Math"`, `"Science"` or `"History"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Math,
    Science,
    History,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Math, Category::Science, Category::History];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Math => "Math",
            Category::Science => "Science",
            Category::History => "History",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}' (expected Math, Science or History)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    /// Parses a category name, ignoring surrounding whitespace and ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

/// A question/answer/category triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: NonEmptyText,
    pub answer: NonEmptyText,
    pub category: Category,
}

impl Flashcard {
    pub fn new(question: NonEmptyText, answer: NonEmptyText, category: Category) -> Self {
        Self {
            question,
            answer,
            category,
        }
    }
}

/// Ordered flashcards produced by one generation, in the order the model returned them.
///
/// Serialises as a plain JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlashcardSet(Vec<Flashcard>);

impl FlashcardSet {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        Self(cards)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Flashcard> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Flashcard] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Flashcard> {
        self.0
    }
}

impl IntoIterator for FlashcardSet {
    type Item = Flashcard;
    type IntoIter = std::vec::IntoIter<Flashcard>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FlashcardSet {
    type Item = &'a Flashcard;
    type IntoIter = std::slice::Iter<'a, Flashcard>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(q: &str, a: &str, c: Category) -> Flashcard {
        Flashcard::new(NonEmptyText::new(q).unwrap(), NonEmptyText::new(a).unwrap(), c)
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!("Math".parse::<Category>(), Ok(Category::Math));
        assert_eq!(" science ".parse::<Category>(), Ok(Category::Science));
        assert_eq!("HISTORY".parse::<Category>(), Ok(Category::History));
    }

    #[test]
    fn test_category_parse_rejects_unknown() {
        let err = "Geography".parse::<Category>().unwrap_err();
        assert_eq!(err, UnknownCategory("Geography".into()));
        assert!("".parse::<Category>().is_err());
    }

    #[test]
    fn test_category_serde_is_strict() {
        assert_eq!(serde_json::to_string(&Category::Science).unwrap(), "\"Science\"");
        assert!(serde_json::from_str::<Category>("\"science\"").is_err());
    }

    #[test]
    fn test_flashcard_set_serializes_as_array() {
        let set = FlashcardSet::new(vec![card("Q1", "A1", Category::Math)]);
        let json = serde_json::to_value(&set).unwrap();

        assert_eq!(
            json,
            serde_json::json!([{"question": "Q1", "answer": "A1", "category": "Math"}])
        );
    }

    #[test]
    fn test_flashcard_set_round_trip() {
        let set = FlashcardSet::new(vec![
            card("What is 7 x 8?", "56", Category::Math),
            card("When did WW2 end?", "1945", Category::History),
        ]);

        let json = serde_json::to_string(&set).unwrap();
        let back: FlashcardSet = serde_json::from_str(&json).unwrap();

        assert_eq!(back, set);
    }
}
