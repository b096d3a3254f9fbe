//! Question and alternative records
//!
//! `details.json` files are parsed into [`QuestionRecord`] and then validated
//! into [`Question`]. Only validated questions ever reach the store, so the
//! rest of the service can rely on the invariants checked here.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// Letters an alternative may carry
pub const ALTERNATIVE_LETTERS: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

/// Reasons a raw record is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("question has no alternatives")]
    NoAlternatives,

    #[error("invalid alternative letter {0:?}")]
    InvalidLetter(String),

    #[error("duplicate alternative letter {0}")]
    DuplicateLetter(char),

    #[error("alternative {0} has neither text nor file")]
    EmptyAlternative(char),

    #[error("invalid correctAlternative {0:?}")]
    InvalidCorrectLetter(String),

    #[error("expected exactly one correct alternative, found {0}")]
    CorrectCount(usize),

    #[error("correctAlternative is {declared} but alternative {flagged} is flagged correct")]
    CorrectMismatch { declared: char, flagged: char },
}

/// Language tag of a question
///
/// Records with no tag are Portuguese.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    Portuguese,
    English,
    Spanish,
    Other(String),
}

impl Language {
    /// Parse a raw language tag (case-insensitive)
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag.map(str::trim).filter(|t| !t.is_empty()) else {
            return Language::Portuguese;
        };
        match tag.to_lowercase().as_str() {
            "portugues" => Language::Portuguese,
            "ingles" => Language::English,
            "espanhol" => Language::Spanish,
            other => Language::Other(other.to_string()),
        }
    }

    /// Lowercase token for this language
    pub fn token(&self) -> &str {
        match self {
            Language::Portuguese => "portugues",
            Language::English => "ingles",
            Language::Spanish => "espanhol",
            Language::Other(tag) => tag,
        }
    }

    pub fn is_foreign(&self) -> bool {
        !matches!(self, Language::Portuguese)
    }
}

/// Raw alternative as stored on disk
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativeRecord {
    #[serde(default)]
    pub letter: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
}

/// Raw question as stored in `details.json`
///
/// Older vintages omit `area` and `discipline`, and several fields may be
/// `null`, so every optional field is tolerated here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub index: u32,
    pub year: u16,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub discipline: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<String>>,
    #[serde(default)]
    pub correct_alternative: String,
    #[serde(default)]
    pub alternatives_introduction: Option<String>,
    #[serde(default)]
    pub alternatives: Vec<AlternativeRecord>,
    #[serde(default)]
    pub dir_name: Option<String>,
}

/// One answer option of a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub letter: char,
    pub text: Option<String>,
    pub file: Option<String>,
    pub is_correct: bool,
}

/// A validated question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "QuestionRecord")]
pub struct Question {
    pub title: String,
    pub index: u32,
    pub year: u16,
    #[serde(serialize_with = "serialize_language")]
    pub language: Language,
    pub area: String,
    pub discipline: String,
    pub context: String,
    pub files: Vec<String>,
    pub correct_alternative: char,
    pub alternatives_introduction: String,
    pub alternatives: Vec<Alternative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir_name: Option<String>,
}

fn serialize_language<S: Serializer>(language: &Language, serializer: S) -> Result<S::Ok, S::Error> {
    match language {
        Language::Portuguese => serializer.serialize_none(),
        other => serializer.serialize_some(other.token()),
    }
}

impl Question {
    /// Stable identifier, `"{year}-{dirName}"` or `"{year}-{index}"`
    pub fn id(&self) -> String {
        match &self.dir_name {
            Some(dir) => format!("{}-{}", self.year, dir),
            None => format!("{}-{}", self.year, self.index),
        }
    }

    pub fn alternative(&self, letter: char) -> Option<&Alternative> {
        let letter = letter.to_ascii_uppercase();
        self.alternatives.iter().find(|a| a.letter == letter)
    }

    /// The alternative flagged correct (always present after validation)
    pub fn correct(&self) -> Option<&Alternative> {
        self.alternatives.iter().find(|a| a.is_correct)
    }
}

fn parse_letter(raw: &str) -> Option<char> {
    let mut chars = raw.trim().chars();
    let letter = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() || !ALTERNATIVE_LETTERS.contains(&letter) {
        return None;
    }
    Some(letter)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<QuestionRecord> for Question {
    type Error = ValidationError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        if record.alternatives.is_empty() {
            return Err(ValidationError::NoAlternatives);
        }

        let mut alternatives = Vec::with_capacity(record.alternatives.len());
        for raw in record.alternatives {
            let letter = parse_letter(&raw.letter)
                .ok_or_else(|| ValidationError::InvalidLetter(raw.letter.clone()))?;
            if alternatives.iter().any(|a: &Alternative| a.letter == letter) {
                return Err(ValidationError::DuplicateLetter(letter));
            }
            let text = non_blank(raw.text);
            let file = non_blank(raw.file);
            if text.is_none() && file.is_none() {
                return Err(ValidationError::EmptyAlternative(letter));
            }
            alternatives.push(Alternative {
                letter,
                text,
                file,
                is_correct: raw.is_correct,
            });
        }

        let declared = parse_letter(&record.correct_alternative).ok_or_else(|| {
            ValidationError::InvalidCorrectLetter(record.correct_alternative.clone())
        })?;

        let flagged: Vec<char> = alternatives
            .iter()
            .filter(|a| a.is_correct)
            .map(|a| a.letter)
            .collect();
        match flagged.as_slice() {
            [letter] if *letter == declared => {}
            [letter] => {
                return Err(ValidationError::CorrectMismatch {
                    declared,
                    flagged: *letter,
                })
            }
            other => return Err(ValidationError::CorrectCount(other.len())),
        }

        Ok(Question {
            title: record.title.unwrap_or_default(),
            index: record.index,
            year: record.year,
            language: Language::from_tag(record.language.as_deref()),
            area: record.area.unwrap_or_default().trim().to_lowercase(),
            discipline: record.discipline.unwrap_or_default().trim().to_lowercase(),
            context: record.context.unwrap_or_default(),
            files: record.files.unwrap_or_default(),
            correct_alternative: declared,
            alternatives_introduction: record.alternatives_introduction.unwrap_or_default(),
            alternatives,
            dir_name: non_blank(record.dir_name),
        })
    }
}
