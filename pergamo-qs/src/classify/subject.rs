//! Subject tokens
//!
//! A subject token is a user-supplied string such as `historia` or
//! `ciencias-humanas`. Tokens are normalized and parsed once into a
//! [`Subject`] so the matching rules can be dispatched by variant.

use std::fmt;

use crate::models::Language;

/// Knowledge areas of the exam
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    CienciasHumanas,
    CienciasNatureza,
    Linguagens,
    Matematica,
}

impl Area {
    pub const ALL: [Area; 4] = [
        Area::CienciasHumanas,
        Area::CienciasNatureza,
        Area::Linguagens,
        Area::Matematica,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Area::CienciasHumanas => "ciencias-humanas",
            Area::CienciasNatureza => "ciencias-natureza",
            Area::Linguagens => "linguagens",
            Area::Matematica => "matematica",
        }
    }

    pub fn from_token(token: &str) -> Option<Area> {
        Area::ALL.into_iter().find(|area| area.token() == token)
    }

    /// Narrow disciplines that make up this area
    pub fn disciplines(self) -> &'static [&'static str] {
        match self {
            Area::CienciasHumanas => HUMANAS,
            Area::CienciasNatureza => NATUREZA,
            Area::Linguagens => &["portugues", "literatura", "artes", "ingles", "espanhol"],
            Area::Matematica => &["matematica"],
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

const HUMANAS: &[&str] = &["historia", "geografia", "filosofia", "sociologia"];
const NATUREZA: &[&str] = &["biologia", "quimica", "fisica"];

/// Parsed subject token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Area(Area),
    /// `ingles` or `espanhol`
    ForeignLanguage(Language),
    Literature,
    Portuguese,
    /// Humanities or science discipline that older data files only tag
    /// with its parent area
    Narrow {
        discipline: &'static str,
        area: Area,
    },
    /// Any other token, matched against the discipline field exactly
    Discipline(String),
}

/// Trim and lowercase a raw token
pub fn normalize_token(token: &str) -> String {
    token.trim().to_lowercase()
}

impl Subject {
    pub fn parse(token: &str) -> Subject {
        let token = normalize_token(token);

        if let Some(area) = Area::from_token(&token) {
            return Subject::Area(area);
        }

        match token.as_str() {
            "ingles" => return Subject::ForeignLanguage(Language::English),
            "espanhol" => return Subject::ForeignLanguage(Language::Spanish),
            "literatura" => return Subject::Literature,
            "portugues" => return Subject::Portuguese,
            _ => {}
        }

        if let Some(discipline) = HUMANAS.iter().copied().find(|d| *d == token) {
            return Subject::Narrow {
                discipline,
                area: Area::CienciasHumanas,
            };
        }
        if let Some(discipline) = NATUREZA.iter().copied().find(|d| *d == token) {
            return Subject::Narrow {
                discipline,
                area: Area::CienciasNatureza,
            };
        }

        Subject::Discipline(token)
    }

    /// Normalized token, also used as the cache key
    pub fn token(&self) -> &str {
        match self {
            Subject::Area(area) => area.token(),
            Subject::ForeignLanguage(language) => language.token(),
            Subject::Literature => "literatura",
            Subject::Portuguese => "portugues",
            Subject::Narrow { discipline, .. } => discipline,
            Subject::Discipline(token) => token,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
