//! The school's subject taxonomy.
//!
//! Every [`Subject`] carries a display name, the two-letter code used by the
//! school system, a three-letter abbreviation and the spellings that show up
//! in free-text exam names. The order of [`Subject::ALL`] is the lookup
//! order: the first subject that matches wins.

use serde::{Deserialize, Serialize};

/// A school subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Biologie,
    Chemie,
    Deutsch,
    Englisch,
    Franzoesisch,
    Geographie,
    Geschichte,
    Informatik,
    Kunst,
    Latein,
    Ler,
    Mathematik,
    Musik,
    PolitischeBildung,
    Physik,
    Recht,
    ReligionEv,
    ReligionKa,
    Seminarkurs,
    Spanisch,
    Sport,
    Technik,
    Wat,
}

/// Static lookup record for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectInfo {
    /// Name shown in generated titles.
    pub display_name: &'static str,
    /// Two-letter code used by the school system.
    pub short_code: &'static str,
    /// Common three-letter abbreviation.
    pub abbreviation: &'static str,
    /// Additional spellings found in free text.
    pub extra_spellings: &'static [&'static str],
}

impl Subject {
    /// All subjects in lookup order.
    pub const ALL: [Subject; 23] = [
        Self::Biologie,
        Self::Chemie,
        Self::Deutsch,
        Self::Englisch,
        Self::Franzoesisch,
        Self::Geographie,
        Self::Geschichte,
        Self::Informatik,
        Self::Kunst,
        Self::Latein,
        Self::Ler,
        Self::Mathematik,
        Self::Musik,
        Self::PolitischeBildung,
        Self::Physik,
        Self::Recht,
        Self::ReligionEv,
        Self::ReligionKa,
        Self::Seminarkurs,
        Self::Spanisch,
        Self::Sport,
        Self::Technik,
        Self::Wat,
    ];

    /// Returns the lookup record of this subject.
    pub fn info(&self) -> SubjectInfo {
        let (display_name, short_code, abbreviation, extra_spellings): (_, _, _, &[&str]) =
            match self {
                Self::Biologie => ("Biologie", "BI", "Bio", &[]),
                Self::Chemie => ("Chemie", "CH", "Che", &[]),
                Self::Deutsch => ("Deutsch", "DE", "Deu", &[]),
                Self::Englisch => ("Englisch", "EN", "Eng", &[]),
                Self::Franzoesisch => ("Französisch", "FR", "Fra", &[]),
                Self::Geographie => ("Geographie", "EK", "Geo", &[]),
                Self::Geschichte => ("Geschichte", "GE", "Ges", &[]),
                Self::Informatik => ("Informatik", "IF", "Inf", &[]),
                Self::Kunst => ("Kunst", "KU", "Kun", &[]),
                Self::Latein => ("Latein", "LA", "Lat", &[]),
                Self::Ler => ("LER", "LE", "LER", &[]),
                Self::Mathematik => ("Mathematik", "MA", "Mat", &["Mathe"]),
                Self::Musik => ("Musik", "MU", "Mus", &[]),
                Self::PolitischeBildung => {
                    ("PB", "PB", "PB", &["Politische Bildung", "Polit. Bildung"])
                }
                Self::Physik => ("Physik", "PH", "Phy", &[]),
                Self::Recht => ("Recht", "RL", "Rec", &[]),
                Self::ReligionEv => ("ev. Religion", "RE", "evR", &[]),
                Self::ReligionKa => ("kat. Religion", "RK", "kaR", &[]),
                Self::Seminarkurs => ("Seminarkurs", "SK", "SK", &[]),
                Self::Spanisch => ("Spanisch", "SN", "Spa", &[]),
                Self::Sport => ("Sport", "SP", "Spo", &[]),
                Self::Technik => ("Technik", "TE", "Tec", &[]),
                Self::Wat => ("WAT", "LE", "WAT", &[]),
            };
        SubjectInfo {
            display_name,
            short_code,
            abbreviation,
            extra_spellings,
        }
    }

    /// Returns the name shown in generated titles.
    pub fn display_name(&self) -> &'static str {
        self.info().display_name
    }

    /// Returns the two-letter code used by the school system.
    pub fn short_code(&self) -> &'static str {
        self.info().short_code
    }

    /// Returns every spelling of this subject, longest forms first.
    pub fn variants(&self) -> Vec<&'static str> {
        let info = self.info();
        let mut variants = Vec::with_capacity(info.extra_spellings.len() + 3);
        // Politische Bildung is displayed by its code, so its long forms lead.
        if *self == Self::PolitischeBildung {
            variants.extend_from_slice(info.extra_spellings);
            variants.push(info.display_name);
        } else {
            variants.push(info.display_name);
            variants.extend_from_slice(info.extra_spellings);
        }
        variants.push(info.abbreviation);
        variants.push(info.short_code);
        variants.dedup();
        variants
    }

    /// Resolves a subject code from the school system (e.g. `"MA"`, `"DE-LK"`).
    ///
    /// The first two characters are compared against the short codes. For
    /// seminar courses the code carries the subject in characters three and
    /// four, so [`Subject::Seminarkurs`] compares those instead.
    pub fn from_code(code: &str) -> Option<Subject> {
        if code.is_empty() {
            return None;
        }
        let head = code.get(..2).unwrap_or(code);
        Self::ALL.into_iter().find(|subject| {
            let candidate = if *subject == Self::Seminarkurs && code.len() >= 4 {
                code.get(2..4).unwrap_or(head)
            } else {
                head
            };
            subject.short_code() == candidate
        })
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_short_codes() {
        assert_eq!(Subject::from_code("MA"), Some(Subject::Mathematik));
        assert_eq!(Subject::from_code("DE-LK1"), Some(Subject::Deutsch));
        assert_eq!(Subject::from_code("EK"), Some(Subject::Geographie));
        assert_eq!(Subject::from_code("ZZ"), None);
        assert_eq!(Subject::from_code(""), None);
    }

    #[test]
    fn shared_code_resolves_to_first_subject() {
        // LER and WAT share "LE"; LER comes first in lookup order.
        assert_eq!(Subject::from_code("LE"), Some(Subject::Ler));
    }

    #[test]
    fn seminar_course_code_in_second_pair() {
        assert_eq!(Subject::from_code("xxSK"), Some(Subject::Seminarkurs));
        assert_eq!(Subject::from_code("SK"), Some(Subject::Seminarkurs));
    }

    #[test]
    fn variants_order() {
        assert_eq!(
            Subject::Mathematik.variants(),
            vec!["Mathematik", "Mathe", "Mat", "MA"]
        );
        assert_eq!(
            Subject::PolitischeBildung.variants(),
            vec!["Politische Bildung", "Polit. Bildung", "PB"]
        );
        assert_eq!(Subject::Ler.variants(), vec!["LER", "LE"]);
    }

    #[test]
    fn display_names() {
        assert_eq!(Subject::Franzoesisch.to_string(), "Französisch");
        assert_eq!(Subject::ReligionEv.display_name(), "ev. Religion");
    }

    #[test]
    fn all_is_complete() {
        assert_eq!(Subject::ALL.len(), 23);
        assert_eq!(Subject::ALL[0], Subject::Biologie);
        assert_eq!(Subject::ALL[22], Subject::Wat);
    }
}
