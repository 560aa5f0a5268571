//! Canonical specialty catalogue.
//!
//! The LLM names specialties in free text, the directory spells them however
//! the source listing did. Both sides are resolved against this list.

use serde::Serialize;

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Specialty {
    pub key: &'static str,
    pub name_en: &'static str,
    pub name_zh: &'static str,
    pub aliases: &'static [&'static str],
}

impl Specialty {
    /// Every spelling that identifies this specialty, lowercased.
    pub fn terms(&self) -> impl Iterator<Item = String> + '_ {
        [self.name_en, self.name_zh]
            .into_iter()
            .chain(self.aliases.iter().copied())
            .map(str::to_lowercase)
    }

    /// True when any spelling of this specialty appears in `text`.
    pub fn found_in(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        self.terms().any(|term| contains_term(&haystack, &term))
    }
}

/// Short ASCII terms ("gp", "ent", "eye") must match a whole word, otherwise
/// "ent" would be found in "dentistry". `haystack` must be lowercased.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    if term.is_ascii() && term.len() <= 3 {
        haystack
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == term)
    } else {
        haystack.contains(term)
    }
}

pub const GENERAL_PRACTICE: &str = "general_practice";
pub const INTERNAL_MEDICINE: &str = "internal_medicine";

pub static SPECIALTIES: &[Specialty] = &[
    Specialty {
        key: GENERAL_PRACTICE,
        name_en: "General Practitioner",
        name_zh: "普通科",
        aliases: &["general practice", "family medicine", "family physician", "gp", "家庭醫學", "全科"],
    },
    Specialty {
        key: INTERNAL_MEDICINE,
        name_en: "Internal Medicine",
        name_zh: "內科",
        aliases: &["internist", "general medicine", "內科醫學"],
    },
    Specialty {
        key: "cardiology",
        name_en: "Cardiology",
        name_zh: "心臟科",
        aliases: &["cardiologist", "cardiac", "心臟內科"],
    },
    Specialty {
        key: "dermatology",
        name_en: "Dermatology",
        name_zh: "皮膚科",
        aliases: &["dermatologist", "skin", "皮膚及性病科"],
    },
    Specialty {
        key: "paediatrics",
        name_en: "Paediatrics",
        name_zh: "兒科",
        aliases: &["pediatrics", "pediatrician", "paediatrician", "children"],
    },
    Specialty {
        key: "orthopaedics",
        name_en: "Orthopaedics",
        name_zh: "骨科",
        aliases: &["orthopedics", "orthopaedic surgery", "orthopedic", "骨科及創傷科"],
    },
    Specialty {
        key: "ent",
        name_en: "Otorhinolaryngology",
        name_zh: "耳鼻喉科",
        aliases: &["ent", "ear, nose and throat", "ear nose throat"],
    },
    Specialty {
        key: "ophthalmology",
        name_en: "Ophthalmology",
        name_zh: "眼科",
        aliases: &["ophthalmologist", "eye"],
    },
    Specialty {
        key: "gastroenterology",
        name_en: "Gastroenterology",
        name_zh: "腸胃肝臟科",
        aliases: &["gastroenterology & hepatology", "hepatology", "gastroenterologist", "腸胃科", "消化科"],
    },
    Specialty {
        key: "neurology",
        name_en: "Neurology",
        name_zh: "腦神經科",
        aliases: &["neurologist", "神經科", "神經內科"],
    },
    Specialty {
        key: "psychiatry",
        name_en: "Psychiatry",
        name_zh: "精神科",
        aliases: &["psychiatrist", "mental health"],
    },
    Specialty {
        key: "obstetrics_gynaecology",
        name_en: "Obstetrics & Gynaecology",
        name_zh: "婦產科",
        aliases: &["obstetrics and gynaecology", "obstetrics & gynecology", "gynaecology", "gynecology", "obstetrics", "婦科"],
    },
    Specialty {
        key: "urology",
        name_en: "Urology",
        name_zh: "泌尿外科",
        aliases: &["urologist", "泌尿科"],
    },
    Specialty {
        key: "respiratory",
        name_en: "Respiratory Medicine",
        name_zh: "呼吸系統科",
        aliases: &["pulmonology", "respiratory", "chest medicine", "胸肺科", "呼吸科"],
    },
    Specialty {
        key: "endocrinology",
        name_en: "Endocrinology",
        name_zh: "內分泌科",
        aliases: &["endocrinology, diabetes & metabolism", "diabetes", "endocrinologist", "糖尿"],
    },
    Specialty {
        key: "oncology",
        name_en: "Oncology",
        name_zh: "腫瘤科",
        aliases: &["clinical oncology", "medical oncology", "oncologist", "癌症"],
    },
    Specialty {
        key: "rheumatology",
        name_en: "Rheumatology",
        name_zh: "風濕病科",
        aliases: &["rheumatologist", "風濕科"],
    },
    Specialty {
        key: "nephrology",
        name_en: "Nephrology",
        name_zh: "腎病科",
        aliases: &["nephrologist", "renal", "腎科"],
    },
    Specialty {
        key: "general_surgery",
        name_en: "General Surgery",
        name_zh: "外科",
        aliases: &["surgeon", "surgery", "普通外科"],
    },
];

pub fn by_key(key: &str) -> Option<&'static Specialty> {
    SPECIALTIES.iter().find(|s| s.key == key)
}

pub fn general_practice() -> &'static Specialty {
    by_key(GENERAL_PRACTICE).unwrap_or(&SPECIALTIES[0])
}

/// Map a free-text specialty name onto the catalogue.
///
/// Exact matches on any spelling win. Otherwise the specialty whose longest
/// spelling is contained in the text is chosen.
pub fn resolve(text: &str) -> Option<&'static Specialty> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(exact) = SPECIALTIES.iter().find(|s| s.terms().any(|t| t == needle)) {
        return Some(exact);
    }

    SPECIALTIES
        .iter()
        .filter_map(|s| {
            s.terms()
                .filter(|t| contains_term(&needle, t))
                .map(|t| t.chars().count())
                .max()
                .map(|len| (s, len))
        })
        .max_by_key(|(_, len)| *len)
        .map(|(s, _)| s)
}

/// Resolve every entry of a list, dropping unknowns and duplicates while
/// keeping first-seen order.
pub fn resolve_all<'a, I>(names: I) -> Vec<&'static Specialty>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut resolved: Vec<&'static Specialty> = Vec::new();
    for name in names {
        if let Some(specialty) = resolve(name) {
            if !resolved.iter().any(|s| s.key == specialty.key) {
                resolved.push(specialty);
            }
        }
    }
    resolved
}

/// GPs and internists are the fallback when a search comes back thin.
pub fn is_general_practice(specialty_text: &str) -> bool {
    [GENERAL_PRACTICE, INTERNAL_MEDICINE]
        .iter()
        .filter_map(|key| by_key(key))
        .any(|s| s.found_in(specialty_text))
}
