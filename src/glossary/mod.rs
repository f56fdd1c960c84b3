use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;

/// Fixed term-level substitutions applied before chunking and again to each
/// remote response. Loaded once from the embedded table and never mutated.
#[derive(Debug, Clone)]
pub struct GlossaryTable {
    languages: HashMap<String, Vec<GlossaryEntry>>,
}

#[derive(Debug, Clone)]
struct GlossaryEntry {
    pattern: Regex,
    translation: String,
}

impl GlossaryTable {
    pub fn load() -> Result<Self> {
        let raw = include_str!("terms.toml");
        Self::parse(raw)
    }

    fn parse(raw: &str) -> Result<Self> {
        let parsed: HashMap<String, HashMap<String, String>> =
            toml::from_str(raw).with_context(|| "failed to parse glossary table")?;

        let mut languages = HashMap::new();
        for (code, terms) in parsed {
            let mut terms: Vec<(String, String)> = terms.into_iter().collect();
            // Longest term first so multi-word entries ("heart attack") win
            // over any shorter entry they contain.
            terms.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

            let mut entries = Vec::with_capacity(terms.len());
            for (term, translation) in terms {
                let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&term)))
                    .with_context(|| format!("invalid glossary term: {term}"))?;
                entries.push(GlossaryEntry {
                    pattern,
                    translation,
                });
            }
            entries.shrink_to_fit();
            languages.insert(code.to_lowercase(), entries);
        }

        Ok(GlossaryTable { languages })
    }

    /// Replaces every whole-word, case-insensitive occurrence of a known
    /// source term with its fixed translation. Languages without a table
    /// pass the text through unchanged.
    pub fn substitute(&self, text: &str, target_lang: &str) -> String {
        let Some(entries) = self.languages.get(&target_lang.trim().to_lowercase()) else {
            return text.to_string();
        };
        let mut result = text.to_string();
        for entry in entries {
            result = entry
                .pattern
                .replace_all(&result, entry.translation.as_str())
                .into_owned();
        }
        result
    }

    pub fn has_language(&self, target_lang: &str) -> bool {
        self.languages
            .contains_key(&target_lang.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::GlossaryTable;

    fn table() -> GlossaryTable {
        GlossaryTable::load().expect("embedded glossary parses")
    }

    #[test]
    fn substitutes_whole_word_case_insensitive() {
        let table = table();
        let out = table.substitute("See a CARDIOLOGIST today", "hi");
        assert_eq!(out, "See a हृदय रोग विशेषज्ञ today");
    }

    #[test]
    fn keeps_term_with_surrounding_punctuation() {
        let table = table();
        let out = table.substitute("Symptoms: fever, cough.", "hi");
        assert_eq!(out, "Symptoms: बुखार, खांसी.");
    }

    #[test]
    fn does_not_touch_partial_words() {
        let table = table();
        // "infectious" contains "infection" as a prefix but is not a whole
        // word match.
        let out = table.substitute("an infectious disease", "hi");
        assert_eq!(out, "an infectious disease");
    }

    #[test]
    fn multi_word_terms_survive() {
        let table = table();
        let out = table.substitute("ordered a blood test and an x-ray", "mr");
        assert_eq!(out, "ordered a रक्त तपासणी and an क्ष-किरण");
    }

    #[test]
    fn unknown_language_is_passthrough() {
        let table = table();
        assert_eq!(table.substitute("fever", "fr"), "fever");
        assert!(!table.has_language("fr"));
        assert!(table.has_language("hi"));
    }
}
