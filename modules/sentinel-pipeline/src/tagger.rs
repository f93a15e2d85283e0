use std::collections::HashSet;

/// A single named entity extracted from text, per §3 "ExtractedEntity".
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEntity {
    pub name: String,
    pub kind: EntityKind,
    pub span_start: usize,
    pub span_end: usize,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Person,
    Organization,
    Location,
}

/// Stateless text-tagging operation, per §4.1's "opaque tagger with a fixed
/// contract": the model itself is out of scope, this trait is the seam a
/// real NER model plugs into. `tag` must return `[]` for empty/whitespace
/// input and must not hold cross-call state.
pub trait EntityTagger: Send + Sync {
    fn tag(&self, text: &str) -> Vec<ExtractedEntity>;
}

/// Deduplicate within a single tagger's output: entities sharing
/// `(lowercase(name), kind)` collapse to their first occurrence, keeping its
/// span. Shared by every `EntityTagger` implementation.
pub fn dedup_by_name_and_kind(entities: Vec<ExtractedEntity>) -> Vec<ExtractedEntity> {
    let mut seen: HashSet<(String, EntityKind)> = HashSet::new();
    let mut out = Vec::with_capacity(entities.len());
    for ent in entities {
        let key = (ent.name.to_lowercase().trim().to_string(), ent.kind);
        if seen.insert(key) {
            out.push(ent);
        }
    }
    out
}

/// A deterministic, dependency-free heuristic tagger: detects runs of
/// capitalised words as candidate entities, classifying them by a small
/// gazetteer of organization/location suffixes and falling back to
/// `Person` otherwise. Not a claim of NLP quality — a substitutable
/// default behind [`EntityTagger`], matching the trait's contract so
/// downstream code can be exercised without a model runtime.
pub struct HeuristicTagger {
    org_suffixes: Vec<String>,
    location_suffixes: Vec<String>,
}

impl Default for HeuristicTagger {
    fn default() -> Self {
        Self {
            org_suffixes: [
                "Inc", "Inc.", "Corp", "Corp.", "Ltd", "Ltd.", "LLC", "ApS", "A/S", "Co",
                "Company", "Organization", "Nations", "Union", "Association",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            location_suffixes: [
                "City", "Island", "Islands", "Mountains", "River", "Republic", "Kingdom",
                "Province", "County", "State",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl HeuristicTagger {
    pub fn new() -> Self {
        Self::default()
    }

    fn classify(&self, words: &[&str]) -> EntityKind {
        let last = words.last().copied().unwrap_or("");
        if self.org_suffixes.iter().any(|s| s == last) {
            EntityKind::Organization
        } else if self.location_suffixes.iter().any(|s| s == last) {
            EntityKind::Location
        } else if words.len() == 1 {
            EntityKind::Location
        } else {
            EntityKind::Person
        }
    }
}

impl EntityTagger for HeuristicTagger {
    fn tag(&self, text: &str) -> Vec<ExtractedEntity> {
        if text.trim().is_empty() {
            return vec![];
        }

        let mut raw = Vec::new();
        let mut run_start: Option<usize> = None;
        let mut run_words: Vec<&str> = Vec::new();
        let mut byte_pos = 0usize;

        let mut push_run = |run_start: &mut Option<usize>, run_words: &mut Vec<&str>, end: usize, raw: &mut Vec<ExtractedEntity>| {
            if let Some(start) = run_start.take() {
                if !run_words.is_empty() {
                    let kind = self.classify(run_words);
                    let name = run_words.join(" ");
                    raw.push(ExtractedEntity {
                        name,
                        kind,
                        span_start: start,
                        span_end: end,
                        confidence: 1.0,
                    });
                }
                run_words.clear();
            }
        };

        for word in text.split_whitespace() {
            let word_start = byte_pos;
            byte_pos += word.len() + 1;
            let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
            let is_capitalized = trimmed
                .chars()
                .next()
                .map(|c| c.is_uppercase())
                .unwrap_or(false);

            if is_capitalized && !trimmed.is_empty() {
                if run_start.is_none() {
                    run_start = Some(word_start);
                }
                run_words.push(word);
            } else {
                push_run(&mut run_start, &mut run_words, word_start, &mut raw);
            }
        }
        push_run(&mut run_start, &mut run_words, byte_pos, &mut raw);

        dedup_by_name_and_kind(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_entities() {
        let tagger = HeuristicTagger::new();
        assert!(tagger.tag("").is_empty());
        assert!(tagger.tag("   ").is_empty());
    }

    #[test]
    fn detects_org_by_suffix() {
        let tagger = HeuristicTagger::new();
        let entities = tagger.tag("A report from United Nations today.");
        assert!(entities
            .iter()
            .any(|e| e.name == "United Nations" && e.kind == EntityKind::Organization));
    }

    #[test]
    fn dedup_collapses_same_name_and_kind() {
        let entities = vec![
            ExtractedEntity {
                name: "Acme".into(),
                kind: EntityKind::Organization,
                span_start: 0,
                span_end: 4,
                confidence: 1.0,
            },
            ExtractedEntity {
                name: "acme".into(),
                kind: EntityKind::Organization,
                span_start: 10,
                span_end: 14,
                confidence: 1.0,
            },
        ];
        let deduped = dedup_by_name_and_kind(entities);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].span_start, 0);
    }
}
