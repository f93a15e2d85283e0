use crate::tagger::{EntityKind, ExtractedEntity};
use sentinel_common::ratcliff_obershelp;
use unicode_normalization::UnicodeNormalization;

const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// An entity after canonicalisation and possible intra-document merging,
/// per §3 "NormalisedEntity".
#[derive(Debug, Clone, PartialEq)]
pub struct NormalisedEntity {
    pub name: String,
    pub kind: EntityKind,
    pub occurrences: u32,
    pub source_spans: Vec<(usize, usize)>,
}

/// Deterministic name canonicalisation, per §4.5: NFC-compose, trim,
/// collapse internal whitespace, title-case.
pub fn canonicalise(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let composed: String = name.chars().nfc().collect();
    let collapsed = sentinel_common::collapse_whitespace(&composed);
    title_case(&collapsed)
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fuzzy one-pass resolver, per §4.5 `resolve`.
pub struct Resolver {
    threshold: f64,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl Resolver {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn resolve(&self, entities: &[ExtractedEntity]) -> Vec<NormalisedEntity> {
        let mut merged: Vec<NormalisedEntity> = Vec::new();

        for ent in entities {
            let norm_name = canonicalise(&ent.name);
            match self.find_match(&norm_name, ent.kind, &merged) {
                Some(idx) => self.merge_entity(&mut merged[idx], ent, &norm_name),
                None => merged.push(NormalisedEntity {
                    name: norm_name,
                    kind: ent.kind,
                    occurrences: 1,
                    source_spans: vec![(ent.span_start, ent.span_end)],
                }),
            }
        }

        merged
    }

    fn find_match(&self, norm_name: &str, kind: EntityKind, candidates: &[NormalisedEntity]) -> Option<usize> {
        candidates.iter().position(|c| {
            c.kind == kind && similarity(norm_name, &c.name) >= self.threshold
        })
    }

    fn merge_entity(&self, existing: &mut NormalisedEntity, new: &ExtractedEntity, norm_new: &str) {
        existing.occurrences += 1;
        existing.source_spans.push((new.span_start, new.span_end));
        if norm_new.len() > existing.name.len() {
            existing.name = norm_new.to_string();
        }
    }
}

fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    ratcliff_obershelp(&a.to_lowercase(), &b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::EntityKind;

    #[test]
    fn canonicalise_collapses_and_title_cases() {
        assert_eq!(canonicalise("  united   nations  "), "United Nations");
        assert_eq!(canonicalise(""), "");
    }

    #[test]
    fn canonicalise_is_idempotent() {
        let once = canonicalise("new york city");
        let twice = canonicalise(&once);
        assert_eq!(once, twice);
    }

    fn entity(name: &str, kind: EntityKind, start: usize, end: usize) -> ExtractedEntity {
        ExtractedEntity {
            name: name.to_string(),
            kind,
            span_start: start,
            span_end: end,
            confidence: 1.0,
        }
    }

    #[test]
    fn near_duplicate_names_merge_and_adopt_longer_form() {
        let resolver = Resolver::default();
        let entities = vec![
            entity("United Nations", EntityKind::Organization, 0, 14),
            entity("United Nation", EntityKind::Organization, 20, 33),
        ];
        let resolved = resolver.resolve(&entities);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "United Nations");
        assert_eq!(resolved[0].occurrences, 2);
    }

    #[test]
    fn different_kinds_never_merge() {
        let resolver = Resolver::default();
        let entities = vec![
            entity("Acme", EntityKind::Organization, 0, 4),
            entity("Acme", EntityKind::Person, 10, 14),
        ];
        let resolved = resolver.resolve(&entities);
        assert_eq!(resolved.len(), 2);
    }
}
