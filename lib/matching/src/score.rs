//! Score aggregation
//!
//! Runs every configured field and group through its similarity function and
//! combines the results into a weighted mean stored under `$global`.
//! Undefined scores are left out of both the numerator and the denominator.

use crate::distance::{
    date_similarity, elevation_similarity, exact_similarity, fuzzy_similarity, geo_similarity,
    ratio_similarity,
};
use crate::normalize::normalize;
use crate::schema::{FieldDescription, GroupDescription, ScoreRule, FIELDS, MULTI_FIELDS};
use ebiodiv_core::{Field, FieldScores, NormalizedOccurrence, Occurrence, Result, GLOBAL};

fn apply(
    rule: ScoreRule,
    field: Field,
    subject: &NormalizedOccurrence,
    related: &NormalizedOccurrence,
) -> Option<f64> {
    match rule {
        ScoreRule::Fuzzy => fuzzy_similarity(subject.text(field), related.text(field)),
        ScoreRule::Exact => exact_similarity(subject.text(field), related.text(field)),
        ScoreRule::Ratio => ratio_similarity(subject.number(field), related.number(field)),
        ScoreRule::ElevationDepth => elevation_similarity(subject, related),
        ScoreRule::DateDecay => date_similarity(subject, related),
        ScoreRule::Geodesic => geo_similarity(subject, related),
    }
}

/// Score a single field of two normalized occurrences
pub fn field_score(
    desc: &FieldDescription,
    subject: &NormalizedOccurrence,
    related: &NormalizedOccurrence,
) -> Option<f64> {
    apply(desc.score, desc.field, subject, related)
}

/// Score a field group of two normalized occurrences
pub fn group_score(
    desc: &GroupDescription,
    subject: &NormalizedOccurrence,
    related: &NormalizedOccurrence,
) -> Option<f64> {
    apply(desc.score, desc.fields[0], subject, related)
}

/// Weighted mean over the defined scores; `None` when nothing is defined
pub fn weighted_average<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = (Option<f64>, f64)>,
{
    let (sum, weights) = scores
        .into_iter()
        .filter_map(|(score, weight)| score.map(|s| (s * weight, weight)))
        .fold((0.0, 0.0), |(sum, total), (s, w)| (sum + s, total + w));
    (weights > 0.0).then(|| sum / weights)
}

/// Round to 3 decimals, ties to even
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round_ties_even() / 1000.0
}

/// Per-field and aggregate scores of two normalized occurrences
pub fn score(subject: &NormalizedOccurrence, related: &NormalizedOccurrence) -> FieldScores {
    let mut scores = FieldScores::new();
    let mut weighted = Vec::with_capacity(FIELDS.len() + MULTI_FIELDS.len());

    for desc in &FIELDS {
        let value = field_score(desc, subject, related);
        weighted.push((value, desc.weight));
        scores.insert(desc.label(), value.map(round3));
    }
    for group in &MULTI_FIELDS {
        let value = group_score(group, subject, related);
        weighted.push((value, group.weight));
        scores.insert(group.label(), value.map(round3));
    }

    scores.insert(GLOBAL, weighted_average(weighted).map(round3));
    scores
}

/// Normalize copies of two raw occurrences, then score them
pub fn score_occurrences(subject: &Occurrence, related: &Occurrence) -> Result<FieldScores> {
    Ok(score(&normalize(subject)?, &normalize(related)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::labels;
    use serde_json::json;

    fn occurrence(value: serde_json::Value) -> Occurrence {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_every_label_present() {
        let scores = score(&NormalizedOccurrence::default(), &NormalizedOccurrence::default());
        for label in labels() {
            assert_eq!(scores.get(label), Some(None), "{label}");
        }
        assert_eq!(scores.get(GLOBAL), Some(None));
        assert_eq!(scores.len(), 14);
    }

    #[test]
    fn test_weighted_average_skips_undefined() {
        assert_eq!(weighted_average([(Some(0.4), 2.0), (None, 1.0)]), Some(0.4));
        assert_eq!(weighted_average([(Some(1.0), 2.0), (Some(0.0), 1.0)]), Some(2.0 / 3.0));
        assert_eq!(weighted_average([(None, 2.0), (None, 1.0)]), None);
        assert_eq!(weighted_average(Vec::<(Option<f64>, f64)>::new()), None);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round3(0.35241), 0.352);
        assert_eq!(round3(0.9186), 0.919);
        assert_eq!(round3(-0.5), -0.5);
    }

    #[test]
    fn test_identical_occurrences() {
        let occ = occurrence(json!({
            "family": "Carabidae",
            "genus": "Carabus",
            "country": "CH",
            "year": 1999,
            "decimalLatitude": 46.2,
            "decimalLongitude": 6.1,
            "elevation": 400
        }));
        let scores = score_occurrences(&occ, &occ).unwrap();
        assert_eq!(scores.get("family"), Some(Some(1.0)));
        assert_eq!(scores.get("year"), Some(Some(1.0)));
        assert_eq!(scores.get("decimalLatitude"), Some(Some(1.0)));
        assert_eq!(scores.get("elevation"), Some(Some(1.0)));
        assert_eq!(scores.get("city"), Some(None));
        assert_eq!(scores.global(), Some(1.0));
    }

    #[test]
    fn test_sentinel_coordinates_excluded_from_global() {
        let a = occurrence(json!({"genus": "Carabus", "decimalLatitude": 0, "decimalLongitude": 0}));
        let b = occurrence(json!({"genus": "Carabus", "decimalLatitude": 46.2, "decimalLongitude": 6.1}));
        let scores = score_occurrences(&a, &b).unwrap();
        assert_eq!(scores.get("decimalLatitude"), Some(None));
        assert_eq!(scores.global(), Some(1.0));
    }

    #[test]
    fn test_global_is_weighted() {
        // genus weight 2 scores 1, country weight 1 scores 0
        let a = occurrence(json!({"genus": "Carabus", "country": "CH"}));
        let b = occurrence(json!({"genus": "Carabus", "country": "FR"}));
        let scores = score_occurrences(&a, &b).unwrap();
        assert_eq!(scores.get("country"), Some(Some(0.0)));
        assert_eq!(scores.global(), Some(0.667));
    }
}
