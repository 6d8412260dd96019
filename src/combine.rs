//! Field combination: one descriptive string per record, the unit that gets
//! embedded.
//!
//! Layout is fixed so a catalog re-embedded later reproduces the same vectors:
//!
//! ```text
//! {title} | {genre} | {normalized review} | Age: {age} | Graphics: {graphics}
//! ```

use crate::catalog::{Catalog, GameRecord};
use crate::normalize::TextNormalizer;

pub const FIELD_SEPARATOR: &str = " | ";

/// Join a record's fields around an already normalized review.
pub fn combine_fields(record: &GameRecord, normalized_review: &str) -> String {
    let age = format!("Age: {}", record.age_rating);
    let graphics = format!("Graphics: {}", record.graphics);
    [
        record.title.as_str(),
        record.genre.as_str(),
        normalized_review,
        age.as_str(),
        graphics.as_str(),
    ]
    .join(FIELD_SEPARATOR)
}

/// Normalize every review and combine, in catalog order.
pub fn combine_catalog(catalog: &Catalog, normalizer: &TextNormalizer) -> Vec<String> {
    let reviews: Vec<&str> = catalog.records().iter().map(|r| r.review.as_str()).collect();
    let normalized = normalizer.normalize_all(&reviews);

    catalog
        .records()
        .iter()
        .zip(normalized.iter())
        .map(|(record, review)| combine_fields(record, review))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_fields_layout() {
        let record = GameRecord::new(
            "Celeste",
            "Platformer",
            "ignored here",
            "Teen",
            "High",
            8.8,
            19.99,
        );
        assert_eq!(
            combine_fields(&record, "emotional platformer"),
            "Celeste | Platformer | emotional platformer | Age: Teen | Graphics: High"
        );
    }

    #[test]
    fn test_combine_catalog_normalizes_reviews_in_order() {
        let catalog = Catalog::from_records(vec![
            GameRecord::new("B", "G", "Loud, FUN!", "Teen", "Low", 1.0, 1.0),
            GameRecord::new("A", "G", "Quiet.", "Everyone", "High", 2.0, 2.0),
        ]);
        let combined = combine_catalog(&catalog, &TextNormalizer::Basic);
        assert_eq!(
            combined,
            vec![
                "B | G | loud fun | Age: Teen | Graphics: Low",
                "A | G | quiet | Age: Everyone | Graphics: High",
            ]
        );
    }

    #[test]
    fn test_combine_is_deterministic() {
        let catalog = Catalog::sample();
        let n = TextNormalizer::Basic;
        assert_eq!(combine_catalog(&catalog, &n), combine_catalog(&catalog, &n));
    }
}
