/// Feature Encoder
///
/// Turns the authors picked in a session into the cold-start user feature
/// vector: 1.0 in the column of every `author_<Name>` feature the vocabulary
/// knows, 0.0 everywhere else. Unknown names are dropped, not rejected; the
/// caller gets them back in [`EncodedFeatures::dropped`].
use crate::services::catalog::FeatureVocabulary;
use ndarray::Array1;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EncodedFeatures {
    pub vector: Array1<f32>,
    /// Selected names with no vocabulary column
    pub dropped: Vec<String>,
}

impl EncodedFeatures {
    pub fn active_count(&self) -> usize {
        self.vector.iter().filter(|v| **v != 0.0).count()
    }
}

#[derive(Clone)]
pub struct FeatureEncoder {
    vocabulary: Arc<FeatureVocabulary>,
}

impl FeatureEncoder {
    pub fn new(vocabulary: Arc<FeatureVocabulary>) -> Self {
        Self { vocabulary }
    }

    pub fn dimension(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn encode<'a, I>(&self, authors: I) -> EncodedFeatures
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut vector = Array1::<f32>::zeros(self.vocabulary.len());
        let mut dropped = Vec::new();

        for author in authors {
            let feature = FeatureVocabulary::author_feature(author);
            match self.vocabulary.column(&feature) {
                Some(col) => vector[col] = 1.0,
                None => dropped.push(author.clone()),
            }
        }

        EncodedFeatures { vector, dropped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::IndexMapping;
    use std::collections::BTreeSet;

    fn encoder() -> FeatureEncoder {
        let columns = IndexMapping::from_keys(
            "features",
            [
                "author_Agatha Christie",
                "author_John Grisham",
                "author_Stephen King",
                "author_Nora Roberts",
            ],
        )
        .unwrap();
        FeatureEncoder::new(Arc::new(FeatureVocabulary::new(columns)))
    }

    fn selection(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_known_authors_set_exactly_their_columns() {
        let enc = encoder();
        let encoded = enc.encode(&selection(&["Agatha Christie", "Stephen King"]));
        assert_eq!(encoded.vector.len(), 4);
        assert_eq!(encoded.active_count(), 2);
        assert_eq!(encoded.vector[0], 1.0);
        assert_eq!(encoded.vector[2], 1.0);
        assert_eq!(encoded.vector[1], 0.0);
        assert!(encoded.dropped.is_empty());
    }

    #[test]
    fn test_unknown_authors_do_not_change_cardinality() {
        let enc = encoder();
        let encoded = enc.encode(&selection(&["John Grisham", "Nobody Atall", "Homer"]));
        assert_eq!(encoded.active_count(), 1);
        assert_eq!(encoded.vector.sum(), 1.0);
        assert_eq!(encoded.dropped, vec!["Homer", "Nobody Atall"]);
    }

    #[test]
    fn test_empty_selection_is_zero_vector() {
        let enc = encoder();
        let encoded = enc.encode(&BTreeSet::new());
        assert_eq!(encoded.vector.len(), enc.dimension());
        assert_eq!(encoded.active_count(), 0);
    }

    #[test]
    fn test_names_are_trimmed_before_lookup() {
        let enc = encoder();
        let encoded = enc.encode(&selection(&["  Nora Roberts "]));
        assert_eq!(encoded.vector[3], 1.0);
    }
}
