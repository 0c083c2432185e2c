/// Catalog Store
///
/// Read-only book/user metadata plus the index mappings that translate
/// between catalog keys (ISBN, user id) and the dense positions the scoring
/// engine works in. Loaded once at startup and shared behind an `Arc`.
///
/// # On-disk layout (`CATALOG_DIR`)
/// - `books.json`: array of [`Book`]
/// - `users.json`: array of [`UserRecord`]
/// - `item_mapping.json`: `{ "<isbn>": <index>, ... }`
/// - `user_mapping.json`: `{ "<user id>": <index>, ... }`
/// - `user_features.json`: `{ "author_<Name>": <column>, ... }`
use crate::models::{Book, UserRecord};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const AUTHOR_FEATURE_PREFIX: &str = "author_";

/// Quick-pick authors offered above the full author list
pub const QUICK_PICK_AUTHORS: [&str; 6] = [
    "Agatha Christie",
    "John Grisham",
    "J.K. Rowling",
    "Stephen King",
    "Nora Roberts",
    "Michael Crichton",
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Inconsistent(String),

    #[error("Unknown catalog item: {0}")]
    UnknownItem(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Bijection between string keys and dense positions `0..N-1`
#[derive(Debug, Clone, Default)]
pub struct IndexMapping {
    keys: Vec<String>,
    positions: HashMap<String, usize>,
}

impl IndexMapping {
    /// Build from a key → index table, rejecting gaps and collisions.
    pub fn from_table(name: &str, table: HashMap<String, usize>) -> Result<Self> {
        let n = table.len();
        let mut keys: Vec<Option<String>> = vec![None; n];

        for (key, idx) in &table {
            if *idx >= n {
                return Err(CatalogError::Inconsistent(format!(
                    "{} maps '{}' to {} outside 0..{}",
                    name, key, idx, n
                )));
            }
            if let Some(existing) = &keys[*idx] {
                return Err(CatalogError::Inconsistent(format!(
                    "{} maps both '{}' and '{}' to {}",
                    name, existing, key, idx
                )));
            }
            keys[*idx] = Some(key.clone());
        }

        // n distinct indices below n means every slot is filled
        let keys = keys.into_iter().flatten().collect();
        Ok(Self {
            keys,
            positions: table,
        })
    }

    /// Build from keys listed in index order.
    pub fn from_keys<I, S>(name: &str, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = HashMap::new();
        for (idx, key) in keys.into_iter().enumerate() {
            let key = key.into();
            if table.insert(key.clone(), idx).is_some() {
                return Err(CatalogError::Inconsistent(format!(
                    "{} lists '{}' twice",
                    name, key
                )));
            }
        }
        Self::from_table(name, table)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.positions.get(key).copied()
    }

    pub fn key_at(&self, idx: usize) -> Option<&str> {
        self.keys.get(idx).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

/// Named feature columns shared by the encoder and the scoring engine
#[derive(Debug, Clone, Default)]
pub struct FeatureVocabulary {
    columns: IndexMapping,
}

impl FeatureVocabulary {
    pub fn new(columns: IndexMapping) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, feature: &str) -> Option<usize> {
        self.columns.index_of(feature)
    }

    pub fn author_feature(author: &str) -> String {
        format!("{}{}", AUTHOR_FEATURE_PREFIX, author.trim())
    }

    /// Author names with an indicator column, sorted
    pub fn authors(&self) -> Vec<String> {
        let mut authors: Vec<String> = self
            .columns
            .keys()
            .filter_map(|f| f.strip_prefix(AUTHOR_FEATURE_PREFIX))
            .map(str::to_string)
            .collect();
        authors.sort();
        authors
    }
}

/// Process-wide, immutable catalog
#[derive(Debug)]
pub struct CatalogStore {
    books: HashMap<String, Book>,
    users: HashMap<String, UserRecord>,
    items: IndexMapping,
    user_index: IndexMapping,
    vocabulary: FeatureVocabulary,
}

impl CatalogStore {
    /// Assemble a catalog, checking that every mapped item has metadata.
    pub fn new(
        books: Vec<Book>,
        users: Vec<UserRecord>,
        items: IndexMapping,
        user_index: IndexMapping,
        vocabulary: FeatureVocabulary,
    ) -> Result<Self> {
        let books: HashMap<String, Book> =
            books.into_iter().map(|b| (b.isbn.clone(), b)).collect();
        let users: HashMap<String, UserRecord> =
            users.into_iter().map(|u| (u.user_id.clone(), u)).collect();

        if let Some(missing) = items.keys().find(|isbn| !books.contains_key(*isbn)) {
            return Err(CatalogError::Inconsistent(format!(
                "item mapping references '{}' with no book metadata",
                missing
            )));
        }
        if items.is_empty() {
            return Err(CatalogError::Inconsistent(
                "item mapping is empty".to_string(),
            ));
        }
        if vocabulary.is_empty() {
            return Err(CatalogError::Inconsistent(
                "feature vocabulary is empty".to_string(),
            ));
        }

        Ok(Self {
            books,
            users,
            items,
            user_index,
            vocabulary,
        })
    }

    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let books: Vec<Book> = read_json(&dir.join("books.json"))?;
        let users: Vec<UserRecord> = read_json(&dir.join("users.json"))?;
        let items = IndexMapping::from_table(
            "item mapping",
            read_json(&dir.join("item_mapping.json"))?,
        )?;
        let user_index = IndexMapping::from_table(
            "user mapping",
            read_json(&dir.join("user_mapping.json"))?,
        )?;
        let vocabulary = FeatureVocabulary::new(IndexMapping::from_table(
            "feature vocabulary",
            read_json(&dir.join("user_features.json"))?,
        )?);

        let store = Self::new(books, users, items, user_index, vocabulary)?;
        info!(
            books = store.books.len(),
            users = store.user_count(),
            items = store.item_count(),
            features = store.vocabulary.len(),
            "Catalog loaded from {}",
            dir.display()
        );
        Ok(store)
    }

    /// Fail unless the scoring model was trained on this feature and item space.
    pub fn check_model_dimensions(&self, n_features: usize, n_items: usize) -> Result<()> {
        if n_features != self.vocabulary.len() {
            return Err(CatalogError::Inconsistent(format!(
                "model expects {} user features, vocabulary has {}",
                n_features,
                self.vocabulary.len()
            )));
        }
        if n_items != self.items.len() {
            return Err(CatalogError::Inconsistent(format!(
                "model scores {} items, item mapping has {}",
                n_items,
                self.items.len()
            )));
        }
        Ok(())
    }

    pub fn book(&self, isbn: &str) -> Result<&Book> {
        self.books
            .get(isbn)
            .ok_or_else(|| CatalogError::UnknownItem(isbn.to_string()))
    }

    pub fn contains(&self, isbn: &str) -> bool {
        self.books.contains_key(isbn)
    }

    pub fn items(&self) -> &IndexMapping {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn user(&self, user_id: &str) -> Option<&UserRecord> {
        self.users.get(user_id)
    }

    pub fn user_count(&self) -> usize {
        self.user_index.len()
    }

    pub fn vocabulary(&self) -> &FeatureVocabulary {
        &self.vocabulary
    }

    /// Quick picks that the vocabulary actually knows
    pub fn quick_pick_authors(&self) -> Vec<String> {
        QUICK_PICK_AUTHORS
            .iter()
            .filter(|a| {
                self.vocabulary
                    .column(&FeatureVocabulary::author_feature(a))
                    .is_some()
            })
            .map(|a| a.to_string())
            .collect()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
