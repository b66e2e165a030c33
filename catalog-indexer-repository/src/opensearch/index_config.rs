//! OpenSearch index configuration and mappings.
//!
//! This module defines the settings and strict mappings of the three catalog
//! indices. Field names and types are what the read API queries against.

use serde_json::{json, Value};

/// Index holding aggregate work documents.
pub const MOVIES_INDEX: &str = "movies";

/// Index holding genre documents.
pub const GENRES_INDEX: &str = "genres";

/// Index holding person documents.
pub const PERSONS_INDEX: &str = "persons";

/// An index name with the body used to create it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: &'static str,
    pub body: Value,
}

impl IndexDefinition {
    /// Build a definition from mapping properties, sharing the catalog settings
    /// and rejecting undeclared fields.
    fn strict(name: &'static str, properties: Value) -> Self {
        Self {
            name,
            body: json!({
                "settings": index_settings(),
                "mappings": {
                    "dynamic": "strict",
                    "properties": properties
                }
            }),
        }
    }
}

/// All catalog indices, in creation order.
pub fn catalog_indices() -> Vec<IndexDefinition> {
    vec![
        IndexDefinition::strict(MOVIES_INDEX, movies_properties()),
        IndexDefinition::strict(GENRES_INDEX, genres_properties()),
        IndexDefinition::strict(PERSONS_INDEX, persons_properties()),
    ]
}

/// Settings shared by all catalog indices.
///
/// The `ru_en` analyzer handles the mixed Russian/English titles and names
/// found in the catalog.
fn index_settings() -> Value {
    json!({
        "number_of_shards": 1,
        "number_of_replicas": 1,
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "english_stop": { "type": "stop", "stopwords": "_english_" },
                "english_stemmer": { "type": "stemmer", "language": "english" },
                "english_possessive_stemmer": { "type": "stemmer", "language": "possessive_english" },
                "russian_stop": { "type": "stop", "stopwords": "_russian_" },
                "russian_stemmer": { "type": "stemmer", "language": "russian" }
            },
            "analyzer": {
                "ru_en": {
                    "tokenizer": "standard",
                    "filter": [
                        "lowercase",
                        "english_stop",
                        "english_stemmer",
                        "english_possessive_stemmer",
                        "russian_stop",
                        "russian_stemmer"
                    ]
                }
            }
        }
    })
}

fn text() -> Value {
    json!({ "type": "text", "analyzer": "ru_en" })
}

fn text_with_raw() -> Value {
    json!({
        "type": "text",
        "analyzer": "ru_en",
        "fields": {
            "raw": { "type": "keyword" }
        }
    })
}

fn person_refs() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "id": { "type": "keyword" },
            "name": text()
        }
    })
}

fn movies_properties() -> Value {
    json!({
        "id": { "type": "keyword" },
        "imdb_rating": { "type": "float" },
        "genres": text(),
        "title": text_with_raw(),
        "description": text(),
        "directors_names": text(),
        "actors_names": text(),
        "writers_names": text(),
        "directors": person_refs(),
        "actors": person_refs(),
        "writers": person_refs()
    })
}

fn genres_properties() -> Value {
    json!({
        "id": { "type": "keyword" },
        "name": text_with_raw(),
        "description": text()
    })
}

fn persons_properties() -> Value {
    json!({
        "id": { "type": "keyword" },
        "full_name": text_with_raw()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_indices() {
        let names: Vec<&str> = catalog_indices().iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["movies", "genres", "persons"]);
    }

    #[test]
    fn test_mappings_are_strict() {
        for definition in catalog_indices() {
            assert_eq!(definition.body["mappings"]["dynamic"], "strict");
            assert!(definition.body["settings"]["analysis"]["analyzer"]["ru_en"].is_object());
        }
    }

    #[test]
    fn test_movies_mapping_matches_document_fields() {
        let movies = catalog_indices().remove(0);
        let properties = movies.body["mappings"]["properties"].as_object().unwrap();

        for field in [
            "id",
            "imdb_rating",
            "genres",
            "title",
            "description",
            "directors_names",
            "actors_names",
            "writers_names",
            "directors",
            "actors",
            "writers",
        ] {
            assert!(properties.contains_key(field), "missing field {}", field);
        }
        assert_eq!(properties.len(), 11);
        assert_eq!(properties["actors"]["type"], "nested");
        assert_eq!(properties["actors"]["properties"]["id"]["type"], "keyword");
    }
}
