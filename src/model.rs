use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record in the `books` collection.
///
/// Only `id` is known to the server. Everything else the client sends is kept
/// verbatim in `fields` and serialized next to `id` in one flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Book {
    pub fn new(id: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove("id");
        Book {
            id: id.into(),
            fields,
        }
    }

    /// Shallow merge: top-level keys in `patch` replace or extend ours. The id is fixed.
    pub fn merge(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            if key == "id" {
                continue;
            }
            self.fields.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// On-disk layout of the store file. Unknown top-level keys survive rewrites.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub books: Option<Vec<Book>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_book_serializes_flat() {
        let book = Book::new("abcd1234", fields(json!({"title": "Dune", "author": "Herbert"})));
        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(
            value,
            json!({"id": "abcd1234", "title": "Dune", "author": "Herbert"})
        );
    }

    #[test]
    fn test_new_ignores_client_id() {
        let book = Book::new("server01", fields(json!({"id": "client", "title": "Dune"})));
        assert_eq!(book.id, "server01");
        assert!(book.get("id").is_none());
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut book = Book::new(
            "abcd1234",
            fields(json!({"title": "T", "author": "Y", "meta": {"a": 1, "b": 2}})),
        );
        book.merge(fields(json!({"author": "X", "year": 1965, "meta": {"a": 9}, "id": "nope"})));

        assert_eq!(book.id, "abcd1234");
        assert_eq!(book.get("title"), Some(&json!("T")));
        assert_eq!(book.get("author"), Some(&json!("X")));
        assert_eq!(book.get("year"), Some(&json!(1965)));
        assert_eq!(book.get("meta"), Some(&json!({"a": 9})));
    }

    #[test]
    fn test_book_without_id_is_rejected() {
        let parsed: Result<Book, _> = serde_json::from_value(json!({"title": "Dune"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_document_keeps_unknown_keys() {
        let doc: Document = serde_json::from_value(json!({"authors": [1, 2]})).unwrap();
        assert!(doc.books.is_none());
        assert_eq!(doc.rest.get("authors"), Some(&json!([1, 2])));
    }
}
