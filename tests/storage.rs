//! Persistence tests: the store survives a save/load cycle and rejects
//! malformed documents instead of reconstructing partial records.

use chrono::NaiveDate;

use refshelf::references::citation::assign_citation_keys;
use refshelf::references::{
    Author, Chunk, ChunkMetadata, IngestStatus, JsonStorage, Reference, ReferenceError,
};

fn reference(file: &str, author: Option<&str>, year: Option<i32>) -> Reference {
    let mut r = Reference::new(file);
    r.status = IngestStatus::Complete;
    r.published_date = year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
    if let Some(name) = author {
        r.authors.push(Author {
            full_name: name.into(),
            given_name: name.split_whitespace().next().map(String::from),
            surname: name.split_whitespace().last().map(String::from),
            email: Some("someone@example.org".into()),
        });
    }
    r.contents = format!("Text of {file}");
    r.chunks.push(Chunk {
        text: r.contents.clone(),
        metadata: ChunkMetadata {
            source_filename: file.into(),
            page_num: 3,
        },
    });
    r
}

#[test]
fn store_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(".storage").join("references.json");

    let batch = assign_citation_keys(
        vec![
            reference("a.pdf", Some("Kathy Jones"), Some(2021)),
            reference("b.pdf", Some("Kathy Jones"), Some(2021)),
            reference("c.pdf", None, None),
        ],
        &Vec::<String>::new(),
    );
    {
        let mut storage = JsonStorage::open(&path);
        storage.load_or_empty().unwrap();
        storage.extend(batch.clone());
        storage.save().unwrap();
    }

    let mut reopened = JsonStorage::open(&path);
    reopened.load().unwrap();
    assert_eq!(reopened.references(), batch.as_slice());
    assert_eq!(reopened.citation_keys(), ["jones2021", "jones2021a", "untitled"]);
    assert_eq!(reopened.corpus().len(), 3);
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn existing_keys_extend_without_mutation() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("references.json");

    let mut storage = JsonStorage::open(&path);
    storage.extend(assign_citation_keys(
        vec![
            reference("a.pdf", Some("Kathy Jones"), Some(2021)),
            reference("b.pdf", Some("Kathy Jones"), Some(2021)),
        ],
        &Vec::<String>::new(),
    ));
    storage.save().unwrap();

    let mut fresh = JsonStorage::open(&path);
    fresh.load().unwrap();
    let added = assign_citation_keys(
        vec![reference("c.pdf", Some("Kathy Jones"), Some(2021))],
        &fresh.citation_keys(),
    );
    assert_eq!(added[0].citation_key.as_deref(), Some("jones2021b"));
    fresh.extend(added);
    fresh.save().unwrap();

    fresh.load().unwrap();
    assert_eq!(fresh.citation_keys(), ["jones2021", "jones2021a", "jones2021b"]);
}

#[test]
fn records_missing_required_fields_fail_to_load() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("references.json");
    std::fs::write(
        &path,
        r#"[{"id": "1", "source_filename": "a.pdf", "status": "complete",
             "chunks": [{"text": "orphan"}]}]"#,
    )
    .unwrap();

    let mut storage = JsonStorage::open(&path);
    assert!(matches!(
        storage.load().unwrap_err(),
        ReferenceError::Storage { .. }
    ));
}

#[test]
fn delete_without_target_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("references.json");
    let mut storage = JsonStorage::open(&path);
    storage.extend([reference("a.pdf", None, None)]);
    storage.save().unwrap();
    let before = std::fs::read(&path).unwrap();

    assert!(matches!(
        storage.delete(&[], false).unwrap_err(),
        ReferenceError::InvalidRequest { .. }
    ));
    assert_eq!(std::fs::read(&path).unwrap(), before);
}
