mod common;

use std::collections::HashSet;

use common::{fixture, scenario_rows, Row};
use kanndeutsch::entry::{FieldMode, Gender};
use kanndeutsch::store::{EntryStore, StoreError};

fn opened(rows: &[Row]) -> (common::Fixture, EntryStore) {
    let fx = fixture(rows);
    let store = EntryStore::new(&fx.path);
    store.initialize().expect("initialize");
    (fx, store)
}

fn headwords(entries: &[kanndeutsch::Entry]) -> Vec<&str> {
    entries.iter().map(|e| e.headword.as_str()).collect()
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = EntryStore::new(dir.path().join("nope.db"));
    assert!(matches!(store.initialize(), Err(StoreError::FileNotFound(_))));
    assert!(!store.is_initialized());
}

#[test]
fn empty_table_is_reported() {
    let fx = fixture(&[]);
    let store = EntryStore::new(&fx.path);
    assert!(matches!(store.initialize(), Err(StoreError::EmptyStore)));
    assert!(!store.is_initialized());
}

#[test]
fn queries_before_initialize_fail() {
    let fx = fixture(&scenario_rows());
    let store = EntryStore::new(&fx.path);
    assert!(matches!(store.count(), Err(StoreError::NotInitialized)));
    assert!(matches!(store.random_sample(3), Err(StoreError::NotInitialized)));
    assert!(matches!(
        store.search("haus", FieldMode::Both, 10),
        Err(StoreError::NotInitialized)
    ));
}

#[test]
fn initialize_twice_is_a_no_op() {
    let (_fx, store) = opened(&scenario_rows());
    store.initialize().expect("second initialize");
    assert_eq!(store.count().unwrap(), 3);
}

#[test]
fn close_then_reinitialize() {
    let (_fx, store) = opened(&scenario_rows());
    store.close();
    assert!(matches!(store.count(), Err(StoreError::NotInitialized)));
    store.initialize().unwrap();
    assert_eq!(store.count().unwrap(), 3);
}

#[test]
fn scenario_searches() {
    let (_fx, store) = opened(&scenario_rows());

    let both = store.search("house", FieldMode::Both, 10).unwrap();
    assert_eq!(headwords(&both), vec!["Haus"]);

    let german = store.search("haus", FieldMode::Source, 10).unwrap();
    assert_eq!(headwords(&german), vec!["Haus"]);
    assert_eq!(german[0].gender, Some(Gender::Neuter));

    assert!(store.search("house", FieldMode::Source, 10).unwrap().is_empty());
    assert!(store.search("haus", FieldMode::Target, 10).unwrap().is_empty());
}

#[test]
fn matching_folds_non_ascii_case() {
    let (_fx, store) = opened(&scenario_rows());
    let hits = store.search("TÜR", FieldMode::Source, 10).unwrap();
    assert_eq!(headwords(&hits), vec!["Tür"]);
}

#[test]
fn both_mode_is_a_union_without_duplicates() {
    let rows = vec![
        Row::new(1, "Haus", "house"),
        Row::new(2, "Hausboot", "houseboat"),
        Row::new(3, "Boot", "boat"),
        Row::new(4, "Baum", "tree"),
        Row::new(5, "Treppenhaus", "stairwell"),
    ];
    let (_fx, store) = opened(&rows);

    for term in ["haus", "boat", "o", "tree", "xyz"] {
        let hits = store.search(term, FieldMode::Both, 100).unwrap();
        let expected: Vec<i64> = rows
            .iter()
            .filter(|r| r.german.to_lowercase().contains(term) || r.english.to_lowercase().contains(term))
            .map(|r| r.id)
            .collect();
        let got: Vec<i64> = hits.iter().map(|e| e.id).collect();
        assert_eq!(got, expected, "term {term}");
    }

    // "Hausboot"/"houseboat" matches on both sides but appears once.
    let hits = store.search("hous", FieldMode::Both, 100).unwrap();
    assert_eq!(hits.iter().filter(|e| e.id == 2).count(), 1);
}

#[test]
fn search_respects_limit_in_id_order() {
    let rows: Vec<Row> = (1..=30)
        .map(|id| Row::new(id, "Wort", "word"))
        .collect();
    let (_fx, store) = opened(&rows);
    let hits = store.search("wort", FieldMode::Source, 10).unwrap();
    assert_eq!(hits.iter().map(|e| e.id).collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());
}

#[test]
fn random_sample_bounds() {
    let (_fx, store) = opened(&scenario_rows());

    assert!(store.random_sample(0).unwrap().is_empty());
    assert_eq!(store.random_sample(2).unwrap().len(), 2);

    for n in [3, 10] {
        let sample = store.random_sample(n).unwrap();
        let ids: HashSet<i64> = sample.iter().map(|e| e.id).collect();
        assert_eq!(sample.len(), 3);
        assert_eq!(ids, HashSet::from([1, 2, 3]));
    }
}

#[test]
fn list_columns_decode_or_degrade_to_empty() {
    let mut good = Row::new(1, "Bank", "bench").gender("F");
    good.german_annotations = Some(r#"["Sitzmöbel"]"#);
    good.german_variations = Some(r#"["Bänke", "Sitzbank"]"#);
    good.subject_domain = Some("furniture, everyday");
    good.usage_level = Some("coll.");

    let mut bad = Row::new(2, "Bank", "bank");
    bad.german_annotations = Some("{broken");
    bad.german_variations = Some("");

    let (_fx, store) = opened(&[good, bad]);
    let hits = store.search("bank", FieldMode::Source, 10).unwrap();
    assert_eq!(hits.len(), 2);

    assert_eq!(hits[0].headword_annotations, vec!["Sitzmöbel"]);
    assert_eq!(hits[0].headword_variants, vec!["Bänke", "Sitzbank"]);
    assert!(hits[0].translation_variants.is_empty());
    assert_eq!(hits[0].gender, Some(Gender::Feminine));
    assert_eq!(hits[0].tags(), vec!["furniture", "everyday", "coll."]);

    assert!(hits[1].headword_annotations.is_empty());
    assert!(hits[1].headword_variants.is_empty());
    assert_eq!(hits[1].gender, None);
    assert!(!hits[1].has_additional_info());
}
