//! Upsert behaviour through the public API.

use pondb_core::{
    Cmp, CoreError, CoreResult, Database, Filter, Object, PrimaryKey, Query, Record,
    UpdatePolicy, Value,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// A frog keyed by name, with a dictionary of favourite ponds per forest.
#[derive(Debug, Clone, PartialEq)]
struct Frog {
    name: String,
    age: i64,
    species: String,
    owner: String,
    favorite_ponds_by_forest: BTreeMap<String, String>,
}

impl Frog {
    fn new(name: &str, age: i64, species: &str, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            age,
            species: species.to_string(),
            owner: owner.to_string(),
            favorite_ponds_by_forest: BTreeMap::new(),
        }
    }
}

impl Object for Frog {
    const COLLECTION: &'static str = "Frog";

    fn primary_key(&self) -> PrimaryKey {
        PrimaryKey::from(self.name.as_str())
    }

    fn to_record(&self) -> Record {
        Record::new(self.primary_key())
            .with("age", self.age)
            .with("species", self.species.as_str())
            .with("owner", self.owner.as_str())
            .with(
                "favoritePondsByForest",
                Value::dictionary(
                    self.favorite_ponds_by_forest
                        .iter()
                        .map(|(k, v)| (k.clone(), v.as_str())),
                ),
            )
    }

    fn from_record(record: &Record) -> CoreResult<Self> {
        let PrimaryKey::Text(name) = record.key() else {
            return Err(CoreError::invalid_format("frog key must be text"));
        };
        let mut ponds = BTreeMap::new();
        if let Some(dict) = record.get("favoritePondsByForest").and_then(Value::as_dictionary) {
            for (forest, pond) in dict {
                let pond = pond.as_text().ok_or_else(|| CoreError::FieldType {
                    field: format!("favoritePondsByForest.{forest}"),
                    expected: "text",
                    found: pond.type_name(),
                })?;
                ponds.insert(forest.clone(), pond.to_string());
            }
        }
        Ok(Self {
            name: name.clone(),
            age: record.require_integer("age")?,
            species: record.require_text("species")?.to_string(),
            owner: record.require_text("owner")?.to_string(),
            favorite_ponds_by_forest: ponds,
        })
    }
}

fn frog_count(db: &Database) -> usize {
    db.count(&Query::new(Frog::COLLECTION)).unwrap()
}

#[test]
fn replace_all_overwrites_every_field() {
    let db = Database::open_in_memory().unwrap();

    db.upsert_object(&Frog::new("Wirt", 45, "Green", "Jim"), UpdatePolicy::ReplaceAll)
        .unwrap();
    let stored = db
        .upsert_object(&Frog::new("Wirt", 4, "Greyfrog", "L'oric"), UpdatePolicy::ReplaceAll)
        .unwrap();

    assert_eq!(stored, Frog::new("Wirt", 4, "Greyfrog", "L'oric"));
    assert_eq!(frog_count(&db), 1);
    let found: Frog = db.find_object(&"Wirt".into()).unwrap().unwrap();
    assert_eq!(found, Frog::new("Wirt", 4, "Greyfrog", "L'oric"));
}

#[test]
fn insert_only_rejects_existing_key() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_object(&Frog::new("Wirt", 45, "Green", "Jim"), UpdatePolicy::ReplaceAll)
        .unwrap();
    let seq = db.committed_seq();

    let err = db
        .upsert_object(&Frog::new("Wirt", 4, "Greyfrog", "L'oric"), UpdatePolicy::InsertOnly)
        .unwrap_err();

    assert!(matches!(err, CoreError::DuplicateKey { .. }));
    assert_eq!(db.committed_seq(), seq);
    let found: Frog = db.find_object(&"Wirt".into()).unwrap().unwrap();
    assert_eq!(found, Frog::new("Wirt", 45, "Green", "Jim"));
}

#[test]
fn snapshot_values_need_refetch() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_object(&Frog::new("Wirt", 45, "Green", "Jim"), UpdatePolicy::ReplaceAll)
        .unwrap();

    let before: Frog = db.find_object(&"Wirt".into()).unwrap().unwrap();
    let reader = db.read().unwrap();
    db.upsert_object(&Frog::new("Wirt", 4, "Greyfrog", "L'oric"), UpdatePolicy::ReplaceAll)
        .unwrap();

    assert_eq!(before.age, 45);
    let pinned: Frog = reader.get_object(&"Wirt".into()).unwrap().unwrap();
    assert_eq!(pinned.age, 45);
    let after: Frog = db.find_object(&"Wirt".into()).unwrap().unwrap();
    assert_eq!(after.age, 4);
}

#[test]
fn dictionary_updates_and_count_query() {
    let db = Database::open_in_memory().unwrap();
    let mut wirt = Frog::new("Wirt", 4, "Greyfrog", "L'oric");
    wirt.favorite_ponds_by_forest
        .insert("Hundred Acre Wood".into(), "Picnic Pond".into());
    db.upsert_object(&wirt, UpdatePolicy::ReplaceAll).unwrap();
    db.upsert_object(&Frog::new("Jeremiah", 7, "Bullfrog", "Jim"), UpdatePolicy::ReplaceAll)
        .unwrap();

    let many_ponds = Query::new(Frog::COLLECTION)
        .filter(Filter::count("favoritePondsByForest", Cmp::Gt, 1));
    assert!(db.query(&many_ponds).unwrap().is_empty());

    let updated = db
        .write(|txn| {
            let mut changed = false;
            txn.update(Frog::COLLECTION, &"Wirt".into(), |frog| {
                changed = frog.dictionary_set_existing(
                    "favoritePondsByForest",
                    "Hundred Acre Wood",
                    "Lily Pad Pond",
                )?;
                frog.dictionary_put("favoritePondsByForest", "Sherwood Forest", "Miller Pond")?;
                Ok(())
            })?;
            Ok(changed)
        })
        .unwrap();
    assert!(updated);

    let found = db.query(&many_ponds).unwrap();
    assert_eq!(found.len(), 1);
    let frog = Frog::from_record(&found[0]).unwrap();
    assert_eq!(frog.name, "Wirt");
    assert_eq!(
        frog.favorite_ponds_by_forest.get("Hundred Acre Wood").map(String::as_str),
        Some("Lily Pad Pond")
    );
    assert_eq!(
        frog.favorite_ponds_by_forest.get("Sherwood Forest").map(String::as_str),
        Some("Miller Pond")
    );
}

#[test]
fn update_object_in_place() {
    let db = Database::open_in_memory().unwrap();
    db.upsert_object(&Frog::new("Wirt", 4, "Greyfrog", "L'oric"), UpdatePolicy::ReplaceAll)
        .unwrap();

    let frog = db
        .write(|txn| txn.update_object::<Frog, _>(&"Wirt".into(), |f| f.age += 1))
        .unwrap();
    assert_eq!(frog.age, 5);

    let err = db
        .write(|txn| txn.update_object::<Frog, _>(&"Wirt".into(), |f| f.name = "Sylvester".into()))
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidOperation { .. }));
    assert_eq!(frog_count(&db), 1);
}

#[test]
fn delete_by_query() {
    let db = Database::open_in_memory().unwrap();
    db.write(|txn| {
        txn.upsert_object(&Frog::new("Wirt", 4, "Greyfrog", "L'oric"), UpdatePolicy::InsertOnly)?;
        txn.upsert_object(&Frog::new("Jeremiah", 7, "Bullfrog", "Jim"), UpdatePolicy::InsertOnly)?;
        txn.upsert_object(&Frog::new("Freddy", 2, "Bullfrog", "Jim"), UpdatePolicy::InsertOnly)?;
        Ok(())
    })
    .unwrap();

    let jims = Query::new(Frog::COLLECTION).filter(Filter::eq("owner", "Jim"));
    assert_eq!(db.delete_where(&jims).unwrap(), 2);
    assert_eq!(frog_count(&db), 1);
    assert_eq!(db.delete_where(&jims).unwrap(), 0);
}

fn fields_strategy() -> impl Strategy<Value = BTreeMap<String, Value>> {
    let scalar = prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-z ]{0,12}".prop_map(Value::Text),
        Just(Value::Null),
    ];
    prop::collection::btree_map("[a-z]{1,8}", scalar, 0..6)
}

fn key_strategy() -> impl Strategy<Value = PrimaryKey> {
    prop_oneof![
        "[A-Z]{1,4}".prop_map(PrimaryKey::Text),
        (0i64..100).prop_map(PrimaryKey::Integer),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn absent_key_inserts_exactly_one(key in key_strategy(), fields in fields_strategy()) {
        let db = Database::open_in_memory().unwrap();
        let candidate = Record::from_fields(key.clone(), fields);
        db.upsert("C", candidate.clone(), UpdatePolicy::ReplaceAll).unwrap();

        prop_assert_eq!(db.count(&Query::new("C")).unwrap(), 1);
        prop_assert_eq!(db.find("C", &key).unwrap(), Some(candidate));
    }

    #[test]
    fn present_key_takes_candidate_fields(
        key in key_strategy(),
        first in fields_strategy(),
        second in fields_strategy(),
    ) {
        let db = Database::open_in_memory().unwrap();
        db.upsert("C", Record::from_fields(key.clone(), first), UpdatePolicy::ReplaceAll).unwrap();
        let stored = db
            .upsert("C", Record::from_fields(key.clone(), second.clone()), UpdatePolicy::ReplaceAll)
            .unwrap();

        prop_assert_eq!(stored.fields(), &second);
        let found = db.find("C", &key).unwrap().unwrap();
        prop_assert_eq!(found.into_fields(), second);
        prop_assert_eq!(db.count(&Query::new("C")).unwrap(), 1);
    }

    #[test]
    fn repeated_upsert_is_idempotent(
        key in key_strategy(),
        fields in fields_strategy(),
        times in 2usize..5,
    ) {
        let db = Database::open_in_memory().unwrap();
        let candidate = Record::from_fields(key.clone(), fields);
        db.upsert("C", candidate.clone(), UpdatePolicy::ReplaceAll).unwrap();
        let once = db.query(&Query::new("C")).unwrap();
        for _ in 1..times {
            db.upsert("C", candidate.clone(), UpdatePolicy::ReplaceAll).unwrap();
        }
        prop_assert_eq!(db.query(&Query::new("C")).unwrap(), once);
    }

    #[test]
    fn rejecting_policies_leave_store_unchanged(
        key in key_strategy(),
        first in fields_strategy(),
        second in fields_strategy(),
    ) {
        let db = Database::open_in_memory().unwrap();
        let original = Record::from_fields(key.clone(), first);
        db.upsert("C", original.clone(), UpdatePolicy::ReplaceAll).unwrap();

        for policy in [UpdatePolicy::FailOnConflict, UpdatePolicy::InsertOnly] {
            let result = db.upsert("C", Record::from_fields(key.clone(), second.clone()), policy);
            prop_assert!(result.is_err());
            prop_assert!(result.unwrap_err().is_key_violation());
            prop_assert_eq!(db.find("C", &key).unwrap(), Some(original.clone()));
        }
    }

    #[test]
    fn keys_stay_unique_under_mixed_writes(
        ops in prop::collection::vec((key_strategy(), fields_strategy()), 1..30),
    ) {
        let db = Database::open_in_memory().unwrap();
        let mut model: BTreeMap<PrimaryKey, BTreeMap<String, Value>> = BTreeMap::new();
        for (key, fields) in ops {
            db.upsert("C", Record::from_fields(key.clone(), fields.clone()), UpdatePolicy::ReplaceAll)
                .unwrap();
            model.insert(key, fields);
        }

        let stored = db.query(&Query::new("C")).unwrap();
        prop_assert_eq!(stored.len(), model.len());
        for (record, (key, fields)) in stored.iter().zip(model.iter()) {
            prop_assert_eq!(record.key(), key);
            prop_assert_eq!(record.fields(), fields);
        }
    }
}
