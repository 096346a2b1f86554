mod common;

use campfire::cache::CacheKey;
use campfire::{FieldSpec, ObjectCache, ObjectError, Record, persistent_object};
use common::{Harness, Screen};

persistent_object! {
    pub struct Broken {
        table: "broken",
        key: "intBrokenID",
        demo: r#"[{"strName": "ok"}, {"strMissing": "nope"}]"#,
        fields {
            str_name: String = "strName" => FieldSpec::varchar(16),
        }
    }
}

persistent_object! {
    pub struct NotAList {
        table: "notalist",
        key: "intID",
        demo: r#"{"strName": "ok"}"#,
        fields {
            str_name: String = "strName" => FieldSpec::varchar(16),
        }
    }
}

#[tokio::test]
async fn test_seed_demo_rebuilds_table_in_dataset_order() {
    let h = Harness::new().await;
    h.create_screen("Stale Screen").await;
    h.create_screen("Another").await;

    let created = Record::<Screen>::seed_demo(&h.deps).await.unwrap();
    assert_eq!(created, 3);

    let screens = Record::<Screen>::broker_all(&h.deps).await.unwrap();
    let rows: Vec<(Option<i64>, &str)> = screens
        .iter()
        .map(|screen| (screen.id(), screen.data().str_screen.as_str()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (Some(1), "Base of Stairs"),
            (Some(2), "Top of Stairs"),
            (Some(3), "Main Hall"),
        ]
    );

    let cached = Record::<Screen>::broker_by_id(&h.deps, 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cached.data().str_screen, "Base of Stairs");
}

#[tokio::test]
async fn test_seed_demo_is_reproducible() {
    let h = Harness::new().await;
    Record::<Screen>::seed_demo(&h.deps).await.unwrap();
    let first: Vec<_> = Record::<Screen>::broker_all(&h.deps)
        .await
        .unwrap()
        .into_iter()
        .map(|screen| (screen.id(), screen.into_data()))
        .collect();

    Record::<Screen>::seed_demo(&h.deps).await.unwrap();
    let second: Vec<_> = Record::<Screen>::broker_all(&h.deps)
        .await
        .unwrap()
        .into_iter()
        .map(|screen| (screen.id(), screen.into_data()))
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_seed_demo_clears_cached_rows_of_the_type_only() {
    let h = Harness::new().await;
    h.create_screen("Stale Screen").await;
    h.cache
        .put(CacheKey::new("Room", 1), vec![campfire::Value::Integer(1)]);

    Record::<Screen>::seed_demo(&h.deps).await.unwrap();
    assert!(h.cache.get(&CacheKey::new("Room", 1)).is_some());

    let cached = h.cache.get(&CacheKey::new("Screen", 1)).unwrap();
    assert_eq!(cached[1], campfire::Value::from("Base of Stairs"));
}

#[tokio::test]
async fn test_malformed_demo_data_is_reported() {
    let h = Harness::new().await;

    Record::<Broken>::initialize(&h.deps).await.unwrap();
    for name in ["first", "second", "third"] {
        let mut broken = Record::<Broken>::new(h.deps.clone());
        broken.set_key("strName", name);
        broken.create(None).await.unwrap();
    }
    let before = h.statements().await;

    let err = Record::<Broken>::seed_demo(&h.deps).await.unwrap_err();
    assert!(matches!(err, ObjectError::DemoData { entity: "Broken", .. }));
    assert!(err.to_string().contains("strMissing"));
    assert_eq!(h.statements().await, before);

    let names: Vec<String> = Record::<Broken>::broker_all(&h.deps)
        .await
        .unwrap()
        .into_iter()
        .map(|broken| broken.into_data().str_name)
        .collect();
    assert_eq!(names, vec!["first", "second", "third"]);

    let err = Record::<NotAList>::seed_demo(&h.deps).await.unwrap_err();
    assert!(err.is_contract_violation());
    assert!(!h.backend.table_exists("notalist").await);
}
