mod common;

use multifire::{bson::doc, memory::InMemoryBackend, prelude::*};

use common::setup;

async fn seed() -> (InMemoryBackend, Firebase) {
    let (backend, firebase) = setup(&["p1"]).await;

    let cities = [
        (
            "sf",
            doc! {
                "name": "San Francisco",
                "state": "CA",
                "population": 860_000,
                "regions": ["west_coast", "norcal"],
            },
        ),
        (
            "la",
            doc! {
                "name": "Los Angeles",
                "state": "CA",
                "population": 3_900_000,
                "regions": ["west_coast", "socal"],
            },
        ),
        (
            "dc",
            doc! {
                "name": "Washington",
                "state": "DC",
                "population": 680_000,
                "regions": ["east_coast"],
            },
        ),
        (
            "tok",
            doc! {
                "name": "Tokyo",
                "country": "JP",
                "population": 9_000_000,
                "regions": ["kanto"],
            },
        ),
        (
            "bj",
            doc! {
                "name": "Beijing",
                "country": "CN",
                "population": 21_500_000,
                "regions": ["jingjinji", "hebei"],
            },
        ),
    ];

    firebase
        .execute_batch(
            cities
                .into_iter()
                .map(|(id, data)| BatchOperation::set("cities", id, data))
                .collect(),
            Some("p1"),
        )
        .await
        .unwrap();

    (backend, firebase)
}

fn ids(rows: &[QueryDocument]) -> Vec<&str> {
    rows.iter().map(|row| row.id.as_str()).collect()
}

async fn run(firebase: &Firebase, builder: QueryBuilder) -> Vec<QueryDocument> {
    firebase
        .get_query(&builder.project("p1").build(), GetOptions::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn filters_then_orders_then_limits() {
    let (_, firebase) = seed().await;

    let rows = run(
        &firebase,
        Query::builder("cities")
            .filter(Filter::gte("population", 800_000))
            .order_by("population", SortDirection::Desc)
            .limit(3),
    )
    .await;

    assert_eq!(ids(&rows), vec!["bj", "tok", "la"]);
}

#[tokio::test]
async fn ordering_is_deterministic() {
    let (_, firebase) = seed().await;
    let query = || {
        Query::builder("cities")
            .where_op("state", "==", "CA")
            .unwrap()
            .order_by("name", SortDirection::Asc)
    };

    let first = run(&firebase, query()).await;
    let second = run(&firebase, query()).await;

    assert_eq!(ids(&first), vec!["la", "sf"]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn string_operators_build_filters() {
    let (_, firebase) = seed().await;

    let rows = run(
        &firebase,
        Query::builder("cities")
            .where_op("regions", "array-contains", "west_coast")
            .unwrap()
            .where_op("population", "<", 1_000_000)
            .unwrap(),
    )
    .await;
    assert_eq!(ids(&rows), vec!["sf"]);

    let rows = run(
        &firebase,
        Query::builder("cities")
            .where_op("country", "in", vec!["JP", "CN"])
            .unwrap(),
    )
    .await;
    assert_eq!(ids(&rows), vec!["bj", "tok"]);

    assert!(Query::builder("cities").where_op("name", "~=", "x").is_err());
}

#[tokio::test]
async fn cursors_paginate_in_query_order() {
    let (_, firebase) = seed().await;
    let by_population = || Query::builder("cities").order_by("population", SortDirection::Asc);

    let page = run(&firebase, by_population().limit(2)).await;
    assert_eq!(ids(&page), vec!["dc", "sf"]);

    let last = page[1].data.get("population").cloned().unwrap();
    let next = run(&firebase, by_population().start_after(vec![last]).limit(2)).await;
    assert_eq!(ids(&next), vec!["la", "tok"]);

    let window = run(
        &firebase,
        by_population()
            .start_at(vec![860_000.into()])
            .end_before(vec![9_000_000.into()]),
    )
    .await;
    assert_eq!(ids(&window), vec!["sf", "la"]);

    let upto = run(&firebase, by_population().end_at(vec![860_000.into()])).await;
    assert_eq!(ids(&upto), vec!["dc", "sf"]);
}

#[tokio::test]
async fn rows_flatten_with_their_id() {
    let (_, firebase) = seed().await;

    let rows = run(&firebase, Query::builder("cities").filter(Filter::eq("name", "Tokyo"))).await;

    let row = rows[0].to_document();
    assert_eq!(row.get_str("id").unwrap(), "tok");
    assert_eq!(row.get_str("country").unwrap(), "JP");
}

#[tokio::test]
async fn server_source_fails_while_offline() {
    let (backend, firebase) = seed().await;
    backend.firestore_of("p1").await.unwrap().disable_network();

    let spec = Query::builder("cities").project("p1").build();

    let offline = firebase
        .get_query(&spec, GetOptions::source(Source::Server))
        .await;
    assert!(matches!(offline, Err(FirebaseError::Unavailable(_))));

    let cached = firebase
        .get_query(&spec, GetOptions::source(Source::Cache))
        .await
        .unwrap();
    assert_eq!(cached.len(), 5);
}

#[tokio::test]
async fn zero_limit_returns_every_match() {
    let (_, firebase) = seed().await;

    let rows = run(
        &firebase,
        Query::builder("cities").order_by("population", SortDirection::Asc).limit(0),
    )
    .await;

    assert_eq!(ids(&rows), vec!["dc", "sf", "la", "tok", "bj"]);
}

#[tokio::test]
async fn denied_collections_reject_queries() {
    let (backend, firebase) = seed().await;
    backend.firestore_of("p1").await.unwrap().deny_collection("cities").await;

    let result = firebase
        .get_query(&Query::builder("cities").project("p1").build(), GetOptions::default())
        .await;

    assert!(matches!(result, Err(FirebaseError::PermissionDenied(_))));
}
