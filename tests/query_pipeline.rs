//! Query Pipeline Tests
//!
//! End-to-end tests through the database handle:
//! - Operators, joins, grouping, having, ordering and windows
//! - Predicate updates and rejected queries
//! - TTL expiry and change event order
//! - Queue-queries mode and cost classification
//! - Configuration loaded from a file

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde_json::json;
use tabula::{
    ChangeAction, ColumnDef, Database, DatabaseConfig, ErrorCategory, EventKind, JoinKind,
    JoinSpec, Op, Query, Row, SortSpec, TableConfig, Value, Where,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn row(value: serde_json::Value) -> Row {
    match Value::from(value) {
        Value::Map(m) => m,
        other => panic!("not a row: {:?}", other),
    }
}

fn rows(values: serde_json::Value) -> Vec<Row> {
    match values {
        serde_json::Value::Array(items) => items.into_iter().map(row).collect(),
        other => vec![row(other)],
    }
}

fn config() -> DatabaseConfig {
    DatabaseConfig::new("pipeline")
        .with_table(TableConfig::new(
            "users",
            vec![
                ColumnDef::new("id", "int").with_prop("pk").with_prop("ai"),
                ColumnDef::new("name", "string").with_prop("trie"),
                ColumnDef::new("age", "int"),
                ColumnDef::new("team", "int").with_prop("idx"),
                ColumnDef::new("tags", "string[]"),
                ColumnDef::new("active", "bool").with_default(true),
            ],
        ))
        .with_table(TableConfig::new(
            "teams",
            vec![
                ColumnDef::new("id", "int").with_prop("pk"),
                ColumnDef::new("title", "string"),
            ],
        ))
        .with_table(TableConfig::new(
            "orders",
            vec![
                ColumnDef::new("id", "int").with_prop("pk").with_prop("ai"),
                ColumnDef::new("customer", "string").with_prop("idx"),
                ColumnDef::new("amount", "int"),
            ],
        ))
        .with_table(TableConfig::new(
            "places",
            vec![
                ColumnDef::new("id", "int").with_prop("pk").with_prop("ai"),
                ColumnDef::new("city", "string"),
                ColumnDef::new("lat", "float"),
                ColumnDef::new("lon", "float"),
            ],
        ))
}

async fn seeded() -> Database {
    let db = Database::in_memory(config());
    db.connect().await.unwrap();

    db.query(Query::upsert(
        "users",
        rows(json!([
            {"name": "ann", "age": 31, "team": 1, "tags": ["admin", "dev"]},
            {"name": "andy", "age": 17, "team": 2, "tags": ["dev"]},
            {"name": "bob", "age": 45, "team": 1, "tags": []},
            {"name": "cleo", "age": 15, "team": 9, "tags": ["ops"]}
        ])),
    ))
    .await
    .unwrap();
    db.query(Query::upsert(
        "teams",
        rows(json!([{"id": 1, "title": "red"}, {"id": 2, "title": "blue"}])),
    ))
    .await
    .unwrap();
    db.query(Query::upsert(
        "orders",
        rows(json!([
            {"customer": "alice", "amount": 5},
            {"customer": "alice", "amount": 10},
            {"customer": "bob", "amount": 3},
            {"customer": "carol", "amount": 20},
            {"customer": "carol", "amount": 1},
            {"customer": "dave", "amount": 12}
        ])),
    ))
    .await
    .unwrap();
    db.query(Query::upsert(
        "places",
        rows(json!([
            {"city": "London", "lat": 51.5074, "lon": -0.1278},
            {"city": "Paris", "lat": 48.8566, "lon": 2.3522}
        ])),
    ))
    .await
    .unwrap();
    db
}

fn column(rows: &[Row], key: &str) -> Vec<Value> {
    rows.iter().map(|r| r.get(key).cloned().unwrap_or_default()).collect()
}

fn names(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.get("name").and_then(Value::as_str).map(str::to_string))
        .collect()
}

// =============================================================================
// Operators
// =============================================================================

/// Pattern, array and prefix operators select the expected rows.
#[tokio::test]
async fn test_operators() {
    let db = seeded().await;

    let like = db
        .query(Query::select("users").filter(Where::cond("name", Op::Like, "an%")))
        .await
        .unwrap();
    assert_eq!(names(like.rows()), vec!["ann", "andy"]);

    let have = db
        .query(Query::select("users").filter(Where::cond("tags", Op::Have, "dev")))
        .await
        .unwrap();
    assert_eq!(names(have.rows()), vec!["ann", "andy"]);

    let prefix = db
        .query(Query::select("users").filter(Where::cond("name", Op::Prefix, "AN")))
        .await
        .unwrap();
    assert_eq!(names(prefix.rows()), vec!["ann", "andy"]);

    let within = db
        .query(Query::select("users").filter(Where::and(vec![
            Where::cond("age", Op::Gte, 17),
            Where::negate(Where::cond("team", Op::In, vec![Value::Int(2)])),
        ])))
        .await
        .unwrap();
    assert_eq!(names(within.rows()), vec!["ann", "bob"]);
}

/// Predicate helpers compute per row values.
#[tokio::test]
async fn test_predicate_helper() {
    let db = seeded().await;
    let near = db
        .query(Query::select("places").filter(
            Where::from_json(&json!(["CROW(lat, lon, 51.5, -0.1)", "<", 50])).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(column(near.rows(), "city"), vec![Value::from("London")]);
    assert_eq!(near.class().as_str(), "fn");
}

// =============================================================================
// Joins, Grouping and Windows
// =============================================================================

/// A left join keeps unmatched users with a null-filled team side.
#[tokio::test]
async fn test_left_join_null_fills() {
    let db = seeded().await;
    let joined = db
        .query(
            Query::select("users")
                .join(JoinSpec::new(JoinKind::Left, "teams", "users.team", Op::Eq, "teams.id"))
                .order_by(SortSpec::asc("users.id")),
        )
        .await
        .unwrap();

    assert_eq!(joined.len(), 4);
    assert_eq!(
        column(joined.rows(), "teams.title"),
        vec![
            Value::from("red"),
            Value::from("blue"),
            Value::from("red"),
            Value::Null
        ]
    );
}

/// WHERE narrows the base table before the join; inner joins drop
/// unmatched rows.
#[tokio::test]
async fn test_where_applies_before_inner_join() {
    let db = seeded().await;
    let joined = db
        .query(
            Query::select("users")
                .filter(Where::cond("age", Op::Gt, 16))
                .join(JoinSpec::new(JoinKind::Inner, "teams", "users.team", Op::Eq, "teams.id")),
        )
        .await
        .unwrap();

    let mut people = column(joined.rows(), "users.name");
    people.sort();
    assert_eq!(
        people,
        vec![Value::from("andy"), Value::from("ann"), Value::from("bob")]
    );
}

/// Group, having, order, offset and limit run in that order.
#[tokio::test]
async fn test_group_having_order_window() {
    let db = seeded().await;
    let query = || {
        Query::select("orders")
            .columns(&["customer", "SUM(amount) AS total"])
            .unwrap()
            .group_by(&["customer"])
            .having(Where::cond("total", Op::Gt, 10))
            .order_by(SortSpec::desc("total"))
    };

    let top = db.query(query().limit(2)).await.unwrap();
    assert_eq!(
        column(top.rows(), "customer"),
        vec![Value::from("carol"), Value::from("alice")]
    );
    assert_eq!(top.rows()[0]["total"].as_f64(), Some(21.0));

    let rest = db.query(query().offset(1)).await.unwrap();
    assert_eq!(
        column(rest.rows(), "customer"),
        vec![Value::from("alice"), Value::from("dave")]
    );
}

/// Aggregates without GROUP BY fold every row into one.
#[tokio::test]
async fn test_aggregate_without_grouping() {
    let db = seeded().await;
    let result = db
        .query(
            Query::select("orders")
                .columns(&["COUNT(*) AS n", "MAX(amount) AS top"])
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.rows()[0]["n"], Value::Int(6));
    assert_eq!(result.rows()[0]["top"], Value::Int(20));
}

/// A plain descending window reads the newest keys.
#[tokio::test]
async fn test_descending_window() {
    let db = seeded().await;
    let newest = db
        .query(Query::select("users").order_by(SortSpec::desc("id")).limit(2))
        .await
        .unwrap();
    assert_eq!(names(newest.rows()), vec!["cleo", "bob"]);
    assert_eq!(newest.scanned_count(), 2);
}

/// Ordering may use columns the select list leaves out, and aliases.
#[tokio::test]
async fn test_order_by_unselected_column_and_alias() {
    let db = seeded().await;
    let by_age = db
        .query(
            Query::select("users")
                .columns(&["name"])
                .unwrap()
                .order_by(SortSpec::desc("age")),
        )
        .await
        .unwrap();
    assert_eq!(names(by_age.rows()), vec!["bob", "ann", "andy", "cleo"]);
    assert!(by_age.rows().iter().all(|r| !r.contains_key("age")));

    let oldest = db
        .query(
            Query::select("users")
                .columns(&["name"])
                .unwrap()
                .order_by(SortSpec::asc("age"))
                .offset(1)
                .limit(2),
        )
        .await
        .unwrap();
    assert_eq!(names(oldest.rows()), vec!["andy", "ann"]);

    let shouted = db
        .query(
            Query::select("users")
                .columns(&["UPPER(name) AS shout"])
                .unwrap()
                .order_by(SortSpec::asc("shout")),
        )
        .await
        .unwrap();
    assert_eq!(
        column(shouted.rows(), "shout"),
        vec![
            Value::from("ANDY"),
            Value::from("ANN"),
            Value::from("BOB"),
            Value::from("CLEO")
        ]
    );
}

// =============================================================================
// Writes
// =============================================================================

/// An upsert with a predicate patches every matching row.
#[tokio::test]
async fn test_predicate_upsert_patches_matches() {
    let db = seeded().await;
    let patched = db
        .query(
            Query::upsert("users", rows(json!({"active": false})))
                .filter(Where::cond("age", Op::Lt, 18)),
        )
        .await
        .unwrap();
    assert_eq!(names(patched.rows()), vec!["andy", "cleo"]);

    let inactive = db
        .query(Query::select("users").filter(Where::eq("active", false)))
        .await
        .unwrap();
    assert_eq!(names(inactive.rows()), vec!["andy", "cleo"]);
    // untouched columns survive the patch
    assert_eq!(inactive.rows()[0]["age"], Value::Int(17));
}

/// Rejected queries report a configuration error and change nothing.
#[tokio::test]
async fn test_rejected_queries() {
    let db = seeded().await;

    let err = db.query(Query::select("ghosts")).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);

    let err = db
        .query(Query::select("users").columns(&["NOPE(name)"]).unwrap())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);

    let err = db
        .query(Query::select("users").filter(Where::cond("age", Op::Between, 3)))
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);

    assert_eq!(db.query(Query::select("users")).await.unwrap().len(), 4);
}

// =============================================================================
// TTL and Events
// =============================================================================

/// Expired rows read as absent and are purged by the next write.
#[tokio::test]
async fn test_ttl_expiry_and_purge() {
    let db = Database::in_memory(
        DatabaseConfig::new("ttl").with_table(
            TableConfig::new(
                "sessions",
                vec![
                    ColumnDef::new("id", "int").with_prop("pk"),
                    ColumnDef::new("user", "string"),
                ],
            )
            .with_ttl(1),
        ),
    );
    db.connect().await.unwrap();
    let (_, mut deletes) = db.subscribe("sessions", EventKind::Delete).unwrap();

    db.query(Query::upsert("sessions", rows(json!({"id": 1, "user": "ann"}))))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert!(db.query(Query::select("sessions")).await.unwrap().is_empty());
    // reads never purge
    assert!(db.adapter().read_pk("sessions", &Value::Int(1)).await.unwrap().is_some());

    db.query(Query::upsert("sessions", rows(json!({"id": 2, "user": "bob"}))))
        .await
        .unwrap();
    let purged = deletes.try_recv().unwrap();
    assert_eq!(purged.action, ChangeAction::Delete);
    assert_eq!(purged.affected_keys, vec![Value::Int(1)]);
    assert!(db.adapter().read_pk("sessions", &Value::Int(1)).await.unwrap().is_none());

    let live = db.query(Query::select("sessions")).await.unwrap();
    assert_eq!(column(live.rows(), "id"), vec![Value::Int(2)]);
}

/// Events arrive in commit order, one per row, with a single drop event.
#[tokio::test]
async fn test_event_order() {
    let db = seeded().await;
    let (_, mut events) = db.subscribe("teams", EventKind::Any).unwrap();
    let (_, mut everything) = db.subscribe("*", EventKind::Any).unwrap();

    db.query(Query::upsert(
        "teams",
        rows(json!([{"id": 3, "title": "green"}, {"id": 4, "title": "gold"}])),
    ))
    .await
    .unwrap();
    db.query(Query::delete("teams").filter(Where::eq("id", 3)))
        .await
        .unwrap();
    db.query(Query::drop_rows("teams")).await.unwrap();
    db.query(Query::upsert("orders", rows(json!({"customer": "erin", "amount": 1}))))
        .await
        .unwrap();

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    let actions: Vec<ChangeAction> = received.iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            ChangeAction::Upsert,
            ChangeAction::Upsert,
            ChangeAction::Delete,
            ChangeAction::Drop
        ]
    );
    assert!(received.windows(2).all(|w| w[0].sequence < w[1].sequence));
    assert_eq!(received[3].affected_keys.len(), 3);
    assert!(received.iter().all(|e| e.source == "pipeline"));

    let mut tables = Vec::new();
    while let Ok(event) = everything.try_recv() {
        tables.push(event.table);
    }
    assert_eq!(tables.len(), 5);
    assert_eq!(tables.last().map(String::as_str), Some("orders"));
}

/// Unchanged writes publish nothing.
#[tokio::test]
async fn test_unchanged_write_is_silent() {
    let db = seeded().await;
    let (_, mut events) = db.subscribe("teams", EventKind::Upsert).unwrap();

    db.query(Query::upsert("teams", rows(json!({"id": 1, "title": "red"}))))
        .await
        .unwrap();
    assert!(events.try_recv().is_err());
}

// =============================================================================
// Scheduling and Planning
// =============================================================================

/// Concurrent queries on a queued instance all complete with distinct keys.
#[tokio::test]
async fn test_queue_mode_serializes_writes() {
    let db = Arc::new(Database::in_memory(DatabaseConfig {
        queue_queries: true,
        ..config()
    }));
    db.connect().await.unwrap();

    let writes = (0..10).map(|i| {
        let db = db.clone();
        async move {
            db.query(Query::upsert("orders", rows(json!({"customer": "q", "amount": i}))))
                .await
        }
    });
    let results = join_all(writes).await;

    let mut ids: Vec<i64> = results
        .into_iter()
        .map(|r| r.unwrap().rows()[0]["id"].as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 10);

    let stored = db.query(Query::select("orders")).await.unwrap();
    assert_eq!(stored.len(), 10);
}

/// The same query always gets the same cost class.
#[tokio::test]
async fn test_classification_is_deterministic() {
    let db = seeded().await;
    let cases = [
        (Query::select("users").filter(Where::eq("id", 1)), "fast"),
        (Query::select("users").filter(Where::eq("team", 1)), "fast"),
        (
            Query::select("users").filter(Where::and(vec![
                Where::eq("team", 1),
                Where::cond("age", Op::Gt, 40),
            ])),
            "medium",
        ),
        (Query::select("users").filter(Where::cond("age", Op::Gt, 40)), "slow"),
        (Query::select("users"), "none"),
    ];

    for (query, expected) in cases {
        let first = db.explain(&query).unwrap();
        let second = db.explain(&query).unwrap();
        assert!(first.accepted);
        assert_eq!(first.class.as_deref(), Some(expected));
        assert_eq!(first.class, second.class);

        let ran = db.query(query).await.unwrap();
        assert_eq!(ran.class().as_str(), expected);
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// A database configured from a JSON file registers its tables.
#[tokio::test]
async fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "{}",
        json!({
            "id": "from-file",
            "queue_queries": true,
            "tables": [
                {
                    "name": "sessions",
                    "model": [
                        {"key": "id", "type": "uuid", "props": ["pk"]},
                        {"key": "user", "type": "string"}
                    ],
                    "ttl_secs": 3600
                }
            ]
        })
    )
    .unwrap();

    let config = DatabaseConfig::from_json_file(file.path()).unwrap();
    assert!(config.queue_queries);
    assert_eq!(config.table("sessions").and_then(|t| t.ttl_secs), Some(3600));

    let db = Database::in_memory(config);
    db.connect().await.unwrap();
    assert_eq!(db.table_names().unwrap(), vec!["sessions".to_string()]);

    let written = db
        .query(Query::upsert("sessions", rows(json!({"user": "ann"}))))
        .await
        .unwrap();
    let id = written.rows()[0]["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 36);
}

/// Malformed configuration is reported, not panicked on.
#[test]
fn test_bad_config_rejected() {
    assert!(DatabaseConfig::from_json("{not json").is_err());
    assert!(DatabaseConfig::from_json(
        &json!({"id": "x", "tables": [{"name": "t", "model": [], "ttl_secs": 0}]}).to_string()
    )
    .is_err());
}
