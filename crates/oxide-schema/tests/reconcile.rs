//! Reconciliation against an in-memory catalog.
//!
//! Each test introspects a [`Catalog`], reconciles one table definition and
//! checks both the statements that reached the connection and the snapshot
//! left behind.

mod common;

use common::{Catalog, RecordingConnection};
use oxide_schema::{
    Action, ColumnDefault, ColumnDefinition, DdlGenerator, Error, Introspector, ReconcileOptions,
    Reconciler, SchemaSnapshot, SemanticType, TableDefinition, Value,
};

fn order_table() -> TableDefinition {
    TableDefinition::new("order")
        .column(
            ColumnDefinition::new("order", "id", SemanticType::UniqueId)
                .default(ColumnDefault::AutoGeneratedId),
        )
        .column(ColumnDefinition::new("order", "total", SemanticType::Numeric))
        .column(ColumnDefinition::new("order", "note", SemanticType::Text).nullable())
}

fn order_catalog() -> Catalog {
    Catalog::default()
        .table("order")
        .column("order", "id", "uuid", false, Some("uuidv7()"))
        .column("order", "total", "numeric", false, None)
        .column("order", "note", "character varying", true, None)
        .primary_key("order", "order_pkey", &["id"])
}

fn snapshot(conn: &RecordingConnection) -> SchemaSnapshot {
    Introspector::new(conn).build_snapshot().unwrap()
}

fn reconcile(
    conn: &RecordingConnection,
    options: ReconcileOptions,
    expected: &TableDefinition,
    actual: &mut SchemaSnapshot,
) -> Result<Vec<Action>, Error> {
    Reconciler::new(conn, DdlGenerator::new(), options).reconcile(expected, "Order", actual)
}

const MIGRATE: ReconcileOptions = ReconcileOptions::migrate();
const STRICT: ReconcileOptions = ReconcileOptions {
    auto_migrate: false,
    dry_run: false,
};

// =============================================================================
// Creation and convergence
// =============================================================================

#[test]
fn test_empty_database_creates_order_table() {
    let conn = RecordingConnection::empty();
    let mut actual = snapshot(&conn);

    let actions = reconcile(&conn, MIGRATE, &order_table(), &mut actual).unwrap();

    assert_eq!(actions.len(), 5);
    assert_eq!(
        conn.executed_sql(),
        [
            r#"CREATE TABLE IF NOT EXISTS "order" ()"#,
            r#"ALTER TABLE "order" ADD COLUMN IF NOT EXISTS "id" UUID NOT NULL DEFAULT uuidv7()"#,
            r#"ALTER TABLE "order" ADD COLUMN IF NOT EXISTS "total" NUMERIC NOT NULL"#,
            r#"ALTER TABLE "order" ADD COLUMN IF NOT EXISTS "note" VARCHAR"#,
            r#"ALTER TABLE "order" ADD CONSTRAINT "order_pkey" PRIMARY KEY ("id")"#,
        ]
    );

    let table = actual.table("order").unwrap();
    assert_eq!(table.primary_key, ["id"]);
    assert_eq!(table.primary_key_constraint.as_deref(), Some("order_pkey"));
}

#[test]
fn test_second_pass_is_a_no_op() {
    let conn = RecordingConnection::empty();
    let mut actual = snapshot(&conn);

    reconcile(&conn, MIGRATE, &order_table(), &mut actual).unwrap();
    conn.clear();

    let actions = reconcile(&conn, MIGRATE, &order_table(), &mut actual).unwrap();
    assert!(actions.is_empty());
    assert!(conn.executed_sql().is_empty());
}

#[test]
fn test_matching_database_is_a_no_op() {
    for options in [MIGRATE, STRICT] {
        let conn = RecordingConnection::new(order_catalog());
        let mut actual = snapshot(&conn);
        let before = actual.clone();

        let actions = reconcile(&conn, options, &order_table(), &mut actual).unwrap();

        assert!(actions.is_empty());
        assert!(conn.executed_sql().is_empty());
        assert_eq!(actual, before);
    }
}

#[test]
fn test_serial_id_table() {
    let conn = RecordingConnection::empty();
    let mut actual = snapshot(&conn);
    let users = TableDefinition::new("user_account")
        .column(
            ColumnDefinition::new("user_account", "id", SemanticType::Integer)
                .default(ColumnDefault::AutoSequential),
        )
        .column(
            ColumnDefinition::new("user_account", "active", SemanticType::Boolean)
                .default(ColumnDefault::Literal(Value::Boolean(true))),
        );

    reconcile(&conn, MIGRATE, &users, &mut actual).unwrap();

    assert_eq!(
        conn.executed_sql()[1..3],
        [
            r#"ALTER TABLE "user_account" ADD COLUMN IF NOT EXISTS "id" SERIAL NOT NULL"#,
            r#"ALTER TABLE "user_account" ADD COLUMN IF NOT EXISTS "active" BOOLEAN NOT NULL DEFAULT 'true'"#,
        ]
    );
}

#[test]
fn test_keyless_table_gets_no_primary_key() {
    let conn = RecordingConnection::empty();
    let mut actual = snapshot(&conn);
    let log = TableDefinition::new("audit_log")
        .column(ColumnDefinition::new("audit_log", "line", SemanticType::Text));

    let actions = reconcile(&conn, MIGRATE, &log, &mut actual).unwrap();

    assert_eq!(actions.len(), 2);
    assert!(!conn
        .executed_sql()
        .iter()
        .any(|sql| sql.contains("PRIMARY KEY")));
}

// =============================================================================
// Refusals
// =============================================================================

#[test]
fn test_missing_table_without_auto_migrate() {
    let conn = RecordingConnection::empty();
    let mut actual = snapshot(&conn);

    let err = reconcile(&conn, STRICT, &order_table(), &mut actual).unwrap_err();

    assert!(matches!(
        err,
        Error::TableNotFound { ref table, ref model } if table == "order" && model == "Order"
    ));
    assert!(conn.executed_sql().is_empty());
    assert!(actual.tables.is_empty());
}

#[test]
fn test_missing_column_without_auto_migrate() {
    let catalog = Catalog::default()
        .table("order")
        .column("order", "id", "uuid", false, Some("uuidv7()"))
        .primary_key("order", "order_pkey", &["id"]);
    let conn = RecordingConnection::new(catalog);
    let mut actual = snapshot(&conn);

    let err = reconcile(&conn, STRICT, &order_table(), &mut actual).unwrap_err();

    assert!(matches!(
        err,
        Error::ColumnNotFound { ref column, ref table } if column == "total" && table == "order"
    ));
    assert!(conn.executed_sql().is_empty());
}

#[test]
fn test_type_change_is_always_refused() {
    for options in [MIGRATE, STRICT] {
        let catalog = Catalog::default()
            .table("order")
            .column("order", "id", "uuid", false, Some("uuidv7()"))
            .column("order", "total", "integer", false, None)
            .column("order", "note", "character varying", true, None);
        let conn = RecordingConnection::new(catalog);
        let mut actual = snapshot(&conn);

        let err = reconcile(&conn, options, &order_table(), &mut actual).unwrap_err();

        assert!(matches!(
            err,
            Error::ColumnTypeMismatch { ref column, actual: SemanticType::Integer } if column == "total"
        ));
        assert!(conn.executed_sql().is_empty());
    }
}

#[test]
fn test_nullability_tightening_is_always_refused() {
    for options in [MIGRATE, STRICT] {
        let catalog = Catalog::default()
            .table("order")
            .column("order", "id", "uuid", false, Some("uuidv7()"))
            .column("order", "total", "numeric", true, None)
            .column("order", "note", "character varying", true, None);
        let conn = RecordingConnection::new(catalog);
        let mut actual = snapshot(&conn);

        let err = reconcile(&conn, options, &order_table(), &mut actual).unwrap_err();

        assert!(matches!(err, Error::ColumnNullable { ref column } if column == "total"));
        assert!(conn.executed_sql().is_empty());
    }
}

// =============================================================================
// Column repairs
// =============================================================================

fn order_catalog_with_required_note() -> Catalog {
    Catalog::default()
        .table("order")
        .column("order", "id", "uuid", false, Some("uuidv7()"))
        .column("order", "total", "numeric", false, None)
        .column("order", "note", "character varying", false, None)
        .primary_key("order", "order_pkey", &["id"])
}

#[test]
fn test_relax_nullability() {
    let conn = RecordingConnection::new(order_catalog_with_required_note());
    let mut actual = snapshot(&conn);

    reconcile(&conn, MIGRATE, &order_table(), &mut actual).unwrap();

    assert_eq!(
        conn.executed_sql(),
        [r#"ALTER TABLE "order" ALTER COLUMN "note" DROP NOT NULL"#]
    );
    assert!(
        actual
            .table("order")
            .unwrap()
            .get_column("note")
            .unwrap()
            .nullable
    );
}

#[test]
fn test_relax_nullability_without_auto_migrate() {
    let conn = RecordingConnection::new(order_catalog_with_required_note());
    let mut actual = snapshot(&conn);

    let err = reconcile(&conn, STRICT, &order_table(), &mut actual).unwrap_err();

    assert!(matches!(err, Error::ColumnNotNullable { ref column } if column == "note"));
    assert!(conn.executed_sql().is_empty());
}

fn counter_table(default: ColumnDefault) -> TableDefinition {
    TableDefinition::new("counter")
        .column(
            ColumnDefinition::new("counter", "id", SemanticType::Integer)
                .default(ColumnDefault::AutoSequential),
        )
        .column(ColumnDefinition::new("counter", "step", SemanticType::Integer).default(default))
}

fn counter_catalog(id_default: Option<&str>, step_default: Option<&str>) -> Catalog {
    Catalog::default()
        .table("counter")
        .column("counter", "id", "integer", false, id_default)
        .column("counter", "step", "integer", false, step_default)
        .primary_key("counter", "counter_pkey", &["id"])
}

const SERIAL: Option<&str> = Some("nextval('counter_id_seq'::regclass)");

#[test]
fn test_change_literal_default() {
    let conn = RecordingConnection::new(counter_catalog(SERIAL, Some("1")));
    let mut actual = snapshot(&conn);
    let expected = counter_table(ColumnDefault::Literal(Value::Integer(2)));

    reconcile(&conn, MIGRATE, &expected, &mut actual).unwrap();

    assert_eq!(
        conn.executed_sql(),
        [r#"ALTER TABLE "counter" ALTER COLUMN "step" SET DEFAULT '2'"#]
    );
    assert_eq!(
        actual.table("counter").unwrap().get_column("step").unwrap().default,
        ColumnDefault::Literal(Value::Integer(2))
    );
}

#[test]
fn test_default_mismatch_without_auto_migrate() {
    let conn = RecordingConnection::new(counter_catalog(SERIAL, Some("1")));
    let mut actual = snapshot(&conn);
    let expected = counter_table(ColumnDefault::Literal(Value::Integer(2)));

    let err = reconcile(&conn, STRICT, &expected, &mut actual).unwrap_err();

    assert!(matches!(err, Error::ColumnDefaultMismatch { ref column } if column == "step"));
}

#[test]
fn test_drop_default() {
    let conn = RecordingConnection::new(counter_catalog(SERIAL, Some("1")));
    let mut actual = snapshot(&conn);

    reconcile(&conn, MIGRATE, &counter_table(ColumnDefault::NoDefault), &mut actual).unwrap();

    assert_eq!(
        conn.executed_sql(),
        [r#"ALTER TABLE "counter" ALTER COLUMN "step" DROP DEFAULT"#]
    );
}

#[test]
fn test_sequence_default_on_existing_column() {
    let conn = RecordingConnection::new(counter_catalog(None, None));
    let mut actual = snapshot(&conn);

    let actions =
        reconcile(&conn, MIGRATE, &counter_table(ColumnDefault::NoDefault), &mut actual).unwrap();

    assert_eq!(actions.len(), 2);
    assert_eq!(
        conn.executed_sql(),
        [
            r#"CREATE SEQUENCE IF NOT EXISTS "counter_id_seq" OWNED BY "counter"."id""#,
            r#"ALTER TABLE "counter" ALTER COLUMN "id" SET DEFAULT nextval('"counter_id_seq"'::regclass)"#,
        ]
    );
}

#[test]
fn test_literal_is_not_a_sentinel() {
    let conn = RecordingConnection::new(counter_catalog(Some("1"), None));
    let mut actual = snapshot(&conn);

    let err = reconcile(
        &conn,
        STRICT,
        &counter_table(ColumnDefault::NoDefault),
        &mut actual,
    )
    .unwrap_err();

    assert!(matches!(err, Error::ColumnDefaultMismatch { ref column } if column == "id"));
}

#[test]
fn test_unparsed_default_converges() {
    let catalog = Catalog::default()
        .table("event")
        .column("event", "at", "timestamp without time zone", false, Some("CURRENT_TIMESTAMP"));
    let conn = RecordingConnection::new(catalog);
    let mut actual = snapshot(&conn);
    assert_eq!(
        actual.table("event").unwrap().get_column("at").unwrap().default,
        ColumnDefault::Unparsed("CURRENT_TIMESTAMP".into())
    );

    let expected = TableDefinition::new("event")
        .column(ColumnDefinition::new("event", "at", SemanticType::Timestamp));
    reconcile(&conn, MIGRATE, &expected, &mut actual).unwrap();
    assert_eq!(
        conn.executed_sql(),
        [r#"ALTER TABLE "event" ALTER COLUMN "at" DROP DEFAULT"#]
    );

    conn.clear();
    assert!(reconcile(&conn, MIGRATE, &expected, &mut actual)
        .unwrap()
        .is_empty());
}

// =============================================================================
// Primary keys
// =============================================================================

fn pair_table() -> TableDefinition {
    TableDefinition::new("pair")
        .column(ColumnDefinition::new("pair", "a", SemanticType::Integer))
        .column(ColumnDefinition::new("pair", "b", SemanticType::Integer))
        .with_primary_key(["a", "b"])
}

fn pair_catalog(key: &[&str]) -> Catalog {
    Catalog::default()
        .table("pair")
        .column("pair", "a", "integer", false, None)
        .column("pair", "b", "integer", false, None)
        .primary_key("pair", "pair_key_legacy", key)
}

#[test]
fn test_primary_key_order_matters() {
    let conn = RecordingConnection::new(pair_catalog(&["b", "a"]));
    let mut actual = snapshot(&conn);

    reconcile(&conn, MIGRATE, &pair_table(), &mut actual).unwrap();

    assert_eq!(
        conn.executed_sql(),
        [
            r#"ALTER TABLE "pair" DROP CONSTRAINT "pair_key_legacy""#,
            r#"ALTER TABLE "pair" ADD CONSTRAINT "pair_pkey" PRIMARY KEY ("a", "b")"#,
        ]
    );
    let table = actual.table("pair").unwrap();
    assert_eq!(table.primary_key, ["a", "b"]);
    assert_eq!(table.primary_key_constraint.as_deref(), Some("pair_pkey"));
}

#[test]
fn test_matching_primary_key() {
    let conn = RecordingConnection::new(pair_catalog(&["a", "b"]));
    let mut actual = snapshot(&conn);

    assert!(reconcile(&conn, STRICT, &pair_table(), &mut actual)
        .unwrap()
        .is_empty());
}

#[test]
fn test_primary_key_change_requires_auto_migrate() {
    let conn = RecordingConnection::new(pair_catalog(&["b", "a"]));
    let mut actual = snapshot(&conn);

    let err = reconcile(&conn, STRICT, &pair_table(), &mut actual).unwrap_err();

    match err {
        Error::PrimaryKeyMismatch {
            table,
            expected,
            actual: found,
        } => {
            assert_eq!(table, "pair");
            assert_eq!(expected, ["a", "b"]);
            assert_eq!(found, ["b", "a"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(conn.executed_sql().is_empty());
    assert_eq!(actual.table("pair").unwrap().primary_key, ["b", "a"]);
}

#[test]
fn test_missing_primary_key_is_created() {
    let catalog = Catalog::default()
        .table("pair")
        .column("pair", "a", "integer", false, None)
        .column("pair", "b", "integer", false, None);
    let conn = RecordingConnection::new(catalog);
    let mut actual = snapshot(&conn);

    reconcile(&conn, MIGRATE, &pair_table(), &mut actual).unwrap();

    assert_eq!(
        conn.executed_sql(),
        [r#"ALTER TABLE "pair" ADD CONSTRAINT "pair_pkey" PRIMARY KEY ("a", "b")"#]
    );
}

// =============================================================================
// Failure semantics
// =============================================================================

#[test]
fn test_applied_changes_survive_a_later_error() {
    let catalog = Catalog::default()
        .table("order")
        .column("order", "id", "uuid", false, Some("uuidv7()"))
        .column("order", "note", "character varying", true, None)
        .column("order", "total", "integer", false, None);
    let conn = RecordingConnection::new(catalog);
    let mut actual = snapshot(&conn);

    let expected = TableDefinition::new("order")
        .column(
            ColumnDefinition::new("order", "id", SemanticType::UniqueId)
                .default(ColumnDefault::AutoGeneratedId),
        )
        .column(ColumnDefinition::new("order", "placed", SemanticType::Timestamp).nullable())
        .column(ColumnDefinition::new("order", "total", SemanticType::Numeric));

    let err = reconcile(&conn, MIGRATE, &expected, &mut actual).unwrap_err();

    assert!(matches!(err, Error::ColumnTypeMismatch { .. }));
    assert_eq!(conn.executed_sql().len(), 1);
    let table = actual.table("order").unwrap();
    assert!(table.get_column("placed").is_some());
    assert_eq!(
        table.get_column("total").unwrap().ty,
        SemanticType::Integer
    );
}

#[test]
fn test_failed_statement_leaves_snapshot_untouched() {
    let conn = RecordingConnection::empty().failing_on("ADD CONSTRAINT");
    let mut actual = snapshot(&conn);

    let err = reconcile(&conn, MIGRATE, &order_table(), &mut actual).unwrap_err();

    assert!(matches!(err, Error::Connection(_)));
    let table = actual.table("order").unwrap();
    assert_eq!(table.columns.len(), 3);
    assert!(table.primary_key.is_empty());
}

#[test]
fn test_dry_run_plans_without_executing() {
    let conn = RecordingConnection::empty();
    let mut actual = snapshot(&conn);

    let actions = reconcile(
        &conn,
        MIGRATE.with_dry_run(true),
        &order_table(),
        &mut actual,
    )
    .unwrap();

    assert_eq!(actions.len(), 5);
    assert!(matches!(actions[0], Action::CreateTable { .. }));
    assert!(matches!(actions[4], Action::CreatePrimaryKey { .. }));
    assert!(conn.executed_sql().is_empty());
    assert!(actual.contains("order"));
}
