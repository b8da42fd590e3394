use assert_matches::assert_matches;
use chrono::NaiveDate;
use mealplan_core::meals::{count_records, load_record, load_week};
use mealplan_core::migrations::{
    detect_schema_version, CURRENT_USER_VERSION, LEGACY_COLUMNS, MEALS_TABLE, USER_COLUMN,
};
use mealplan_core::users::list_users;
use mealplan_core::{
    connect, ensure_schema, ConnectionMethods, ConnectionSpec, DayMeals, SchemaVersion,
    DEFAULT_USER_NAME,
};
use mealplan_test_helper::*;
use mealplan_test_macros::mealplan_test;
use pretty_assertions::assert_eq;

fn jan_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

#[mealplan_test(nomigrate)]
fn empty_store_gets_current_schema(conn: Connection) {
    assert_eq!(detect_schema_version(&conn).unwrap(), SchemaVersion::Empty);
    assert_eq!(ensure_schema(&conn).unwrap(), SchemaVersion::Empty);
    assert_eq!(
        detect_schema_version(&conn).unwrap(),
        SchemaVersion::MultiUser
    );
    assert_eq!(list_users(&conn).unwrap(), vec![DEFAULT_USER_NAME.to_string()]);
    assert_eq!(conn.user_version().unwrap(), CURRENT_USER_VERSION);
    let columns = conn.table_columns(MEALS_TABLE).unwrap();
    assert_eq!(columns[0], USER_COLUMN);
    assert_eq!(columns.len(), 8);
}

#[mealplan_test(nomigrate)]
fn legacy_rows_move_to_default_user(conn: Connection) {
    create_legacy_store(
        &conn,
        &[legacy_row("2024-01-01", "egg", "rice", "soup", "", "")],
    );
    let found = detect_schema_version(&conn).unwrap();
    assert!(found.needs_migration());
    assert_matches!(
        &found,
        SchemaVersion::Legacy { columns } if columns.len() == LEGACY_COLUMNS.len()
    );

    assert_eq!(ensure_schema(&conn).unwrap(), found);

    assert_eq!(count_records(&conn, DEFAULT_USER_NAME).unwrap(), 1);
    assert_eq!(
        load_record(&conn, DEFAULT_USER_NAME, jan_first()).unwrap(),
        Some(DayMeals {
            breakfast: "egg".to_string(),
            lunch: "rice".to_string(),
            dinner: "soup".to_string(),
            ..Default::default()
        })
    );
    assert!(conn
        .table_columns(MEALS_TABLE)
        .unwrap()
        .contains(&USER_COLUMN.to_string()));
    assert!(!conn.has_table("meals_new").unwrap());
    assert_eq!(conn.user_version().unwrap(), CURRENT_USER_VERSION);
}

#[mealplan_test(nomigrate)]
fn second_run_is_noop(conn: Connection) {
    create_legacy_store(
        &conn,
        &[legacy_row("2024-01-01", "egg", "rice", "soup", "", "")],
    );
    ensure_schema(&conn).unwrap();
    assert_eq!(ensure_schema(&conn).unwrap(), SchemaVersion::MultiUser);
    assert_eq!(ensure_schema(&conn).unwrap(), SchemaVersion::MultiUser);
    assert_eq!(count_records(&conn, DEFAULT_USER_NAME).unwrap(), 1);
    assert_eq!(list_users(&conn).unwrap().len(), 1);
}

#[mealplan_test(nomigrate)]
fn partial_legacy_table(conn: Connection) {
    conn.execute(
        "CREATE TABLE meals (meal_date TEXT PRIMARY KEY, dinner TEXT, memo TEXT);
         INSERT INTO meals VALUES ('2024-01-02', 'curry', NULL);
         INSERT INTO meals VALUES ('2024-01-03', NULL, 'out');",
    )
    .unwrap();
    ensure_schema(&conn).unwrap();
    let week = load_week(&conn, DEFAULT_USER_NAME, jan_first()).unwrap();
    assert_eq!(week.len(), 2);
    assert_eq!(week[0].meals.dinner, "curry");
    assert_eq!(week[0].meals.memo, "");
    assert_eq!(week[1].meals.memo, "out");
    assert_eq!(week[1].meals.breakfast, "");
}

#[mealplan_test(nomigrate)]
fn legacy_table_without_date_is_replaced(conn: Connection) {
    conn.execute(
        "CREATE TABLE meals (breakfast TEXT);
         INSERT INTO meals VALUES ('toast');",
    )
    .unwrap();
    ensure_schema(&conn).unwrap();
    assert_eq!(
        detect_schema_version(&conn).unwrap(),
        SchemaVersion::MultiUser
    );
    assert_eq!(count_records(&conn, DEFAULT_USER_NAME).unwrap(), 0);
}

#[mealplan_test(nomigrate)]
fn leftover_staging_table_is_reused(conn: Connection) {
    create_legacy_store(
        &conn,
        &[legacy_row("2024-01-01", "egg", "", "", "", "")],
    );
    // an interrupted run left a half-filled staging table behind
    conn.execute(
        "CREATE TABLE meals_new (
            user_name TEXT NOT NULL,
            meal_date TEXT NOT NULL,
            breakfast TEXT,
            lunch TEXT,
            dinner TEXT,
            snack TEXT,
            memo TEXT,
            updated_at TEXT,
            PRIMARY KEY (user_name, meal_date)
        );
        INSERT INTO meals_new(user_name, meal_date, breakfast)
            VALUES ('나', '2024-01-01', 'stale');",
    )
    .unwrap();
    ensure_schema(&conn).unwrap();
    assert_eq!(count_records(&conn, DEFAULT_USER_NAME).unwrap(), 1);
    assert_eq!(
        load_record(&conn, DEFAULT_USER_NAME, jan_first())
            .unwrap()
            .unwrap()
            .breakfast,
        "egg"
    );
}

#[mealplan_test(nomigrate)]
fn existing_users_are_kept(conn: Connection) {
    conn.execute(
        "CREATE TABLE users (user_name TEXT PRIMARY KEY, created_at TEXT);
         INSERT INTO users VALUES ('mom', '2023-05-01T10:00:00');",
    )
    .unwrap();
    ensure_schema(&conn).unwrap();
    let mut expected = vec!["mom".to_string(), DEFAULT_USER_NAME.to_string()];
    expected.sort();
    assert_eq!(list_users(&conn).unwrap(), expected);
}

#[test]
fn legacy_file_survives_reopen() {
    common_setup();
    let setup_data = file_setup();
    let spec = ConnectionSpec::new(setup_data.connection_string());
    {
        let conn = Connection::open(spec.connection_string()).unwrap();
        create_legacy_store(
            &conn,
            &[
                legacy_row("2024-01-01", "egg", "rice", "soup", "", ""),
                legacy_row("2024-01-02", "", "", "stew", "chips", "tired"),
            ],
        );
    }
    {
        let conn = connect(&spec).unwrap();
        assert_eq!(count_records(&conn, DEFAULT_USER_NAME).unwrap(), 2);
    }
    let conn = connect(&spec).unwrap();
    assert_eq!(
        detect_schema_version(&conn).unwrap(),
        SchemaVersion::MultiUser
    );
    let week = load_week(&conn, DEFAULT_USER_NAME, jan_first()).unwrap();
    assert_eq!(week.len(), 2);
    assert_eq!(week[1].meals.snack, "chips");
    drop(conn);
    file_teardown(setup_data);
}

#[test]
fn failed_migration_leaves_store_untouched() {
    common_setup();
    let conn = memory_connection();
    // meals_new with an incompatible shape makes the copy fail
    conn.execute(
        "CREATE TABLE meals (meal_date TEXT PRIMARY KEY, breakfast TEXT);
         INSERT INTO meals VALUES ('2024-01-01', 'egg');
         CREATE TABLE meals_new (unrelated TEXT);",
    )
    .unwrap();
    assert!(ensure_schema(&conn).is_err());
    assert_matches!(
        detect_schema_version(&conn).unwrap(),
        SchemaVersion::Legacy { .. }
    );
    assert!(!conn.has_table("users").unwrap());
}
