mod common;

use pgtesthelper::{HelperError, Options, TestDatabase, TruncateMode};

#[test]
fn reset_restarts_sequences_at_one() {
    let Some((mut db, _dir)) = common::setup_db("reset_seq") else {
        return;
    };
    common::insert_widget(&mut db, "a");
    common::insert_widget(&mut db, "b");

    db.reset(&["widgets"], &["widgets_id_seq"]).unwrap();
    let id = common::insert_widget(&mut db, "c");

    assert_eq!(common::count(&mut db, "widgets"), 1);
    assert_eq!(id, 1);

    db.cleanup().unwrap();
}

#[test]
fn reset_restarts_sequence_at_declared_start() {
    let Some(settings) = common::settings() else {
        return;
    };
    let (_dir, path) = common::write_schema(
        "CREATE SEQUENCE counters_seq START 100 MINVALUE 100;
         CREATE TABLE counters (id integer DEFAULT nextval('counters_seq'), label text);",
    );
    let mut db = TestDatabase::new(Options::new(path, "reset_start", settings)).unwrap();
    db.create().unwrap();

    let next = |db: &mut TestDatabase, label: &str| -> i32 {
        let rows = db
            .query(
                "INSERT INTO counters (label) VALUES ($1) RETURNING id",
                &[&label],
            )
            .unwrap();
        rows[0].get(0)
    };
    assert_eq!(next(&mut db, "a"), 100);
    assert_eq!(next(&mut db, "b"), 101);

    db.reset(&["counters"], &["counters_seq"]).unwrap();

    assert_eq!(next(&mut db, "c"), 100);

    db.cleanup().unwrap();
}

#[test]
fn clean_tables_keeps_sequence_position() {
    let Some((mut db, _dir)) = common::setup_db("reset_noseq") else {
        return;
    };
    common::insert_widget(&mut db, "a");
    common::insert_widget(&mut db, "b");

    db.clean_tables(&["widgets"]).unwrap();
    let id = common::insert_widget(&mut db, "c");

    assert_eq!(common::count(&mut db, "widgets"), 1);
    assert_eq!(id, 3);

    db.cleanup().unwrap();
}

#[test]
fn failed_reset_rolls_back_everything() {
    let Some((mut db, _dir)) = common::setup_db("reset_rollback") else {
        return;
    };
    common::insert_widget(&mut db, "a");
    common::insert_widget(&mut db, "b");

    let err = db
        .reset(&["widgets", "no_such_table"], &["widgets_id_seq"])
        .unwrap_err();
    match &err {
        HelperError::Reset { step, .. } => assert!(step.contains("no_such_table"), "{}", step),
        other => panic!("expected reset error, got: {}", other),
    }
    assert!(!err.is_ambiguous());
    let rendered = err.to_string();
    assert!(rendered.contains("does not exist"), "{}", rendered);
    assert!(rendered.contains("SQLSTATE 42P01"), "{}", rendered);

    // widgets was truncated first, but the rollback restored it.
    assert_eq!(common::count(&mut db, "widgets"), 2);
    assert_eq!(common::insert_widget(&mut db, "c"), 3);

    db.cleanup().unwrap();
}

#[test]
fn cascade_truncates_referencing_tables() {
    let Some((mut db, _dir)) = common::setup_db("reset_cascade") else {
        return;
    };
    let widget = common::insert_widget(&mut db, "a");
    db.execute(
        "INSERT INTO parts (widget_id, label) VALUES ($1, 'bolt')",
        &[&widget],
    )
    .unwrap();

    db.clean_tables(&["widgets"]).unwrap();

    assert_eq!(common::count(&mut db, "widgets"), 0);
    assert_eq!(common::count(&mut db, "parts"), 0);

    db.cleanup().unwrap();
}

#[test]
fn restrict_mode_fails_on_referenced_table() {
    let Some((options, _dir)) = common::options("reset_restrict") else {
        return;
    };
    let mut db = TestDatabase::new(options.truncate_mode(TruncateMode::Restrict)).unwrap();
    db.create().unwrap();
    let widget = common::insert_widget(&mut db, "a");
    db.execute(
        "INSERT INTO parts (widget_id, label) VALUES ($1, 'bolt')",
        &[&widget],
    )
    .unwrap();

    let err = db.clean_tables(&["widgets"]).unwrap_err();
    assert!(matches!(err, HelperError::Reset { .. }), "{}", err);
    assert_eq!(common::count(&mut db, "widgets"), 1);
    assert_eq!(common::count(&mut db, "parts"), 1);

    // RESTRICT checks references per statement, so truncating the
    // dependent table first does not help. The earlier step is rolled back.
    db.clean_tables(&["parts", "widgets"]).unwrap_err();
    assert_eq!(common::count(&mut db, "parts"), 1);

    db.cleanup().unwrap();
}

#[test]
fn empty_reset_is_a_no_op() {
    let Some((mut db, _dir)) = common::setup_db("reset_empty") else {
        return;
    };
    common::insert_widget(&mut db, "a");

    db.reset(&[] as &[&str], &[] as &[&str]).unwrap();
    assert_eq!(common::count(&mut db, "widgets"), 1);

    db.cleanup().unwrap();
}

#[test]
fn invalid_names_are_rejected_before_anything_runs() {
    let Some((mut db, _dir)) = common::setup_db("reset_badname") else {
        return;
    };
    common::insert_widget(&mut db, "a");

    let err = db
        .clean_tables(&["widgets", "widgets; DROP TABLE parts"])
        .unwrap_err();
    assert!(matches!(err, HelperError::InvalidIdentifier { .. }), "{}", err);
    assert_eq!(common::count(&mut db, "widgets"), 1);
    assert_eq!(common::count(&mut db, "parts"), 0);

    db.cleanup().unwrap();
}

#[test]
fn reset_cycles_repeat() {
    let Some((mut db, _dir)) = common::setup_db("reset_cycles") else {
        return;
    };
    for _ in 0..3 {
        common::insert_widget(&mut db, "a");
        common::insert_widget(&mut db, "b");
        db.reset(&["widgets"], &["widgets_id_seq"]).unwrap();
        assert_eq!(common::count(&mut db, "widgets"), 0);
    }
    assert_eq!(common::insert_widget(&mut db, "last"), 1);

    db.cleanup().unwrap();
}
