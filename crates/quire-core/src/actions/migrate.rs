//! Action schema migrations
//!
//! Rewrites logged actions of an older payload schema to the current one,
//! in place. Each step selects on `(type, schema)`, so a step with nothing
//! left to match is a no-op and the whole run is safe to repeat.

use rusqlite::{Connection, Transaction};

use super::log::ActionLog;
use crate::db::{BookRepository, SqliteBookRepository};
use crate::error::{Error, Result};
use crate::models::{
    ActionPayload, ActionType, AddBookDataV2, AddNoteDataV3, EditNoteDataV3, RemoveBookDataV2,
    RemoveNoteDataV2,
};

type UpgradeFn = fn(&Connection, ActionPayload) -> Result<ActionPayload>;

/// One named upgrade from a single `(type, schema)` to the current schema
struct Migration {
    name: &'static str,
    action_type: ActionType,
    from_schema: i64,
    upgrade: UpgradeFn,
}

const MIGRATIONS: [Migration; 6] = [
    Migration {
        name: "edit_note_v1_to_v3",
        action_type: ActionType::EditNote,
        from_schema: 1,
        upgrade: edit_note_v1_to_v3,
    },
    Migration {
        name: "edit_note_v2_to_v3",
        action_type: ActionType::EditNote,
        from_schema: 2,
        upgrade: edit_note_v2_to_v3,
    },
    Migration {
        name: "add_note_v2_to_v3",
        action_type: ActionType::AddNote,
        from_schema: 2,
        upgrade: add_note_v2_to_v3,
    },
    Migration {
        name: "remove_note_v1_to_v2",
        action_type: ActionType::RemoveNote,
        from_schema: 1,
        upgrade: remove_note_v1_to_v2,
    },
    Migration {
        name: "add_book_v1_to_v2",
        action_type: ActionType::AddBook,
        from_schema: 1,
        upgrade: add_book_v1_to_v2,
    },
    Migration {
        name: "remove_book_v1_to_v2",
        action_type: ActionType::RemoveBook,
        from_schema: 1,
        upgrade: remove_book_v1_to_v2,
    },
];

/// Upgrade every logged action to its type's current schema.
///
/// Returns the number of actions rewritten. Any failed step fails the whole
/// run; the caller drops `tx` and nothing is rewritten.
pub fn migrate(tx: &Transaction<'_>) -> Result<usize> {
    let conn: &Connection = tx;
    let log = ActionLog::new(conn);
    let mut rewritten = 0;

    for migration in &MIGRATIONS {
        let pending = log.list_by_schema(migration.action_type, migration.from_schema)?;
        if pending.is_empty() {
            continue;
        }

        for action in &pending {
            let upgraded = (migration.upgrade)(conn, action.payload()?)?;
            debug_assert!(upgraded.is_current());
            log.rewrite(&action.uuid, &upgraded)?;
        }

        tracing::info!(
            step = migration.name,
            count = pending.len(),
            "upgraded logged actions"
        );
        rewritten += pending.len();
    }

    Ok(rewritten)
}

fn unexpected(payload: &ActionPayload, step: &str) -> Error {
    tracing::error!(
        step,
        action_type = %payload.action_type(),
        schema = payload.schema(),
        "payload does not match migration step"
    );
    Error::UnsupportedSchema {
        action_type: payload.action_type(),
        schema: payload.schema(),
    }
}

fn edit_note_v1_to_v3(_conn: &Connection, payload: ActionPayload) -> Result<ActionPayload> {
    let data = match payload {
        ActionPayload::EditNoteV1(data) => data,
        other => return Err(unexpected(&other, "edit_note_v1_to_v3")),
    };
    Ok(ActionPayload::EditNoteV3(EditNoteDataV3 {
        note_uuid: data.note_uuid,
        book_uuid: None,
        content: Some(data.content),
        public: Some(false),
    }))
}

fn edit_note_v2_to_v3(conn: &Connection, payload: ActionPayload) -> Result<ActionPayload> {
    let data = match payload {
        ActionPayload::EditNoteV2(data) => data,
        other => return Err(unexpected(&other, "edit_note_v2_to_v3")),
    };
    let book_uuid = data
        .to_book
        .map(|label| SqliteBookRepository::new(conn).uuid_for_label(&label))
        .transpose()?;
    Ok(ActionPayload::EditNoteV3(EditNoteDataV3 {
        note_uuid: data.note_uuid,
        book_uuid,
        content: data.content,
        public: data.public,
    }))
}

fn add_note_v2_to_v3(conn: &Connection, payload: ActionPayload) -> Result<ActionPayload> {
    let data = match payload {
        ActionPayload::AddNoteV2(data) => data,
        other => return Err(unexpected(&other, "add_note_v2_to_v3")),
    };
    Ok(ActionPayload::AddNoteV3(AddNoteDataV3 {
        note_uuid: data.note_uuid,
        book_uuid: SqliteBookRepository::new(conn).uuid_for_label(&data.book_name)?,
        content: data.content,
        public: data.public,
    }))
}

fn remove_note_v1_to_v2(_conn: &Connection, payload: ActionPayload) -> Result<ActionPayload> {
    let data = match payload {
        ActionPayload::RemoveNoteV1(data) => data,
        other => return Err(unexpected(&other, "remove_note_v1_to_v2")),
    };
    Ok(ActionPayload::RemoveNoteV2(RemoveNoteDataV2 {
        note_uuid: data.note_uuid,
    }))
}

fn add_book_v1_to_v2(conn: &Connection, payload: ActionPayload) -> Result<ActionPayload> {
    let data = match payload {
        ActionPayload::AddBookV1(data) => data,
        other => return Err(unexpected(&other, "add_book_v1_to_v2")),
    };
    let book_uuid = SqliteBookRepository::new(conn).uuid_for_label(&data.book_name)?;
    Ok(ActionPayload::AddBookV2(AddBookDataV2 {
        book_name: data.book_name,
        book_uuid,
    }))
}

fn remove_book_v1_to_v2(conn: &Connection, payload: ActionPayload) -> Result<ActionPayload> {
    let data = match payload {
        ActionPayload::RemoveBookV1(data) => data,
        other => return Err(unexpected(&other, "remove_book_v1_to_v2")),
    };
    Ok(ActionPayload::RemoveBookV2(RemoveBookDataV2 {
        book_uuid: SqliteBookRepository::new(conn).uuid_for_label(&data.book_name)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Action, Book};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        SqliteBookRepository::new(db.connection())
            .insert(&Book::with_uuid("b1", "work"))
            .unwrap();
        db
    }

    fn log_action(db: &Database, uuid: &str, action_type: ActionType, schema: i64, data: Value) {
        ActionLog::new(db.connection())
            .append(&Action {
                uuid: uuid.to_string(),
                schema,
                action_type,
                data,
                timestamp: 1,
            })
            .unwrap();
    }

    fn run(db: &mut Database) -> Result<usize> {
        let tx = db.transaction().unwrap();
        let count = migrate(&tx)?;
        tx.commit().unwrap();
        Ok(count)
    }

    fn logged(db: &Database) -> Vec<Action> {
        ActionLog::new(db.connection()).list().unwrap()
    }

    #[test]
    fn upgrades_every_legacy_shape() {
        let mut db = setup();
        log_action(&db, "a1", ActionType::AddBook, 1, json!({"book_name": "work"}));
        log_action(
            &db,
            "a2",
            ActionType::AddNote,
            2,
            json!({"note_uuid": "n1", "book_name": "work", "content": "hi", "public": true}),
        );
        log_action(
            &db,
            "a3",
            ActionType::EditNote,
            1,
            json!({"note_uuid": "n1", "from_book": "work", "content": "edited"}),
        );
        log_action(
            &db,
            "a4",
            ActionType::EditNote,
            2,
            json!({"note_uuid": "n1", "from_book": "work", "to_book": "work", "public": false}),
        );
        log_action(
            &db,
            "a5",
            ActionType::RemoveNote,
            1,
            json!({"note_uuid": "n1", "book_name": "work"}),
        );
        log_action(&db, "a6", ActionType::RemoveBook, 1, json!({"book_name": "work"}));

        assert_eq!(run(&mut db).unwrap(), 6);

        let actions = logged(&db);
        assert!(actions
            .iter()
            .all(|action| action.schema == action.action_type.current_schema()));
        let data: Vec<Value> = actions.into_iter().map(|action| action.data).collect();
        assert_eq!(
            data,
            vec![
                json!({"book_name": "work", "book_uuid": "b1"}),
                json!({"note_uuid": "n1", "book_uuid": "b1", "content": "hi", "public": true}),
                json!({"note_uuid": "n1", "book_uuid": null, "content": "edited", "public": false}),
                json!({"note_uuid": "n1", "book_uuid": "b1", "content": null, "public": false}),
                json!({"note_uuid": "n1"}),
                json!({"book_uuid": "b1"}),
            ]
        );
    }

    #[test]
    fn rewrites_in_place() {
        let mut db = setup();
        log_action(&db, "a1", ActionType::AddBook, 1, json!({"book_name": "work"}));

        run(&mut db).unwrap();

        let actions = logged(&db);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].uuid, "a1");
        assert_eq!(actions[0].schema, 2);
    }

    #[test]
    fn second_run_is_noop() {
        let mut db = setup();
        log_action(
            &db,
            "a1",
            ActionType::EditNote,
            2,
            json!({"note_uuid": "n1", "from_book": "work", "content": "x"}),
        );

        assert_eq!(run(&mut db).unwrap(), 1);
        let once = logged(&db);
        assert_eq!(run(&mut db).unwrap(), 0);
        assert_eq!(logged(&db), once);
    }

    #[test]
    fn missing_book_fails_whole_run() {
        let mut db = setup();
        log_action(
            &db,
            "a1",
            ActionType::RemoveNote,
            1,
            json!({"note_uuid": "n1", "book_name": "work"}),
        );
        log_action(&db, "a2", ActionType::AddBook, 1, json!({"book_name": "ghost"}));

        assert!(matches!(run(&mut db), Err(Error::BookNotFound(_))));

        // Earlier steps in the same run are rolled back with the failure
        let schemas: Vec<i64> = logged(&db).iter().map(|action| action.schema).collect();
        assert_eq!(schemas, vec![1, 1]);
    }

    #[test]
    fn current_actions_are_untouched() {
        let mut db = setup();
        log_action(
            &db,
            "a1",
            ActionType::EditNote,
            3,
            json!({"note_uuid": "n1", "public": true}),
        );

        assert_eq!(run(&mut db).unwrap(), 0);
        assert_eq!(logged(&db)[0].data, json!({"note_uuid": "n1", "public": true}));
    }

    #[test]
    fn step_rejects_payload_of_another_type() {
        let db = setup();
        let payload = ActionPayload::RemoveNoteV2(RemoveNoteDataV2 {
            note_uuid: "n1".to_string(),
        });

        let error = edit_note_v1_to_v3(db.connection(), payload).unwrap_err();
        assert!(matches!(
            error,
            Error::UnsupportedSchema {
                action_type: ActionType::RemoveNote,
                schema: 2
            }
        ));
    }
}
