use crate::error::DirectoryError;
use crate::models::{ChannelRow, MessageRow, UserRow};
use crate::Database;
use anyhow::{Result, anyhow};
use cipherchan_crypto::keys::generate_channel_key;
use cipherchan_types::models::JoinOutcome;
use rusqlite::{Connection, Row};

const CHANNEL_COLUMNS: &str = "id, name, key, creator_id, encrypted_custom_map, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password) VALUES (?1, ?2, ?3, ?4)",
                (id, username, email, password_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Channels --

    /// Create a channel and make its creator the first member, atomically.
    /// A join key is generated when `key` is `None`.
    pub fn create_channel(
        &self,
        name: &str,
        creator_id: &str,
        key: Option<&str>,
        sealed_map: &str,
    ) -> Result<ChannelRow, DirectoryError> {
        let key = key.map(str::to_owned).unwrap_or_else(generate_channel_key);

        let created = self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;

            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM channels WHERE name = ?1)",
                [name],
                |row| row.get(0),
            )?;
            if taken {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO channels (name, key, creator_id, encrypted_custom_map) VALUES (?1, ?2, ?3, ?4)",
                (name, &key, creator_id, sealed_map),
            )?;
            let channel_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO memberships (user_id, channel_id) VALUES (?1, ?2)",
                rusqlite::params![creator_id, channel_id],
            )?;

            let row = query_channel(&tx, "id", &channel_id)?
                .ok_or_else(|| anyhow!("channel {} missing after insert", channel_id))?;
            tx.commit()?;
            Ok(Some(row))
        })?;

        created.ok_or_else(|| DirectoryError::NameTaken(name.to_string()))
    }

    pub fn get_channel(&self, id: i64) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| query_channel(conn, "id", &id))
    }

    pub fn get_channel_by_key(&self, key: &str) -> Result<Option<ChannelRow>> {
        self.with_conn(|conn| query_channel(conn, "key", &key))
    }

    /// Channels the user belongs to, oldest first.
    pub fn channels_for_user(&self, user_id: &str) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, c.key, c.creator_id, c.encrypted_custom_map, c.created_at
                 FROM channels c
                 JOIN memberships m ON m.channel_id = c.id
                 WHERE m.user_id = ?1
                 ORDER BY c.created_at, c.id",
            )?;

            let rows = stmt
                .query_map([user_id], channel_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Replace a channel's stored map blob. Callers seal the map first, which
    /// is where non-bijective maps are refused.
    pub fn set_symbol_map(&self, channel_id: i64, sealed_map: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE channels SET encrypted_custom_map = ?1 WHERE id = ?2",
                rusqlite::params![sealed_map, channel_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Memberships --

    /// Idempotent join: a second join reports `AlreadyMember` and changes nothing.
    pub fn join_channel(&self, user_id: &str, channel_id: i64) -> Result<JoinOutcome> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO memberships (user_id, channel_id) VALUES (?1, ?2)",
                rusqlite::params![user_id, channel_id],
            )?;

            Ok(if inserted > 0 {
                JoinOutcome::Joined
            } else {
                JoinOutcome::AlreadyMember
            })
        })
    }

    pub fn is_member(&self, user_id: &str, channel_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let member = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM memberships WHERE user_id = ?1 AND channel_id = ?2)",
                rusqlite::params![user_id, channel_id],
                |row| row.get(0),
            )?;
            Ok(member)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        channel_id: i64,
        created_by: &str,
        encrypted_data: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, channel_id, created_by, encrypted_data) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, channel_id, created_by, encrypted_data],
            )?;
            Ok(())
        })
    }

    /// Newest first. Rows written in the same second keep insertion order.
    pub fn get_messages(&self, channel_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            // JOIN users to fetch the author name in the same query
            let mut stmt = conn.prepare(
                "SELECT m.id, m.channel_id, m.created_by, u.username, m.encrypted_data, m.created_at
                 FROM messages m
                 LEFT JOIN users u ON m.created_by = u.id
                 WHERE m.channel_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![channel_id, limit], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        channel_id: row.get(1)?,
                        created_by: row.get(2)?,
                        author_username: row
                            .get::<_, Option<String>>(3)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        encrypted_data: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT id, username, email, password, created_at FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_channel(
    conn: &Connection,
    column: &str,
    value: &dyn rusqlite::types::ToSql,
) -> Result<Option<ChannelRow>> {
    let sql = format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], channel_from_row).optional()?;
    Ok(row)
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<ChannelRow> {
    Ok(ChannelRow {
        id: row.get(0)?,
        name: row.get(1)?,
        key: row.get(2)?,
        creator_id: row.get(3)?,
        encrypted_custom_map: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherchan_crypto::{MapSigner, SymbolMap};

    const ALICE: &str = "00000000-0000-0000-0000-00000000000a";
    const BOB: &str = "00000000-0000-0000-0000-00000000000b";

    fn setup() -> (Database, MapSigner) {
        let db = Database::open_in_memory().unwrap();
        db.create_user(ALICE, "alice", "alice@example.com", "hash").unwrap();
        db.create_user(BOB, "bob", "bob@example.com", "hash").unwrap();
        (db, MapSigner::new("test-secret"))
    }

    fn new_channel(db: &Database, signer: &MapSigner, name: &str) -> ChannelRow {
        db.create_channel(name, ALICE, None, &signer.seal(&SymbolMap::default()))
            .unwrap()
    }

    #[test]
    fn test_create_channel_generates_key_and_membership() {
        let (db, signer) = setup();
        let channel = new_channel(&db, &signer, "general");

        assert!(channel.id > 0);
        assert_eq!(channel.key.len(), 22);
        assert!(db.is_member(ALICE, channel.id).unwrap());
        assert!(!db.is_member(BOB, channel.id).unwrap());

        let loaded = channel.symbol_map(&signer);
        assert!(!loaded.is_recovered());
        assert_eq!(loaded.map(), &SymbolMap::default());
    }

    #[test]
    fn test_explicit_key_kept() {
        let (db, signer) = setup();
        let sealed = signer.seal(&SymbolMap::default());
        let channel = db.create_channel("ops", ALICE, Some("fixed-key"), &sealed).unwrap();
        assert_eq!(channel.key, "fixed-key");
        assert_eq!(db.get_channel_by_key("fixed-key").unwrap().unwrap().id, channel.id);
    }

    #[test]
    fn test_channel_name_unique() {
        let (db, signer) = setup();
        new_channel(&db, &signer, "general");
        let err = db
            .create_channel("general", BOB, None, &signer.seal(&SymbolMap::default()))
            .unwrap_err();
        assert!(matches!(err, DirectoryError::NameTaken(name) if name == "general"));
        assert!(db.channels_for_user(BOB).unwrap().is_empty());
    }

    #[test]
    fn test_keys_unique_across_channels() {
        let (db, signer) = setup();
        let a = new_channel(&db, &signer, "a");
        let b = new_channel(&db, &signer, "b");
        assert_ne!(a.key, b.key);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_join_is_idempotent() {
        let (db, signer) = setup();
        let channel = new_channel(&db, &signer, "general");

        assert_eq!(db.join_channel(BOB, channel.id).unwrap(), JoinOutcome::Joined);
        assert_eq!(db.join_channel(BOB, channel.id).unwrap(), JoinOutcome::AlreadyMember);
        assert_eq!(db.join_channel(ALICE, channel.id).unwrap(), JoinOutcome::AlreadyMember);
        assert_eq!(db.channels_for_user(BOB).unwrap().len(), 1);
    }

    #[test]
    fn test_lookup_misses() {
        let (db, _) = setup();
        assert!(db.get_channel(99).unwrap().is_none());
        assert!(db.get_channel_by_key("nope").unwrap().is_none());
        assert!(db.get_user_by_username("carol").unwrap().is_none());
        assert_eq!(db.get_user_by_id(ALICE).unwrap().unwrap().username, "alice");
    }

    #[test]
    fn test_messages_newest_first_and_limited() {
        let (db, signer) = setup();
        let channel = new_channel(&db, &signer, "general");

        for i in 0..60 {
            db.insert_message(&format!("m{i:02}"), channel.id, ALICE, &format!("[{i}]"))
                .unwrap();
        }

        let rows = db.get_messages(channel.id, 50).unwrap();
        assert_eq!(rows.len(), 50);
        assert_eq!(rows[0].id, "m59");
        assert_eq!(rows[49].id, "m10");
        assert_eq!(rows[0].author_username, "alice");
        assert_eq!(rows[0].to_model().secret_key, vec![59]);
    }

    #[test]
    fn test_messages_scoped_to_channel() {
        let (db, signer) = setup();
        let a = new_channel(&db, &signer, "a");
        let b = new_channel(&db, &signer, "b");
        db.insert_message("m1", a.id, ALICE, "[1]").unwrap();
        assert_eq!(db.get_messages(a.id, 50).unwrap().len(), 1);
        assert!(db.get_messages(b.id, 50).unwrap().is_empty());
    }

    #[test]
    fn test_custom_map_and_corrupt_blob() {
        let (db, signer) = setup();
        let channel = new_channel(&db, &signer, "general");

        let custom = SymbolMap::new([('a', 1), ('b', 2)]).unwrap();
        assert!(db.set_symbol_map(channel.id, &signer.seal(&custom)).unwrap());
        let reloaded = db.get_channel(channel.id).unwrap().unwrap();
        assert_eq!(reloaded.symbol_map(&signer).into_map(), custom);

        assert!(db.set_symbol_map(channel.id, "garbage").unwrap());
        let reloaded = db.get_channel(channel.id).unwrap().unwrap();
        let load = reloaded.symbol_map(&signer);
        assert!(load.is_recovered());
        assert_eq!(reloaded.cipher(&signer).symbol_map(), &SymbolMap::default());

        assert!(!db.set_symbol_map(404, "garbage").unwrap());
    }
}
