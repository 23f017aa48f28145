use std::fs;

use log::warn;
use redb::{Database, ReadableTable, TableDefinition};

use crate::event::Event;

use super::{ClientDatabase, Result};

const TABLE_NAME: &str = "metadata";
const METADATA_TABLE: TableDefinition<&str, &str> = TableDefinition::new(TABLE_NAME);

/// Namespace for metadata events, keyed by author pubkey.
#[derive(Debug)]
pub struct MetadataTable {
  db: Database,
}

impl Default for MetadataTable {
  fn default() -> Self {
    Self::new(None)
  }
}

impl<'a> ClientDatabase<'a> for MetadataTable {
  type K = &'a str;
  type V = &'a str;

  fn write_to_db(&self, k: Self::K, v: Self::V) -> Result<()> {
    let write_txn = self.db.begin_write()?;
    {
      let mut table = write_txn.open_table(METADATA_TABLE)?;
      table.insert(k, v)?;
    }
    write_txn.commit()?;
    Ok(())
  }

  fn remove_from_db(&self, k: Self::K) -> Result<()> {
    let write_txn = self.db.begin_write()?;
    {
      let mut table = write_txn.open_table(METADATA_TABLE)?;
      table.remove(k)?;
    }
    write_txn.commit()?;
    Ok(())
  }
}

impl MetadataTable {
  pub fn new(metadata_table_name: Option<String>) -> Self {
    fs::create_dir_all("db/").unwrap();
    let table_name = match metadata_table_name {
      Some(name) => name,
      None => TABLE_NAME.to_string(),
    };
    let db = Database::create(format!("db/{table_name}.redb")).unwrap();

    {
      let write_txn = db.begin_write().unwrap();
      write_txn.open_table(METADATA_TABLE).unwrap(); // this basically just creates the table if doesn't exist
      write_txn.commit().unwrap();
    }

    Self { db }
  }

  /// Stores a metadata event unless one already exists for its
  /// pubkey. First write wins; stale entries are never refreshed.
  /// Returns whether the event was stored.
  pub fn store_metadata_if_absent(&self, event: &Event) -> Result<bool> {
    if self.get_metadata(&event.pubkey)?.is_some() {
      return Ok(false);
    }

    self.write_to_db(&event.pubkey, &event.as_json())?;
    Ok(true)
  }

  pub fn get_metadata(&self, pubkey: &str) -> Result<Option<Event>> {
    let read_txn = self.db.begin_read()?;
    let table = read_txn.open_table(METADATA_TABLE)?;

    let event = match table.get(pubkey)? {
      Some(stored) => match Event::from_json(stored.value()) {
        Ok(event) => Some(event),
        Err(err) => {
          warn!("Dropping unreadable metadata for {pubkey}: {err}");
          None
        }
      },
      None => None,
    };

    Ok(event)
  }
}
