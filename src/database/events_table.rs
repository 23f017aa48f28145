use std::fs;

use log::warn;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::event::Event;

use super::{ClientDatabase, Result};

const TABLE_NAME: &str = "events";
const EVENTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new(TABLE_NAME);

/// A cached text or direct-message event, keyed by event id.
/// `decrypt_failed` marks direct messages whose content could not be
/// decrypted; the UI shows the failed state and disables edits.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
  pub event: Event,
  #[serde(default)]
  pub decrypt_failed: bool,
}

impl EventRecord {
  pub fn as_json(&self) -> String {
    json!(self).to_string()
  }
}

#[derive(Debug)]
pub struct EventsTable {
  db: Database,
}

impl Default for EventsTable {
  fn default() -> Self {
    Self::new(None)
  }
}

impl<'a> ClientDatabase<'a> for EventsTable {
  type K = &'a str;
  type V = &'a str;

  fn write_to_db(&self, k: Self::K, v: Self::V) -> Result<()> {
    let write_txn = self.db.begin_write()?;
    {
      let mut table = write_txn.open_table(EVENTS_TABLE)?;
      table.insert(k, v)?;
    }
    write_txn.commit()?;
    Ok(())
  }

  fn remove_from_db(&self, k: Self::K) -> Result<()> {
    let write_txn = self.db.begin_write()?;
    {
      let mut table = write_txn.open_table(EVENTS_TABLE)?;
      table.remove(k)?;
    }
    write_txn.commit()?;
    Ok(())
  }
}

impl EventsTable {
  pub fn new(events_table_name: Option<String>) -> Self {
    fs::create_dir_all("db/").unwrap();
    let table_name = match events_table_name {
      Some(name) => name,
      None => TABLE_NAME.to_string(),
    };
    let db = Database::create(format!("db/{table_name}.redb")).unwrap();

    {
      let write_txn = db.begin_write().unwrap();
      write_txn.open_table(EVENTS_TABLE).unwrap(); // this basically just creates the table if doesn't exist
      write_txn.commit().unwrap();
    }

    Self { db }
  }

  pub fn store_event(&self, record: &EventRecord) -> Result<()> {
    self.write_to_db(&record.event.id, &record.as_json())
  }

  pub fn get_event(&self, event_id: &str) -> Result<Option<EventRecord>> {
    let read_txn = self.db.begin_read()?;
    let table = read_txn.open_table(EVENTS_TABLE)?;

    let record = match table.get(event_id)? {
      Some(stored) => match serde_json::from_str(stored.value()) {
        Ok(record) => Some(record),
        Err(err) => {
          warn!("Dropping unreadable event record {event_id}: {err}");
          None
        }
      },
      None => None,
    };

    Ok(record)
  }
}
