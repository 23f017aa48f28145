use std::fs;

use redb::{Database, ReadableTable, TableDefinition};

use super::{ClientDatabase, Result};

const TABLE_NAME: &str = "persisted_markers";
const MARKERS_TABLE: TableDefinition<&str, &str> = TableDefinition::new(TABLE_NAME);

/// Namespace marking which event ids have already been handed to the
/// backend, so repeated queries do not re-persist the same events.
#[derive(Debug)]
pub struct MarkersTable {
  db: Database,
}

impl Default for MarkersTable {
  fn default() -> Self {
    Self::new(None)
  }
}

impl<'a> ClientDatabase<'a> for MarkersTable {
  type K = &'a str;
  type V = &'a str;

  fn write_to_db(&self, k: Self::K, v: Self::V) -> Result<()> {
    let write_txn = self.db.begin_write()?;
    {
      let mut table = write_txn.open_table(MARKERS_TABLE)?;
      table.insert(k, v)?;
    }
    write_txn.commit()?;
    Ok(())
  }

  fn remove_from_db(&self, k: Self::K) -> Result<()> {
    let write_txn = self.db.begin_write()?;
    {
      let mut table = write_txn.open_table(MARKERS_TABLE)?;
      table.remove(k)?;
    }
    write_txn.commit()?;
    Ok(())
  }
}

impl MarkersTable {
  pub fn new(markers_table_name: Option<String>) -> Self {
    fs::create_dir_all("db/").unwrap();
    let table_name = match markers_table_name {
      Some(name) => name,
      None => TABLE_NAME.to_string(),
    };
    let db = Database::create(format!("db/{table_name}.redb")).unwrap();

    {
      let write_txn = db.begin_write().unwrap();
      write_txn.open_table(MARKERS_TABLE).unwrap(); // this basically just creates the table if doesn't exist
      write_txn.commit().unwrap();
    }

    Self { db }
  }

  pub fn mark_persisted(&self, event_id: &str, node_id: &str) -> Result<()> {
    self.write_to_db(event_id, node_id)
  }

  pub fn is_persisted(&self, event_id: &str) -> Result<bool> {
    let read_txn = self.db.begin_read()?;
    let table = read_txn.open_table(MARKERS_TABLE)?;

    let persisted = table.get(event_id)?.is_some();

    Ok(persisted)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Sut {
    markers_table: MarkersTable,
    table_name: String,
  }

  impl Drop for Sut {
    fn drop(&mut self) {
      self.remove_temp_db();
    }
  }

  impl Sut {
    fn new(table_name: &str) -> Sut {
      let markers_table = MarkersTable::new(Some(table_name.to_string()));

      Sut {
        markers_table,
        table_name: table_name.to_string(),
      }
    }

    fn remove_temp_db(&self) {
      fs::remove_file(format!("db/{}.redb", self.table_name)).unwrap();
    }
  }

  #[test]
  fn mark_and_check_persisted() {
    let sut = Sut::new("mark_and_check_persisted");

    assert!(!sut.markers_table.is_persisted("eventid").unwrap());

    sut.markers_table.mark_persisted("eventid", "node42").unwrap();
    assert!(sut.markers_table.is_persisted("eventid").unwrap());

    sut.markers_table.remove_from_db("eventid").unwrap();
    assert!(!sut.markers_table.is_persisted("eventid").unwrap());
  }
}
