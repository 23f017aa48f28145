use std::fs;

use redb::{Database, ReadableTable, TableDefinition};

use super::{ClientDatabase, Result};

const TABLE_NAME: &str = "keys";
const KEYS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new(TABLE_NAME);

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Keys {
  pub private_key: Vec<u8>,
  pub public_key: Vec<u8>,
}

/// Namespace for the session secret key and its derived public key.
pub struct KeysTable {
  db: Database,
}

impl<'a> ClientDatabase<'a> for KeysTable {
  type K = &'a str;
  type V = &'a [u8];

  fn write_to_db(&self, k: Self::K, v: Self::V) -> Result<()> {
    let write_txn = self.db.begin_write()?;
    {
      let mut table = write_txn.open_table(KEYS_TABLE)?;
      table.insert(k, v)?;
    }
    write_txn.commit()?;
    Ok(())
  }

  fn remove_from_db(&self, k: Self::K) -> Result<()> {
    let write_txn = self.db.begin_write()?;
    {
      let mut table = write_txn.open_table(KEYS_TABLE)?;
      table.remove(k)?;
    }
    write_txn.commit()?;
    Ok(())
  }
}

impl Default for KeysTable {
  fn default() -> Self {
    Self::new(None)
  }
}

impl KeysTable {
  pub fn new(keys_table_name: Option<String>) -> Self {
    fs::create_dir_all("db/").unwrap();
    let table_name = match keys_table_name {
      Some(name) => name,
      None => TABLE_NAME.to_string(),
    };
    let db = Database::create(format!("db/{table_name}.redb")).unwrap();

    {
      let write_txn = db.begin_write().unwrap();
      write_txn.open_table(KEYS_TABLE).unwrap(); // this basically just creates the table if doesn't exist
      write_txn.commit().unwrap();
    }

    Self { db }
  }

  pub fn get_client_keys(&self) -> Result<Option<Keys>> {
    let read_txn = self.db.begin_read()?;
    let table = read_txn.open_table(KEYS_TABLE)?;

    let private_key = match table.get("private_key")? {
      Some(private_key) => private_key.value().to_owned(),
      None => vec![],
    };

    let public_key = match table.get("public_key")? {
      Some(public_key) => public_key.value().to_owned(),
      None => vec![],
    };

    if private_key.is_empty() || public_key.is_empty() {
      return Ok(None);
    }

    Ok(Some(Keys {
      private_key,
      public_key,
    }))
  }

  pub fn store_client_keys(&self, keys: &Keys) -> Result<()> {
    self.write_to_db("private_key", &keys.private_key)?;
    self.write_to_db("public_key", &keys.public_key)?;
    Ok(())
  }

  pub fn clear_client_keys(&self) -> Result<()> {
    self.remove_from_db("private_key")?;
    self.remove_from_db("public_key")?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  struct Sut {
    keys: Keys,
    keys_table: KeysTable,
    table_name: String,
  }

  impl Drop for Sut {
    fn drop(&mut self) {
      self.remove_temp_db();
    }
  }

  impl Sut {
    fn new(table_name: &str) -> Sut {
      let keys = Keys {
        private_key: vec![1u8, 2u8, 3u8, 4u8],
        public_key: vec![0u8, 1u8, 2u8, 3u8],
      };

      let keys_table = KeysTable::new(Some(table_name.to_string()));

      Sut {
        keys,
        keys_table,
        table_name: table_name.to_string(),
      }
    }

    fn remove_temp_db(&self) {
      fs::remove_file(format!("db/{}.redb", self.table_name)).unwrap();
    }
  }

  #[test]
  fn store_and_read_client_keys() {
    let sut = Sut::new("store_and_read_client_keys");

    assert!(sut.keys_table.get_client_keys().unwrap().is_none());

    sut.keys_table.store_client_keys(&sut.keys).unwrap();

    let keys = sut.keys_table.get_client_keys().unwrap();
    assert_eq!(Some(sut.keys.clone()), keys);
  }

  #[test]
  fn clear_client_keys() {
    let sut = Sut::new("clear_client_keys");

    sut.keys_table.store_client_keys(&sut.keys).unwrap();
    assert!(sut.keys_table.get_client_keys().unwrap().is_some());

    sut.keys_table.clear_client_keys().unwrap();
    assert!(sut.keys_table.get_client_keys().unwrap().is_none());
  }
}
