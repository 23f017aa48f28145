use std::result;

pub mod events_table;
pub mod keys_table;
pub mod markers_table;
pub mod metadata_table;

pub type Result<T> = result::Result<T, redb::Error>;

/// One key-value namespace of the local store.
pub trait ClientDatabase<'a> {
  type K;
  type V;
  fn write_to_db(&self, k: Self::K, v: Self::V) -> Result<()>;
  fn remove_from_db(&self, k: Self::K) -> Result<()>;
}
