use std::sync::Arc;

use async_trait::async_trait;
use bitcoin_hashes::hex::ToHex;
use log::{debug, warn};
use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::database::keys_table::{Keys, KeysTable};
use crate::event::Event;
use crate::schnorr;

/// The session identity triple. Either all three fields are present
/// or no identity is loaded at all; the triple is reassigned as one
/// value and never left partially set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
  pub secret_key: SecretKey,
  pub public_key: PublicKey,
  pub encoded_public_key: String,
}

impl Identity {
  fn from_secret_key(secret_key: SecretKey) -> Self {
    let secp = Secp256k1::new();
    let public_key = PublicKey::from_secret_key(&secp, &secret_key);
    let encoded_public_key = public_key.to_hex()[2..].to_string();

    Self {
      secret_key,
      public_key,
      encoded_public_key,
    }
  }
}

/// An out-of-process signing capability. Returns `None` when it
/// cannot or will not sign, in which case the event stays unsigned.
#[async_trait]
pub trait ExternalSignerCapability: Send + Sync {
  async fn sign_event(&self, event: Event) -> Option<Event>;
}

/// Which signer handles [`IdentityManager::sign`]. Exactly one is
/// active at a time, chosen at configuration time.
#[derive(Clone)]
pub enum SignerConfig {
  LocalKey,
  External(Arc<dyn ExternalSignerCapability>),
}

/// Owns the signing keypair and its encoded forms.
pub struct IdentityManager {
  identity: Option<Identity>,
  signer: SignerConfig,
  keys_table: KeysTable,
}

impl Default for IdentityManager {
  fn default() -> Self {
    Self::new(SignerConfig::LocalKey, KeysTable::default())
  }
}

impl IdentityManager {
  pub fn new(signer: SignerConfig, keys_table: KeysTable) -> Self {
    Self {
      identity: None,
      signer,
      keys_table,
    }
  }

  pub fn identity(&self) -> Option<&Identity> {
    self.identity.as_ref()
  }

  pub fn is_loaded(&self) -> bool {
    self.identity.is_some()
  }

  /// Produces a fresh identity and persists its keys to the keys
  /// namespace. Replaces any identity loaded before.
  pub fn generate(&mut self) -> Identity {
    let generated = schnorr::generate_keys();
    let identity = Identity::from_secret_key(generated.private_key);

    let keys = Keys {
      private_key: identity.secret_key.secret_bytes().to_vec(),
      public_key: identity.public_key.serialize().to_vec(),
    };
    if let Err(err) = self.keys_table.store_client_keys(&keys) {
      warn!("Could not persist generated keys: {err}");
    }

    self.identity = Some(identity.clone());
    identity
  }

  /// Rehydrates the identity from a stored secret. No-op when an
  /// identity is already loaded; `None` when the secret is malformed.
  pub fn load(&mut self, persisted_secret: &[u8]) -> Option<Identity> {
    if let Some(identity) = &self.identity {
      debug!("Identity already loaded, keeping it");
      return Some(identity.clone());
    }

    let secret_key = match SecretKey::from_slice(persisted_secret) {
      Ok(secret_key) => secret_key,
      Err(err) => {
        warn!("Could not load identity from stored secret: {err}");
        return None;
      }
    };

    let identity = Identity::from_secret_key(secret_key);
    self.identity = Some(identity.clone());
    Some(identity)
  }

  /// Rehydrates the identity from a hex-encoded secret, as pasted or
  /// imported by the user.
  pub fn load_hex(&mut self, hex_secret: &str) -> Option<Identity> {
    let persisted_secret = match hex::decode(hex_secret) {
      Ok(bytes) => bytes,
      Err(err) => {
        warn!("Could not decode hex secret: {err}");
        return None;
      }
    };

    self.load(&persisted_secret)
  }

  /// Loads the identity persisted in the keys namespace, if any.
  pub fn load_from_store(&mut self) -> Option<Identity> {
    let keys = match self.keys_table.get_client_keys() {
      Ok(Some(keys)) => keys,
      Ok(None) => return None,
      Err(err) => {
        warn!("Could not read persisted keys: {err}");
        return None;
      }
    };

    self.load(&keys.private_key)
  }

  /// Clears the identity triple and the persisted keys. Used on
  /// logout.
  pub fn invalidate(&mut self) {
    self.identity = None;
    if let Err(err) = self.keys_table.clear_client_keys() {
      warn!("Could not clear persisted keys: {err}");
    }
  }

  /// Signs an event with the configured signer capability. With no
  /// loaded identity (or a declining external signer) the event is
  /// returned unmodified and unsigned; callers check identity
  /// presence before relying on signed output.
  pub async fn sign(&self, event: Event) -> Event {
    match &self.signer {
      SignerConfig::LocalKey => match &self.identity {
        Some(identity) => {
          let mut event = event;
          event.sign_event(&identity.secret_key.secret_bytes());
          event
        }
        None => {
          debug!("No identity loaded, returning event unsigned");
          event
        }
      },
      SignerConfig::External(capability) => {
        let fallback = event.clone();
        match capability.sign_event(event).await {
          Some(signed) => signed,
          None => {
            debug!("External signer declined, returning event unsigned");
            fallback
          }
        }
      }
    }
  }
}
