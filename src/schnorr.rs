use std::str::FromStr;

use bitcoin_hashes::{hex::FromHex, sha256};
use secp256k1::{
  schnorr, KeyPair, Message, PublicKey, Secp256k1, SecretKey, Signing, Verification,
  XOnlyPublicKey,
};

#[derive(Debug)]
pub struct AsymmetricKeys {
  pub private_key: SecretKey,
  pub public_key: PublicKey,
}

impl Default for AsymmetricKeys {
  fn default() -> Self {
    let secp = Secp256k1::new();
    let private_key = SecretKey::new(&mut rand::thread_rng());
    Self {
      private_key,
      public_key: PublicKey::from_secret_key(&secp, &private_key),
    }
  }
}

/// [`Schnorr`] error
#[derive(thiserror::Error, Debug)]
pub enum SchnorrError {
  /// Error related to bitcoin_hashes::hex
  #[error(transparent)]
  SHA256(#[from] bitcoin_hashes::hex::Error),

  /// Error secp256k1
  #[error(transparent)]
  SECP256K1(#[from] secp256k1::Error),
}

///
/// Signs a Schnorr signature over an already-hashed, hex-encoded message
/// (an event id).
///
/// Returns the `Signature` on success, a `SchnorrError` otherwise.
///
pub fn sign_schnorr<C: Signing>(
  secp: &Secp256k1<C>,
  msg: String,
  seckey: &[u8],
) -> Result<schnorr::Signature, SchnorrError> {
  let hash_from_hex = sha256::Hash::from_hex(&msg)?;
  let msg = Message::from_slice(hash_from_hex.as_ref())?;
  match SecretKey::from_slice(seckey) {
    Ok(seckey) => {
      let keypair = KeyPair::from_secret_key(secp, &seckey);
      Ok(secp.sign_schnorr_no_aux_rand(&msg, &keypair))
    }
    Err(err) => {
      log::error!("[sign_schnorr > SecretKey::from_slice] {err}");
      Err(SchnorrError::SECP256K1(err))
    }
  }
}

///
/// Verifies a Schnorr signature over an already-hashed, hex-encoded message
/// against an x-only public key (hex string).
///
/// Returns `Ok(true)` when the signature verifies, a `SchnorrError` otherwise.
///
pub fn verify_schnorr<C: Verification>(
  secp: &Secp256k1<C>,
  msg: String,
  sig: schnorr::Signature,
  pubkey: String,
) -> Result<bool, SchnorrError> {
  let hash_from_hex = sha256::Hash::from_hex(&msg)?;
  let msg = Message::from_slice(hash_from_hex.as_ref())?;
  let x_only_pubkey = XOnlyPublicKey::from_str(&pubkey)?;

  match secp.verify_schnorr(&sig, &msg, &x_only_pubkey) {
    Ok(_) => Ok(true),
    Err(err) => {
      log::debug!("[verify_schnorr] {err}");
      Err(SchnorrError::SECP256K1(err))
    }
  }
}

///
/// Generates a random keypair (private and public keys)
/// usable for Schnorr signatures.
///
pub fn generate_keys() -> AsymmetricKeys {
  let secp = Secp256k1::new();
  let mut rng = rand::thread_rng();

  let (seckey, pubkey) = secp.generate_keypair(&mut rng);

  AsymmetricKeys {
    public_key: pubkey,
    private_key: seckey,
  }
}
