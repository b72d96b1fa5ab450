use std::path::{Path, PathBuf};
use std::{env, fs};

use crate::error::SecurityError;

const PASSWORD_SALT: &str = "password.salt";
const USER_AUTH_PUBLIC: &str = "user_auth.pem.pub";
const USER_AUTH_PRIVATE: &str = "user_auth.pem";

pub type Salt = [u8; 16];

#[derive(Clone)]
pub struct KeySet {
    pub public: Vec<u8>,
    pub private: Vec<u8>,
}

impl std::fmt::Debug for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeySet({} byte public key)", self.public.len())
    }
}

#[derive(Clone)]
pub struct Security {
    pub salt: Salt,
    pub jwt_keys: KeySet,
}

impl std::fmt::Debug for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Security")
            .field("jwt_keys", &self.jwt_keys)
            .finish_non_exhaustive()
    }
}

#[inline]
fn security_dir() -> PathBuf {
    PathBuf::from(env::var("SECURITY_DIR").unwrap_or_else(|_| "./security".to_string()))
}

impl Security {
    pub fn load() -> Result<Security, SecurityError> {
        Self::load_from(security_dir())
    }

    pub fn load_from(dir: impl AsRef<Path>) -> Result<Security, SecurityError> {
        let dir = dir.as_ref();

        if cfg!(feature = "generate-security") {
            fs::create_dir_all(dir)?;
        }

        tracing::info!("Loading password salt...");
        let salt = match fs::read(dir.join(PASSWORD_SALT))
            .ok()
            .and_then(|s| Salt::try_from(s.as_slice()).ok())
        {
            Some(salt) => {
                tracing::info!("Salt found and loaded.");
                salt
            }
            None => {
                tracing::info!("Salt not found in '{}'.", dir.join(PASSWORD_SALT).display());
                if !cfg!(feature = "generate-security") {
                    return Err(SecurityError::MissingSalt(dir.to_path_buf()));
                }
                tracing::info!("Generating a new password salt.");
                let salt: Salt = rand::random();
                fs::write(dir.join(PASSWORD_SALT), salt)?;
                salt
            }
        };

        tracing::info!("Loading JWT signing keys...");
        let pub_key = fs::read(dir.join(USER_AUTH_PUBLIC)).ok();
        let priv_key = fs::read(dir.join(USER_AUTH_PRIVATE)).ok();

        let jwt_keys = match (pub_key, priv_key) {
            (Some(public), Some(private)) if !public.is_empty() && !private.is_empty() => {
                tracing::info!("Loaded JWT keys.");
                KeySet { public, private }
            }
            #[cfg(feature = "generate-security")]
            _ => generate_key_set(dir)?,
            #[cfg(not(feature = "generate-security"))]
            _ => return Err(SecurityError::MissingKeys(dir.to_path_buf())),
        };

        Ok(Security { salt, jwt_keys })
    }
}

#[cfg(feature = "generate-security")]
fn generate_key_set(dir: &Path) -> Result<KeySet, SecurityError> {
    use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
    use rsa::pkcs8::EncodePublicKey;

    let keygen = |e: &dyn std::fmt::Display| SecurityError::KeyGeneration(e.to_string());

    tracing::info!("Unable to load private and/or public user auth key(s). Generating a new pair.");

    tracing::info!("Generating a private RSA key. This will take a few minutes...");
    let mut rng = rand::thread_rng();
    let rsa_sk = rsa::RsaPrivateKey::new(&mut rng, 4096).map_err(|e| keygen(&e))?;

    tracing::info!("Creating PS256 private key...");
    let private = rsa_sk
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| keygen(&e))?
        .to_string()
        .into_bytes();
    fs::write(dir.join(USER_AUTH_PRIVATE), private.as_slice())?;

    tracing::info!("Creating PS256 public key...");
    let public = rsa_sk
        .to_public_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| keygen(&e))?
        .into_bytes();
    fs::write(dir.join(USER_AUTH_PUBLIC), public.as_slice())?;

    tracing::info!("Done generating JWT keys.");
    Ok(KeySet { public, private })
}
