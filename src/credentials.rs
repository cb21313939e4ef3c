//! Account login file.
//!
//! With an empty master password the file holds `email password` in plain text.
//! Otherwise it holds `v1:<salt>:<iv>:<ciphertext>` (base64 parts), AES-256-CBC
//! under a PBKDF2-SHA256 key.

use std::fs;
use std::path::Path;

use aes::Aes256;
use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const FORMAT_TAG: &str = "v1";
const PLAINTEXT_MARKER: &str = "siege-login:";
const PBKDF2_ITERATIONS: u32 = 120_000;
const SALT_LEN: usize = 16;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

pub fn encrypt_credentials(creds: &Credentials, master_password: &str) -> Result<String> {
    if creds.email.split_whitespace().count() != 1 {
        return Err(anyhow!("email must be a single word"));
    }
    if master_password.is_empty() {
        return Ok(format!("{} {}", creds.email, creds.password));
    }

    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; 16];
    rng.fill(&mut salt);
    rng.fill(&mut iv);
    let key = derive_key(master_password, &salt);

    let mut buf = format!("{PLAINTEXT_MARKER}{} {}", creds.email, creds.password).into_bytes();
    let msg_len = buf.len();
    buf.resize(msg_len + 16, 0);
    let ciphertext = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_mut::<Pkcs7>(&mut buf, msg_len)
        .map_err(|_| anyhow!("AES encrypt failed: output buffer too small"))?;

    Ok(format!(
        "{FORMAT_TAG}:{}:{}:{}",
        BASE64.encode(salt),
        BASE64.encode(iv),
        BASE64.encode(ciphertext)
    ))
}

pub fn decrypt_credentials(content: &str, master_password: &str) -> Result<Credentials> {
    let content = content.trim();
    if !content.starts_with(&format!("{FORMAT_TAG}:")) {
        return split_login(content);
    }

    let mut parts = content.splitn(4, ':').skip(1);
    let (Some(salt), Some(iv), Some(ciphertext)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(anyhow!("expected v1:salt:iv:ciphertext"));
    };
    let salt = BASE64.decode(salt).context("salt base64 decode failed")?;
    let iv = BASE64.decode(iv).context("iv base64 decode failed")?;
    let mut buf = BASE64
        .decode(ciphertext)
        .context("ciphertext base64 decode failed")?;
    let iv: [u8; 16] = iv
        .try_into()
        .map_err(|v: Vec<u8>| anyhow!("IV must be 16 bytes, got {}", v.len()))?;

    let key = derive_key(master_password, &salt);
    let plaintext = Aes256CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| anyhow!("wrong master password or corrupted login file"))?;
    let plaintext = std::str::from_utf8(plaintext)
        .map_err(|_| anyhow!("wrong master password or corrupted login file"))?;
    let login = plaintext
        .strip_prefix(PLAINTEXT_MARKER)
        .ok_or_else(|| anyhow!("wrong master password or corrupted login file"))?;
    split_login(login)
}

pub fn save_credentials(path: &Path, creds: &Credentials, master_password: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let content = encrypt_credentials(creds, master_password)?;
    fs::write(path, content).with_context(|| format!("write login file {}", path.display()))
}

pub fn load_credentials(path: &Path, master_password: &str) -> Result<Credentials> {
    let raw = fs::read_to_string(path).with_context(|| {
        format!(
            "read login file {} (create it with `encrypt-credentials`)",
            path.display()
        )
    })?;
    decrypt_credentials(&raw, master_password)
}

fn split_login(raw: &str) -> Result<Credentials> {
    let mut parts = raw.trim().splitn(2, char::is_whitespace);
    let email = parts.next().unwrap_or_default().trim();
    let password = parts.next().unwrap_or_default().trim();
    if email.is_empty() || password.is_empty() {
        return Err(anyhow!("login file must contain an email and a password"));
    }
    Ok(Credentials {
        email: email.to_string(),
        password: password.to_string(),
    })
}

fn derive_key(master_password: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(master_password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}
