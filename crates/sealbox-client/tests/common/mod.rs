#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use opendal::Operator;
use sealbox_client::records::{user_address, UserRecord};
use sealbox_client::{Client, Session};
use sealbox_core::SealboxError;
use sealbox_crypto::{derive_master_key, Address, KdfParams, KeyBundle};
use sealbox_storage::{BlobStore, KeyDirectory};
use secrecy::SecretString;

pub const FAST_KDF: KdfParams = KdfParams {
    mem_cost_kib: 1024,
    time_cost: 1,
    parallelism: 1,
};

pub fn memory_operator() -> Operator {
    Operator::new(opendal::services::Memory::default())
        .expect("memory operator")
        .finish()
}

/// Fresh, isolated blob store and directory.
pub fn client() -> Client {
    Client::new(
        BlobStore::new(memory_operator()),
        KeyDirectory::new(memory_operator()),
    )
    .with_kdf_params(FAST_KDF)
}

pub fn password(user: &str) -> SecretString {
    SecretString::from(format!("{user}-correct-horse"))
}

pub async fn account(client: &Client, user: &str) -> Session {
    client
        .create_account(user, &password(user))
        .await
        .expect("create account")
}

pub async fn login(client: &Client, user: &str) -> Session {
    client
        .authenticate(user, &password(user))
        .await
        .expect("authenticate")
}

/// Addresses present now that were not in `before`.
pub async fn new_keys(client: &Client, before: &[Address]) -> Vec<Address> {
    client
        .blobs()
        .raw_keys()
        .await
        .expect("list blobs")
        .into_iter()
        .filter(|k| !before.contains(k))
        .collect()
}

pub async fn snapshot(client: &Client) -> Vec<Address> {
    client.blobs().raw_keys().await.expect("list blobs")
}

/// Every blob with its current value.
pub async fn contents(client: &Client) -> Vec<(Address, Vec<u8>)> {
    let mut out = Vec::new();
    for address in snapshot(client).await {
        let data = client
            .blobs()
            .raw_get(&address)
            .await
            .expect("read blob")
            .expect("blob present");
        out.push((address, data));
    }
    out
}

/// A user's key bundle, rebuilt from their stored record and test password.
pub async fn keys_of(client: &Client, user: &str) -> KeyBundle {
    let raw = client
        .blobs()
        .raw_get(&user_address(user))
        .await
        .expect("read user record")
        .expect("user record present");
    let record: UserRecord = serde_json::from_slice(&raw).expect("parse user record");
    let master = derive_master_key(&password(user), &record.salt, &record.kdf).expect("derive");
    KeyBundle::derive(&master).expect("key bundle")
}

pub async fn flip_byte(client: &Client, address: &Address) -> Vec<u8> {
    let original = client
        .blobs()
        .raw_get(address)
        .await
        .expect("read blob")
        .expect("blob present");
    let mut tampered = original.clone();
    let mid = tampered.len() / 2;
    tampered[mid] ^= 0x01;
    client
        .blobs()
        .raw_put(address, tampered)
        .await
        .expect("write blob");
    original
}

pub fn assert_integrity<T: std::fmt::Debug>(result: Result<T, SealboxError>) {
    match result {
        Err(SealboxError::IntegrityViolation(_)) => {}
        other => panic!("expected integrity violation, got {other:?}"),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log buffer")).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's tracing output into a buffer until the guard drops.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();
    (capture, tracing::subscriber::set_default(subscriber))
}
