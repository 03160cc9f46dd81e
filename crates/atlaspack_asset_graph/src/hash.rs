use xxhash_rust::xxh3::xxh3_64;
use xxhash_rust::xxh3::Xxh3;

/// Hasher used for identifiers that end up in caches.
///
/// The hashes don't need to be incredibly fast, but they should be stable across
/// runs, machines, platforms and versions.
pub type IdentifierHasher = Xxh3;

pub fn hash_string(s: &str) -> String {
  hash_bytes(s.as_bytes())
}

pub fn hash_bytes(s: &[u8]) -> String {
  let res = xxh3_64(s);
  format!("{:016x}", res)
}

/// Accumulates strings into a single digest, in the order they are written.
#[derive(Default)]
pub struct StringHasher {
  inner: Xxh3,
}

impl StringHasher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn write_string(&mut self, s: &str) {
    self.inner.update(s.as_bytes());
  }

  pub fn finish(&self) -> String {
    format!("{:016x}", self.inner.digest())
  }
}
