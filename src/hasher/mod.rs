use crate::error::Error;
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::Sha256;
use std::fmt;
use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;
use twox_hash::XxHash64;

const CHUNK_SIZE: usize = 1024 * 1024; // 1MiB

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgo {
    Md5,
    Sha1,
    Sha256,
    Blake3,
    Xxh64,
}

impl HashAlgo {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgo::Md5 => "md5",
            HashAlgo::Sha1 => "sha1",
            HashAlgo::Sha256 => "sha256",
            HashAlgo::Blake3 => "blake3",
            HashAlgo::Xxh64 => "xxh64",
        }
    }

    /// Empty (or all-whitespace) names mean hashing is disabled.
    pub fn from_config(name: &str) -> Result<Option<Self>, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        name.parse().map(Some)
    }

    fn state(self) -> HashState {
        match self {
            HashAlgo::Md5 => HashState::Md5(Md5::new()),
            HashAlgo::Sha1 => HashState::Sha1(Sha1::new()),
            HashAlgo::Sha256 => HashState::Sha256(Sha256::new()),
            HashAlgo::Blake3 => HashState::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgo::Xxh64 => HashState::Xxh64(XxHash64::with_seed(0)),
        }
    }
}

impl FromStr for HashAlgo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "md5" => Ok(HashAlgo::Md5),
            "sha1" => Ok(HashAlgo::Sha1),
            "sha256" => Ok(HashAlgo::Sha256),
            "blake3" => Ok(HashAlgo::Blake3),
            "xxh64" | "xxhash64" => Ok(HashAlgo::Xxh64),
            _ => Err(Error::UnknownHashAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for HashAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

enum HashState {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Blake3(Box<blake3::Hasher>),
    Xxh64(XxHash64),
}

impl HashState {
    fn update(&mut self, data: &[u8]) {
        match self {
            HashState::Md5(h) => h.update(data),
            HashState::Sha1(h) => h.update(data),
            HashState::Sha256(h) => h.update(data),
            HashState::Blake3(h) => {
                h.update(data);
            }
            HashState::Xxh64(h) => h.write(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            HashState::Md5(h) => hex::encode(h.finalize()),
            HashState::Sha1(h) => hex::encode(h.finalize()),
            HashState::Sha256(h) => hex::encode(h.finalize()),
            HashState::Blake3(h) => h.finalize().to_hex().to_string(),
            HashState::Xxh64(h) => format!("{:016x}", h.finish()),
        }
    }
}

/// Stream `reader` through `algo` in 1MiB chunks, returning a lowercase hex digest.
pub fn hash_reader<R: Read>(mut reader: R, algo: HashAlgo) -> io::Result<String> {
    let mut state = algo.state();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        state.update(&buffer[..n]);
    }
    Ok(state.finalize_hex())
}

/// Hash a file's content. With no algorithm this is a no-op returning an empty string.
pub fn hash_file(path: &Path, algo: Option<HashAlgo>) -> Result<String, Error> {
    let Some(algo) = algo else {
        return Ok(String::new());
    };
    let unreadable = |source| Error::ObjectUnreadable {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(unreadable)?;
    hash_reader(file, algo).map_err(unreadable)
}
