#![allow(dead_code)]
pub mod oracles;
pub mod prepare_env;
pub mod stores;

/// A well-formed file id that is unique per `n`.
pub fn file_id(n: usize) -> String {
    format!("00000000-0000-4000-8000-{n:012}")
}
