//! Repository 実装
//!
//! - `inmemory`: プロセス内の HashMap/BTreeMap をストアとして使う実装
//! - `json_file`: インメモリ実装の状態を JSON ファイルに永続化する実装

pub mod inmemory;
pub mod json_file;

pub use inmemory::{DirectorySnapshot, InMemoryDirectory};
pub use json_file::JsonFileDirectory;
