//! IdentityVerifier 実装
//!
//! - `static_token`: JSON ファイルから読み込んだ固定トークン表による検証

pub mod static_token;

pub use static_token::StaticTokenVerifier;
