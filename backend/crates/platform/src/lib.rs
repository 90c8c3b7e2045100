//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (HMAC-SHA256 signing, base64url)
//! - Password hashing (Argon2id with NFKC normalization and zeroization)
//! - Client identification from HTTP headers

pub mod client;
pub mod crypto;
pub mod password;
