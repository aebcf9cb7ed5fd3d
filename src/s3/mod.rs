pub mod client;
pub mod signer;

pub use client::{PutOptions, S3Client, S3Error};
