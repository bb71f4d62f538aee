//! Codec for the zip end-of-central-directory record.

pub mod eocd;
