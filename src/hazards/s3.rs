use anyhow::{Context, Result};
use bytes::Bytes;
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

use super::{HazardStore, Obstacle, parse_catalogue};

/// Reads the catalogue from a single S3 object.
///
/// Objects whose key ends in `.gz` are gunzipped before parsing.
pub struct S3HazardStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    key: String,
}

impl S3HazardStore {
    /// Creates a store using the ambient AWS configuration already loaded by
    /// `aws_config::load_from_env`.
    pub fn new(config: &aws_config::SdkConfig, bucket: String, key: String) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
            bucket,
            key,
        }
    }
}

fn decompress(key: &str, body: Bytes) -> Result<Bytes> {
    if !key.ends_with(".gz") {
        return Ok(body);
    }
    let mut out = Vec::with_capacity(body.len() * 4);
    GzDecoder::new(body.as_ref())
        .read_to_end(&mut out)
        .with_context(|| format!("failed to gunzip '{key}'"))?;
    Ok(out.into())
}

#[async_trait::async_trait]
impl HazardStore for S3HazardStore {
    async fn list(&self) -> Result<Vec<Obstacle>> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await
            .with_context(|| format!("S3 GetObject failed for '{}/{}'", self.bucket, self.key))?;

        let body = resp
            .body
            .collect()
            .await
            .with_context(|| format!("failed to read S3 object '{}/{}'", self.bucket, self.key))?
            .into_bytes();
        debug!(bucket = %self.bucket, key = %self.key, bytes = body.len(), "Obstacle catalogue downloaded");

        parse_catalogue(&decompress(&self.key, body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_decompress_gzipped_key() {
        let json = br#"[{"id":1,"position":[35.0,139.0]}]"#;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json).unwrap();
        let compressed = encoder.finish().unwrap();

        let out = decompress("obstacles.json.gz", compressed.into()).unwrap();
        assert_eq!(out.as_ref(), json);
    }

    #[test]
    fn test_plain_key_passes_through() {
        let out = decompress("obstacles.json", Bytes::from_static(b"[]")).unwrap();
        assert_eq!(out.as_ref(), b"[]");
    }

    #[test]
    fn test_corrupt_gzip_is_an_error() {
        assert!(decompress("obstacles.json.gz", Bytes::from_static(b"not gzip")).is_err());
    }
}
