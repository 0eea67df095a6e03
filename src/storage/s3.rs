use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Method, StatusCode};
use sha2::{Digest, Sha256};

use super::{BucketAddr, ObjectStore, StorageLocator};
use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// SigV4 presigned URLs cannot outlive seven days; longer requested
/// expiries are clamped.
const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl S3Credentials {
    /// Reads `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` from the
    /// environment.
    pub fn from_env() -> Result<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID")
            .map_err(|_| Error::Config("AWS_ACCESS_KEY_ID is not set".to_string()))?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY")
            .map_err(|_| Error::Config("AWS_SECRET_ACCESS_KEY is not set".to_string()))?;
        Ok(Self {
            access_key_id,
            secret_access_key,
        })
    }
}

/// S3 backend speaking the REST API directly with AWS Signature V4.
///
/// With no custom endpoint, virtual-hosted addressing is used
/// (`https://{bucket}.s3.{region}.amazonaws.com`). A custom endpoint (for
/// S3-compatible stores such as MinIO) switches to path-style addressing.
pub struct S3Store {
    client: reqwest::Client,
    credentials: S3Credentials,
    endpoint: Option<String>,
}

impl S3Store {
    #[must_use]
    pub fn new(credentials: S3Credentials, endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            endpoint,
        }
    }

    /// Host and canonical URI for a bucket-level or object-level request.
    fn address(&self, bucket: &BucketAddr, key: Option<&str>) -> (String, String, String) {
        let encoded_key = key.map(|k| uri_encode(k, false));

        match &self.endpoint {
            Some(endpoint) => {
                let trimmed = endpoint.trim_end_matches('/');
                let host = trimmed
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .to_string();
                let uri = match &encoded_key {
                    Some(k) => format!("/{}/{}", bucket.bucket, k),
                    None => format!("/{}", bucket.bucket),
                };
                (host, uri.clone(), format!("{trimmed}{uri}"))
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", bucket.bucket, bucket.location);
                let uri = match &encoded_key {
                    Some(k) => format!("/{k}"),
                    None => "/".to_string(),
                };
                (host.clone(), uri.clone(), format!("https://{host}{uri}"))
            }
        }
    }

    async fn request(
        &self,
        method: Method,
        bucket: &BucketAddr,
        key: Option<&str>,
        query: &[(String, String)],
        body: Option<Vec<u8>>,
        content_type: Option<&str>,
    ) -> Result<reqwest::Response> {
        let (host, canonical_uri, url) = self.address(bucket, key);
        let now = Utc::now();
        let payload_hash = hex::encode(Sha256::digest(body.as_deref().unwrap_or_default()));
        let canonical_query = canonical_query_string(query);

        let authorization = self.authorization_header(
            method.as_str(),
            &canonical_uri,
            &canonical_query,
            &host,
            &payload_hash,
            &bucket.location,
            now,
        );

        let full_url = if canonical_query.is_empty() {
            url
        } else {
            format!("{url}?{canonical_query}")
        };

        let mut request = self
            .client
            .request(method, &full_url)
            .header("host", &host)
            .header("x-amz-date", amz_date(now))
            .header("x-amz-content-sha256", &payload_hash)
            .header("authorization", authorization);

        if let Some(ct) = content_type {
            request = request.header("content-type", ct);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        request
            .send()
            .await
            .map_err(|e| Error::Storage(format!("s3 request failed: {e}")))
    }

    #[allow(clippy::too_many_arguments)]
    fn authorization_header(
        &self,
        method: &str,
        canonical_uri: &str,
        canonical_query: &str,
        host: &str,
        payload_hash: &str,
        region: &str,
        now: DateTime<Utc>,
    ) -> String {
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";
        let canonical_headers = format!(
            "host:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{}\n",
            amz_date(now)
        );
        let canonical_request = format!(
            "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
        );

        let scope = format!("{}/{region}/s3/aws4_request", date_stamp(now));
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{scope}\n{}",
            amz_date(now),
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signature = hex::encode(self.signature(region, now, string_to_sign.as_bytes()));

        format!(
            "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.credentials.access_key_id
        )
    }

    fn signature(&self, region: &str, now: DateTime<Utc>, string_to_sign: &[u8]) -> Vec<u8> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac_sha256(secret.as_bytes(), date_stamp(now).as_bytes());
        let k_region = hmac_sha256(&k_date, region.as_bytes());
        let k_service = hmac_sha256(&k_region, b"s3");
        let k_signing = hmac_sha256(&k_service, b"aws4_request");
        hmac_sha256(&k_signing, string_to_sign)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn create_bucket_if_absent(&self, bucket: &BucketAddr) -> Result<()> {
        // us-east-1 rejects an explicit LocationConstraint.
        let body = if bucket.location == "us-east-1" {
            Vec::new()
        } else {
            format!(
                "<CreateBucketConfiguration><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
                bucket.location
            )
            .into_bytes()
        };

        let response = self
            .request(Method::PUT, bucket, None, &[], Some(body), None)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Already owned; create-if-absent semantics.
            StatusCode::CONFLICT => Ok(()),
            status => Err(storage_failure("create bucket", status)),
        }
    }

    async fn delete_bucket(&self, bucket: &BucketAddr) -> Result<()> {
        let response = self
            .request(Method::DELETE, bucket, None, &[], None, None)
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            status => Err(storage_failure("delete bucket", status)),
        }
    }

    async fn list(
        &self,
        bucket: &BucketAddr,
        prefix: Option<&str>,
        max_keys: Option<usize>,
    ) -> Result<Vec<String>> {
        let mut query = vec![("list-type".to_string(), "2".to_string())];
        if let Some(prefix) = prefix {
            query.push(("prefix".to_string(), prefix.to_string()));
        }
        if let Some(max) = max_keys {
            query.push(("max-keys".to_string(), max.to_string()));
        }

        let response = self
            .request(Method::GET, bucket, None, &query, None, None)
            .await?;

        if !response.status().is_success() {
            return Err(storage_failure("list bucket", response.status()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Storage(format!("s3 list response: {e}")))?;

        Ok(extract_tags(&body, "Key"))
    }

    async fn put(&self, cubby: &StorageLocator, data: &[u8]) -> Result<String> {
        let response = self
            .request(
                Method::PUT,
                &cubby.bucket_addr(),
                Some(&cubby.key),
                &[],
                Some(data.to_vec()),
                cubby.content_type.as_deref(),
            )
            .await?;

        if !response.status().is_success() {
            return Err(storage_failure("put object", response.status()));
        }

        self.url(cubby, super::DEFAULT_URL_EXPIRY).await
    }

    async fn get(&self, cubby: &StorageLocator) -> Result<Vec<u8>> {
        let response = self
            .request(
                Method::GET,
                &cubby.bucket_addr(),
                Some(&cubby.key),
                &[],
                None,
                None,
            )
            .await?;

        match response.status() {
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| Error::Storage(format!("s3 get body: {e}")))?;
                Ok(bytes.to_vec())
            }
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            status => Err(storage_failure("get object", status)),
        }
    }

    async fn exists(&self, cubby: &StorageLocator) -> Result<bool> {
        let response = self
            .request(
                Method::HEAD,
                &cubby.bucket_addr(),
                Some(&cubby.key),
                &[],
                None,
                None,
            )
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(storage_failure("head object", status)),
        }
    }

    async fn delete(&self, cubby: &StorageLocator) -> Result<()> {
        let response = self
            .request(
                Method::DELETE,
                &cubby.bucket_addr(),
                Some(&cubby.key),
                &[],
                None,
                None,
            )
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Ok(()),
            status => Err(storage_failure("delete object", status)),
        }
    }

    async fn size(&self, cubby: &StorageLocator) -> Result<i64> {
        let response = self
            .request(
                Method::HEAD,
                &cubby.bucket_addr(),
                Some(&cubby.key),
                &[],
                None,
                None,
            )
            .await?;

        match response.status() {
            status if status.is_success() => response
                .headers()
                .get("content-length")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| Error::Storage("s3 response missing content-length".to_string())),
            StatusCode::NOT_FOUND => Err(Error::NotFound),
            status => Err(storage_failure("head object", status)),
        }
    }

    async fn url(&self, cubby: &StorageLocator, expiry: Duration) -> Result<String> {
        let bucket = cubby.bucket_addr();
        let (host, canonical_uri, url) = self.address(&bucket, Some(&cubby.key));
        let now = Utc::now();
        let expiry = expiry.min(MAX_PRESIGN_EXPIRY);

        let scope = format!("{}/{}/s3/aws4_request", date_stamp(now), bucket.location);
        let credential = format!("{}/{scope}", self.credentials.access_key_id);

        let mut query = vec![
            (
                "X-Amz-Algorithm".to_string(),
                "AWS4-HMAC-SHA256".to_string(),
            ),
            ("X-Amz-Credential".to_string(), credential),
            ("X-Amz-Date".to_string(), amz_date(now)),
            ("X-Amz-Expires".to_string(), expiry.as_secs().to_string()),
            ("X-Amz-SignedHeaders".to_string(), "host".to_string()),
        ];
        let canonical_query = canonical_query_string(&query);

        let canonical_request = format!(
            "GET\n{canonical_uri}\n{canonical_query}\nhost:{host}\n\nhost\nUNSIGNED-PAYLOAD"
        );
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{scope}\n{}",
            amz_date(now),
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );
        let signature = hex::encode(self.signature(&bucket.location, now, string_to_sign.as_bytes()));

        query.push(("X-Amz-Signature".to_string(), signature));
        Ok(format!("{url}?{}", canonical_query_string(&query)))
    }
}

fn storage_failure(operation: &str, status: StatusCode) -> Error {
    Error::Storage(format!("s3 {operation} returned {status}"))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC-SHA256 accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac key");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

fn date_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

/// AWS-style URI encoding: unreserved characters pass through, `/` only
/// when it separates path segments.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn canonical_query_string(params: &[(String, String)]) -> String {
    let mut encoded: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
        .collect();
    encoded.sort();
    encoded.join("&")
}

/// Pulls the text content of every `<tag>...</tag>` out of an S3 XML
/// response. The responses are machine-generated and unnested, so a scan
/// beats pulling in an XML parser.
fn extract_tags(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut values = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find(&open) {
        rest = &rest[start + open.len()..];
        let Some(end) = rest.find(&close) else { break };
        values.push(rest[..end].to_string());
        rest = &rest[end + close.len()..];
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("dog-bog/dog-bog-1.0.0.zip", false), "dog-bog/dog-bog-1.0.0.zip");
        assert_eq!(uri_encode("a b", true), "a%20b");
        assert_eq!(uri_encode("a/b", true), "a%2Fb");
        assert_eq!(uri_encode("ok-._~", true), "ok-._~");
    }

    #[test]
    fn test_canonical_query_sorted() {
        let query = canonical_query_string(&[
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ]);
        assert_eq!(query, "a=1&b=2");
    }

    #[test]
    fn test_extract_tags() {
        let xml = "<ListBucketResult><Contents><Key>a/1</Key></Contents>\
                   <Contents><Key>b/2</Key></Contents></ListBucketResult>";
        assert_eq!(extract_tags(xml, "Key"), vec!["a/1", "b/2"]);
        assert!(extract_tags(xml, "Missing").is_empty());
    }

    #[test]
    fn test_presign_clamps_expiry() {
        let store = S3Store::new(
            S3Credentials {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "secret".to_string(),
            },
            None,
        );
        let cubby = StorageLocator::parse("s3://us-west-1/packages/a.zip", None).unwrap();

        let rt = tokio::runtime::Runtime::new().unwrap();
        let url = rt
            .block_on(store.url(&cubby, super::super::DEFAULT_URL_EXPIRY))
            .unwrap();

        assert!(url.contains("X-Amz-Expires=604800"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.starts_with("https://packages.s3.us-west-1.amazonaws.com/a.zip?"));
    }

    #[test]
    fn test_address_styles() {
        let creds = S3Credentials {
            access_key_id: "k".to_string(),
            secret_access_key: "s".to_string(),
        };
        let bucket = BucketAddr::parse("s3://us-west-1/packages").unwrap();

        let virtual_hosted = S3Store::new(creds.clone(), None);
        let (host, uri, url) = virtual_hosted.address(&bucket, Some("a/b.zip"));
        assert_eq!(host, "packages.s3.us-west-1.amazonaws.com");
        assert_eq!(uri, "/a/b.zip");
        assert_eq!(url, "https://packages.s3.us-west-1.amazonaws.com/a/b.zip");

        let path_style = S3Store::new(creds, Some("http://127.0.0.1:9000".to_string()));
        let (host, uri, url) = path_style.address(&bucket, Some("a/b.zip"));
        assert_eq!(host, "127.0.0.1:9000");
        assert_eq!(uri, "/packages/a/b.zip");
        assert_eq!(url, "http://127.0.0.1:9000/packages/a/b.zip");
    }
}
