//! # 📡 THE STORAGE API BACKEND
//!
//! 🎬 COLD OPEN: INT. SOMEBODY ELSE'S DATA CENTER, 3:47 AM
//!
//! Two hosted projects. One has the invoices. The other one is supposed to.
//! Between them: three HTTP endpoints, a service key each, and a lot of hope.
//!
//! - `GET  {url}/storage/v1/object/list/{bucket}`  one page of a folder
//! - `GET  {url}/storage/v1/object/{bucket}/{path}` the bytes
//! - `POST {url}/storage/v1/object/{bucket}/{path}` the bytes, but going the other way
//!
//! Every call wears two hats with the same credential on them: `apikey` and
//! `Authorization: Bearer`. The gateway checks one, the storage service checks the other.
//! We send both and stop asking questions. 🦆

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url, multipart};
use tracing::{debug, trace};

use crate::app_config::RuntimeConfig;
use crate::backends::{ListEntry, ListRequest, ObjectStore};

/// 📡 One hosted project's storage API, reached over HTTP.
///
/// Holds a `reqwest::Client` reused across every call, because spinning up a new client
/// per request is the networking equivalent of buying a new car every time you need groceries.
pub struct StorageApi {
    client: reqwest::Client,
    base_url: Url,
    service_key: String,
}

// 🎭 manual Debug: the service key stays out of every log line, forever
impl std::fmt::Debug for StorageApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageApi")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

impl StorageApi {
    /// 🚀 Wires up a client for one project. No network calls happen here.
    pub fn new(url: &str, service_key: impl Into<String>, runtime: &RuntimeConfig) -> Result<Self> {
        let base_url = Url::parse(url)
            .with_context(|| format!("💀 '{}' is not a URL we can build requests on. Scheme included? https:// and all?", url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("💀 '{}' cannot be used as a base URL", url);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(runtime.connect_timeout_secs))
            .timeout(Duration::from_secs(runtime.request_timeout_secs))
            .build()
            .context("💀 The HTTP client refused to be born. The TLS stack wept. Probably a cursed system cert store.")?;

        Ok(Self {
            client,
            base_url,
            service_key: service_key.into(),
        })
    }

    /// 🗺️ `{base}/storage/v1/object/{fixed...}/{path segments...}`, every segment percent-encoded on its own.
    fn endpoint(&self, fixed: &[&str], path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| anyhow!("💀 base URL '{}' has no path to extend", self.base_url))?;
            segments.pop_if_empty();
            segments.extend(["storage", "v1", "object"]);
            segments.extend(fixed);
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    /// 🔒 Both credential headers, same key. The gateway and the storage service each want their own.
    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

#[async_trait]
impl ObjectStore for StorageApi {
    async fn list_page(&self, bucket: &str, request: &ListRequest) -> Result<Vec<ListEntry>> {
        let mut url = self.endpoint(&["list", bucket], "")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &request.limit.to_string());
            // -- 🗺️ root listing goes out without a prefix at all, not `prefix=`
            if !request.prefix.is_empty() {
                query.append_pair("prefix", &request.prefix);
            }
            if request.offset > 0 {
                query.append_pair("offset", &request.offset.to_string());
            }
        }

        trace!("📋 GET {}", url);
        let response = self
            .authed(self.client.get(url))
            .send()
            .await
            .with_context(|| format!("💀 Listing '{}/{}' never made it to the server", bucket, request.prefix))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 Listing '{}/{}' came back {}: {}",
                bucket,
                request.prefix,
                status,
                body
            );
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("💀 Listing '{}/{}' hung up mid-sentence", bucket, request.prefix))?;
        let entries: Vec<ListEntry> = serde_json::from_slice(&body)
            .with_context(|| format!("💀 Listing '{}/{}' returned something that isn't a list of entries", bucket, request.prefix))?;

        debug!(
            "📋 '{}/{}' page at offset {} → {} entries",
            bucket,
            request.prefix,
            request.offset,
            entries.len()
        );
        Ok(entries)
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let url = self.endpoint(&[bucket], path)?;
        trace!("⬇️ GET {}", url);

        let response = self
            .authed(self.client.get(url))
            .send()
            .await
            .with_context(|| format!("💀 Download of '{}/{}' never made it to the server", bucket, path))?;

        let status = response.status();
        if status != StatusCode::OK {
            anyhow::bail!("💀 Download of '{}/{}' came back {}", bucket, path, status);
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("💀 Download of '{}/{}' dropped mid-stream", bucket, path))?;
        Ok(body.to_vec())
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<()> {
        let url = self.endpoint(&[bucket], path)?;
        let file_name = path.rsplit('/').next().unwrap_or(path).to_string();
        trace!("⬆️ POST {} ({} bytes)", url, bytes.len());

        let form = multipart::Form::new().part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .authed(self.client.post(url))
            // -- 🔄 rerun = overwrite, not a 400 "Duplicate"
            .header("x-upsert", "true")
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("💀 Upload of '{}/{}' never made it to the server", bucket, path))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 Upload of '{}/{}' came back {}: {}",
                bucket,
                path,
                status,
                body
            );
        }

        trace!("🚀 '{}/{}' landed with {}", bucket, path, status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> StorageApi {
        StorageApi::new(&server.uri(), "svc-key", &RuntimeConfig::default())
            .expect("💀 client should build")
    }

    #[test]
    fn the_one_where_paths_get_their_segments_encoded() {
        let api = StorageApi::new("https://proj.example.co/", "k", &RuntimeConfig::default())
            .expect("💀 client should build");

        let url = api.endpoint(&["invoices"], "2024/march report.pdf").expect("💀 url");
        assert_eq!(
            url.as_str(),
            "https://proj.example.co/storage/v1/object/invoices/2024/march%20report.pdf"
        );

        let list = api.endpoint(&["list", "invoices"], "").expect("💀 url");
        assert_eq!(list.as_str(), "https://proj.example.co/storage/v1/object/list/invoices");
    }

    #[test]
    fn the_one_where_a_bare_hostname_is_rejected() {
        assert!(StorageApi::new("proj.example.co", "k", &RuntimeConfig::default()).is_err());
    }

    #[tokio::test]
    async fn the_one_where_listing_sends_both_credentials_and_no_prefix_at_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/list/invoices"))
            .and(query_param("limit", "1000"))
            .and(query_param_is_missing("prefix"))
            .and(query_param_is_missing("offset"))
            .and(header("apikey", "svc-key"))
            .and(header("authorization", "Bearer svc-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "a.pdf", "id": "1", "metadata": {"size": 1024}},
                {"name": "folder", "id": null, "metadata": null}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let entries = api(&server)
            .list_page("invoices", &ListRequest { prefix: String::new(), limit: 1000, offset: 0 })
            .await
            .expect("💀 listing should succeed");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].size_bytes(), 1024);
        assert!(entries[1].is_folder());
    }

    #[tokio::test]
    async fn the_one_where_nested_listing_carries_prefix_and_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/list/invoices"))
            .and(query_param("prefix", "folder/sub"))
            .and(query_param("offset", "1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let entries = api(&server)
            .list_page("invoices", &ListRequest { prefix: "folder/sub".into(), limit: 1000, offset: 1000 })
            .await
            .expect("💀 listing should succeed");
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn the_one_where_a_listing_403_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("nope"))
            .mount(&server)
            .await;

        let err = api(&server)
            .list_page("invoices", &ListRequest { prefix: String::new(), limit: 10, offset: 0 })
            .await
            .err()
            .expect("💀 403 must not look like an empty folder");
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn the_one_where_download_only_trusts_a_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/invoices/folder/b.pdf"))
            .and(header("apikey", "svc-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/object/invoices/missing.pdf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let api = api(&server);
        let bytes = api.download("invoices", "folder/b.pdf").await.expect("💀 should download");
        assert_eq!(bytes, b"%PDF-1.7");
        assert!(api.download("invoices", "missing.pdf").await.is_err());
    }

    #[tokio::test]
    async fn the_one_where_upload_is_multipart_upsert_and_201_is_fine() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/invoices/folder/b.pdf"))
            .and(header("authorization", "Bearer svc-key"))
            .and(header("x-upsert", "true"))
            .and(body_string_contains("name=\"file\""))
            .and(body_string_contains("filename=\"b.pdf\""))
            .and(body_string_contains("hello bytes"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        api(&server)
            .upload("invoices", "folder/b.pdf", b"hello bytes".to_vec())
            .await
            .expect("💀 201 is a success where we come from");
    }

    #[tokio::test]
    async fn the_one_where_an_upload_500_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("storage is sad"))
            .mount(&server)
            .await;

        let err = api(&server)
            .upload("invoices", "a.pdf", b"x".to_vec())
            .await
            .err()
            .expect("💀 500 must surface");
        assert!(err.to_string().contains("storage is sad"));
    }
}
