// Hub REST client
//
// Wraps `reqwest::Client` with hub URL construction and bearer-token auth.
// Every endpoint returns the raw response body; turning payloads into
// entity records is the cache layer's job, which keeps this module a pure
// transport surface with a narrow contract.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Jinja template posted to `/api/template` to extract entity→area pairs.
///
/// The hub evaluates it server-side and returns a JSON-ish array of
/// `{"e": entity_id, "a": area_id}` objects. Templated output is not
/// guaranteed to be clean JSON, so callers parse it defensively.
const REGISTRY_TEMPLATE: &str = r#"{% set ns = namespace(result=[]) %}{% for entity in states %}{% set area = area_id(entity.entity_id) %}{% if area %}{% set ns.result = ns.result + ['{"e":"' ~ entity.entity_id ~ '","a":"' ~ area ~ '"}'] %}{% endif %}{% endfor %}[{{ ns.result | join(',') }}]"#;

/// Raw HTTP client for a Home Assistant compatible hub.
///
/// Holds the base URL and a long-lived access token; each call sends
/// `Authorization: Bearer <token>` and returns the body verbatim together
/// with success, or the failure reason (transport error or non-2xx status).
/// No retries happen at this level.
#[derive(Clone)]
pub struct HubClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
}

impl HubClient {
    /// Create a new hub client from a base URL and access token.
    ///
    /// The `base_url` should be the hub root including the port
    /// (e.g. `http://192.168.1.50:8123`).
    pub fn new(
        base_url: Url,
        token: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url, token })
    }

    /// The hub base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/` — liveness probe. The hub answers with a short status
    /// message when the token is accepted.
    pub async fn test_connection(&self) -> Result<String, Error> {
        self.get_raw(self.api_url("")?).await
    }

    /// `GET /api/states` — full dump of all entity states.
    pub async fn get_all_states(&self) -> Result<String, Error> {
        self.get_raw(self.api_url("states")?).await
    }

    /// `GET /api/states/{entity_id}` — a single entity state.
    pub async fn get_state(&self, entity_id: &str) -> Result<String, Error> {
        self.get_raw(self.api_url(&format!("states/{entity_id}"))?).await
    }

    /// `POST /api/services/{domain}/{service}` — invoke a service.
    ///
    /// The body merges `{"entity_id": ...}` (when given) with any extra
    /// parameters; a key collision resolves in favour of `extra`.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        entity_id: Option<&str>,
        extra: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<String, Error> {
        let mut body = serde_json::Map::new();
        if let Some(id) = entity_id {
            body.insert("entity_id".into(), serde_json::Value::String(id.into()));
        }
        if let Some(extra) = extra {
            for (k, v) in extra {
                body.insert(k.clone(), v.clone());
            }
        }

        let url = self.api_url(&format!("services/{domain}/{service}"))?;
        self.post_raw(url, &body).await
    }

    /// `GET /api/services` — discovery of available service domains.
    pub async fn get_services(&self) -> Result<String, Error> {
        self.get_raw(self.api_url("services")?).await
    }

    /// `POST /api/template` — fetch the entity→area registry blob.
    pub async fn get_entity_registry(&self) -> Result<String, Error> {
        let body = serde_json::json!({ "template": REGISTRY_TEMPLATE });
        self.post_raw(self.api_url("template")?, &body).await
    }

    // ── Request plumbing ─────────────────────────────────────────────

    /// Build a full URL under the hub's `/api/` root.
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    /// Send a GET request and return the raw body.
    async fn get_raw(&self, url: Url) -> Result<String, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::read_body(resp).await
    }

    /// Send a POST request with a JSON body and return the raw body.
    async fn post_raw(&self, url: Url, body: &impl Serialize) -> Result<String, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        Self::read_body(resp).await
    }

    /// Collect the body, mapping non-2xx statuses to `Error::Status` with
    /// the body preserved for diagnostics.
    async fn read_body(resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(Error::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl std::fmt::Debug for HubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Token deliberately omitted.
        f.debug_struct("HubClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
