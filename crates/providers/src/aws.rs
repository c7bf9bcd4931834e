//! AWS request authentication for Bedrock endpoints.
//!
//! Two schemes are supported:
//! - **SigV4** (`AWS4-HMAC-SHA256`) using access keys from the environment
//! - **Bearer** Bedrock API keys (`Authorization: Bearer ...`)
//!
//! The knowledge-base client in `stratadesk-knowledge` reuses this module so
//! both services authenticate the same way.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Signing name shared by `bedrock-runtime` and `bedrock-agent-runtime`.
pub const BEDROCK_SIGNING_SERVICE: &str = "bedrock";

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static AWS access keys.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AwsCredentials {
    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_key_id = lookup("AWS_ACCESS_KEY_ID").filter(|v| !v.is_empty())?;
        let secret_access_key = lookup("AWS_SECRET_ACCESS_KEY").filter(|v| !v.is_empty())?;
        Some(Self {
            access_key_id,
            secret_access_key,
            session_token: lookup("AWS_SESSION_TOKEN").filter(|v| !v.is_empty()),
        })
    }
}

/// How outbound Bedrock requests are authenticated.
#[derive(Debug, Clone)]
pub enum AwsAuth {
    SigV4(AwsCredentials),
    Bearer(String),
    Anonymous,
}

impl AwsAuth {
    /// Environment access keys win; otherwise fall back to a bearer API key.
    pub fn resolve(api_key: Option<String>) -> Self {
        if let Some(credentials) = AwsCredentials::from_env() {
            return AwsAuth::SigV4(credentials);
        }
        match api_key {
            Some(key) if !key.is_empty() => AwsAuth::Bearer(key),
            _ => AwsAuth::Anonymous,
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            AwsAuth::SigV4(_) => "sigv4",
            AwsAuth::Bearer(_) => "bearer",
            AwsAuth::Anonymous => "none",
        }
    }

    /// Attach authentication headers to a JSON POST request.
    ///
    /// `url` must be exactly the URL the builder was created with, and `body`
    /// exactly the bytes that will be sent.
    pub fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        url: &reqwest::Url,
        body: &[u8],
        region: &str,
    ) -> reqwest::RequestBuilder {
        match self {
            AwsAuth::Anonymous => builder,
            AwsAuth::Bearer(token) => builder.bearer_auth(token),
            AwsAuth::SigV4(credentials) => {
                let host = match url.port() {
                    Some(port) => format!("{}:{port}", url.host_str().unwrap_or_default()),
                    None => url.host_str().unwrap_or_default().to_string(),
                };
                let request = SigningRequest {
                    method: "POST",
                    host: &host,
                    path: url.path(),
                    query: url.query().unwrap_or(""),
                    headers: vec![("content-type".into(), "application/json".into())],
                    payload: body,
                };
                let signed = sign(
                    credentials,
                    region,
                    BEDROCK_SIGNING_SERVICE,
                    &request,
                    Utc::now(),
                );
                signed
                    .into_iter()
                    .fold(builder, |b, (name, value)| b.header(name, value))
            }
        }
    }
}

/// The parts of an HTTP request that participate in the signature.
#[derive(Debug)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub host: &'a str,
    /// Path exactly as sent on the wire (already percent-encoded)
    pub path: &'a str,
    pub query: &'a str,
    /// Extra headers to sign (besides `host` and `x-amz-date`)
    pub headers: Vec<(String, String)>,
    pub payload: &'a [u8],
}

/// Compute SigV4 headers for a request.
///
/// Returns the headers the caller must add: `x-amz-date`, optionally
/// `x-amz-security-token`, and `authorization`.
pub fn sign(
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
    request: &SigningRequest<'_>,
    now: DateTime<Utc>,
) -> Vec<(String, String)> {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();

    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    headers.push(("host".into(), request.host.to_string()));
    headers.push(("x-amz-date".into(), amz_date.clone()));
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token".into(), token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        request.method,
        canonical_uri(request.path),
        canonical_query(request.query),
        canonical_headers,
        signed_headers,
        hex::encode(Sha256::digest(request.payload)),
    );

    let scope = format!("{date}/{region}/{service}/aws4_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let k_date = hmac(
        format!("AWS4{}", credentials.secret_access_key).as_bytes(),
        date.as_bytes(),
    );
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    let k_signing = hmac(&k_service, b"aws4_request");
    let signature = hex::encode(hmac(&k_signing, string_to_sign.as_bytes()));

    let mut out = vec![("x-amz-date".to_string(), amz_date)];
    if let Some(token) = &credentials.session_token {
        out.push(("x-amz-security-token".to_string(), token.clone()));
    }
    out.push((
        "authorization".to_string(),
        format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key_id
        ),
    ));
    out
}

/// Percent-encode everything except RFC 3986 unreserved characters.
pub fn uri_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Non-S3 services encode each path segment a second time.
fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".into();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

fn canonical_query(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (uri_encode(k), uri_encode(v)),
            None => (uri_encode(pair), String::new()),
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn example_credentials() -> AwsCredentials {
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
            session_token: None,
        }
    }

    #[test]
    fn get_vanilla_signature_matches_reference() {
        let now = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
        let request = SigningRequest {
            method: "GET",
            host: "example.amazon.com",
            path: "/",
            query: "",
            headers: vec![],
            payload: b"",
        };

        let headers = sign(&example_credentials(), "us-east-1", "service", &request, now);
        let auth = headers
            .iter()
            .find(|(k, _)| k == "authorization")
            .map(|(_, v)| v.as_str())
            .unwrap();

        assert_eq!(
            auth,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
        assert!(headers.iter().any(|(k, v)| k == "x-amz-date" && v == "20150830T123600Z"));
    }

    #[test]
    fn session_token_is_signed_and_emitted() {
        let mut credentials = example_credentials();
        credentials.session_token = Some("token123".into());
        let request = SigningRequest {
            method: "POST",
            host: "bedrock-runtime.us-east-1.amazonaws.com",
            path: "/model/x/invoke",
            query: "",
            headers: vec![("Content-Type".into(), "application/json".into())],
            payload: b"{}",
        };
        let headers = sign(&credentials, "us-east-1", BEDROCK_SIGNING_SERVICE, &request, Utc::now());
        let auth = &headers.last().unwrap().1;
        assert!(auth.contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token"));
        assert!(headers.iter().any(|(k, v)| k == "x-amz-security-token" && v == "token123"));
    }

    #[test]
    fn uri_encoding_rules() {
        assert_eq!(uri_encode("anthropic.claude-3-haiku-20240307-v1:0"), "anthropic.claude-3-haiku-20240307-v1%3A0");
        assert_eq!(uri_encode("a b/c~"), "a%20b%2Fc~");
        // Already-encoded segments are encoded again for the canonical form
        assert_eq!(canonical_uri("/model/v1%3A0/invoke"), "/model/v1%253A0/invoke");
        assert_eq!(canonical_uri("/"), "/");
    }

    #[test]
    fn query_pairs_are_sorted() {
        assert_eq!(canonical_query("b=2&a=1"), "a=1&b=2");
        assert_eq!(canonical_query(""), "");
    }

    #[test]
    fn credentials_from_lookup() {
        let creds = AwsCredentials::from_lookup(|k| match k {
            "AWS_ACCESS_KEY_ID" => Some("AKID".into()),
            "AWS_SECRET_ACCESS_KEY" => Some("secret".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(creds.access_key_id, "AKID");
        assert!(creds.session_token.is_none());
        assert!(!format!("{creds:?}").contains("secret"));

        assert!(AwsCredentials::from_lookup(|_| None).is_none());
    }
}
