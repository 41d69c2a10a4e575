//! Signed `dash` request construction.
//!
//! The manifest endpoint checks `vf` against the exact bytes of the query
//! string it was computed over, so parameters live in an ordered list from
//! assembly through signing to transmission. Reordering anything, or
//! escaping it differently, invalidates the signature.
//!
//! Signing steps:
//!
//! 1. assemble the fixed block, ids, timestamp and the escaped `bop` blob
//! 2. `authKey = auth(auth("") ‖ tm ‖ tvid)`, appended
//! 3. `vf = md5(addChar("/dash?k=v&…"))`, appended last
//! 4. `bop` is un-escaped in place; the HTTP layer escapes it on the wire

use anyhow::{Context, Result};
use md5::{Digest, Md5};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ResolverConfig;
use crate::http_client::{ApiResponse, PageFetcher};
use crate::signing::SigningEngine;

use super::catalog::{int, StreamCatalog};
use super::identity::VideoIdentity;

/// Manifest `code` for a usable answer.
pub const SUCCESS_CODE: &str = "A00000";

const BID: &str = "300";
const SRC: &str = "01080031010000000000";

const PLAYER_FLAGS: &[(&str, &str)] = &[
    ("vt", "0"),
    ("rs", "1"),
    ("uid", ""),
    ("ori", "pcw"),
    ("ps", "1"),
];

const SESSION_FLAGS: &[(&str, &str)] = &[
    ("pt", "0"),
    ("d", "0"),
    ("s", ""),
    ("lid", "0"),
    ("cf", "0"),
    ("ct", "0"),
    ("k_tag", "1"),
];

const RETRY_FLAGS: &[(&str, &str)] = &[("k_err_retries", "0"), ("up", ""), ("qd_v", "a1")];

const FEATURE_FLAGS: &[(&str, &str)] = &[
    ("k_ft1", "706436220846084"),
    ("k_ft4", "1162321298202628"),
    ("k_ft5", "137573171201"),
    ("k_ft6", "128"),
    ("k_ft7", "671612932"),
];

const FRAME_RATE_CAPS: &[(&str, &str)] = &[
    ("fr_300", "120_120_120_120_120_120"),
    ("fr_500", "120_120_120_120_120_120"),
    ("fr_600", "120_120_120_120_120_120"),
    ("fr_800", "120_120_120_120_120_120"),
    ("fr_1020", "120_120_120_120_120_120"),
];

/// Device-bound constants the web player sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceParams {
    pub k_uid: String,
    pub dfp: String,
    pub pck: String,
}

impl Default for DeviceParams {
    fn default() -> Self {
        Self {
            k_uid: "1bf80ab6e72de7ab4a42f4db91bd530b".to_string(),
            dfp: "a05f71a09d3d594d61999d8de6456cae27c93252e9ce61cd4246848a76eafcb3ec".to_string(),
            pck: "38Dklg6YLDVPnQ2URa80m1AvEn7v0bVvq4MgAHwm3m1Vm3ai5115qb9dHm1vNXAv4ytm2qAF17"
                .to_string(),
        }
    }
}

impl DeviceParams {
    /// The `bop` fingerprint blob, unescaped. The brace placement is the
    /// player's and must not be "fixed".
    pub fn bop(&self) -> String {
        format!(r#"{{"version":"10.0","dfp":"{}"}},"b_ft1":24"#, self.dfp)
    }
}

/// Constant and time-varying signature inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningContext {
    pub timestamp_millis: i64,
    pub device: DeviceParams,
}

impl SigningContext {
    /// Context stamped with the current wall clock.
    pub fn now() -> Self {
        Self::at(chrono::Utc::now().timestamp_millis())
    }

    pub fn at(timestamp_millis: i64) -> Self {
        Self {
            timestamp_millis,
            device: DeviceParams::default(),
        }
    }
}

/// Query parameters in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.0.push((key.to_string(), value.into()));
    }

    fn extend(&mut self, pairs: &[(&str, &str)]) {
        for (key, value) in pairs {
            self.push(key, *value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Replace a value without moving its key.
    pub fn replace(&mut self, key: &str, value: impl Into<String>) -> bool {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => {
                slot.1 = value.into();
                true
            }
            None => false,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `path?k=v&k=v`, values as stored, no trailing separator.
    pub fn to_query_string(&self, path: &str) -> String {
        let joined = self
            .0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{path}?{joined}")
    }
}

/// A fully signed manifest request, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedStreamRequest {
    /// Transmission order; `bop` is already un-escaped.
    pub params: QueryParams,
    pub auth_key: String,
    /// `vf`
    pub verification_token: String,
}

/// Parsed manifest contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamManifest {
    pub catalog: StreamCatalog,
    pub duration_seconds: i64,
}

/// Builds, signs and sends the manifest request.
pub struct StreamRequestBuilder<'a> {
    signer: &'a dyn SigningEngine,
    path: &'a str,
}

impl<'a> StreamRequestBuilder<'a> {
    /// `path` is the prefix the signature covers, normally `/dash`.
    pub fn new(signer: &'a dyn SigningEngine, path: &'a str) -> Self {
        Self { signer, path }
    }

    /// Everything before `authKey`, with `bop` escaped.
    pub fn unsigned_params(identity: &VideoIdentity, ctx: &SigningContext) -> QueryParams {
        let device = &ctx.device;
        let mut params = QueryParams::new();

        params.push("tvid", identity.primary_id.as_str());
        params.push("bid", BID);
        params.push("vid", identity.secondary_id.as_str());
        params.push("src", SRC);
        params.extend(PLAYER_FLAGS);
        params.push("k_uid", device.k_uid.as_str());
        params.extend(SESSION_FLAGS);
        params.push("dfp", device.dfp.as_str());
        params.push("locale", "zh_cn");
        params.push("pck", device.pck.as_str());
        params.extend(RETRY_FLAGS);
        params.push("tm", ctx.timestamp_millis.to_string());
        params.extend(FEATURE_FLAGS);
        params.extend(FRAME_RATE_CAPS);
        params.push("bop", urlencoding::encode(&device.bop()).into_owned());
        params.push("ut", "0");

        params
    }

    /// Deterministic for fixed identity, context and signer outputs.
    pub fn sign(&self, identity: &VideoIdentity, ctx: &SigningContext) -> Result<SignedStreamRequest> {
        let mut params = Self::unsigned_params(identity, ctx);

        let auth_base = self.signer.auth("").context("auth(\"\") failed")?;
        let seed = format!("{auth_base}{}{}", ctx.timestamp_millis, identity.primary_id);
        let auth_key = self.signer.auth(&seed).context("auth(seed) failed")?;
        params.push("authKey", auth_key.as_str());

        let unsigned = params.to_query_string(self.path);
        let digest_input = self.signer.add_char(&unsigned).context("addChar failed")?;
        let verification_token = format!("{:x}", Md5::digest(digest_input.as_bytes()));
        params.push("vf", verification_token.as_str());

        let plain_bop = match params.get("bop") {
            Some(escaped) => Some(
                urlencoding::decode(escaped)
                    .context("bop is not valid percent-encoding")?
                    .into_owned(),
            ),
            None => None,
        };
        if let Some(plain) = plain_bop {
            params.replace("bop", plain);
        }

        Ok(SignedStreamRequest {
            params,
            auth_key,
            verification_token,
        })
    }

    /// Sign with the current time and fetch the manifest.
    ///
    /// `Ok(None)` means the request went through but carried no streams.
    #[instrument(skip_all, fields(tvid = %identity.primary_id))]
    pub async fn build_and_fetch(
        &self,
        identity: &VideoIdentity,
        fetcher: &dyn PageFetcher,
        config: &ResolverConfig,
    ) -> Result<Option<StreamManifest>> {
        let request = self.sign(identity, &SigningContext::now())?;
        debug!(vf = %request.verification_token, "Signed manifest request");

        let response = fetcher
            .fetch_api(
                &config.dash_endpoint,
                request.params.as_slice(),
                config.api_timeout(),
            )
            .await?;

        Ok(parse_manifest(&response))
    }
}

/// Pull the stream list out of a manifest response.
pub fn parse_manifest(response: &ApiResponse) -> Option<StreamManifest> {
    if !response.is_ok() {
        debug!(status = response.status, "Manifest request rejected");
        return None;
    }

    let body = match response.json() {
        Ok(body) => body,
        Err(e) => {
            debug!("{e:#}");
            return None;
        }
    };

    let code = body.get("code").and_then(Value::as_str);
    if code != Some(SUCCESS_CODE) {
        debug!(code = ?code, "Manifest returned a non-success code");
        return None;
    }

    let data = body.get("data").filter(|d| is_truthy(d))?;
    let program = data.get("program").cloned().unwrap_or(Value::Null);
    let videos = program
        .get("video")
        .and_then(Value::as_array)
        .filter(|v| !v.is_empty())?;

    let catalog = StreamCatalog::from_entries(videos);
    if catalog.is_empty() {
        debug!("Manifest video list had no usable entries");
        return None;
    }

    Some(StreamManifest {
        catalog,
        duration_seconds: int(&program, "duration"),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iqiyi::testing::FakeFetcher;

    /// Deterministic stand-in for the platform script.
    struct StubSigner;

    impl SigningEngine for StubSigner {
        fn auth(&self, seed: &str) -> Result<String> {
            if seed.is_empty() {
                Ok("base".to_string())
            } else {
                Ok(format!("{:x}", Md5::digest(seed.as_bytes())))
            }
        }

        fn add_char(&self, buffer: &str) -> Result<String> {
            Ok(format!("{buffer}&salt"))
        }
    }

    struct BrokenSigner;

    impl SigningEngine for BrokenSigner {
        fn auth(&self, _seed: &str) -> Result<String> {
            anyhow::bail!("script threw")
        }

        fn add_char(&self, buffer: &str) -> Result<String> {
            Ok(buffer.to_string())
        }
    }

    fn identity() -> VideoIdentity {
        VideoIdentity::new("999", "abc123").unwrap()
    }

    const TS: i64 = 1_700_000_000_000;

    #[test]
    fn parameter_order_matches_player() {
        let params = StreamRequestBuilder::unsigned_params(&identity(), &SigningContext::at(TS));
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(
            keys,
            [
                "tvid", "bid", "vid", "src", "vt", "rs", "uid", "ori", "ps", "k_uid", "pt", "d",
                "s", "lid", "cf", "ct", "k_tag", "dfp", "locale", "pck", "k_err_retries", "up",
                "qd_v", "tm", "k_ft1", "k_ft4", "k_ft5", "k_ft6", "k_ft7", "fr_300", "fr_500",
                "fr_600", "fr_800", "fr_1020", "bop", "ut",
            ]
        );
        assert_eq!(params.get("tm"), Some("1700000000000"));
    }

    /// The web player's query for tvid 999 / vid abc123 at `TS`, before signing.
    const PLAYER_QUERY: &str = concat!(
        "/dash?tvid=999&bid=300&vid=abc123&src=01080031010000000000",
        "&vt=0&rs=1&uid=&ori=pcw&ps=1",
        "&k_uid=1bf80ab6e72de7ab4a42f4db91bd530b",
        "&pt=0&d=0&s=&lid=0&cf=0&ct=0&k_tag=1",
        "&dfp=a05f71a09d3d594d61999d8de6456cae27c93252e9ce61cd4246848a76eafcb3ec",
        "&locale=zh_cn",
        "&pck=38Dklg6YLDVPnQ2URa80m1AvEn7v0bVvq4MgAHwm3m1Vm3ai5115qb9dHm1vNXAv4ytm2qAF17",
        "&k_err_retries=0&up=&qd_v=a1&tm=1700000000000",
        "&k_ft1=706436220846084&k_ft4=1162321298202628&k_ft5=137573171201",
        "&k_ft6=128&k_ft7=671612932",
        "&fr_300=120_120_120_120_120_120&fr_500=120_120_120_120_120_120",
        "&fr_600=120_120_120_120_120_120&fr_800=120_120_120_120_120_120",
        "&fr_1020=120_120_120_120_120_120",
        "&bop=%7B%22version%22%3A%2210.0%22%2C%22dfp%22%3A%22",
        "a05f71a09d3d594d61999d8de6456cae27c93252e9ce61cd4246848a76eafcb3ec",
        "%22%7D%2C%22b_ft1%22%3A24",
        "&ut=0",
    );

    #[test]
    fn unsigned_query_matches_player_byte_for_byte() {
        let params = StreamRequestBuilder::unsigned_params(&identity(), &SigningContext::at(TS));
        assert_eq!(params.to_query_string("/dash"), PLAYER_QUERY);
    }

    #[test]
    fn bop_is_escaped_for_signing() {
        let params = StreamRequestBuilder::unsigned_params(&identity(), &SigningContext::at(TS));
        let bop = params.get("bop").unwrap();
        assert!(bop.starts_with("%7B%22version%22%3A%2210.0%22%2C%22dfp%22%3A%22a05f71"));
        assert!(bop.ends_with("%22%7D%2C%22b_ft1%22%3A24"));
    }

    #[test]
    fn query_string_has_no_trailing_separator() {
        let mut params = QueryParams::new();
        params.push("a", "1");
        params.push("b", "");
        assert_eq!(params.to_query_string("/dash"), "/dash?a=1&b=");
    }

    #[test]
    fn replace_keeps_position() {
        let mut params = QueryParams::new();
        params.push("a", "1");
        params.push("b", "2");
        params.push("c", "3");
        assert!(params.replace("b", "x"));
        assert!(!params.replace("z", "x"));
        assert_eq!(params.to_query_string("/p"), "/p?a=1&b=x&c=3");
    }

    #[test]
    fn signing_appends_auth_key_then_vf() {
        let builder = StreamRequestBuilder::new(&StubSigner, "/dash");
        let request = builder.sign(&identity(), &SigningContext::at(TS)).unwrap();

        let keys: Vec<&str> = request.params.keys().collect();
        assert_eq!(&keys[keys.len() - 4..], ["bop", "ut", "authKey", "vf"]);

        let expected_auth = format!("{:x}", Md5::digest(format!("base{TS}999").as_bytes()));
        assert_eq!(request.auth_key, expected_auth);
        assert_eq!(request.params.get("authKey"), Some(expected_auth.as_str()));
        assert_eq!(request.params.get("vf"), Some(request.verification_token.as_str()));
    }

    #[test]
    fn vf_covers_escaped_query_and_bop_is_sent_plain() {
        let builder = StreamRequestBuilder::new(&StubSigner, "/dash");
        let ctx = SigningContext::at(TS);
        let request = builder.sign(&identity(), &ctx).unwrap();

        let input = format!("{PLAYER_QUERY}&authKey={}&salt", request.auth_key);
        assert_eq!(
            request.verification_token,
            format!("{:x}", Md5::digest(input.as_bytes()))
        );

        assert_eq!(request.params.get("bop"), Some(ctx.device.bop().as_str()));
    }

    #[test]
    fn verification_token_is_deterministic() {
        let builder = StreamRequestBuilder::new(&StubSigner, "/dash");
        let ctx = SigningContext::at(TS);
        let first = builder.sign(&identity(), &ctx).unwrap();
        let second = builder.sign(&identity(), &ctx).unwrap();
        assert_eq!(first, second);

        let later = builder.sign(&identity(), &SigningContext::at(TS + 1)).unwrap();
        assert_ne!(first.verification_token, later.verification_token);
    }

    #[test]
    fn signer_failure_is_an_error() {
        let builder = StreamRequestBuilder::new(&BrokenSigner, "/dash");
        assert!(builder.sign(&identity(), &SigningContext::at(TS)).is_err());
    }

    fn ok(body: &str) -> ApiResponse {
        ApiResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn manifest_success() {
        let manifest = parse_manifest(&ok(
            r#"{"code":"A00000","data":{"program":{"duration":2700,"video":[
                {"scrsz":"1920x1080","vtype":"H264","l":"https://v/1","vsize":100,"dur":2700},
                {"scrsz":"1280x720","vtype":"H264","l":"https://v/2","vsize":50,"dur":2700}
            ]}}}"#,
        ))
        .unwrap();
        assert_eq!(manifest.duration_seconds, 2700);
        assert_eq!(manifest.catalog.available.len(), 2);
        assert_eq!(manifest.catalog.recommended[0].url, "https://v/1");
    }

    #[test]
    fn manifest_rejections() {
        assert!(parse_manifest(&ok(r#"{"code":"A00001","data":{"program":{"video":[{}]}}}"#)).is_none());
        assert!(parse_manifest(&ok(r#"{"code":"A00000","data":{}}"#)).is_none());
        assert!(parse_manifest(&ok(r#"{"code":"A00000","data":{"program":{"video":[]}}}"#)).is_none());
        assert!(parse_manifest(&ok("not json")).is_none());
        assert!(parse_manifest(&ok(r#"{"code":"A00000","data":{"program":{"video":[1,"x"]}}}"#)).is_none());
        assert!(parse_manifest(&ApiResponse {
            status: 403,
            body: r#"{"code":"A00000","data":{"program":{"video":[{}]}}}"#.into(),
        })
        .is_none());
    }

    #[tokio::test]
    async fn build_and_fetch_sends_ordered_params() {
        let config = ResolverConfig::default();
        let fetcher = FakeFetcher::new().api(
            &config.dash_endpoint,
            200,
            r#"{"code":"A00000","data":{"program":{"video":[{"scrsz":"720","l":"u"}]}}}"#,
        );
        let builder = StreamRequestBuilder::new(&StubSigner, &config.dash_path);

        let manifest = builder
            .build_and_fetch(&identity(), &fetcher, &config)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(manifest.catalog.available[0].quality, "720");

        let queries = fetcher.queries();
        let sent: Vec<&str> = queries[0].iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(sent.first(), Some(&"tvid"));
        assert_eq!(sent.last(), Some(&"vf"));
    }

    #[tokio::test]
    async fn build_and_fetch_propagates_transport_errors() {
        let config = ResolverConfig::default();
        let fetcher = FakeFetcher::new();
        let builder = StreamRequestBuilder::new(&StubSigner, &config.dash_path);

        assert!(builder
            .build_and_fetch(&identity(), &fetcher, &config)
            .await
            .is_err());
    }
}
