//! In-memory Vault emulator.
//!
//! Serves the slice of Vault's HTTP API that keyward uses: ACL policies, the
//! AppRole auth method mounted at `auth/approle`, and a generic key/value
//! store for everything else (including the `aws` secrets engine roles).

use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{TimeDelta, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use keyward::Fields;
use keyward_vault::VaultConfig;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

const ROLE_PREFIX: &str = "auth/approle/role/";
const LOGIN_PATH: &str = "auth/approle/login";
const POLICY_PREFIX: &str = "sys/policies/acl/";
const AWS_ROLE_PREFIX: &str = "aws/roles/";
const CREDENTIAL_TYPES: [&str; 4] = [
    "iam_user",
    "assumed_role",
    "federation_token",
    "session_token",
];

/// A running Vault emulator.
pub struct LocalVault {
    /// The address the emulator is listening on
    pub address: String,
    /// The token accepted for every operation
    pub root_token: String,
    state: Arc<RwLock<State>>,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl LocalVault {
    /// Start an emulator on an ephemeral local port.
    pub async fn start() -> anyhow::Result<Self> {
        let root_token = "s.local-root".to_string();
        let state = Arc::new(RwLock::new(State {
            root_token: root_token.clone(),
            ..Default::default()
        }));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = format!("http://{}", listener.local_addr()?);

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let shared = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    result = listener.accept() => {
                        if let Ok((stream, _)) = result {
                            let state = shared.clone();
                            tokio::spawn(async move {
                                let service = hyper::service::service_fn(move |req| {
                                    let state = state.clone();
                                    async move { handle_request(req, state).await }
                                });
                                let _ = http1::Builder::new()
                                    .serve_connection(TokioIo::new(stream), service)
                                    .await;
                            });
                        }
                    }
                }
            }
        });

        Ok(Self {
            address,
            root_token,
            state,
            shutdown_tx,
        })
    }

    /// A client configuration pointing at this emulator.
    pub fn config(&self) -> VaultConfig {
        VaultConfig::new(&self.address)
    }

    /// The rules of the ACL policy `name`.
    pub async fn policy(&self, name: &str) -> Option<String> {
        self.state.read().await.policies.get(name).cloned()
    }

    /// The number of live secret ids issued for the role `name`.
    pub async fn secret_count(&self, name: &str) -> usize {
        self.state
            .read()
            .await
            .roles
            .get(name)
            .map_or(0, |role| role.secrets.len())
    }

    /// Every value received for the header `name`, in request order.
    pub async fn received(&self, name: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .received
            .iter()
            .filter(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Answer reads of `path` with a body that is not JSON.
    pub async fn corrupt(&self, path: &str) {
        self.state.write().await.corrupted.insert(path.to_string());
    }

    /// Stop the emulator.
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[derive(Default)]
struct State {
    root_token: String,
    client_tokens: BTreeSet<String>,
    entries: BTreeMap<String, Fields>,
    policies: BTreeMap<String, String>,
    roles: BTreeMap<String, Role>,
    corrupted: BTreeSet<String>,
    received: Vec<(String, String)>,
    sequence: u64,
}

impl State {
    fn next(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

struct Role {
    role_id: String,
    options: Fields,
    secrets: BTreeMap<String, Secret>,
}

struct Secret {
    secret_id: String,
    creation_time: String,
    expiration_time: String,
}

enum Answer {
    Body(Value),
    Raw(&'static str),
    Empty,
    Missing,
    Error(StatusCode, String),
}

fn data(value: Value) -> Answer {
    Answer::Body(json!({ "data": value }))
}

fn bad_request(message: impl Into<String>) -> Answer {
    Answer::Error(StatusCode::BAD_REQUEST, message.into())
}

fn unknown_accessor(accessor: &str) -> Answer {
    Answer::Error(
        StatusCode::NOT_FOUND,
        format!("failed to find accessor entry for secret_id_accessor: {accessor:?}"),
    )
}

fn unsupported() -> Answer {
    Answer::Error(
        StatusCode::METHOD_NOT_ALLOWED,
        "unsupported operation".into(),
    )
}

async fn handle_request(
    req: Request<Incoming>,
    state: Arc<RwLock<State>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let list = req
        .uri()
        .query()
        .is_some_and(|query| query.split('&').any(|pair| pair == "list=true"));
    let Some(path) = req.uri().path().strip_prefix("/v1/").map(str::to_string) else {
        return Ok(respond(Answer::Missing));
    };

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    let token = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("x-vault-token"))
        .map(|(_, value)| value.clone());

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(error) => return Ok(respond(bad_request(error.to_string()))),
    };
    let fields: Fields = if body.is_empty() {
        Fields::new()
    } else {
        match serde_json::from_slice(&body) {
            Ok(fields) => fields,
            Err(error) => return Ok(respond(bad_request(error.to_string()))),
        }
    };

    let mut state = state.write().await;
    state.received.extend(headers);

    if method == Method::POST && path == LOGIN_PATH {
        return Ok(respond(login(&mut state, &fields)));
    }

    let is_root = token.as_deref() == Some(state.root_token.as_str());
    let is_client = token
        .as_ref()
        .is_some_and(|token| state.client_tokens.contains(token));
    if !is_root && !(is_client && method == Method::GET) {
        return Ok(respond(Answer::Error(
            StatusCode::FORBIDDEN,
            "permission denied".into(),
        )));
    }

    if method == Method::GET && state.corrupted.contains(&path) {
        return Ok(respond(Answer::Raw("<html>upstream error</html>")));
    }

    let answer = if let Some(name) = path.strip_prefix(POLICY_PREFIX) {
        policy(&mut state, &method, name, &fields)
    } else if let Some(rest) = path.strip_prefix(ROLE_PREFIX) {
        approle(&mut state, &method, rest, fields)
    } else {
        generic(&mut state, &method, &path, list, fields)
    };

    Ok(respond(answer))
}

fn respond(answer: Answer) -> Response<Full<Bytes>> {
    let (status, body) = match answer {
        Answer::Body(value) => (StatusCode::OK, value.to_string()),
        Answer::Raw(body) => (StatusCode::OK, body.to_string()),
        Answer::Empty => (StatusCode::NO_CONTENT, String::new()),
        Answer::Missing => (StatusCode::NOT_FOUND, json!({ "errors": [] }).to_string()),
        Answer::Error(status, message) => (status, json!({ "errors": [message] }).to_string()),
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn text<'a>(fields: &'a Fields, name: &str) -> Option<&'a str> {
    fields.get(name).and_then(Value::as_str)
}

fn login(state: &mut State, fields: &Fields) -> Answer {
    let (Some(role_id), Some(secret_id)) = (text(fields, "role_id"), text(fields, "secret_id"))
    else {
        return bad_request("missing role_id or secret_id");
    };

    let valid = state.roles.values().any(|role| {
        role.role_id == role_id
            && role
                .secrets
                .values()
                .any(|secret| secret.secret_id == secret_id)
    });
    if !valid {
        return bad_request("invalid role or secret ID");
    }

    let token = format!("s.client-{}", state.next());
    state.client_tokens.insert(token.clone());

    Answer::Body(json!({
        "data": null,
        "auth": { "client_token": token, "policies": ["default"] },
    }))
}

fn policy(state: &mut State, method: &Method, name: &str, fields: &Fields) -> Answer {
    match *method {
        Method::PUT | Method::POST => match text(fields, "policy") {
            Some(rules) => {
                state.policies.insert(name.to_string(), rules.to_string());
                Answer::Empty
            }
            None => bad_request("missing policy"),
        },
        Method::GET => match state.policies.get(name) {
            Some(rules) => data(json!({ "name": name, "policy": rules })),
            None => Answer::Missing,
        },
        Method::DELETE => {
            state.policies.remove(name);
            Answer::Empty
        }
        _ => unsupported(),
    }
}

/// Seconds in a duration such as `8776h`, `10m` or `30`.
fn ttl_seconds(ttl: &str) -> i64 {
    let ttl = ttl.trim();
    let (digits, unit) = match ttl.char_indices().last() {
        Some((at, unit)) if unit.is_ascii_alphabetic() => (&ttl[..at], unit),
        _ => (ttl, 's'),
    };
    let scale = match unit {
        'h' => 3600,
        'm' => 60,
        _ => 1,
    };
    digits.parse::<i64>().map_or(0, |value| value * scale)
}

fn approle(state: &mut State, method: &Method, rest: &str, fields: Fields) -> Answer {
    let (name, action) = rest.split_once('/').unwrap_or((rest, ""));

    match (method.clone(), action) {
        (Method::POST, "") => {
            let sequence = state.next();
            let role = state.roles.entry(name.to_string()).or_insert_with(|| Role {
                role_id: format!("role-{sequence}"),
                options: Fields::new(),
                secrets: BTreeMap::new(),
            });
            role.options = fields;
            Answer::Empty
        }
        (Method::GET, "") => match state.roles.get(name) {
            Some(role) => data(Value::Object(role.options.clone())),
            None => Answer::Missing,
        },
        (Method::DELETE, "") => {
            state.roles.remove(name);
            Answer::Empty
        }
        (Method::GET, "role-id") => match state.roles.get(name) {
            Some(role) => data(json!({ "role_id": role.role_id })),
            None => Answer::Missing,
        },
        (Method::POST, "secret-id") => {
            let sequence = state.next();
            let Some(role) = state.roles.get_mut(name) else {
                return bad_request(format!("role \"{name}\" does not exist"));
            };

            let ttl = text(&role.options, "secret_id_ttl").map_or(0, ttl_seconds);
            let created = Utc::now();
            let expires = created + TimeDelta::seconds(ttl);
            let secret_id = format!("secret-{sequence}");
            let accessor = format!("accessor-{sequence}");

            role.secrets.insert(
                accessor.clone(),
                Secret {
                    secret_id: secret_id.clone(),
                    creation_time: created.to_rfc3339(),
                    expiration_time: expires.to_rfc3339(),
                },
            );

            data(json!({
                "secret_id": secret_id,
                "secret_id_accessor": accessor,
                "secret_id_ttl": ttl,
                "secret_id_num_uses": 0,
            }))
        }
        (Method::POST, "secret-id-accessor/lookup") => {
            let Some(accessor) = text(&fields, "secret_id_accessor") else {
                return bad_request("missing secret_id_accessor");
            };
            let secret = state
                .roles
                .get(name)
                .and_then(|role| role.secrets.get(accessor));

            match secret {
                Some(secret) => data(json!({
                    "secret_id_accessor": accessor,
                    "creation_time": secret.creation_time,
                    "expiration_time": secret.expiration_time,
                    "metadata": {},
                })),
                None => unknown_accessor(accessor),
            }
        }
        (Method::POST, "secret-id-accessor/destroy") => {
            let Some(accessor) = text(&fields, "secret_id_accessor") else {
                return bad_request("missing secret_id_accessor");
            };
            let removed = state
                .roles
                .get_mut(name)
                .and_then(|role| role.secrets.remove(accessor));

            match removed {
                Some(_) => Answer::Empty,
                None => unknown_accessor(accessor),
            }
        }
        _ => unsupported(),
    }
}

fn generic(state: &mut State, method: &Method, path: &str, list: bool, fields: Fields) -> Answer {
    match *method {
        Method::GET if list => {
            let prefix = format!("{path}/");
            let keys: BTreeSet<String> = state
                .entries
                .keys()
                .filter_map(|key| key.strip_prefix(prefix.as_str()))
                .map(|rest| match rest.split_once('/') {
                    Some((folder, _)) => format!("{folder}/"),
                    None => rest.to_string(),
                })
                .collect();

            if keys.is_empty() {
                Answer::Missing
            } else {
                data(json!({ "keys": keys }))
            }
        }
        Method::GET => match state.entries.get(path) {
            Some(fields) => data(Value::Object(fields.clone())),
            None => Answer::Missing,
        },
        Method::POST | Method::PUT => {
            if path.starts_with(AWS_ROLE_PREFIX) {
                let credential_type = text(&fields, "credential_type").unwrap_or_default();
                if !CREDENTIAL_TYPES.contains(&credential_type) {
                    return bad_request(format!(
                        "unrecognized credential_type: {credential_type:?}"
                    ));
                }
            }
            state.entries.insert(path.to_string(), fields);
            Answer::Empty
        }
        Method::DELETE => {
            state.entries.remove(path);
            Answer::Empty
        }
        _ => unsupported(),
    }
}
