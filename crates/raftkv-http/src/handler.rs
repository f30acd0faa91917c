use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use raftkv_metrics::HttpMetrics;
use raftkv_store::Store;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::instrument::Instrumented;
use crate::router::{decode_path, key_from_path, Route};

const JOIN_ID: &str = "id";
const JOIN_ADDR: &str = "addr";

/// Shared state handed to every request.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn Store>,
    metrics: HttpMetrics,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, metrics: HttpMetrics) -> Self {
        Self { store, metrics }
    }

    pub fn metrics(&self) -> &HttpMetrics {
        &self.metrics
    }
}

/// Route a request to the key, join or status handler.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let (path, valid) = decode_path(uri.path());
    match Route::resolve(&path) {
        Route::Key => {
            // A path that does not decode to UTF-8 carries no usable key.
            let key = if valid { key_from_path(&path) } else { "" };
            handle_key(&state, method, key, &body).await
        }
        Route::Join => handle_join(&state, &body).await,
        Route::Status => handle_status(&state).await,
        Route::NotFound => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Decode the first JSON value in `body` as a string map.
///
/// Trailing bytes after that value are ignored and `null` decodes as an empty
/// map.
fn decode_string_map(body: &[u8]) -> Result<HashMap<String, String>, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_slice(body);
    let map = Option::<HashMap<String, String>>::deserialize(&mut de)?;
    Ok(map.unwrap_or_default())
}

/// JSON formatter that escapes `<`, `>`, `&`, U+2028 and U+2029 inside
/// strings, so values can be embedded in HTML unchanged.
struct HtmlSafeFormatter;

impl serde_json::ser::Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escaped = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

type EncodeError = Box<dyn std::error::Error + Send + Sync>;

fn encode_json<T: Serialize>(value: &T) -> Result<String, EncodeError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, HtmlSafeFormatter);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8(buf)?)
}

async fn handle_key(state: &AppState, method: Method, key: &str, body: &[u8]) -> Response {
    let mut rec = Instrumented::start(&state.metrics, method.clone());

    match method {
        Method::GET => {
            if key.is_empty() {
                // The lookup still goes ahead with the empty key.
                debug!("GET without a key");
                rec.fail(StatusCode::BAD_REQUEST);
            }

            let value = match state.store.get(key).await {
                Ok(value) => value,
                Err(e) => {
                    warn!(key, "get failed: {}", e);
                    rec.fail(StatusCode::INTERNAL_SERVER_ERROR);
                    return rec.respond();
                }
            };

            match encode_json(&HashMap::from([(key, value)])) {
                Ok(json) => rec.respond_with(([(header::CONTENT_TYPE, "application/json")], json)),
                Err(e) => {
                    warn!(key, "failed to encode value: {}", e);
                    rec.fail(StatusCode::INTERNAL_SERVER_ERROR);
                    rec.respond()
                }
            }
        }

        Method::POST => {
            let entries = match decode_string_map(body) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!("malformed key-value body: {}", e);
                    rec.fail(StatusCode::BAD_REQUEST);
                    return rec.respond();
                }
            };

            // First failure aborts; entries already applied stay applied.
            for (key, value) in &entries {
                if let Err(e) = state.store.set(key, value).await {
                    warn!(key, "set failed: {}", e);
                    rec.fail(StatusCode::INTERNAL_SERVER_ERROR);
                    return rec.respond();
                }
            }
            rec.respond()
        }

        Method::DELETE => {
            if key.is_empty() {
                debug!("DELETE without a key");
                rec.fail(StatusCode::BAD_REQUEST);
                return rec.respond();
            }
            if let Err(e) = state.store.delete(key).await {
                warn!(key, "delete failed: {}", e);
                rec.fail(StatusCode::INTERNAL_SERVER_ERROR);
            }
            rec.respond()
        }

        _ => {
            debug!(method = %method, "method not allowed on key endpoint");
            rec.fail(StatusCode::METHOD_NOT_ALLOWED);
            rec.respond()
        }
    }
}

async fn handle_join(state: &AppState, body: &[u8]) -> Response {
    let request = match decode_string_map(body) {
        Ok(request) => request,
        Err(e) => {
            debug!("malformed join body: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if request.len() != 2 {
        debug!(fields = request.len(), "join body must have exactly two fields");
        return StatusCode::BAD_REQUEST.into_response();
    }
    let (Some(addr), Some(node_id)) = (request.get(JOIN_ADDR), request.get(JOIN_ID)) else {
        debug!("join body missing id or addr");
        return StatusCode::BAD_REQUEST.into_response();
    };

    if let Err(e) = state.store.join(node_id, addr).await {
        warn!(node_id = %node_id, addr = %addr, "join failed: {}", e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    StatusCode::OK.into_response()
}

async fn handle_status(state: &AppState) -> Response {
    state.store.status().await.into_response()
}
