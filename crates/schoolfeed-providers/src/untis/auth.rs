//! JSON-RPC bodies and responses used for login and logout.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ProviderError, ProviderResult};

use super::records::null_default;

/// Path of the public JSON-RPC endpoint.
pub const JSONRPC_PATH: &str = "WebUntis/jsonrpc.do";

/// Path of the internal JSON-RPC endpoint used by the mobile app.
pub const JSONRPC_INTERN_PATH: &str = "WebUntis/jsonrpc_intern.do";

/// Body of the `authenticate` call.
pub fn password_body(app_id: &str, username: &str, password: &str) -> Value {
    rpc(
        app_id,
        "authenticate",
        json!({ "user": username, "password": password, "client": app_id }),
    )
}

/// Body of the `getUserData2017` call used for secret login.
pub fn secret_body(app_id: &str, username: &str, otp: &str, client_time_ms: i64) -> Value {
    rpc(
        app_id,
        "getUserData2017",
        json!([{ "auth": { "clientTime": client_time_ms, "user": username, "otp": otp } }]),
    )
}

/// Body of the `logout` call.
pub fn logout_body(app_id: &str) -> Value {
    rpc(app_id, "logout", json!([]))
}

fn rpc(app_id: &str, method: &str, params: Value) -> Value {
    json!({ "id": app_id, "method": method, "params": params, "jsonrpc": "2.0" })
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default, deserialize_with = "null_default")]
    code: i64,
    #[serde(default, deserialize_with = "null_default")]
    message: String,
}

/// Identifiers returned by a successful `authenticate` call.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthResult {
    #[serde(deserialize_with = "null_default")]
    pub session_id: String,
    #[serde(deserialize_with = "null_default")]
    pub person_id: i64,
    #[serde(deserialize_with = "null_default")]
    pub person_type: i64,
    #[serde(deserialize_with = "null_default")]
    pub klasse_id: i64,
}

/// User data returned by `getUserData2017`, if present.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserData {
    #[serde(deserialize_with = "null_default")]
    pub elem_id: i64,
    #[serde(deserialize_with = "null_default")]
    pub elem_type: String,
    #[serde(deserialize_with = "null_default")]
    pub klassen_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserDataResult {
    #[serde(deserialize_with = "null_default")]
    user_data: UserData,
}

fn unwrap_rpc<T>(response: RpcResponse<T>) -> ProviderResult<Option<T>> {
    if let Some(error) = response.error {
        return Err(ProviderError::authentication(format!(
            "login rejected ({}): {}",
            error.code, error.message
        )));
    }
    Ok(response.result)
}

/// Parses the `authenticate` response.
///
/// A JSON-RPC error or a missing session id is an authentication error.
pub fn parse_auth_response(body: &str) -> ProviderResult<AuthResult> {
    let response: RpcResponse<AuthResult> = serde_json::from_str(body)?;
    let result = unwrap_rpc(response)?.unwrap_or_default();
    if result.session_id.is_empty() {
        return Err(ProviderError::authentication("login response has no session id"));
    }
    Ok(result)
}

/// Parses the `getUserData2017` response.
///
/// The body may be empty or lack user data; only a JSON-RPC error fails.
pub fn parse_user_data(body: &str) -> ProviderResult<UserData> {
    if body.trim().is_empty() {
        return Ok(UserData::default());
    }
    let response: RpcResponse<UserDataResult> = serde_json::from_str(body)?;
    Ok(unwrap_rpc(response)?.unwrap_or_default().user_data)
}

/// Finds a cookie value in a list of `Set-Cookie` header values.
pub fn cookie_from_set_cookie<'a, I>(headers: I, name: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    headers.into_iter().find_map(|header| {
        header.split(';').find_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    })
}
