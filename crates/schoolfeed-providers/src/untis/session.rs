//! Login sessions and bearer token handling.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use serde::Deserialize;
use tokio::sync::Mutex;

/// Credentials used to open a session.
#[derive(Clone)]
pub enum Credentials {
    /// Username and password, sent to the JSON-RPC `authenticate` method.
    Password { username: String, password: String },
    /// Username and base32 app secret, used to derive a one-time code.
    Secret { username: String, secret: String },
}

impl Credentials {
    /// Creates password credentials.
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates app-secret credentials.
    pub fn secret(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Secret {
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        match self {
            Self::Password { username, .. } | Self::Secret { username, .. } => username,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::Password { .. } => "Password",
            Self::Secret { .. } => "Secret",
        };
        f.debug_struct(kind)
            .field("username", &self.username())
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// An authenticated WebUntis session.
///
/// Created by [`UntisClient::login`](super::UntisClient::login) and consumed
/// by [`UntisClient::logout`](super::UntisClient::logout). The bearer token
/// is refreshed lazily behind a mutex, so concurrent requests on one session
/// fetch a new token at most once.
#[derive(Debug)]
pub struct Session {
    /// Person id of the logged in user (0 if unknown).
    pub person_id: i64,
    /// Person type of the logged in user (0 if unknown).
    pub person_type: i64,
    /// Class id of the logged in user (0 if unknown).
    pub class_id: i64,
    session_id: String,
    pub(crate) token: Mutex<Option<String>>,
}

impl Session {
    /// Creates a session from login identifiers.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            person_id: 0,
            person_type: 0,
            class_id: 0,
            session_id: session_id.into(),
            token: Mutex::new(None),
        }
    }

    /// Sets the person identifiers.
    pub fn with_person(mut self, person_id: i64, person_type: i64, class_id: i64) -> Self {
        self.person_id = person_id;
        self.person_type = person_type;
        self.class_id = class_id;
        self
    }

    /// Sets the bearer token, e.g. one kept from an earlier request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Mutex::new(Some(token.into()));
        self
    }

    /// Returns the session cookie value (`JSESSIONID`).
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Builds the `Cookie` header for requests on this session.
    pub fn cookie_header(&self, school: &str) -> String {
        format!("JSESSIONID={}; schoolname={}", self.session_id, school)
    }
}

#[derive(Deserialize)]
struct TokenClaims {
    exp: Option<serde_json::Number>,
}

/// Returns true if `token` is a JWT whose `exp` claim lies after `now_secs`.
///
/// Anything that is not three dot-separated segments, has an undecodable
/// payload, or lacks a numeric `exp` counts as expired.
pub fn token_is_valid(token: &str, now_secs: i64) -> bool {
    let mut parts = token.split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(bytes) = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
    else {
        return false;
    };

    let Ok(claims) = serde_json::from_slice::<TokenClaims>(&bytes) else {
        return false;
    };

    claims
        .exp
        .and_then(|exp| exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64)))
        .is_some_and(|exp| exp > now_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl", URL_SAFE_NO_PAD.encode(payload))
    }

    mod token {
        use super::*;

        #[test]
        fn valid_until_exp() {
            let token = jwt(r#"{"exp":1000,"sub":"display"}"#);
            assert!(token_is_valid(&token, 999));
            assert!(!token_is_valid(&token, 1000));
            assert!(!token_is_valid(&token, 1001));
        }

        #[test]
        fn wrong_segment_count() {
            assert!(!token_is_valid("", 0));
            assert!(!token_is_valid("a.b", 0));
            assert!(!token_is_valid("a.b.c.d", 0));
        }

        #[test]
        fn undecodable_payload() {
            assert!(!token_is_valid("a.!!!.c", 0));
            let not_json = format!("a.{}.c", URL_SAFE_NO_PAD.encode("plain"));
            assert!(!token_is_valid(&not_json, 0));
        }

        #[test]
        fn missing_or_non_numeric_exp() {
            assert!(!token_is_valid(&jwt(r#"{"sub":"x"}"#), 0));
            assert!(!token_is_valid(&jwt(r#"{"exp":"tomorrow"}"#), 0));
        }

        #[test]
        fn standard_alphabet_payload() {
            // '?' encodes to '/' in the standard alphabet.
            let payload = STANDARD_NO_PAD.encode(r#"{"exp":5000,"n":"??"}"#);
            assert!(payload.contains('/'));
            assert!(token_is_valid(&format!("h.{}.s", payload), 10));
        }
    }

    #[test]
    fn cookie_header() {
        let session = Session::new("ABC123");
        assert_eq!(
            session.cookie_header("Marie-Curie-Gym"),
            "JSESSIONID=ABC123; schoolname=Marie-Curie-Gym"
        );
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials::password("display", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("display"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(Credentials::secret("u", "s").username(), "u");
    }
}
