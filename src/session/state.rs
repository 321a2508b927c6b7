//! Session snapshot and transitions.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::{Error, Result};

/// A validated, non-empty user name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserName(String);

impl UserName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::EmptyUserName);
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Snapshot of the authentication state.
///
/// The user name is present exactly when the session is authenticated; the
/// representation makes any other combination impossible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    user_name: Option<UserName>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView<'a> {
    is_authenticated: bool,
    user_name: Option<&'a str>,
}

impl Serialize for SessionState {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        SessionView {
            is_authenticated: self.is_authenticated(),
            user_name: self.user_name(),
        }
        .serialize(serializer)
    }
}

impl SessionState {
    /// The unauthenticated state.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn authenticated(user_name: UserName) -> Self {
        Self {
            user_name: Some(user_name),
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_name.is_some()
    }

    #[must_use]
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_ref().map(UserName::as_str)
    }
}

/// The only intents that change a [`SessionState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    Login(UserName),
    Logout,
}

/// Apply an action to a state, producing the next state.
#[must_use]
pub fn reduce(_state: &SessionState, action: AuthAction) -> SessionState {
    match action {
        AuthAction::Login(name) => SessionState::authenticated(name),
        AuthAction::Logout => SessionState::anonymous(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_name_rejects_blank() {
        assert!(matches!(UserName::new(""), Err(Error::EmptyUserName)));
        assert!(matches!(UserName::new("   "), Err(Error::EmptyUserName)));
        assert_eq!(UserName::new("kim").unwrap().as_str(), "kim");
    }

    #[test]
    fn test_login_then_logout_resets() {
        for name in ["kim", "lee", "a very long farm owner name"] {
            let state = reduce(
                &SessionState::anonymous(),
                AuthAction::Login(UserName::new(name).unwrap()),
            );
            assert!(state.is_authenticated());
            assert_eq!(state.user_name(), Some(name));

            let state = reduce(&state, AuthAction::Logout);
            assert_eq!(state, SessionState::anonymous());
            assert!(!state.is_authenticated());
            assert!(state.user_name().is_none());
        }
    }

    #[test]
    fn test_login_replaces_previous_user() {
        let first = SessionState::authenticated(UserName::new("kim").unwrap());
        let next = reduce(&first, AuthAction::Login(UserName::new("park").unwrap()));
        assert_eq!(next.user_name(), Some("park"));
    }

    #[test]
    fn test_serialized_shape() {
        let state = SessionState::authenticated(UserName::new("kim").unwrap());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"isAuthenticated": true, "userName": "kim"})
        );

        let json = serde_json::to_value(SessionState::anonymous()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"isAuthenticated": false, "userName": null})
        );
    }
}
