//! Key expression layout for session advertisement and lookup
//!
//! Pattern: `<prefix>/<scope>/session/<session_id>/<action>`
//!
//! - `scope` is `lan` or `online`, so a LAN query never sees online sessions
//!   and the other way round
//! - `session_id` is the provider-owned handle of a hosted session, `*` when
//!   looking up every session
//! - `action` is `advert` (presence/metadata lookup), `join` (request a
//!   connect address) or `leave` (give the joined slot back), `*` on the
//!   host's queryable

use zenoh::key_expr::KeyExpr;

use crate::error::{LobbyError, Result};

const SESSION_CHUNK: &str = "session";
const WILDCARD: &str = "*";

/// Visibility scope of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Lan,
    Online,
}

impl Scope {
    pub fn from_lan(is_lan: bool) -> Self {
        if is_lan {
            Scope::Lan
        } else {
            Scope::Online
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Lan => "lan",
            Scope::Online => "online",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "lan" => Some(Scope::Lan),
            "online" => Some(Scope::Online),
            _ => None,
        }
    }
}

/// What a query on a session key asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Advert,
    Join,
    Leave,
}

impl SessionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionAction::Advert => "advert",
            SessionAction::Join => "join",
            SessionAction::Leave => "leave",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "advert" => Some(SessionAction::Advert),
            "join" => Some(SessionAction::Join),
            "leave" => Some(SessionAction::Leave),
            _ => None,
        }
    }
}

/// Session keyexpr, `None` fields stand for `*`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyexprSession {
    prefix: KeyExpr<'static>,
    scope: Scope,
    session_id: Option<String>,
    action: Option<SessionAction>,
}

impl KeyexprSession {
    pub fn new(
        prefix: impl Into<KeyExpr<'static>>,
        scope: Scope,
        session_id: Option<String>,
        action: Option<SessionAction>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            scope,
            session_id,
            action,
        }
    }

    /// Keyexpr the host of `session_id` declares its queryable on
    pub fn queryable(prefix: impl Into<KeyExpr<'static>>, scope: Scope, session_id: &str) -> Self {
        Self::new(prefix, scope, Some(session_id.to_string()), None)
    }

    /// Keyexpr matching the adverts of every session in `scope`
    pub fn lookup(prefix: impl Into<KeyExpr<'static>>, scope: Scope) -> Self {
        Self::new(prefix, scope, None, Some(SessionAction::Advert))
    }

    pub fn prefix(&self) -> &KeyExpr<'static> {
        &self.prefix
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn action(&self) -> Option<SessionAction> {
        self.action
    }

    /// Same session, specific action
    pub fn with_action(&self, action: SessionAction) -> Self {
        Self {
            action: Some(action),
            ..self.clone()
        }
    }

    /// Build the zenoh keyexpr
    pub fn to_keyexpr(&self) -> Result<KeyExpr<'static>> {
        let keyexpr_str = format!(
            "{}/{}/{}/{}/{}",
            self.prefix.as_str(),
            self.scope.as_str(),
            SESSION_CHUNK,
            self.session_id.as_deref().unwrap_or(WILDCARD),
            self.action.map(|a| a.as_str()).unwrap_or(WILDCARD),
        );
        KeyExpr::try_from(keyexpr_str.clone())
            .map_err(|e| LobbyError::InvalidKeyexpr(format!("{}: {}", keyexpr_str, e)))
    }
}

impl TryFrom<&KeyExpr<'_>> for KeyexprSession {
    type Error = LobbyError;

    fn try_from(keyexpr: &KeyExpr<'_>) -> Result<Self> {
        let invalid = || {
            LobbyError::InvalidKeyexpr(format!(
                "Invalid session keyexpr pattern: {}",
                keyexpr.as_str()
            ))
        };
        let parts: Vec<&str> = keyexpr.as_str().split('/').collect();

        // Expected pattern: [...prefix]/<scope>/session/<session_id>/<action>
        let n = parts.len();
        if n < 5 || parts[n - 3] != SESSION_CHUNK {
            return Err(invalid());
        }
        let scope = Scope::parse(parts[n - 4]).ok_or_else(invalid)?;
        let session_id = match parts[n - 2] {
            WILDCARD => None,
            id => Some(id.to_string()),
        };
        let action = match parts[n - 1] {
            WILDCARD => None,
            action => Some(SessionAction::parse(action).ok_or_else(invalid)?),
        };
        let prefix = KeyExpr::try_from(parts[..n - 4].join("/")).map_err(|_| invalid())?;

        Ok(Self {
            prefix,
            scope,
            session_id,
            action,
        })
    }
}
