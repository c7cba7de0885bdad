use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    permissions::ActionType,
    schema::{User, UserRole, Uuid},
};

/// Identity handed over by whatever authenticated the request.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
}

impl SessionData {
    pub fn new(user_id: Uuid, username: &str, role: UserRole) -> Self {
        Self {
            user_id,
            username: username.to_string(),
            role,
        }
    }

    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Forbidden);
        }
        Ok(())
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

impl From<&User> for SessionData {
    fn from(user: &User) -> Self {
        Self::new(user.id, &user.username, user.role.to_owned())
    }
}

/// Who a request runs as. Every action takes the viewer explicitly.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Viewer {
    #[default]
    Anonymous,
    Authenticated(SessionData),
}

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::Authenticated(session) => Some(session.user_id),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Viewer::Authenticated(_))
    }

    pub fn session(&self) -> Result<&SessionData, Error> {
        match self {
            Viewer::Anonymous => Err(Error::Unauthorized),
            Viewer::Authenticated(session) => Ok(session),
        }
    }

    /// Resolves the session and checks it may perform `action`.
    pub fn authorize(&self, action: ActionType) -> Result<&SessionData, Error> {
        let session = self.session()?;
        session.authenticate(action)?;
        Ok(session)
    }
}

impl From<SessionData> for Viewer {
    fn from(session: SessionData) -> Self {
        Viewer::Authenticated(session)
    }
}

impl From<Option<SessionData>> for Viewer {
    fn from(session: Option<SessionData>) -> Self {
        session.map(Viewer::Authenticated).unwrap_or_default()
    }
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        Viewer::Authenticated(user.into())
    }
}
