use tracing::info;

use super::AppContext;
use crate::core::error::Result;
use crate::core::User;

/// Which screen a fresh session should open on.
#[derive(Debug, Clone, PartialEq)]
pub enum Landing {
    Admin,
    Dashboard(User),
    Auth,
}

pub struct AuthController {
    ctx: AppContext,
}

impl AuthController {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Create an account and start a session for it.
    pub fn register(&self, name: &str, password: &str) -> Result<User> {
        let user = self.ctx.repos.users.register(name, password)?;
        self.ctx.repos.users.set_current(&user)?;
        Ok(user)
    }

    pub fn login(&self, name: &str, password: &str) -> Result<User> {
        let user = self.ctx.repos.users.authenticate(name, password)?;
        self.ctx.repos.users.set_current(&user)?;
        info!(user_id = %user.id, "user logged in");
        Ok(user)
    }

    pub fn logout(&self) -> Result<()> {
        self.ctx.repos.users.clear_current()
    }

    pub fn current_user(&self) -> Option<User> {
        self.ctx.repos.users.current()
    }

    /// An active admin session wins over a remembered user.
    pub fn landing(&self) -> Landing {
        if self.ctx.repos.settings.admin_session() {
            return Landing::Admin;
        }
        match self.current_user() {
            Some(user) => Landing::Dashboard(user),
            None => Landing::Auth,
        }
    }
}
