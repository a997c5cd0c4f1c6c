use super::AppContext;
use crate::core::{ChatMessage, Relationship, User};

/// Read-only view over a user's past chats and analyses.
pub struct HistoryController {
    ctx: AppContext,
    user: User,
}

impl HistoryController {
    pub fn new(ctx: AppContext, user: User) -> Self {
        Self { ctx, user }
    }

    pub fn chat_history(&self) -> Vec<ChatMessage> {
        self.ctx.repos.chats.list_for_user(&self.user.id)
    }

    /// Newest first.
    pub fn relationship_history(&self) -> Vec<Relationship> {
        let mut relationships = self.ctx.repos.relationships.list_for_user(&self.user.id);
        relationships.reverse();
        relationships
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::stub::StubGateway;
    use crate::views::testing::test_app;

    #[test]
    fn test_history_is_scoped_to_user() {
        let app = test_app(StubGateway::new());
        let ana = app.register("Ana");
        let leo = app.register("Leo");
        let repos = &app.ctx.repos;

        let first = repos.relationships.create(&ana.id, "Ana", "Leo").unwrap();
        let second = repos.relationships.create(&ana.id, "Ana", "Max").unwrap();
        repos.relationships.create(&leo.id, "Leo", "Ana").unwrap();
        repos.chats.append_admin_reply(&ana.id, "welcome").unwrap();

        let history = HistoryController::new(app.ctx.clone(), ana);
        let relationships = history.relationship_history();
        assert_eq!(relationships.len(), 2);
        assert_eq!(relationships[0].id, second.id);
        assert_eq!(relationships[1].id, first.id);
        assert_eq!(history.chat_history().len(), 1);

        let empty = HistoryController::new(app.ctx.clone(), leo);
        assert!(empty.chat_history().is_empty());
    }
}
