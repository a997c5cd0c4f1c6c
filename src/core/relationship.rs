use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::{LoveMatchError, Result};
use super::store::LocalStore;
use super::user::{User, USERS_KEY};

pub const RELATIONSHIPS_KEY: &str = "relationships";

pub const DEFAULT_COMPATIBILITY_LEVEL: &str = "Growing Connection";
pub const DEFAULT_EMOTIONAL_TRAJECTORY: &str = "Steady";
pub const DEFAULT_OVERALL_OUTLOOK: &str = "Promising";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    /// Always within 0..=100
    pub match_percentage: u8,
    pub compatibility_level: String,
    pub advice: String,
    pub strengths: String,
    pub areas_to_work_on: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub short_term_prediction: String,
    pub long_term_prediction: String,
    pub potential_challenges: String,
    pub emotional_trajectory: String,
    pub key_advice: String,
    pub overall_outlook: String,
}

/// A compatibility request for a pair of names, owned by the submitting user.
///
/// `compatibility` and `prediction` start empty. A prediction is only ever
/// stored once compatibility is populated, and `overridden` is sticky once an
/// admin has edited the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub partner_name: String,
    pub compatibility: Option<CompatibilityResult>,
    pub prediction: Option<PredictionResult>,
    #[serde(rename = "override", default)]
    pub overridden: bool,
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    pub fn new(user_id: &str, user_name: &str, partner_name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            partner_name: partner_name.to_string(),
            compatibility: None,
            prediction: None,
            overridden: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.compatibility.is_none()
    }

    pub fn title(&self) -> String {
        format!("{} & {}", self.user_name, self.partner_name)
    }
}

pub struct RelationshipRepository {
    store: Arc<LocalStore>,
}

impl RelationshipRepository {
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self { store }
    }

    pub fn list_all(&self) -> Vec<Relationship> {
        self.store.get(RELATIONSHIPS_KEY, Vec::new())
    }

    /// Relationships owned by `user_id`, oldest first.
    pub fn list_for_user(&self, user_id: &str) -> Vec<Relationship> {
        let mut mine: Vec<Relationship> = self
            .list_all()
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        mine.sort_by_key(|r| r.created_at);
        mine
    }

    pub fn get(&self, id: &str) -> Option<Relationship> {
        self.list_all().into_iter().find(|r| r.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.list_all().iter().filter(|r| r.is_pending()).count()
    }

    pub fn create(&self, user_id: &str, user_name: &str, partner_name: &str) -> Result<Relationship> {
        let (user_name, partner_name) = (user_name.trim(), partner_name.trim());
        if user_name.is_empty() || partner_name.is_empty() {
            return Err(LoveMatchError::InvalidInput(
                "Please enter both names".to_string(),
            ));
        }

        let users: Vec<User> = self.store.get(USERS_KEY, Vec::new());
        if !users.iter().any(|u| u.id == user_id) {
            return Err(LoveMatchError::UnknownUser(user_id.to_string()));
        }

        let relationship = Relationship::new(user_id, user_name, partner_name);
        self.store
            .update(RELATIONSHIPS_KEY, Vec::<Relationship>::new(), |all| {
                all.push(relationship.clone());
                Ok(())
            })?;

        info!(relationship_id = %relationship.id, user_id, "created relationship");
        Ok(relationship)
    }

    /// Store an agent's compatibility result. Admin-overridden values are kept.
    pub fn set_compatibility(&self, id: &str, result: CompatibilityResult) -> Result<Relationship> {
        self.modify(id, |rel| {
            if rel.overridden {
                info!(relationship_id = %rel.id, "keeping admin override over agent result");
                return Ok(());
            }
            rel.compatibility = Some(result);
            Ok(())
        })
    }

    /// Store a prediction. Rejected while compatibility is still pending.
    pub fn set_prediction(&self, id: &str, result: PredictionResult) -> Result<Relationship> {
        self.modify(id, |rel| {
            if rel.compatibility.is_none() {
                return Err(LoveMatchError::CompatibilityPending(rel.id.clone()));
            }
            rel.prediction = Some(result);
            Ok(())
        })
    }

    /// Replace compatibility (and optionally prediction) with admin-supplied values.
    pub fn apply_admin_override(
        &self,
        id: &str,
        compatibility: CompatibilityResult,
        prediction: Option<PredictionResult>,
    ) -> Result<Relationship> {
        let updated = self.modify(id, |rel| {
            rel.compatibility = Some(compatibility);
            if let Some(prediction) = prediction {
                rel.prediction = Some(prediction);
            }
            rel.overridden = true;
            Ok(())
        })?;

        info!(relationship_id = %id, "applied admin override");
        Ok(updated)
    }

    fn modify<F>(&self, id: &str, f: F) -> Result<Relationship>
    where
        F: FnOnce(&mut Relationship) -> Result<()>,
    {
        self.store
            .update(RELATIONSHIPS_KEY, Vec::<Relationship>::new(), |all| {
                let rel = all
                    .iter_mut()
                    .find(|r| r.id == id)
                    .ok_or_else(|| LoveMatchError::RelationshipNotFound(id.to_string()))?;
                f(rel)?;
                Ok(rel.clone())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::user::UserRepository;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        users: UserRepository,
        repo: RelationshipRepository,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LocalStore::open(dir.path(), "").unwrap());
        Fixture {
            _dir: dir,
            users: UserRepository::new(store.clone()),
            repo: RelationshipRepository::new(store),
        }
    }

    fn compatibility(pct: u8) -> CompatibilityResult {
        CompatibilityResult {
            match_percentage: pct,
            compatibility_level: "Strong Match".to_string(),
            advice: "Talk often".to_string(),
            strengths: "Humor".to_string(),
            areas_to_work_on: "Patience".to_string(),
        }
    }

    fn prediction() -> PredictionResult {
        PredictionResult {
            short_term_prediction: "Sunny".to_string(),
            long_term_prediction: "Stable".to_string(),
            potential_challenges: "Distance".to_string(),
            emotional_trajectory: "Rising".to_string(),
            key_advice: "Listen".to_string(),
            overall_outlook: "Very Promising".to_string(),
        }
    }

    #[test]
    fn test_new_relationship_is_pending() {
        let f = fixture();
        let user = f.users.register("Ana", "pw").unwrap();
        let rel = f.repo.create(&user.id, " Ana ", "Leo").unwrap();

        assert!(rel.compatibility.is_none());
        assert!(rel.prediction.is_none());
        assert!(!rel.overridden);
        assert_eq!(rel.user_name, "Ana");
        assert_eq!(rel.title(), "Ana & Leo");
        assert_eq!(f.repo.pending_count(), 1);
    }

    #[test]
    fn test_create_requires_existing_user() {
        let f = fixture();
        let err = f.repo.create("nobody", "Ana", "Leo").unwrap_err();
        assert!(matches!(err, LoveMatchError::UnknownUser(_)));
        assert!(f.repo.list_all().is_empty());
    }

    #[test]
    fn test_create_requires_both_names() {
        let f = fixture();
        let user = f.users.register("Ana", "pw").unwrap();
        let err = f.repo.create(&user.id, "Ana", "  ").unwrap_err();
        assert!(matches!(err, LoveMatchError::InvalidInput(_)));
    }

    #[test]
    fn test_list_for_user_filters_and_orders() {
        let f = fixture();
        let ana = f.users.register("Ana", "pw").unwrap();
        let leo = f.users.register("Leo", "pw").unwrap();

        let first = f.repo.create(&ana.id, "Ana", "Leo").unwrap();
        f.repo.create(&leo.id, "Leo", "Mia").unwrap();
        let second = f.repo.create(&ana.id, "Ana", "Sam").unwrap();

        let mine = f.repo.list_for_user(&ana.id);
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, first.id);
        assert_eq!(mine[1].id, second.id);
    }

    #[test]
    fn test_prediction_before_compatibility_is_rejected() {
        let f = fixture();
        let user = f.users.register("Ana", "pw").unwrap();
        let rel = f.repo.create(&user.id, "Ana", "Leo").unwrap();

        let err = f.repo.set_prediction(&rel.id, prediction()).unwrap_err();
        assert!(matches!(err, LoveMatchError::CompatibilityPending(_)));
        assert!(f.repo.get(&rel.id).unwrap().prediction.is_none());
    }

    #[test]
    fn test_compatibility_then_prediction() {
        let f = fixture();
        let user = f.users.register("Ana", "pw").unwrap();
        let rel = f.repo.create(&user.id, "Ana", "Leo").unwrap();

        f.repo.set_compatibility(&rel.id, compatibility(77)).unwrap();
        let updated = f.repo.set_prediction(&rel.id, prediction()).unwrap();

        assert_eq!(updated.compatibility.unwrap().match_percentage, 77);
        assert_eq!(updated.prediction.unwrap().overall_outlook, "Very Promising");
        assert!(!updated.overridden);
        assert_eq!(f.repo.pending_count(), 0);
    }

    #[test]
    fn test_unknown_relationship() {
        let f = fixture();
        let err = f.repo.set_compatibility("missing", compatibility(10)).unwrap_err();
        assert!(matches!(err, LoveMatchError::RelationshipNotFound(_)));
    }

    #[test]
    fn test_admin_override_is_sticky() {
        let f = fixture();
        let user = f.users.register("Ana", "pw").unwrap();
        let rel = f.repo.create(&user.id, "Ana", "Leo").unwrap();

        let first = f
            .repo
            .apply_admin_override(&rel.id, compatibility(40), None)
            .unwrap();
        assert!(first.overridden);
        assert_eq!(first.compatibility, Some(compatibility(40)));
        assert!(first.prediction.is_none());

        let second = f
            .repo
            .apply_admin_override(&rel.id, compatibility(95), Some(prediction()))
            .unwrap();
        assert!(second.overridden);
        assert_eq!(second.compatibility, Some(compatibility(95)));
        assert_eq!(second.prediction, Some(prediction()));

        // A later agent result neither clears the flag nor replaces the values
        let after = f.repo.set_compatibility(&rel.id, compatibility(10)).unwrap();
        assert!(after.overridden);
        assert_eq!(after.compatibility, Some(compatibility(95)));
        assert_eq!(f.repo.get(&rel.id).unwrap(), after);
    }

    #[test]
    fn test_malformed_collection_is_not_overwritten() {
        let f = fixture();
        let user = f.users.register("Ana", "pw").unwrap();
        let first = f.repo.create(&user.id, "Ana", "Leo").unwrap();
        f.repo.create(&user.id, "Ana", "Sam").unwrap();
        f.repo.set_compatibility(&first.id, compatibility(70)).unwrap();

        // Another writer stored a percentage outside the u8 range
        let path = f._dir.path().join("relationships.json");
        let mut raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        raw[0]["compatibility"]["match_percentage"] = serde_json::json!(300);
        std::fs::write(&path, raw.to_string()).unwrap();

        assert!(f.repo.list_all().is_empty());
        let err = f.repo.create(&user.id, "Ana", "Max").unwrap_err();
        assert!(matches!(err, LoveMatchError::MalformedStoredData { .. }));

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.as_array().unwrap().len(), 2);
        assert_eq!(on_disk[0]["compatibility"]["match_percentage"], 300);
    }

    #[test]
    fn test_override_field_uses_wire_name() {
        let rel = Relationship::new("u1", "Ana", "Leo");
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["override"], false);
        assert_eq!(json["userId"], "u1");
        assert!(json["compatibility"].is_null());
    }
}
