//! Customer profile: a single document keyed by the user id.

use super::{decode, encode};
use crate::deadline::with_fallback;
use crate::error::RemoteError;
use crate::facade::Collection;
use crate::remote::RemoteStore;
use serde::{Deserialize, Serialize};
use shopfront_engine::{CollectionSchema, FieldDef, FieldType};
use std::sync::Arc;
use std::time::Duration;

pub fn path(user_id: &str) -> String {
    format!("users/{}/profile", user_id)
}

pub fn schema(collection: &str) -> CollectionSchema {
    CollectionSchema::new(
        collection,
        vec![
            FieldDef::required("displayName", FieldType::String),
            FieldDef::optional("role", FieldType::String),
            FieldDef::optional("loyaltyPoints", FieldType::Int),
        ],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub loyalty_points: i64,
}

impl Profile {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            display_name: display_name.into(),
            role: Role::Customer,
            loyalty_points: 0,
        }
    }
}

/// Profile of the signed-in user.
#[derive(Clone)]
pub struct ProfileStore {
    collection: Collection,
    user_id: String,
    remote: Option<Arc<dyn RemoteStore>>,
    read_timeout: Duration,
}

impl ProfileStore {
    pub fn new(
        collection: Collection,
        user_id: impl Into<String>,
        remote: Option<Arc<dyn RemoteStore>>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            collection,
            user_id: user_id.into(),
            remote,
            read_timeout,
        }
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn profile(&self) -> Option<Profile> {
        self.collection.get(&self.user_id).as_ref().and_then(decode)
    }

    /// Create or overwrite the profile document.
    pub fn save_profile(&self, profile: &Profile) -> bool {
        match encode(profile) {
            Ok(fields) => self.collection.upsert(&self.user_id, fields),
            Err(err) => {
                self.collection.record_error(err);
                false
            }
        }
    }

    /// Authoritative role of the user.
    ///
    /// Reads the profile from the remote, bounded by the read timeout. Falls
    /// back to the locally known profile, then to [`Role::Customer`].
    pub async fn role(&self) -> Role {
        let local = self.profile().map(|p| p.role).unwrap_or_default();
        let Some(remote) = &self.remote else {
            return local;
        };

        let collection = self.collection.name().to_string();
        let fetched = with_fallback(
            self.read_timeout,
            remote.fetch(&collection),
            Err(RemoteError::Timeout),
        )
        .await;

        match fetched {
            Ok(snapshot) => snapshot
                .get(&self.user_id)
                .and_then(decode::<Profile>)
                .map(|p| p.role)
                .unwrap_or(local),
            Err(err) => {
                tracing::debug!(
                    user_id = %self.user_id,
                    error = %err,
                    "role lookup fell back to local profile"
                );
                local
            }
        }
    }
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("collection", &self.collection)
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_defaults_to_customer() {
        let profile: Profile =
            serde_json::from_value(json!({"id": "u1", "displayName": "Ada"})).unwrap();
        assert_eq!(profile.role, Role::Customer);
        assert_eq!(profile.loyalty_points, 0);
    }

    #[test]
    fn profile_fields_satisfy_schema() {
        let mut profile = Profile::new("Ada");
        profile.role = Role::Admin;
        let fields = encode(&profile).unwrap();
        assert_eq!(fields["role"], "admin");
        assert!(schema(&path("u1")).validate_fields(&fields).is_ok());
    }
}
