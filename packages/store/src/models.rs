//! # Domain models for prospects, profiles and message templates
//!
//! Defines the strongly typed entities that live in the stores' mirrors, plus
//! the input shapes accepted by their mutation gateways. Every entity is
//! `Serialize + Deserialize` with camelCase field names, matching the documents
//! kept in the remote collections.
//!
//! ## Entities
//!
//! | Struct | Collection | Keyed by |
//! |--------|------------|----------|
//! | [`Prospect`] | `prospects` | store-assigned id, filtered by `userId` |
//! | [`UserProfile`] | `users` | the identity's uid |
//! | [`MessageTemplate`] | `messageTemplates` | store-assigned id, filtered by `userId` |
//!
//! ## Inputs
//!
//! - [`NewProspect`] / [`ProspectPatch`]: create and partial-update shapes for prospects.
//! - [`NewTemplate`] / [`TemplatePatch`]: the same for templates. Neither carries
//!   `variables`: placeholders are always derived from the body by the store.
//! - [`ProfilePatch`]: editable profile fields.
//! - [`Identity`]: what the identity provider tells us about the signed-in user.
//!
//! Ids are not part of the stored document body. They are skipped on
//! serialisation and filled in from the document key after decoding.
//!
//! ## Timestamps
//!
//! [`current_timestamp`] returns milliseconds since the Unix epoch. All
//! `created_at` / `updated_at` / `last_login_at` fields use it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Current wall-clock time in milliseconds.
pub fn current_timestamp() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Pipeline stage of a prospect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProspectStatus {
    #[default]
    New,
    Contacted,
    Responded,
    Qualified,
    Disqualified,
}

impl ProspectStatus {
    pub const ALL: [ProspectStatus; 5] = [
        ProspectStatus::New,
        ProspectStatus::Contacted,
        ProspectStatus::Responded,
        ProspectStatus::Qualified,
        ProspectStatus::Disqualified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProspectStatus::New => "new",
            ProspectStatus::Contacted => "contacted",
            ProspectStatus::Responded => "responded",
            ProspectStatus::Qualified => "qualified",
            ProspectStatus::Disqualified => "disqualified",
        }
    }
}

impl fmt::Display for ProspectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sales prospect owned by one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prospect {
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: ProspectStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Prospect {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Prospect facts handed to the message generator, keyed the way its
    /// prompts expect them.
    pub fn generation_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("first_name".to_string(), self.first_name.clone());
        fields.insert("last_name".to_string(), self.last_name.clone());
        fields.insert("full_name".to_string(), self.full_name());
        fields.insert("email".to_string(), self.email.clone());
        fields.insert("prospect_company".to_string(), self.company.clone());
        fields.insert("prospect_position".to_string(), self.position.clone());
        fields.insert(
            "prospect_location".to_string(),
            self.location.clone().unwrap_or_default(),
        );
        fields.insert(
            "prospect_linkedin".to_string(),
            self.linkedin.clone().unwrap_or_default(),
        );
        fields.insert("prospect_tags".to_string(), self.tags.join(", "));
        fields
    }
}

/// Everything needed to create a prospect. Id and timestamps are assigned on write.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProspect {
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: String,
    pub position: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: ProspectStatus,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewProspect {
    /// Stamp the prospect for its first write.
    pub fn into_prospect(self, now: Timestamp) -> Prospect {
        Prospect {
            id: String::new(),
            owner_id: self.owner_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            company: self.company,
            position: self.position,
            location: self.location,
            linkedin: self.linkedin,
            website: self.website,
            phone: self.phone,
            notes: self.notes,
            status: self.status,
            tags: self.tags,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial prospect update. Only `Some` fields are written.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProspectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProspectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl ProspectPatch {
    pub fn status(status: ProspectStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Display theme preference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

/// Per-user preferences nested inside the profile document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

/// The single profile document of an identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub created_at: Timestamp,
    pub last_login_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<ProfileSettings>,
}

impl UserProfile {
    /// First profile of a freshly signed-in identity.
    pub fn from_identity(identity: &Identity, now: Timestamp) -> Self {
        Self {
            user_id: identity.uid.clone(),
            email: identity.email.clone().unwrap_or_default(),
            display_name: identity.display_name.clone(),
            photo_url: identity.photo_url.clone(),
            created_at: now,
            last_login_at: now,
            settings: None,
        }
    }

    /// Get display name, falling back to email if name is not set.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Editable profile fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<ProfileSettings>,
}

/// Channel a template is written for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    #[default]
    Email,
    Linkedin,
}

impl TemplateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Email => "email",
            TemplateType::Linkedin => "linkedin",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outreach template with `{{placeholder}}` tokens in its body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub name: String,
    pub content: String,
    pub template_type: TemplateType,
    /// Distinct placeholders in `content`, in order of first appearance.
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(rename = "userId")]
    pub owner_id: String,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTemplate {
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub name: String,
    pub content: String,
    pub template_type: TemplateType,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_type: Option<TemplateType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

/// The signed-in user as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// Split a comma separated tag list, trimming and dropping empty entries.
pub fn parse_tags(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("enterprise, ai ,, b2b "), vec!["enterprise", "ai", "b2b"]);
        assert!(parse_tags(" , ").is_empty());
    }

    #[test]
    fn test_prospect_wire_names() {
        let prospect = NewProspect {
            owner_id: "u1".into(),
            first_name: "Sarah".into(),
            last_name: "Johnson".into(),
            email: "sarah@techvision.com".into(),
            company: "TechVision".into(),
            position: "CTO".into(),
            ..NewProspect::default()
        }
        .into_prospect(42);

        let value = serde_json::to_value(&prospect).unwrap();
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["firstName"], "Sarah");
        assert_eq!(value["status"], "new");
        assert_eq!(value["createdAt"], 42);
        assert!(value.get("id").is_none());
        assert!(value.get("location").is_none());
    }

    #[test]
    fn test_profile_decodes_nested_settings() {
        let profile: UserProfile = serde_json::from_value(json!({
            "userId": "u1",
            "email": "a@b.co",
            "photoURL": "https://img",
            "createdAt": 1,
            "lastLoginAt": 2,
            "settings": { "emailNotifications": true, "theme": "dark" }
        }))
        .unwrap();

        let settings = profile.settings.clone().unwrap();
        assert_eq!(settings.theme, Some(Theme::Dark));
        assert_eq!(settings.email_notifications, Some(true));
        assert_eq!(profile.photo_url.as_deref(), Some("https://img"));
        assert_eq!(profile.display_name(), "a@b.co");
    }

    #[test]
    fn test_generation_fields() {
        let mut prospect = NewProspect {
            owner_id: "u1".into(),
            first_name: "Michael".into(),
            last_name: "Chen".into(),
            email: "michael@cloudscale.io".into(),
            company: "CloudScale".into(),
            position: "VP of Engineering".into(),
            tags: vec!["cloud".into(), "b2b".into()],
            ..NewProspect::default()
        }
        .into_prospect(1);
        prospect.id = "p1".into();

        let fields = prospect.generation_fields();
        assert_eq!(fields["full_name"], "Michael Chen");
        assert_eq!(fields["prospect_company"], "CloudScale");
        assert_eq!(fields["prospect_location"], "");
        assert_eq!(fields["prospect_tags"], "cloud, b2b");
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let value = serde_json::to_value(ProspectPatch::status(ProspectStatus::Qualified)).unwrap();
        assert_eq!(value, json!({ "status": "qualified" }));

        let value = serde_json::to_value(TemplatePatch {
            is_default: Some(true),
            ..TemplatePatch::default()
        })
        .unwrap();
        assert_eq!(value, json!({ "isDefault": true }));
    }
}
