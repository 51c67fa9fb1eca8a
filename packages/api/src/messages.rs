//! AI message generation and the backend's stock templates.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use store::{Prospect, TemplateType, UserProfile};

use crate::client::{ApiClient, ROUTES};
use crate::error::ApiError;

/// Who the message is from, as seen by the generator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SenderInfo {
    pub sender_name: String,
    pub sender_position: String,
    pub company_name: String,
    pub value_proposition: String,
}

impl SenderInfo {
    /// Start from the signed-in profile; the remaining fields are filled by the caller.
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            sender_name: profile.display_name().to_string(),
            ..Self::default()
        }
    }

    fn fields(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("sender_name".to_string(), self.sender_name.clone()),
            ("sender_position".to_string(), self.sender_position.clone()),
            ("company_name".to_string(), self.company_name.clone()),
            ("value_proposition".to_string(), self.value_proposition.clone()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prospect_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub message_type: TemplateType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    pub prospect_data: BTreeMap<String, String>,
    pub user_data: BTreeMap<String, String>,
}

impl GenerateRequest {
    pub fn for_prospect(
        prospect: &Prospect,
        sender: &SenderInfo,
        message_type: TemplateType,
        custom_prompt: Option<String>,
    ) -> Self {
        Self {
            prospect_id: prospect.id.clone(),
            template_id: None,
            message_type,
            custom_prompt: custom_prompt.filter(|p| !p.trim().is_empty()),
            prospect_data: prospect.generation_fields(),
            user_data: sender.fields(),
        }
    }

    pub fn with_template(mut self, template_id: impl Into<String>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedMessage {
    pub message: String,
    /// Request keys the generator reports as used in `message`.
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

/// The backend's built-in template bodies.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DefaultTemplates {
    pub email: String,
    pub linkedin: String,
}

impl DefaultTemplates {
    pub fn get(&self, template_type: TemplateType) -> &str {
        match template_type {
            TemplateType::Email => &self.email,
            TemplateType::Linkedin => &self.linkedin,
        }
    }
}

impl ApiClient {
    pub async fn generate_message(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedMessage, ApiError> {
        let path = format!("{ROUTES}/messages/generate");
        self.send_json(self.request(Method::POST, &path).json(request))
            .await
    }

    pub async fn default_templates(&self) -> Result<DefaultTemplates, ApiError> {
        let path = format!("{ROUTES}/messages/templates");
        self.send_json(self.request(Method::GET, &path)).await
    }
}
