//! Input checks that run before anything is written.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;
use crate::models::{NewProspect, NewTemplate, ProfilePatch, ProspectPatch, TemplatePatch};

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("email pattern")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_re().is_match(email)
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

fn require_if_set(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(value) => require(field, value),
        None => Ok(()),
    }
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

pub fn new_prospect(prospect: &NewProspect) -> Result<(), ValidationError> {
    require("firstName", &prospect.first_name)?;
    require("lastName", &prospect.last_name)?;
    require("email", &prospect.email)?;
    require("company", &prospect.company)?;
    require("position", &prospect.position)?;
    check_email(&prospect.email)
}

pub fn prospect_patch(patch: &ProspectPatch) -> Result<(), ValidationError> {
    require_if_set("firstName", patch.first_name.as_deref())?;
    require_if_set("lastName", patch.last_name.as_deref())?;
    require_if_set("company", patch.company.as_deref())?;
    require_if_set("position", patch.position.as_deref())?;
    if let Some(email) = &patch.email {
        require("email", email)?;
        check_email(email)?;
    }
    Ok(())
}

pub fn new_template(template: &NewTemplate) -> Result<(), ValidationError> {
    require("name", &template.name)?;
    require("content", &template.content)
}

pub fn template_patch(patch: &TemplatePatch) -> Result<(), ValidationError> {
    require_if_set("name", patch.name.as_deref())?;
    require_if_set("content", patch.content.as_deref())
}

pub fn profile_patch(patch: &ProfilePatch) -> Result<(), ValidationError> {
    if let Some(email) = &patch.email {
        check_email(email)?;
    }
    Ok(())
}
