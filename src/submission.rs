use std::sync::LazyLock;

use anyhow::{bail, Context};
use chrono::Utc;
use regex::Regex;
use url::Url;
use uuid::Uuid;

use crate::models::Submission;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.-]+@[\w.-]+\.\w+$").unwrap());

const PLACEHOLDER_NAMES: [&str; 3] = ["", "null", "none"];
const GUEST_NAME: &str = "Audit Guest";

/// Forces a scheme, keeps scheme/host/port/path only, and strips one trailing
/// slash.
pub fn normalize_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("website URL is empty");
    }

    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&with_scheme).with_context(|| format!("invalid website URL: {raw}"))?;
    let host = parsed
        .host_str()
        .with_context(|| format!("website URL has no host: {raw}"))?;

    let mut normalized = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        normalized.push_str(&format!(":{port}"));
    }
    normalized.push_str(parsed.path());

    if normalized.ends_with('/') {
        normalized.pop();
    }

    Ok(normalized)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Resolves the name used for matching on the page. Placeholder names, built
/// in or listed in `extra_placeholders`, fall back to the contact name, then to
/// a name derived from the email.
pub fn resolve_business_name(
    business_name: &str,
    contact_name: Option<&str>,
    email: &str,
    extra_placeholders: &[String],
) -> String {
    let trimmed = business_name.trim();
    let lowered = trimmed.to_lowercase();
    let is_placeholder = PLACEHOLDER_NAMES.contains(&lowered.as_str())
        || extra_placeholders
            .iter()
            .any(|name| name.trim().to_lowercase() == lowered);
    if !is_placeholder {
        return trimmed.to_string();
    }

    if let Some(contact) = contact_name.map(str::trim).filter(|c| !c.is_empty()) {
        return contact.to_string();
    }

    let local = email.split('@').next().unwrap_or_default();
    let derived = title_case(local).replace('.', " ").trim().to_string();
    if derived.is_empty() {
        GUEST_NAME.to_string()
    } else {
        derived
    }
}

fn title_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                output.extend(ch.to_uppercase());
            } else {
                output.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            output.push(ch);
            at_word_start = true;
        }
    }
    output
}

pub fn build_submission(
    business_name: &str,
    contact_name: Option<&str>,
    url: &str,
    email: &str,
    extra_placeholders: &[String],
) -> anyhow::Result<Submission> {
    if !is_valid_email(email) {
        bail!("invalid contact email: {email}");
    }

    Ok(Submission {
        id: Uuid::new_v4(),
        business_name: resolve_business_name(business_name, contact_name, email, extra_placeholders),
        website_url: normalize_url(url)?,
        contact_email: email.trim().to_string(),
        location: None,
        services: Vec::new(),
        created_at: Utc::now(),
    })
}
