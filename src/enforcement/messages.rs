//! Localized message templates for enforcement actions
//!
//! The catalog maps message keys to template strings. Templates may contain
//! `{playerName}`, `{checkType}`, `{duration}`, `{flagCount}`,
//! `{flagThreshold}`, `{detailsString}` and any violation-detail key; the
//! engine treats the resolved text as opaque and hands it to the messaging
//! collaborator.

use crate::core::types::ViolationDetails;
use ahash::AHashMap;

/// Values available to a template at format time.
#[derive(Debug, Clone, Default)]
pub struct MessageContext<'a> {
    pub player_name: &'a str,
    pub check_type: &'a str,
    pub duration: Option<&'a str>,
    pub flag_count: u32,
    pub flag_threshold: u32,
    pub details: Option<&'a ViolationDetails>,
}

/// Message key to template registry, immutable after load.
#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    templates: AHashMap<String, String>,
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Resolve a key and substitute placeholders. Returns `None` when the
    /// key is not in the catalog; the caller decides whether that is a
    /// configuration error.
    pub fn format(&self, key: &str, ctx: &MessageContext<'_>) -> Option<String> {
        self.templates
            .get(key)
            .map(|template| substitute(template, ctx))
    }
}

/// Render a details map as `key: value, key: value` for the
/// `{detailsString}` placeholder.
pub fn format_details(details: &ViolationDetails) -> String {
    if details.is_empty() {
        return "n/a".to_string();
    }
    details
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn substitute(template: &str, ctx: &MessageContext<'_>) -> String {
    let mut text = template.to_string();
    text = text.replace("{playerName}", ctx.player_name);
    text = text.replace("{checkType}", ctx.check_type);
    text = text.replace("{duration}", ctx.duration.unwrap_or("n/a"));
    text = text.replace("{flagCount}", &ctx.flag_count.to_string());
    text = text.replace("{flagThreshold}", &ctx.flag_threshold.to_string());

    if let Some(details) = ctx.details {
        text = text.replace("{detailsString}", &format_details(details));
        for (key, value) in details {
            text = text.replace(&format!("{{{}}}", key), value);
        }
    } else {
        text = text.replace("{detailsString}", "n/a");
    }
    text
}
