use serde::{Deserialize, Serialize};

/// A managed Rainyun account as reported by the list endpoint.
///
/// `id` is server-assigned and opaque; `last_status` and `last_checkin`
/// are written only by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub renew_products: Vec<u64>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub auto_renew: bool,
    #[serde(default)]
    pub last_status: Option<String>,
    #[serde(default)]
    pub last_checkin: Option<String>,
}

impl Account {
    /// Display label: the name, or the id for unnamed accounts.
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

/// The writable subset of an account, sent on create and update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountPayload {
    pub name: String,
    pub username: String,
    pub password: String,
    pub api_key: String,
    pub renew_products: Vec<u64>,
    pub enabled: bool,
    pub auto_renew: bool,
}

/// Boolean-only patch accepted by the account flags endpoint.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AccountFlags {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_renew: Option<bool>,
}

/// Parse a comma-separated renew-product list as typed in the form.
///
/// Empty tokens are discarded; a non-numeric token rejects the whole
/// input, returning the offending token.
pub fn parse_renew_products(input: &str) -> Result<Vec<u64>, String> {
    let mut ids = Vec::new();
    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.parse::<u64>() {
            Ok(id) => ids.push(id),
            Err(_) => return Err(token.to_string()),
        }
    }
    Ok(ids)
}

/// Render a renew-product list back into the form's comma-separated string.
pub fn format_renew_products(ids: &[u64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
