//! Target resolution for reminder recipients
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use super::error::TargetError;

/// Resolve a comma-separated "who" string into recipient IDs
///
/// Accepts `@me`, `<@123>` / `<@!123>` mentions and bare numeric IDs.
/// The result keeps the order of first mention with duplicates removed.
pub fn resolve_targets(who: &str, requesting_user_id: &str) -> Result<Vec<String>, TargetError> {
    let mut targets: Vec<String> = Vec::new();

    for token in who.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let id = resolve_token(token, requesting_user_id).ok_or_else(|| {
            TargetError::InvalidTarget {
                token: token.to_string(),
            }
        })?;
        if !targets.contains(&id) {
            targets.push(id);
        }
    }

    if targets.is_empty() {
        return Err(TargetError::NoTargets);
    }
    Ok(targets)
}

fn resolve_token(token: &str, requesting_user_id: &str) -> Option<String> {
    if token.eq_ignore_ascii_case("@me") {
        return Some(requesting_user_id.to_string());
    }

    let id = token
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|inner| inner.strip_prefix('!').unwrap_or(inner))
        .unwrap_or(token);

    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}
