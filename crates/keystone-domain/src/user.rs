//! User identity helpers.

/// Join the non-empty name parts with single spaces.
///
/// Used for the `name` claim of access tokens and for display purposes.
pub fn display_name(
    first_name: &str,
    middle_name: Option<&str>,
    first_surname: &str,
    second_surname: Option<&str>,
) -> String {
    [
        Some(first_name),
        middle_name,
        Some(first_surname),
        second_surname,
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Canonical form of a login email: trimmed and lowercased.
///
/// Applied both when accounts are stored and when credentials are looked up,
/// so `Alice@Example.com ` and `alice@example.com` identify the same account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shallow shape check: one `@` with a non-empty local part and a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}
