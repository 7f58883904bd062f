/// Loose email check: `local@domain.tld`, no whitespace.
pub fn validate_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Phone numbers: optional leading `+`, then at least 7 digits, spaces or dashes.
pub fn validate_phone(phone: &str) -> bool {
    let phone = phone.trim();
    let body = phone.strip_prefix('+').unwrap_or(phone);
    body.chars().count() >= 7
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
}

/// Trim a required text field, failing with `message` when nothing is left.
pub(crate) fn required(value: &str, message: &str) -> Result<String, super::LedgerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(super::LedgerError::validation(message));
    }
    Ok(trimmed.to_string())
}

/// Normalize an optional free-text field: trimmed, `None` when blank.
pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
