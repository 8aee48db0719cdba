//! Log-safe renderings of values that may carry personal data.

/// Scheme, host and path only; query strings and fragments often carry
/// session tokens.
pub fn url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) if parsed.host_str().is_some() => format!(
            "{}://{}{}",
            parsed.scheme(),
            parsed.host_str().unwrap_or_default(),
            parsed.path()
        ),
        Ok(parsed) => parsed.scheme().to_string() + ":",
        Err(_) => "<unparsable url>".to_string(),
    }
}

/// First `max_chars` characters of `raw`, with an ellipsis when cut.
pub fn text(raw: &str, max_chars: usize) -> String {
    let mut chars = raw.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        head + "…"
    } else {
        head
    }
}

/// Keeps the first character and the domain of an e-mail address.
pub fn email(raw: &str) -> String {
    match raw.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None if raw.is_empty() => String::new(),
        None => "***".to_string(),
    }
}
