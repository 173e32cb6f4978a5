//! Identifier case conversion and Go literal helpers.

use deunicode::deunicode;

/// Converts an identifier to lower snake case.
///
/// Non-ASCII characters are transliterated first, runs of separators collapse
/// into one underscore, and acronyms stay together:
///
/// ```rust
/// use schemagen_render::snake_case;
///
/// assert_eq!(snake_case("UserAccount"), "user_account");
/// assert_eq!(snake_case("HTTPServer"), "http_server");
/// assert_eq!(snake_case("public.users"), "public_users");
/// ```
pub fn snake_case(s: &str) -> String {
    let ascii = deunicode(s);
    let chars: Vec<char> = ascii.chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|j| chars[j]);
            let next = chars.get(i + 1);
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Converts an identifier to PascalCase (`user_id` -> `UserId`).
pub fn pascal_case(s: &str) -> String {
    snake_case(s).split('_').map(capitalize).collect()
}

/// Converts an identifier to camelCase (`user_id` -> `userId`).
pub fn camel_case(s: &str) -> String {
    let snake = snake_case(s);
    let mut words = snake.split('_');
    let mut out = words.next().unwrap_or_default().to_string();
    out.extend(words.map(capitalize));
    out
}

/// Naive English pluralisation, good enough for type names.
pub fn plural(s: &str) -> String {
    let lower = s.to_ascii_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        format!("{}es", s)
    } else if lower.ends_with('y')
        && !lower.ends_with("ay")
        && !lower.ends_with("ey")
        && !lower.ends_with("oy")
        && !lower.ends_with("uy")
    {
        format!("{}ies", &s[..s.len() - 1])
    } else {
        format!("{}s", s)
    }
}

/// Formats `s` as a double-quoted Go string literal.
pub fn go_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
