// Copyright (c) The testdock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use testdock_metadata::TestIdentity;

/// Returns a human-readable name for a test, in the form `Type Name: Method Name`.
///
/// Both the simple type name and the method name are split into words at camel-case and
/// snake-case boundaries, and each word is capitalized.
pub fn human_name(identity: &TestIdentity) -> String {
    format!(
        "{}: {}",
        humanize(identity.simple_type_name()),
        humanize(&identity.method_name)
    )
}

fn humanize(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            flush(&mut current, &mut words);
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|next| next.is_lowercase());
            // "addsTwo" -> "adds Two", "HTTPServer" -> "HTTP Server".
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                flush(&mut current, &mut words);
            }
        }

        current.push(c);
    }
    flush(&mut current, &mut words);

    words
        .iter()
        .map(|word| capitalize(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn flush(current: &mut String, words: &mut Vec<String>) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
