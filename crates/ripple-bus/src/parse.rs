// SPDX-FileCopyrightText: 2026 Ripple Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command line parsing: `<prefix><name>[@<handle>] <arguments>`.

use ripple_core::Request;

/// Parse `text` as a command invocation.
///
/// The first token must start with one of `prefixes` and be at least two
/// characters long. A `@handle` suffix must name one of `handles`, otherwise
/// the line is addressed to another bot and is not a command.
pub fn parse_command(text: &str, prefixes: &[char], handles: &[String]) -> Option<Request> {
    let line = text.trim().replace('\u{a0}', " ");
    let (head, args) = line.split_once(' ').unwrap_or((line.as_str(), ""));
    let (name, handle) = match head.rsplit_once('@') {
        Some((name, handle)) => (name, Some(handle)),
        None => (head, None),
    };

    let mut chars = name.chars();
    let prefix = chars.next()?;
    if !prefixes.contains(&prefix) || chars.as_str().is_empty() {
        return None;
    }
    if let Some(handle) = handle
        && !handles.iter().any(|h| h == handle)
    {
        return None;
    }
    Some(Request::new(chars.as_str(), args))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIXES: &[char] = &['/', '\''];

    fn handles() -> Vec<String> {
        vec!["ripplebot".to_string()]
    }

    fn parse(text: &str) -> Option<(String, String)> {
        parse_command(text, PREFIXES, &handles()).map(|r| (r.cmd, r.args))
    }

    #[test]
    fn parses_name_and_arguments() {
        assert_eq!(parse("/help"), Some(("help".into(), "".into())));
        assert_eq!(
            parse("  /search @bob hello world  "),
            Some(("search".into(), "@bob hello world".into()))
        );
        assert_eq!(parse("'quote"), Some(("quote".into(), "".into())));
    }

    #[test]
    fn non_breaking_space_separates_arguments() {
        assert_eq!(
            parse("/nick\u{a0}Alice"),
            Some(("nick".into(), "Alice".into()))
        );
    }

    #[test]
    fn rejects_plain_text_and_bare_prefix() {
        assert_eq!(parse("hello /help"), None);
        assert_eq!(parse("/"), None);
        assert_eq!(parse("/ help"), None);
        assert_eq!(parse("!help"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn handle_suffix_must_be_ours() {
        assert_eq!(parse("/help@ripplebot"), Some(("help".into(), "".into())));
        assert_eq!(parse("/help@otherbot"), None);
        assert_eq!(
            parse("/search@ripplebot a@b"),
            Some(("search".into(), "a@b".into()))
        );
    }

    #[test]
    fn multibyte_names_are_accepted() {
        assert_eq!(parse("/帮助 x"), Some(("帮助".into(), "x".into())));
    }
}
