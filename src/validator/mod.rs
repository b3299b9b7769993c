/*
 * This file is part of the Obvia ERP.
 *
 * Copyright (C) 2025 Kovács Dávid <kapcsolat@kovacsdavid.dev>
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use regex::Regex;
use std::sync::OnceLock;

/// Outcome of scanning a candidate tenant backend entry file (§4.4).
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ValidationResult {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ValidationResult {
    fn ok() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    fn reject(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

fn listen_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:app|server|express)\s*\.\s*listen\s*\(").unwrap())
}

fn create_server_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:https?)\s*\.\s*createServer\s*\(").unwrap())
}

/// Strips `//` and `/* */` comments from `src`, leaving string literal
/// contents untouched. This is a character-scanner, not a full tokenizer
/// (§9 open question): it tracks quote state only so genuine comment
/// markers inside a string aren't mistaken for the start of a comment, but
/// it never masks string contents from the forbidden-pattern scan that
/// follows, so a forbidden token that happens to sit inside a string
/// literal still triggers a rejection.
fn strip_comments(src: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Normal,
        LineComment,
        BlockComment,
        InString(char),
    }

    let mut out = String::with_capacity(src.len());
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut state = State::Normal;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match &state {
            State::Normal => match (c, next) {
                ('/', Some('/')) => {
                    state = State::LineComment;
                    i += 2;
                    continue;
                }
                ('/', Some('*')) => {
                    state = State::BlockComment;
                    i += 2;
                    continue;
                }
                ('"', _) | ('\'', _) | ('`', _) => {
                    state = State::InString(c);
                    out.push(c);
                    i += 1;
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            },
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                    out.push(c);
                }
                i += 1;
            }
            State::BlockComment => {
                if c == '*' && next == Some('/') {
                    state = State::Normal;
                    i += 2;
                } else {
                    i += 1;
                }
            }
            State::InString(quote) => {
                let quote = *quote;
                if c == '\\' {
                    out.push(c);
                    if let Some(escaped) = next {
                        out.push(escaped);
                    }
                    i += 2;
                } else if c == quote {
                    state = State::Normal;
                    out.push(c);
                    i += 1;
                } else {
                    out.push(c);
                    i += 1;
                }
            }
        }
    }

    out
}

/// Rejects a candidate backend entry file that would bind its own listening
/// socket (§4.4) — the front-door owns the port, not tenant code.
pub fn validate_entry_source(source: &str) -> ValidationResult {
    let scanned = strip_comments(source);

    if listen_pattern().is_match(&scanned) {
        return ValidationResult::reject(
            "entry file calls .listen(...) on app/server/express; the front door owns the listening socket",
        );
    }
    if create_server_pattern().is_match(&scanned) {
        return ValidationResult::reject(
            "entry file references http(s).createServer; tenants must not bind their own server",
        );
    }

    ValidationResult::ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_handler_factory_with_no_listen_call() {
        let src = "module.exports = () => (req, res) => res.end('ok');";
        assert!(validate_entry_source(src).valid);
    }

    #[test]
    fn rejects_app_listen() {
        let src = "const app = express(); app.listen(3000);";
        assert!(!validate_entry_source(src).valid);
    }

    #[test]
    fn rejects_server_listen() {
        let src = "server.listen(process.env.PORT);";
        assert!(!validate_entry_source(src).valid);
    }

    #[test]
    fn rejects_http_create_server() {
        let src = "const srv = http.createServer(handler);";
        assert!(!validate_entry_source(src).valid);
    }

    #[test]
    fn rejects_https_create_server() {
        let src = "https.createServer(opts, handler).listen(443);";
        assert!(!validate_entry_source(src).valid);
    }

    #[test]
    fn listen_inside_line_comment_is_accepted() {
        let src = "// app.listen(3000) legacy note, handled elsewhere\nmodule.exports = () => {};";
        assert!(validate_entry_source(src).valid);
    }

    #[test]
    fn listen_inside_block_comment_is_accepted() {
        let src = "/* app.listen(3000) */\nmodule.exports = () => {};";
        assert!(validate_entry_source(src).valid);
    }

    #[test]
    fn listen_inside_string_literal_is_a_false_positive_by_design() {
        let src = r#"const note = "app.listen(3000)"; module.exports = () => {};"#;
        assert!(!validate_entry_source(src).valid);
    }

    #[test]
    fn line_comment_marker_inside_a_string_does_not_eat_following_code() {
        let src = "const url = \"http://example.com\";\napp.listen(3000);";
        // the `//` inside the string is not treated as a comment start, so the
        // real app.listen(...) on the next line is still detected.
        assert!(!validate_entry_source(src).valid);
    }
}
