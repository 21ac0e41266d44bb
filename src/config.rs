//! Persisted configuration (§6).
//!
//! A hand-written INI-like file format: `[section]` headers, `key = value`
//! pairs, `#`-to-end-of-line comments. Keys may contain internal whitespace
//! (`Ping Response Delay = 10` is one key, not three tokens), and values run
//! to the end of the line rather than stopping at the next whitespace. The
//! tokenizer below mirrors the original's `Lexer`/`Token` shape directly,
//! just expressed as a Rust iterator instead of a hand-rolled index.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    BracketOpen,
    BracketClose,
    String,
    Equals,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    line: usize,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::BracketOpen => "BracketOpen",
            TokenKind::BracketClose => "BracketClose",
            TokenKind::String => "String",
            TokenKind::Equals => "Equals",
        };
        f.write_str(name)
    }
}

struct Lexer<'a> {
    data: &'a str,
    bytes: &'a [u8],
    index: usize,
    line: usize,
}

fn is_special(c: u8) -> bool {
    matches!(c, b'[' | b']' | b'=' | b'#')
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\n' | b'\r' | b'\t')
}

impl<'a> Lexer<'a> {
    fn new(data: &'a str) -> Self {
        Lexer {
            data,
            bytes: data.as_bytes(),
            index: 0,
            line: 0,
        }
    }

    /// Read the next token. When `expect_string` is set, leading whitespace
    /// is skipped and the token is read as a bare string even if it starts
    /// with what would otherwise be ordinary text; when `string_to_line_end`
    /// is also set, the string only terminates at a newline (used for
    /// values, which may contain `=` or `#`-like characters).
    fn next_token(&mut self, expect_string: bool, string_to_line_end: bool) -> Option<Token<'a>> {
        if self.index >= self.bytes.len() {
            return None;
        }

        let mut reading_string = false;
        let mut string_start = 0;

        if expect_string {
            while self.index < self.bytes.len() && is_whitespace(self.bytes[self.index]) {
                self.index += 1;
            }
            reading_string = true;
            string_start = self.index;
        }

        while self.index < self.bytes.len() {
            let current_index = self.index;
            let c = self.bytes[self.index];
            self.index += 1;

            if reading_string && (is_whitespace(c) || is_special(c)) && current_index > string_start
            {
                if c == b'\r' || c == b'\n' || !string_to_line_end {
                    self.index = current_index;
                    return Some(Token {
                        kind: TokenKind::String,
                        text: &self.data[string_start..current_index],
                        line: self.line,
                    });
                }
            }

            if c == b'#' && (!reading_string || current_index > string_start) {
                while self.index < self.bytes.len() && self.bytes[self.index - 1] != b'\n' {
                    self.index += 1;
                }
                self.line += 1;
                continue;
            }

            if is_whitespace(c) {
                if c == b'\n' {
                    self.line += 1;
                }
                continue;
            }

            match c {
                b'[' => {
                    return Some(Token {
                        kind: TokenKind::BracketOpen,
                        text: &self.data[current_index..current_index + 1],
                        line: self.line,
                    })
                }
                b']' => {
                    return Some(Token {
                        kind: TokenKind::BracketClose,
                        text: &self.data[current_index..current_index + 1],
                        line: self.line,
                    })
                }
                b'=' => {
                    return Some(Token {
                        kind: TokenKind::Equals,
                        text: &self.data[current_index..current_index + 1],
                        line: self.line,
                    })
                }
                _ => {
                    if !reading_string {
                        reading_string = true;
                        string_start = current_index;
                    }
                }
            }
        }

        if reading_string {
            return Some(Token {
                kind: TokenKind::String,
                text: &self.data[string_start..self.index],
                line: self.line,
            });
        }

        None
    }
}

/// A single `[section]`'s key/value pairs.
#[derive(Debug, Default, Clone)]
pub struct ConfigGroup {
    map: HashMap<String, String>,
}

impl ConfigGroup {
    /// Raw string value for `key`, if present.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    /// Value parsed as an integer, if present and parseable.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.map.get(key).and_then(|v| v.parse().ok())
    }
}

/// A loaded configuration file, grouped by `[section]`.
#[derive(Debug, Default, Clone)]
pub struct Config {
    groups: HashMap<String, ConfigGroup>,
}

fn trim(s: &str) -> &str {
    s.trim_matches(|c: char| c == ' ' || c == '\t' || c == '\r' || c == '\n')
}

impl Config {
    /// Load and parse a config file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, CoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| CoreError::ConfigLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Config::parse(&contents).map_err(|reason| CoreError::ConfigLoad {
            path: path.display().to_string(),
            reason,
        })
    }

    /// Parse config file contents already read into memory.
    pub fn parse(contents: &str) -> Result<Config, String> {
        let mut config = Config::default();
        let mut lexer = Lexer::new(contents);
        let mut current_group = String::new();

        let mut token = lexer.next_token(false, false);

        while let Some(tok) = token {
            match tok.kind {
                TokenKind::BracketOpen => {
                    let group_id = lexer
                        .next_token(false, false)
                        .ok_or_else(|| "expected section name, found end of file".to_string())?;
                    if group_id.kind != TokenKind::String {
                        return Err(format!(
                            "expected String on line {}, found {}",
                            group_id.line + 1,
                            group_id.kind
                        ));
                    }
                    let group_end = lexer
                        .next_token(false, false)
                        .ok_or_else(|| "expected ']', found end of file".to_string())?;
                    if group_end.kind != TokenKind::BracketClose {
                        return Err(format!(
                            "expected BracketClose on line {}, found {}",
                            group_end.line + 1,
                            group_end.kind
                        ));
                    }
                    current_group = trim(group_id.text).to_string();
                }
                TokenKind::String => {
                    // Coalesce key tokens so keys may contain internal
                    // whitespace ("Ping Response Delay").
                    let key_start = tok.text.as_ptr() as usize - contents.as_ptr() as usize;
                    let mut key_end = key_start + tok.text.len();

                    let mut next = lexer.next_token(false, false);
                    while let Some(next_tok) = next {
                        if next_tok.kind != TokenKind::String {
                            break;
                        }
                        key_end = (next_tok.text.as_ptr() as usize - contents.as_ptr() as usize)
                            + next_tok.text.len();
                        next = lexer.next_token(false, false);
                    }

                    let equals = next.ok_or_else(|| "expected '=', found end of file".to_string())?;
                    if equals.kind != TokenKind::Equals {
                        return Err(format!(
                            "expected Equals on line {}, found {}",
                            equals.line + 1,
                            equals.kind
                        ));
                    }

                    let value = lexer
                        .next_token(true, true)
                        .ok_or_else(|| "expected value, found end of file".to_string())?;
                    if value.kind != TokenKind::String {
                        return Err(format!(
                            "expected String on line {}, found {}",
                            value.line + 1,
                            value.kind
                        ));
                    }

                    let key = trim(&contents[key_start..key_end]).to_string();
                    let val = trim(value.text).to_string();

                    config
                        .groups
                        .entry(current_group.clone())
                        .or_default()
                        .map
                        .insert(key, val);
                }
                TokenKind::BracketClose | TokenKind::Equals => {
                    return Err(format!(
                        "unexpected {} on line {}",
                        tok.kind,
                        tok.line + 1
                    ))
                }
            }

            token = lexer.next_token(false, false);
        }

        Ok(config)
    }

    /// Look up a section by name.
    pub fn group(&self, section: &str) -> Option<&ConfigGroup> {
        self.groups.get(section)
    }

    /// Typed integer getter over `(section, key)`.
    pub fn get_int(&self, section: &str, key: &str) -> Option<i64> {
        self.group(section)?.get_int(key)
    }

    /// Typed string getter over `(section, key)`.
    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.group(section)?.get_str(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sections_and_values() {
        let cfg = Config::parse(
            "[General]\nName = NullpointBot\nPort = 7900\n\n[Bot]\nFlood Limit = 10\n",
        )
        .unwrap();

        assert_eq!(cfg.get_str("General", "Name"), Some("NullpointBot"));
        assert_eq!(cfg.get_int("General", "Port"), Some(7900));
        assert_eq!(cfg.get_int("Bot", "Flood Limit"), Some(10));
    }

    #[test]
    fn ignores_comments_to_end_of_line() {
        let cfg = Config::parse("[A]\n# a comment\nKey = Value # trailing note\n").unwrap();
        // Value reads to end of line, so the trailing comment text is part
        // of the value per the original's "value runs to EOL" rule.
        assert_eq!(
            cfg.get_str("A", "Key"),
            Some("Value # trailing note")
        );
    }

    #[test]
    fn unknown_section_or_key_returns_none() {
        let cfg = Config::parse("[A]\nKey = 1\n").unwrap();
        assert_eq!(cfg.get_str("Missing", "Key"), None);
        assert_eq!(cfg.get_str("A", "Missing"), None);
    }

    #[test]
    fn rejects_value_without_equals() {
        let err = Config::parse("[A]\nKey Value\n").unwrap_err();
        assert!(err.contains('='));
    }
}
