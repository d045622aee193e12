//! A small parser for JavaScript object literals as they appear in component props.
//!
//! Accepts what JSON accepts plus bare identifier keys, single-quoted and
//! backtick strings (without interpolation), trailing commas, `undefined`,
//! and `//` / `/* */` comments. The result is a [`serde_json::Value`].

use serde_json::{Map, Number, Value};
use tt_core::{Error, Result};

const MAX_DEPTH: usize = 64;

/// Parses one value at the start of `src` (leading whitespace allowed).
///
/// Returns the value and the byte offset just past it.
pub fn parse_value_prefix(src: &str) -> Result<(Value, usize)> {
    let mut parser = Parser { src, pos: 0, depth: 0 };
    parser.skip_trivia()?;
    let value = parser.value()?;
    Ok((value, parser.pos))
}

/// Parses `src` as exactly one value, trailing trivia allowed.
pub fn parse_value(src: &str) -> Result<Value> {
    let mut parser = Parser { src, pos: 0, depth: 0 };
    parser.skip_trivia()?;
    let value = parser.value()?;
    parser.skip_trivia()?;
    if parser.pos != src.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> Error {
        Error::Parse(format!("{} at byte {}", message, self.pos))
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();

            if trimmed.starts_with("//") {
                let line_end = trimmed.find('\n').unwrap_or(trimmed.len());
                self.pos += line_end;
            } else if trimmed.starts_with("/*") {
                let close = trimmed[2..]
                    .find("*/")
                    .ok_or_else(|| self.error("unterminated comment"))?;
                self.pos += close + 4;
            } else {
                return Ok(());
            }
        }
    }

    fn value(&mut self) -> Result<Value> {
        match self.peek() {
            Some('{') => self.nested(Self::object),
            Some('[') => self.nested(Self::array),
            Some(q @ ('"' | '\'' | '`')) => self.string(q).map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if is_ident_start(c) => {
                let ident = self.ident();
                match ident {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" | "undefined" => Ok(Value::Null),
                    other => Err(self.error(&format!("unsupported identifier '{}'", other))),
                }
            }
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn nested(&mut self, f: fn(&mut Self) -> Result<Value>) -> Result<Value> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        let value = f(self);
        self.depth -= 1;
        value
    }

    fn object(&mut self) -> Result<Value> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_trivia()?;
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            let key = self.key()?;
            self.skip_trivia()?;
            self.expect(':')?;
            self.skip_trivia()?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_trivia()?;
            if self.eat(',') {
                continue;
            }
            self.skip_trivia()?;
            self.expect('}')?;
            return Ok(Value::Object(map));
        }
    }

    fn array(&mut self) -> Result<Value> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.eat(']') {
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_trivia()?;
            if self.eat(',') {
                continue;
            }
            self.expect(']')?;
            return Ok(Value::Array(items));
        }
    }

    fn key(&mut self) -> Result<String> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => self.string(q),
            Some(c) if is_ident_start(c) => Ok(self.ident().to_string()),
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().map_or(false, |c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
                Ok(self.src[start..self.pos].to_string())
            }
            _ => Err(self.error("expected object key")),
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().map_or(false, is_ident_continue) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn string(&mut self, quote: char) -> Result<String> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            let c = self.bump().ok_or_else(|| self.error("unterminated string"))?;
            match c {
                c if c == quote => return Ok(out),
                '\\' => self.escape(&mut out)?,
                '$' if quote == '`' && self.peek() == Some('{') => {
                    return Err(self.error("template interpolation is not supported"));
                }
                '\n' if quote != '`' => return Err(self.error("newline in string")),
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<()> {
        let c = self.bump().ok_or_else(|| self.error("unterminated escape"))?;
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            '\n' => {}
            'x' => {
                let code = self.hex_digits(2)?;
                out.push(char::from_u32(code).ok_or_else(|| self.error("invalid \\x escape"))?);
            }
            'u' => {
                let c = self.unicode_escape()?;
                out.push(c);
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize) -> Result<u32> {
        let rest = self.rest();
        let digits = rest.get(..count).ok_or_else(|| self.error("truncated hex escape"))?;
        let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid hex escape"))?;
        self.pos += count;
        Ok(code)
    }

    fn unicode_escape(&mut self) -> Result<char> {
        if self.eat('{') {
            let end = self.rest().find('}').ok_or_else(|| self.error("unterminated \\u{...}"))?;
            let digits = &self.rest()[..end];
            let code = u32::from_str_radix(digits, 16).map_err(|_| self.error("invalid \\u{...}"))?;
            self.pos += end + 1;
            return char::from_u32(code).ok_or_else(|| self.error("invalid code point"));
        }
        let high = self.hex_digits(4)?;
        if (0xD800..0xDC00).contains(&high) && self.rest().starts_with("\\u") {
            self.pos += 2;
            let low = self.hex_digits(4)?;
            let code = 0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3FF);
            return char::from_u32(code).ok_or_else(|| self.error("invalid surrogate pair"));
        }
        Ok(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn number(&mut self) -> Result<Value> {
        let start = self.pos;
        while self
            .peek()
            .map_or(false, |c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_'))
        {
            self.pos += 1;
        }
        let raw: String = self.src[start..self.pos].chars().filter(|c| *c != '_').collect();
        let raw = raw.trim_start_matches('+');
        if let Ok(i) = raw.parse::<i64>() {
            return Ok(Value::Number(i.into()));
        }
        raw.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error("invalid number"))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_plain_json() {
        let value = parse_value(r#"{"S": [{"name": "A", "price": 12.5}], "ok": true}"#).unwrap();
        assert_eq!(value, json!({"S": [{"name": "A", "price": 12.5}], "ok": true}));
    }

    #[test]
    fn test_parses_js_object_literal() {
        let src = r#"{
            // top tier
            "S": [
              { name: 'Logitech G Pro X', review: "Great \"clarity\"", link: `https://a.co/x`, },
            ],
            A: [ /* empty */ ],
            7: undefined,
        }"#;
        let value = parse_value(src).unwrap();
        assert_eq!(
            value,
            json!({
                "S": [{"name": "Logitech G Pro X", "review": "Great \"clarity\"", "link": "https://a.co/x"}],
                "A": [],
                "7": null
            })
        );
    }

    #[test]
    fn test_preserves_key_order() {
        let value = parse_value("{ B: 1, S: 2, A: 3 }").unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["B", "S", "A"]);
    }

    #[test]
    fn test_string_escapes() {
        let value = parse_value(r#"'it\'s é \u{1F600} \x41 😀'"#).unwrap();
        assert_eq!(value, json!("it's é 😀 A 😀"));
    }

    #[test]
    fn test_prefix_reports_offset() {
        let src = "  {a: [1, 2]}} />";
        let (value, end) = parse_value_prefix(src).unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
        assert_eq!(&src[end..], "} />");
    }

    #[test]
    fn test_rejects_unsupported_input() {
        assert!(parse_value("{ a: someVariable }").is_err());
        assert!(parse_value("{ a: `x ${y}` }").is_err());
        assert!(parse_value("{ a: 'unterminated }").is_err());
        assert!(parse_value("{ a: 1 } extra").is_err());
        assert!(parse_value(&"[".repeat(100)).is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_value("-42").unwrap(), json!(-42));
        assert_eq!(parse_value("1e3").unwrap(), json!(1000.0));
        assert_eq!(parse_value("1_000").unwrap(), json!(1000));
    }
}
