//! Sinatra-style path patterns: `/pancakes/:id` and `/files/*`.

use std::borrow::Cow;

use regex::Regex;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Literal(String),
    Named(String),
    Splat,
}

fn tokenize(path: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = path.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        match c {
            ':' if chars
                .peek()
                .is_some_and(|(_, next)| next.is_ascii_alphabetic() || *next == '_') =>
            {
                let mut name = String::new();
                while let Some((_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || *next == '_' {
                        name.push(*next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Named(name));
            }
            '*' => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(Token::Splat);
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

/// Every `:name` placeholder in `path`, in order of appearance.
pub fn placeholder_names(path: &str) -> Vec<String> {
    tokenize(path)
        .into_iter()
        .filter_map(|t| match t {
            Token::Named(name) => Some(name),
            _ => None,
        })
        .collect()
}

/// Render `path` the way OpenAPI expects: `:id` becomes `{id}` and a trailing
/// wildcard is dropped.
pub fn openapi_path(path: &str) -> String {
    let mut tokens = tokenize(path);
    if tokens.last() == Some(&Token::Splat) {
        tokens.pop();
    }

    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Literal(text) => out.push_str(&text),
            Token::Named(name) => {
                out.push('{');
                out.push_str(&name);
                out.push('}');
            }
            Token::Splat => out.push('*'),
        }
    }
    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

#[derive(Clone, Debug)]
enum Capture {
    Named(String),
    Splat,
}

/// A compiled path pattern.
#[derive(Clone, Debug)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    captures: Vec<Capture>,
    names: Vec<String>,
}

/// Values extracted from a matching path, percent-decoded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathMatch {
    /// Placeholder values in path order.
    pub named: Vec<(String, String)>,
    /// Wildcard values in path order.
    pub splat: Vec<String>,
}

impl PathPattern {
    pub fn compile(path: &str) -> Result<Self, regex::Error> {
        let mut pattern = String::from("^");
        let mut captures = Vec::new();
        let mut names = Vec::new();

        for token in tokenize(path) {
            match token {
                Token::Literal(text) => pattern.push_str(&regex::escape(&text)),
                Token::Named(name) => {
                    pattern.push_str("([^/?#]+)");
                    names.push(name.clone());
                    captures.push(Capture::Named(name));
                }
                Token::Splat => {
                    pattern.push_str("(.*?)");
                    captures.push(Capture::Splat);
                }
            }
        }
        pattern.push('$');

        Ok(Self {
            source: path.to_string(),
            regex: Regex::new(&pattern)?,
            captures,
            names,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholder names in path order.
    pub fn placeholders(&self) -> &[String] {
        &self.names
    }

    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        let caps = self.regex.captures(path)?;
        let mut matched = PathMatch::default();

        for (i, capture) in self.captures.iter().enumerate() {
            let raw = caps.get(i + 1).map_or("", |m| m.as_str());
            let value = decode(raw);
            match capture {
                Capture::Named(name) => matched.named.push((name.clone(), value)),
                Capture::Splat => matched.splat.push(value),
            }
        }
        Some(matched)
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}
