//! Resource identifiers (ARIs): `scheme[:path] [flags...]`.
//!
//! [`parse`] turns a token stream into identifiers, [`piped_tokens`] cleans up piped stdin and
//! `Display` renders an identifier so that it parses back.

use std::fmt;

use crate::signal::Signal;

/// Separator between a re-parseable identifier and its human readable annotation.
pub const COMMENT_SEPARATOR: &str = " # ";

/// A scheme-prefixed, optionally pathed, flag bearing token naming one unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ari {
    /// Provider selector. `None` only when flags were given without any identifier.
    pub scheme: Option<String>,
    /// Opaque provider path. `None` means "use the remembered state".
    pub path: Option<String>,
    /// Flag tokens in user order, never containing `--`.
    pub flags: Vec<String>,
}

impl Ari {
    pub fn new(scheme: impl Into<String>, path: Option<&str>) -> Self {
        Self {
            scheme: Some(scheme.into()),
            path: path.map(str::to_string),
            flags: Vec::new(),
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Copy without flags, for handing this identifier to another command.
    pub fn without_flags(&self) -> Self {
        Self {
            scheme: self.scheme.clone(),
            path: self.path.clone(),
            flags: Vec::new(),
        }
    }

    /// Render as an output line: `scheme:path # description`.
    pub fn output_line(&self, description: Option<&str>) -> String {
        let base = self.without_flags().to_string();
        match description {
            Some(d) if !d.trim().is_empty() => format!("{base}{COMMENT_SEPARATOR}{}", d.trim()),
            _ => base,
        }
    }
}

impl fmt::Display for Ari {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(self.flags.len() + 1);
        match (&self.scheme, &self.path) {
            (Some(s), Some(p)) => parts.push(format!("{s}:{p}")),
            (Some(s), None) => parts.push(s.clone()),
            (None, _) => {}
        }
        parts.extend(self.flags.iter().cloned());
        f.write_str(&parts.join(" "))
    }
}

/// Turn a flat token stream into identifiers.
///
/// Each identifier is one `scheme[:path]` token followed by every directly following token that
/// starts with `-`. A literal `--` ends the flag run and is dropped. Flags given before any
/// identifier form a schemeless identifier (flags for a global command).
pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Ari>, Signal> {
    let mut aris = Vec::new();
    let mut rest = tokens.iter().map(AsRef::as_ref).peekable();

    while let Some(token) = rest.next() {
        let mut ari = if token == "--" {
            continue;
        } else if token.starts_with('-') && aris.is_empty() {
            Ari {
                flags: vec![token.to_string()],
                ..Ari::default()
            }
        } else {
            split_identifier(token)?
        };

        while let Some(next) = rest.peek() {
            if !next.starts_with('-') {
                break;
            }
            let flag = rest.next().unwrap_or_default();
            if flag == "--" {
                break;
            }
            ari.flags.push(flag.to_string());
        }

        aris.push(ari);
    }

    tracing::trace!(count = aris.len(), "parsed identifiers");
    Ok(aris)
}

fn split_identifier(token: &str) -> Result<Ari, Signal> {
    let (scheme, path) = match token.split_once(':') {
        Some((scheme, path)) => (scheme, Some(path).filter(|p| !p.is_empty())),
        None => (token, None),
    };
    if scheme.is_empty() {
        return Err(Signal::abort(format!(
            "Invalid ARI '{token}': missing scheme before ':'"
        )));
    }
    Ok(Ari {
        scheme: Some(scheme.to_string()),
        path: path.map(str::to_string),
        flags: Vec::new(),
    })
}

/// Sanitize piped input into tokens.
///
/// Every line loses its ` # comment` annotation, the remainders are joined and split on
/// whitespace.
pub fn piped_tokens(input: &str) -> Vec<String> {
    input
        .lines()
        .map(|line| match line.find(COMMENT_SEPARATOR) {
            Some(idx) => &line[..idx],
            None => line,
        })
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}
