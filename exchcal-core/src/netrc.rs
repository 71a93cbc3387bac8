//! Minimal netrc reader.
//!
//! Only the pieces exchcal needs: `machine`/`default` entries with
//! `login`, `account` and `password` tokens. `macdef` bodies are skipped.
//! Values may be double-quoted to hold spaces; `\"` and `\\` escape
//! inside quotes.

use std::path::Path;

use crate::error::{ExchError, ExchResult};

/// Netrc machine name holding the Exchange login and mailbox address.
pub const EXCHANGE_MACHINE: &str = "EXCH";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetrcEntry {
    pub login: Option<String>,
    pub account: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Netrc {
    machines: Vec<(String, NetrcEntry)>,
    default: Option<NetrcEntry>,
}

enum Target {
    Machine(usize),
    Default,
}

impl Netrc {
    pub fn load(path: &Path) -> ExchResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ExchError::Netrc(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> ExchResult<Self> {
        let mut netrc = Netrc::default();
        let mut target: Option<Target> = None;
        let mut lines = contents.lines();

        while let Some(line) = lines.next() {
            let mut tokens = tokenize(line)?.into_iter();
            while let Some(token) = tokens.next() {
                match token.as_str() {
                    "machine" => {
                        let name = tokens
                            .next()
                            .ok_or_else(|| ExchError::Netrc("'machine' without a name".into()))?;
                        netrc
                            .machines
                            .push((name.to_string(), NetrcEntry::default()));
                        target = Some(Target::Machine(netrc.machines.len() - 1));
                    }
                    "default" => {
                        netrc.default = Some(NetrcEntry::default());
                        target = Some(Target::Default);
                    }
                    "login" | "account" | "password" => {
                        let value = tokens
                            .next()
                            .ok_or_else(|| ExchError::Netrc(format!("'{token}' without a value")))?;
                        let entry = match target {
                            Some(Target::Machine(i)) => &mut netrc.machines[i].1,
                            Some(Target::Default) => match netrc.default.as_mut() {
                                Some(entry) => entry,
                                None => continue,
                            },
                            None => {
                                return Err(ExchError::Netrc(format!(
                                    "'{token}' appears before any machine entry"
                                )));
                            }
                        };
                        let value = Some(value);
                        match token.as_str() {
                            "login" => entry.login = value,
                            "account" => entry.account = value,
                            _ => entry.password = value,
                        }
                    }
                    "macdef" => {
                        // Macro body runs until the next empty line.
                        for body in lines.by_ref() {
                            if body.trim().is_empty() {
                                break;
                            }
                        }
                        break;
                    }
                    other => {
                        return Err(ExchError::Netrc(format!("Unexpected token '{other}'")));
                    }
                }
            }
        }

        Ok(netrc)
    }

    /// Entry for `machine`, falling back to the `default` entry.
    pub fn authenticators(&self, machine: &str) -> Option<&NetrcEntry> {
        self.machines
            .iter()
            .find(|(name, _)| name == machine)
            .map(|(_, entry)| entry)
            .or(self.default.as_ref())
    }
}

/// Split one line into tokens. An unquoted `#` starts a comment.
fn tokenize(line: &str) -> ExchResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            break;
        }

        let mut token = String::new();
        if c == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(escaped) => token.push(escaped),
                        None => break,
                    },
                    Some(other) => token.push(other),
                    None => {
                        return Err(ExchError::Netrc("Unterminated quote".into()));
                    }
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_exchange_machine() {
        let netrc = Netrc::parse(
            "machine github.com login octo password hunter2\n\
             machine EXCH\n  login jdoe@example.org\n  account shared@example.org\n",
        )
        .unwrap();

        let entry = netrc.authenticators(EXCHANGE_MACHINE).unwrap();
        assert_eq!(entry.login.as_deref(), Some("jdoe@example.org"));
        assert_eq!(entry.account.as_deref(), Some("shared@example.org"));
        assert_eq!(entry.password, None);
    }

    #[test]
    fn falls_back_to_default_entry() {
        let netrc = Netrc::parse("default login anon account anon@example.org").unwrap();

        let entry = netrc.authenticators("EXCH").unwrap();
        assert_eq!(entry.login.as_deref(), Some("anon"));
    }

    #[test]
    fn missing_machine_is_none() {
        let netrc = Netrc::parse("machine other login x").unwrap();
        assert!(netrc.authenticators(EXCHANGE_MACHINE).is_none());
    }

    #[test]
    fn skips_comments_and_macros() {
        let netrc = Netrc::parse(
            "# personal\nmacdef init\ncd /pub\nget file\n\nmachine EXCH login me # trailing\n",
        )
        .unwrap();

        assert_eq!(
            netrc.authenticators("EXCH").unwrap().login.as_deref(),
            Some("me")
        );
    }

    #[test]
    fn quoted_values_keep_spaces() {
        let netrc = Netrc::parse(
            "machine EXCH login \"CONTOSO\\\\jdoe\" password \"a b \\\"c\\\" #d\"\n",
        )
        .unwrap();

        let entry = netrc.authenticators(EXCHANGE_MACHINE).unwrap();
        assert_eq!(entry.login.as_deref(), Some("CONTOSO\\jdoe"));
        assert_eq!(entry.password.as_deref(), Some("a b \"c\" #d"));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = Netrc::parse("machine EXCH password \"open").unwrap_err();
        assert!(matches!(err, ExchError::Netrc(_)));
    }

    #[test]
    fn rejects_value_before_machine() {
        let err = Netrc::parse("login orphan").unwrap_err();
        assert!(matches!(err, ExchError::Netrc(_)));
    }
}
