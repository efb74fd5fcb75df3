use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Separator between path components in catalog addresses
pub const PATH_SEPARATOR: &str = "/";

/// How titles are rendered inside a hierarchical path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathEscaping {
    /// Quote components containing `/`, `.` or `"`, doubling embedded quotes
    #[default]
    QuoteSpecial,
    /// Join titles as they are
    Plain,
}

impl PathEscaping {
    pub fn escape_component<'a>(&self, title: &'a str) -> Cow<'a, str> {
        match self {
            Self::Plain => Cow::Borrowed(title),
            Self::QuoteSpecial => {
                if title.contains('"') {
                    Cow::Owned(format!("\"{}\"", title.replace('"', "\"\"")))
                } else if title.contains('/') || title.contains('.') {
                    Cow::Owned(format!("\"{title}\""))
                } else {
                    Cow::Borrowed(title)
                }
            }
        }
    }

    pub fn join(&self, components: &[String]) -> String {
        components
            .iter()
            .map(|component| self.escape_component(component))
            .collect::<Vec<_>>()
            .join(PATH_SEPARATOR)
    }
}

impl fmt::Display for PathEscaping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuoteSpecial => write!(f, "quote_special"),
            Self::Plain => write!(f, "plain"),
        }
    }
}

impl FromStr for PathEscaping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quote_special" | "quote-special" | "quoted" => Ok(Self::QuoteSpecial),
            "plain" | "none" => Ok(Self::Plain),
            _ => Err(format!("Unknown path escaping: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_titles_are_untouched() {
        let escaping = PathEscaping::QuoteSpecial;
        assert_eq!(escaping.escape_component("Finance"), "Finance");
        assert!(matches!(escaping.escape_component("Finance"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_slash_and_dot_are_quoted() {
        let escaping = PathEscaping::QuoteSpecial;
        assert_eq!(escaping.escape_component("INPUT/OUTPUT"), "\"INPUT/OUTPUT\"");
        assert_eq!(escaping.escape_component("dataspot."), "\"dataspot.\"");
    }

    #[test]
    fn test_quotes_are_doubled() {
        let escaping = PathEscaping::QuoteSpecial;
        assert_eq!(
            escaping.escape_component("Project \"Zeus\""),
            "\"Project \"\"Zeus\"\"\""
        );
        assert_eq!(escaping.escape_component("28\" City Bike"), "\"28\"\" City Bike\"");
    }

    #[test]
    fn test_join() {
        let path = vec!["Dept".to_string(), "A/B".to_string(), "Office".to_string()];
        assert_eq!(PathEscaping::QuoteSpecial.join(&path), "Dept/\"A/B\"/Office");
        assert_eq!(PathEscaping::Plain.join(&path), "Dept/A/B/Office");
        assert_eq!(PathEscaping::Plain.join(&[]), "");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("plain".parse::<PathEscaping>(), Ok(PathEscaping::Plain));
        assert_eq!(
            "quote_special".parse::<PathEscaping>(),
            Ok(PathEscaping::QuoteSpecial)
        );
        assert!("shout".parse::<PathEscaping>().is_err());
    }
}
