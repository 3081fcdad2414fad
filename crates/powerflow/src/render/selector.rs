use std::fmt;
use std::str::FromStr;

/// Error produced when parsing a selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected character {0:?} in selector")]
    Unexpected(char),

    #[error("missing name after {0:?}")]
    MissingName(char),

    #[error("compound selector has more than one id")]
    DuplicateId,
}

/// One compound selector: an optional tag, an optional `#id` and any `.class`es.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

/// A chain of compound selectors joined by descendant combinators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    parts: Vec<Compound>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_name(input: &str) -> (&str, &str) {
    let end = input
        .char_indices()
        .find(|&(_, c)| !is_name_char(c))
        .map_or(input.len(), |(i, _)| i);
    input.split_at(end)
}

impl FromStr for Compound {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut compound = Compound::default();
        let (tag, mut rest) = take_name(s);
        if !tag.is_empty() {
            compound.tag = Some(tag.to_ascii_lowercase());
        }

        while let Some(marker) = rest.chars().next() {
            let (name, tail) = take_name(&rest[marker.len_utf8()..]);
            match marker {
                '#' | '.' if name.is_empty() => return Err(SelectorError::MissingName(marker)),
                '#' if compound.id.is_some() => return Err(SelectorError::DuplicateId),
                '#' => compound.id = Some(name.to_string()),
                '.' => compound.classes.push(name.to_string()),
                other => return Err(SelectorError::Unexpected(other)),
            }
            rest = tail;
        }

        Ok(compound)
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split_whitespace()
            .map(Compound::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Self { parts })
    }
}

impl Selector {
    /// Compound selectors from outermost ancestor to the subject.
    pub fn parts(&self) -> &[Compound] {
        &self.parts
    }

    /// The compound the matched element itself must satisfy.
    pub fn subject(&self) -> &Compound {
        // `from_str` rejects empty selectors.
        &self.parts[self.parts.len() - 1]
    }

    /// Compounds that must match ancestors, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Compound> {
        self.parts[..self.parts.len() - 1].iter().rev()
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tag) = &self.tag {
            write!(f, "{tag}")?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let sel: Selector = "#load".parse().unwrap();
        assert_eq!(sel.parts().len(), 1);
        assert_eq!(sel.subject().id.as_deref(), Some("load"));
        assert!(sel.subject().tag.is_none());
    }

    #[test]
    fn test_parse_descendant_chain() {
        let sel: Selector = "#loadText  .super".parse().unwrap();
        assert_eq!(sel.parts().len(), 2);
        assert_eq!(sel.subject().classes, vec!["super".to_string()]);
        let ancestors: Vec<_> = sel.ancestors().collect();
        assert_eq!(ancestors.len(), 1);
        assert_eq!(ancestors[0].id.as_deref(), Some("loadText"));
    }

    #[test]
    fn test_parse_compound() {
        let c: Compound = "DIV#grid-disconnect.icon.off".parse().unwrap();
        assert_eq!(c.tag.as_deref(), Some("div"));
        assert_eq!(c.id.as_deref(), Some("grid-disconnect"));
        assert_eq!(c.classes, vec!["icon".to_string(), "off".to_string()]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Selector>(), Err(SelectorError::Empty));
        assert_eq!("   ".parse::<Selector>(), Err(SelectorError::Empty));
        assert_eq!("#".parse::<Selector>(), Err(SelectorError::MissingName('#')));
        assert_eq!("div.".parse::<Selector>(), Err(SelectorError::MissingName('.')));
        assert_eq!("#a#b".parse::<Selector>(), Err(SelectorError::DuplicateId));
        assert_eq!("div > p".parse::<Selector>(), Err(SelectorError::Unexpected('>')));
    }

    #[test]
    fn test_display_round_trips_text() {
        let sel: Selector = "#icons   #grid-disconnect".parse().unwrap();
        assert_eq!(sel.to_string(), "#icons #grid-disconnect");
    }
}
