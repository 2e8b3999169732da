//! CSS-like selectors — compound selectors joined by descendant combinators.
//!
//! Supported grammar, enough for every player layout in the adapter
//! registry:
//!
//! ```text
//! selector := compound (WS compound)*
//! compound := (tag | '*')? ('#' ident | '.' ident)*
//! ```
//!
//! Child/sibling combinators, attribute selectors and pseudo-classes are
//! rejected at parse time rather than silently mismatching.

use std::fmt;
use std::str::FromStr;

use super::NodeId;

/// Selector parse errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected character {ch:?} in selector {selector:?}")]
    UnexpectedChar { ch: char, selector: String },
    #[error("missing name after {prefix:?} in selector {selector:?}")]
    MissingName { prefix: char, selector: String },
    #[error("unsupported combinator {combinator:?} in selector {selector:?}")]
    UnsupportedCombinator { combinator: char, selector: String },
}

/// One compound selector: an optional tag plus id/class constraints.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compound {
    /// Lowercased tag name. `None` matches any element.
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

/// A parsed selector: compounds ordered outermost-first. The last
/// compound is the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    compounds: Vec<Compound>,
}

/// Read-only element view the matcher walks.
pub(crate) trait ElementTree {
    /// Tag name, or `None` for the document node.
    fn tag_of(&self, node: NodeId) -> Option<&str>;
    fn id_of(&self, node: NodeId) -> Option<&str>;
    fn classes_of(&self, node: NodeId) -> &[String];
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        let compounds = trimmed
            .split_whitespace()
            .map(|token| parse_compound(token, trimmed))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: trimmed.to_string(),
            compounds,
        })
    }

    /// Selector matching any element carrying `class`.
    pub fn class(name: &str) -> Self {
        Self {
            source: format!(".{name}"),
            compounds: vec![Compound {
                tag: None,
                id: None,
                classes: vec![name.to_string()],
            }],
        }
    }

    /// The selector text as written (trimmed).
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Compounds, outermost first.
    pub fn compounds(&self) -> &[Compound] {
        &self.compounds
    }

    /// Whether `node` matches. Ancestor compounds may match anywhere
    /// above `node`, including outside any query scope, as in the DOM.
    pub(crate) fn matches<T: ElementTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !compound_matches(subject, tree, node) {
            return false;
        }

        // Greedy right-to-left walk is exact for descendant-only chains.
        let mut cursor = tree.parent_of(node);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(candidate) = cursor else {
                    return false;
                };
                cursor = tree.parent_of(candidate);
                if compound_matches(compound, tree, candidate) {
                    break;
                }
            }
        }
        true
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn compound_matches<T: ElementTree + ?Sized>(compound: &Compound, tree: &T, node: NodeId) -> bool {
    let Some(tag) = tree.tag_of(node) else {
        return false;
    };
    if let Some(want) = &compound.tag
        && want != tag
    {
        return false;
    }
    if let Some(want) = &compound.id
        && tree.id_of(node) != Some(want.as_str())
    {
        return false;
    }
    let classes = tree.classes_of(node);
    compound.classes.iter().all(|c| classes.contains(c))
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn parse_compound(token: &str, selector: &str) -> Result<Compound, SelectorError> {
    let mut compound = Compound::default();
    let mut chars = token.chars().peekable();

    // Leading tag or universal selector.
    if chars.peek() == Some(&'*') {
        chars.next();
    } else {
        let tag: String = std::iter::from_fn(|| chars.next_if(|c| is_ident_char(*c))).collect();
        if !tag.is_empty() {
            compound.tag = Some(tag.to_ascii_lowercase());
        }
    }

    while let Some(prefix) = chars.next() {
        match prefix {
            '#' | '.' => {
                let name: String =
                    std::iter::from_fn(|| chars.next_if(|c| is_ident_char(*c))).collect();
                if name.is_empty() {
                    return Err(SelectorError::MissingName {
                        prefix,
                        selector: selector.to_string(),
                    });
                }
                if prefix == '#' {
                    compound.id = Some(name);
                } else {
                    compound.classes.push(name);
                }
            }
            '>' | '+' | '~' => {
                return Err(SelectorError::UnsupportedCombinator {
                    combinator: prefix,
                    selector: selector.to_string(),
                });
            }
            ch => {
                return Err(SelectorError::UnexpectedChar {
                    ch,
                    selector: selector.to_string(),
                });
            }
        }
    }

    Ok(compound)
}
