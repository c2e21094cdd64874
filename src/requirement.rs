use alloc::string::{String, ToString as _};
use alloc::vec::Vec;
use alloc::{format, vec};
use core::fmt;
use core::str::FromStr;

use crate::error::BuildError;
use crate::utils::uniq;
use crate::version::LooseVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Less => "<",
            Comparator::LessEqual => "<=",
            Comparator::Greater => ">",
            Comparator::GreaterEqual => ">=",
            Comparator::Equal => "==",
        }
    }

    /// Whether `found <op> wanted` holds.
    pub fn matches(&self, found: &LooseVersion, wanted: &LooseVersion) -> bool {
        match self {
            Comparator::Less => found < wanted,
            Comparator::LessEqual => found <= wanted,
            Comparator::Greater => found > wanted,
            Comparator::GreaterEqual => found >= wanted,
            Comparator::Equal => found == wanted,
        }
    }
}

impl FromStr for Comparator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(Comparator::Less),
            "<=" => Ok(Comparator::LessEqual),
            ">" => Ok(Comparator::Greater),
            ">=" => Ok(Comparator::GreaterEqual),
            "==" => Ok(Comparator::Equal),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    pub comparator: Comparator,
    pub version: String,
}

/// A package requirement such as `blitz`, or `boost >= 1.55`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requirement {
    pub name: String,
    pub constraint: Option<Constraint>,
}

fn is_comparator_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=')
}

/// Splits around every run of comparator characters, swallowing the
/// whitespace that surrounds them. The runs themselves are kept as tokens.
fn tokenize(requirement: &str) -> Vec<&str> {
    let mut tokens = vec![];
    let mut rest = requirement;

    while let Some(start) = rest.find(is_comparator_char) {
        let len = rest[start..]
            .find(|c: char| !is_comparator_char(c))
            .unwrap_or(rest.len() - start);
        tokens.push(rest[..start].trim_end());
        tokens.push(&rest[start..start + len]);
        rest = rest[start + len..].trim_start();
    }
    tokens.push(rest);

    tokens
}

impl Requirement {
    pub fn parse(requirement: &str) -> Result<Self, BuildError> {
        let malformed = || BuildError::MalformedRequirement(requirement.to_string());

        let tokens = tokenize(requirement.trim());
        match tokens.as_slice() {
            [name] if !name.is_empty() => Ok(Self {
                name: name.to_string(),
                constraint: None,
            }),
            [name, op, version] if !name.is_empty() && !version.is_empty() => {
                let comparator = op.parse().map_err(|_| malformed())?;
                Ok(Self {
                    name: name.to_string(),
                    constraint: Some(Constraint {
                        comparator,
                        version: version.to_string(),
                    }),
                })
            }
            _ => Err(malformed()),
        }
    }

    /// Checks `found` against the constraint; unconstrained requirements always hold.
    pub fn is_satisfied_by(&self, found: &LooseVersion) -> bool {
        match &self.constraint {
            Some(c) => c
                .comparator
                .matches(found, &LooseVersion::parse(&c.version)),
            None => true,
        }
    }
}

impl FromStr for Requirement {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(c) => write!(f, "{} {} {}", self.name, c.comparator, c.version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Groups requirements by package name.
///
/// Every package shows up once as a bare name if it was never constrained,
/// or once per distinct constraint otherwise. Names keep their first
/// encounter order. Overlapping ranges are not merged: `a > 1.0` and
/// `a > 2.0` both survive.
pub fn normalize<S: AsRef<str>>(requirements: &[S]) -> Result<Vec<String>, BuildError> {
    let mut parsed: Vec<(String, Vec<Constraint>)> = vec![];

    for requirement in requirements {
        let requirement = Requirement::parse(requirement.as_ref())?;
        let idx = match parsed.iter().position(|(name, _)| *name == requirement.name) {
            Some(idx) => idx,
            None => {
                parsed.push((requirement.name.clone(), vec![]));
                parsed.len() - 1
            }
        };
        if let Some(constraint) = requirement.constraint {
            parsed[idx].1.push(constraint);
        }
    }

    let mut leftovers = vec![];
    for (name, constraints) in parsed {
        let constraints = uniq(constraints);
        if constraints.is_empty() {
            leftovers.push(name);
            continue;
        }
        for c in constraints {
            leftovers.push(format!("{name} {} {}", c.comparator, c.version));
        }
    }

    Ok(leftovers)
}
