//! Term lookup capability and the map-backed registry used by default.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use toml::de::Error as TomlError;

use super::term::{Term, TermId};

/// Capability the grammar engine uses to resolve term ids.
pub trait TermLookup {
    fn lookup(&self, id: &TermId) -> Option<&Term>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read term registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid TOML term registry: {0}")]
    Toml(#[from] TomlError),
    #[error("invalid JSON term registry: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported term registry format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("term `{0}` is defined more than once")]
    DuplicateTerm(TermId),
    #[error("term `{term}` refers to unknown term `{reference}`")]
    UnknownReference { term: TermId, reference: TermId },
    #[error("term `{term}` has a rule or modifier whose weights sum to zero")]
    ZeroWeight { term: TermId },
}

/// On-disk shape of a registry: `[[terms]]` tables in TOML, `{"terms": [...]}` in JSON.
#[derive(Debug, Default, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    terms: Vec<Term>,
}

#[derive(Clone, Debug, Default)]
pub struct TermRegistry {
    terms: BTreeMap<TermId, Term>,
}

impl TermLookup for TermRegistry {
    fn lookup(&self, id: &TermId) -> Option<&Term> {
        self.terms.get(id)
    }
}

impl TermRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry, rejecting duplicate ids and dangling references.
    pub fn from_terms(terms: impl IntoIterator<Item = Term>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for term in terms {
            let id = term.id.clone();
            if registry.insert(term).is_some() {
                return Err(RegistryError::DuplicateTerm(id));
            }
        }
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = toml::from_str(source)?;
        Self::from_terms(file.terms)
    }

    pub fn from_json_str(source: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(source)?;
        Self::from_terms(file.terms)
    }

    /// Loads a registry file, choosing the parser from the extension.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = fs::read_to_string(path)
            .map_err(|source| RegistryError::Io { path: path.to_path_buf(), source })?;
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(RegistryError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Inserts or replaces a term, returning the replaced definition.
    pub fn insert(&mut self, term: Term) -> Option<Term> {
        self.terms.insert(term.id.clone(), term)
    }

    pub fn get(&self, id: &str) -> Option<&Term> {
        self.terms.get(&TermId::from(id))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.terms.values()
    }

    /// Checks that every referenced term exists and that every weighted
    /// choice can actually pick something.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for term in self.terms.values() {
            if let Some(reference) = term.referenced_terms().find(|id| !self.terms.contains_key(*id))
            {
                return Err(RegistryError::UnknownReference {
                    term: term.id.clone(),
                    reference: reference.clone(),
                });
            }
            let rule_weight: u64 = term.rules.iter().map(|rule| u64::from(rule.weight)).sum();
            let dead_rules = !term.rules.is_empty() && rule_weight == 0;
            let dead_modifier =
                term.modifiers.iter().any(|modifier| modifier.total_weight() == Some(0));
            if dead_rules || dead_modifier {
                return Err(RegistryError::ZeroWeight { term: term.id.clone() });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::modifier::{Modifier, WeightedTerm};
    use crate::grammar::term::{Condition, RoomMeta, Rule, RuleShape};
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
[[terms]]
id = "Start"
meta = { name = "Entrance", category = "start", width = 7, height = 7 }

[[terms]]
id = "Hall"
meta = { name = "Hall", width = 9, height = 5, data = { mobs = "skeleton" } }
modifiers = [{ kind = "inject_branch", terms = [{ term = "Treasure" }], chance = 0.5 }]

[[terms.rules]]
weight = 3
symbols = ["Blank", "Hall"]
condition = { kind = "depth_below", depth = 3 }

[[terms.rules]]
symbols = ["Blank", "Treasure"]
shape = "branch"

[[terms]]
id = "Blank"

[[terms]]
id = "Treasure"
meta = { name = "Vault", category = "treasure", width = 4, height = 4 }
"#;

    #[test]
    fn toml_registry_loads_rules_modifiers_and_metadata() {
        let registry = TermRegistry::from_toml_str(SAMPLE).expect("sample registry parses");
        assert_eq!(registry.len(), 4);

        let hall = registry.get("Hall").expect("hall defined");
        assert_eq!(hall.meta.width, 9);
        assert_eq!(hall.meta.category, "room", "unspecified metadata keeps its default");
        assert_eq!(hall.meta.data.get("mobs").map(String::as_str), Some("skeleton"));
        assert_eq!(hall.rules.len(), 2);
        assert_eq!(hall.rules[0].weight, 3);
        assert_eq!(hall.rules[0].condition, Some(Condition::DepthBelow { depth: 3 }));
        assert_eq!(hall.rules[1].shape, RuleShape::Branch);
        assert_eq!(
            hall.modifiers,
            vec![Modifier::InjectBranch { terms: vec![WeightedTerm::new("Treasure", 1)], chance: 0.5 }]
        );
        assert!(registry.get("Blank").expect("blank defined").is_terminal());
    }

    #[test]
    fn dangling_references_fail_fast() {
        let hall = Term::terminal("Hall", RoomMeta::default()).with_rule(Rule::chain(&["Missing"]));
        let error = TermRegistry::from_terms([hall]).expect_err("reference is dangling");
        assert!(matches!(
            error,
            RegistryError::UnknownReference { ref reference, .. } if reference.as_str() == "Missing"
        ));
    }

    #[test]
    fn duplicate_and_zero_weight_definitions_are_rejected() {
        let blank = Term::terminal("Blank", RoomMeta::default());
        let duplicate = TermRegistry::from_terms([blank.clone(), blank.clone()]);
        assert!(matches!(duplicate, Err(RegistryError::DuplicateTerm(_))));

        let dead = Term::terminal("Hall", RoomMeta::default())
            .with_rule(Rule::chain(&["Blank"]).weighted(0));
        let dead = TermRegistry::from_terms([blank, dead]);
        assert!(matches!(dead, Err(RegistryError::ZeroWeight { .. })));
    }

    #[test]
    fn load_picks_parser_by_extension() {
        let dir = tempdir().expect("tempdir");
        let toml_path = dir.path().join("terms.toml");
        fs::write(&toml_path, SAMPLE).expect("write toml");
        let from_toml = TermRegistry::load(&toml_path).expect("load toml");

        let json_path = dir.path().join("terms.json");
        fs::write(
            &json_path,
            r#"{"terms":[{"id":"Start","exit":false},{"id":"Exit","exit":true}]}"#,
        )
        .expect("write json");
        let from_json = TermRegistry::load(&json_path).expect("load json");
        assert!(from_json.get("Exit").expect("exit defined").exit);
        assert_eq!(from_toml.len(), 4);

        let other = dir.path().join("terms.yaml");
        fs::write(&other, "terms: []").expect("write yaml");
        assert!(matches!(TermRegistry::load(&other), Err(RegistryError::UnsupportedFormat(_))));
        assert!(matches!(
            TermRegistry::load(&dir.path().join("absent.toml")),
            Err(RegistryError::Io { .. })
        ));
    }
}
