//! Ordered class-name registry. A class id is the position of its name.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Immutable ordered list of class names shared by extraction and training.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ClassRegistry {
    names: Vec<String>,
}

impl ClassRegistry {
    /// Build a registry, rejecting empty lists, blank names and duplicates.
    pub fn new<I, S>(names: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        for (idx, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ConfigError::BlankClassName(idx));
            }
            if names[..idx].contains(name) {
                return Err(ConfigError::DuplicateClass(name.clone()));
            }
        }
        Ok(Self { names })
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.names
            .iter()
            .position(|candidate| candidate == name)
            .map(|idx| idx as u32)
    }

    pub fn name_of(&self, class_id: u32) -> Option<&str> {
        self.names.get(class_id as usize).map(String::as_str)
    }

    /// `(class_id, name)` in registry order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (idx as u32, name.as_str()))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self {
            names: ["schematic", "table", "qcm", "preamble", "question_year"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl TryFrom<Vec<String>> for ClassRegistry {
    type Error = ConfigError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<ClassRegistry> for Vec<String> {
    fn from(registry: ClassRegistry) -> Self {
        registry.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_position() {
        let registry = ClassRegistry::default();
        assert_eq!(registry.id_of("schematic"), Some(0));
        assert_eq!(registry.id_of("table"), Some(1));
        assert_eq!(registry.id_of("question_year"), Some(4));
        assert_eq!(registry.id_of("Table"), None);
        assert_eq!(registry.name_of(2), Some("qcm"));
        assert_eq!(registry.name_of(5), None);
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert!(matches!(
            ClassRegistry::new(Vec::<String>::new()),
            Err(ConfigError::EmptyRegistry)
        ));
        assert!(matches!(
            ClassRegistry::new(["a", "b", "a"]),
            Err(ConfigError::DuplicateClass(name)) if name == "a"
        ));
        assert!(matches!(
            ClassRegistry::new(["a", "  "]),
            Err(ConfigError::BlankClassName(1))
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let registry: ClassRegistry = serde_json::from_str(r#"["cat", "dog"]"#).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(serde_json::from_str::<ClassRegistry>("[]").is_err());
    }
}
