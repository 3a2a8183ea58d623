use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod reconcile;
pub mod vocabulary;

pub use reconcile::{normalize, Reconciled, TextReconciler, NICKNAME_FLOOR};
pub use vocabulary::{Candidate, SimilarVariant, SkillEntry, SkillsFile, Vocabulary};

/// characters.json entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterCharacter {
    pub name: String,
    #[serde(default)]
    pub nicknames: Vec<String>,
}

/// Master vocabulary, built once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct MasterData {
    pub characters: Vec<MasterCharacter>,
    pub skills: Vocabulary,
}

impl MasterData {
    pub fn from_json(characters: &[u8], skills: &[u8]) -> Result<Self> {
        let characters: Vec<MasterCharacter> =
            serde_json::from_slice(characters).context("Failed to parse characters.json")?;
        let skills = Vocabulary::from_json(skills)?;
        tracing::info!(
            "Loaded {} characters and {} skill candidates",
            characters.len(),
            skills.len()
        );
        Ok(Self { characters, skills })
    }

    pub fn character_names(&self) -> impl Iterator<Item = &str> {
        self.characters.iter().map(|c| c.name.as_str())
    }

    pub fn character(&self, name: &str) -> Option<&MasterCharacter> {
        self.characters.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_master_data() {
        let chars = r#"[
            {"name": "スペシャルウィーク", "nicknames": ["[スペシャルドリーマー]"]},
            {"name": "サイレンススズカ"}
        ]"#;
        let data = MasterData::from_json(chars.as_bytes(), b"{}").unwrap();
        assert_eq!(data.characters.len(), 2);
        assert!(data.character("サイレンススズカ").unwrap().nicknames.is_empty());
        assert_eq!(
            data.character_names().collect::<Vec<_>>(),
            vec!["スペシャルウィーク", "サイレンススズカ"]
        );
    }

    #[test]
    fn test_bad_characters_json() {
        let err = MasterData::from_json(b"{\"name\": 1}", b"{}").unwrap_err();
        assert!(format!("{err:#}").contains("characters.json"));
    }
}
