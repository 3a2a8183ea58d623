use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Raw skills.json entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillEntry {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub name: String,
    pub weight: u32,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub similar: Vec<SimilarVariant>,
}

/// A literal OCR confusion of a skill name. A variant carrying its own weight is
/// searched in that width class instead of the entry's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SimilarVariant {
    Plain(String),
    Weighted { name: String, weight: u32 },
}

/// Raw skills.json file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillsFile {
    #[serde(default)]
    pub normal_skills: Vec<SkillEntry>,
    #[serde(default)]
    pub rare_skills: Vec<SkillEntry>,
    #[serde(default)]
    pub unique_skills: Vec<SkillEntry>,
}

/// One resolvable name inside a width class, plus every string that may stand for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub canonical: String,
    /// Strings compared against OCR output. Home-class candidates list the canonical
    /// name first.
    pub forms: Vec<String>,
}

/// Skill names partitioned by rendered-width class.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    by_weight: BTreeMap<u32, Vec<Candidate>>,
    unique: HashSet<String>,
}

impl Vocabulary {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let file: SkillsFile =
            serde_json::from_slice(bytes).context("Failed to parse skills.json")?;
        Ok(Self::from_file(file))
    }

    pub fn from_file(file: SkillsFile) -> Self {
        let mut vocab = Self::default();
        for entry in &file.unique_skills {
            vocab.unique.insert(entry.name.clone());
        }
        for entry in file
            .normal_skills
            .iter()
            .chain(&file.rare_skills)
            .chain(&file.unique_skills)
        {
            vocab.insert(entry);
        }
        vocab
    }

    fn insert(&mut self, entry: &SkillEntry) {
        let mut forms = vec![entry.name.clone()];
        for variant in &entry.similar {
            match variant {
                SimilarVariant::Plain(name) => forms.push(name.clone()),
                SimilarVariant::Weighted { name, weight } if *weight == entry.weight => {
                    forms.push(name.clone())
                }
                SimilarVariant::Weighted { name, weight } => {
                    self.add_form(*weight, &entry.name, name);
                }
            }
        }
        let class = self.by_weight.entry(entry.weight).or_default();
        match class.iter_mut().find(|c| c.canonical == entry.name) {
            Some(existing) => {
                for form in forms {
                    if !existing.forms.contains(&form) {
                        existing.forms.push(form);
                    }
                }
            }
            None => class.push(Candidate {
                canonical: entry.name.clone(),
                forms,
            }),
        }
    }

    fn add_form(&mut self, weight: u32, canonical: &str, form: &str) {
        let class = self.by_weight.entry(weight).or_default();
        match class.iter_mut().find(|c| c.canonical == canonical) {
            Some(existing) => {
                if !existing.forms.iter().any(|f| f == form) {
                    existing.forms.push(form.to_string());
                }
            }
            None => class.push(Candidate {
                canonical: canonical.to_string(),
                forms: vec![form.to_string()],
            }),
        }
    }

    /// Candidates registered under `weight`; empty for unknown classes.
    pub fn class(&self, weight: u32) -> &[Candidate] {
        self.by_weight.get(&weight).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_unique(&self, name: &str) -> bool {
        self.unique.contains(name)
    }

    pub fn len(&self) -> usize {
        self.by_weight.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_weight.is_empty()
    }
}
