use serde::{Deserialize, Serialize};

/// Everything extracted from one character detail screenshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub character: String,
    pub nickname: String,
    pub rank: String,
    pub params: Parameters,
    pub unique_skill: Skill,
    pub skills: Vec<Skill>,
    pub abilities: Abilities,
}

/// Identity and rank read from the name plate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub nickname: String,
    pub rank: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub speed: u32,
    pub stamina: u32,
    pub power: u32,
    pub guts: u32,
    pub wise: u32,
}

impl Parameters {
    /// Field names in on-screen order, left to right.
    pub const NAMES: [&'static str; 5] = ["speed", "stamina", "power", "guts", "wise"];

    pub fn from_array(values: [u32; 5]) -> Self {
        let [speed, stamina, power, guts, wise] = values;
        Self {
            speed,
            stamina,
            power,
            guts,
            wise,
        }
    }
}

/// Current and maximum stat values on the support-character screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportParameters {
    pub speed: u32,
    pub stamina: u32,
    pub power: u32,
    pub guts: u32,
    pub wise: u32,
    pub max_speed: u32,
    pub max_stamina: u32,
    pub max_power: u32,
    pub max_guts: u32,
    pub max_wise: u32,
}

impl SupportParameters {
    pub fn from_arrays(current: [u32; 5], max: [u32; 5]) -> Self {
        let [speed, stamina, power, guts, wise] = current;
        let [max_speed, max_stamina, max_power, max_guts, max_wise] = max;
        Self {
            speed,
            stamina,
            power,
            guts,
            wise,
            max_speed,
            max_stamina,
            max_power,
            max_guts,
            max_wise,
        }
    }
}

/// Support screen result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportRecord {
    pub params: SupportParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    pub level: u32,
}

impl Skill {
    pub fn new(name: impl Into<String>, level: u32) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }
}

/// Skills split into the character's own unique skill and everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterSkills {
    pub unique_skill: Skill,
    pub normal_skills: Vec<Skill>,
}

/// Grade letters ("S" .. "G"); empty when the grade icon was not recognized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAbilities {
    pub turf: String,
    pub dirt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceAbilities {
    pub short: String,
    pub miles: String,
    pub medium: String,
    pub long: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAbilities {
    pub first: String,
    pub half_first: String,
    pub half_last: String,
    pub last: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abilities {
    pub fields: FieldAbilities,
    pub distances: DistanceAbilities,
    pub strategies: StrategyAbilities,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_record_keys() {
        let record = StatusRecord {
            character: "サイレンススズカ".into(),
            params: Parameters::from_array([1200, 800, 900, 400, 600]),
            unique_skill: Skill::new("先頭の景色は譲らない…！", 4),
            skills: vec![Skill::new("コーナー回復○", 0)],
            ..Default::default()
        };
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["params"]["guts"], 400);
        assert_eq!(v["unique_skill"]["level"], 4);
        assert_eq!(v["skills"][0]["name"], "コーナー回復○");
        assert_eq!(v["abilities"]["strategies"]["half_first"], "");
        assert_eq!(v["abilities"]["fields"]["turf"], "");
        assert_eq!(v["rank"], "");
    }

    #[test]
    fn test_support_parameters_order() {
        let p = SupportParameters::from_arrays([1, 2, 3, 4, 5], [10, 20, 30, 40, 50]);
        assert_eq!((p.guts, p.max_wise), (4, 50));
        let v = serde_json::to_value(p).unwrap();
        assert_eq!(v["max_stamina"], 20);
    }
}
