use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The seven stage-tracked stats. HP never carries a stage.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum StatKind {
    Attack,
    Defense,
    #[strum(to_string = "Special Attack", serialize = "SpecialAttack")]
    SpecialAttack,
    #[strum(to_string = "Special Defense", serialize = "SpecialDefense")]
    SpecialDefense,
    Speed,
    Accuracy,
    Evasion,
}

impl StatKind {
    pub const COMBAT: [StatKind; 5] = [
        StatKind::Attack,
        StatKind::Defense,
        StatKind::SpecialAttack,
        StatKind::SpecialDefense,
        StatKind::Speed,
    ];

    pub const ALL: [StatKind; 7] = [
        StatKind::Attack,
        StatKind::Defense,
        StatKind::SpecialAttack,
        StatKind::SpecialDefense,
        StatKind::Speed,
        StatKind::Accuracy,
        StatKind::Evasion,
    ];

    /// Accuracy and evasion use their own stage formula.
    pub fn is_accuracy_class(self) -> bool {
        matches!(self, StatKind::Accuracy | StatKind::Evasion)
    }
}

#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Weather {
    #[default]
    Clear,
    Rain,
    Sunny,
    Sandstorm,
    Hail,
    Snow,
    Fog,
}

#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Display,
    EnumIter,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Terrain {
    #[default]
    Normal,
    Electric,
    Grassy,
    Misty,
    Psychic,
}

/// Entry hazards laid on one side of the field.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter,
)]
pub enum Hazard {
    Spikes,
    StealthRock,
    ToxicSpikes,
    StickyWeb,
}

impl Hazard {
    pub fn max_layers(self) -> u8 {
        match self {
            Hazard::Spikes => 3,
            Hazard::ToxicSpikes => 2,
            Hazard::StealthRock | Hazard::StickyWeb => 1,
        }
    }
}

impl std::fmt::Display for Hazard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let display_name = match self {
            Hazard::Spikes => "Spikes",
            Hazard::StealthRock => "Stealth Rock",
            Hazard::ToxicSpikes => "Toxic Spikes",
            Hazard::StickyWeb => "Sticky Web",
        };
        write!(f, "{}", display_name)
    }
}

/// Timed conditions that protect or boost a whole side.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SideCondition {
    Reflect,
    LightScreen,
    AuroraVeil,
    Safeguard,
    Mist,
    Tailwind,
    LuckyChant,
}

impl std::fmt::Display for SideCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let display_name = match self {
            SideCondition::Reflect => "Reflect",
            SideCondition::LightScreen => "Light Screen",
            SideCondition::AuroraVeil => "Aurora Veil",
            SideCondition::Safeguard => "Safeguard",
            SideCondition::Mist => "Mist",
            SideCondition::Tailwind => "Tailwind",
            SideCondition::LuckyChant => "Lucky Chant",
        };
        write!(f, "{}", display_name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum MoveCategory {
    Physical,
    Special,
    Status,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn is_opposite(self, other: Gender) -> bool {
        self != other
    }
}
