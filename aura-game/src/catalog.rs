//! Static definitions: achievements, daily challenge templates, power-ups
//! and the rank ladder. Nothing here changes at runtime.
use chrono::NaiveDate;
use std::fmt;

use crate::constants::{
    CHALLENGE_AURA, CHALLENGE_RISKS, CHALLENGE_SCENARIOS, CHALLENGE_STREAK, DAILY_CHALLENGE_COUNT,
};
use crate::records::{DailyChallenge, GameStats, PowerUp, PowerUpEffect};

/// Counter of [`GameStats`] an achievement condition reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    TotalAuraGained,
    TotalAuraLost,
    TotalDecisions,
    RisksTaken,
    RisksWon,
    WildChoices,
    SafeChoices,
    Timeouts,
    HighestStreak,
    TotalGamesPlayed,
    ConsecutiveDays,
}

impl StatField {
    #[must_use]
    pub const fn read(self, stats: &GameStats) -> u64 {
        match self {
            Self::TotalAuraGained => stats.total_aura_gained,
            Self::TotalAuraLost => stats.total_aura_lost,
            Self::TotalDecisions => stats.total_decisions,
            Self::RisksTaken => stats.risks_taken,
            Self::RisksWon => stats.risks_won,
            Self::WildChoices => stats.wild_choices,
            Self::SafeChoices => stats.safe_choices,
            Self::Timeouts => stats.timeouts,
            Self::HighestStreak => stats.highest_streak,
            Self::TotalGamesPlayed => stats.total_games_played,
            Self::ConsecutiveDays => stats.consecutive_days,
        }
    }
}

/// One comparison against a stat counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    AtLeast(StatField, u64),
    Equals(StatField, u64),
}

impl Condition {
    #[must_use]
    pub const fn holds(self, stats: &GameStats) -> bool {
        match self {
            Self::AtLeast(field, threshold) => field.read(stats) >= threshold,
            Self::Equals(field, value) => field.read(stats) == value,
        }
    }
}

/// Catalog entry for an achievement. Every condition must hold to unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementDef {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub conditions: &'static [Condition],
}

impl AchievementDef {
    #[must_use]
    pub fn is_met(&self, stats: &GameStats) -> bool {
        self.conditions.iter().all(|c| c.holds(stats))
    }
}

use Condition::{AtLeast, Equals};
use StatField::{
    ConsecutiveDays, HighestStreak, RisksTaken, RisksWon, SafeChoices, Timeouts, TotalAuraGained,
    TotalAuraLost, TotalDecisions, TotalGamesPlayed, WildChoices,
};

pub const ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        id: "first_blood",
        title: "FIRST BLOOD",
        description: "Complete your first scenario",
        icon: "🎯",
        conditions: &[AtLeast(TotalDecisions, 1)],
    },
    AchievementDef {
        id: "main_character",
        title: "MAIN CHARACTER UNLOCKED",
        description: "Reach Main Character rank",
        icon: "⭐",
        conditions: &[AtLeast(TotalAuraGained, 5_000)],
    },
    AchievementDef {
        id: "risk_taker",
        title: "RISK TAKER",
        description: "Choose RISK 10 times",
        icon: "⚠️",
        conditions: &[AtLeast(RisksTaken, 10)],
    },
    AchievementDef {
        id: "gambling_addiction",
        title: "GAMBLING ADDICTION",
        description: "Choose RISK 50 times",
        icon: "🎰",
        conditions: &[AtLeast(RisksTaken, 50)],
    },
    AchievementDef {
        id: "lucky_charm",
        title: "LUCKY CHARM",
        description: "Win 5 RISK choices",
        icon: "🍀",
        conditions: &[AtLeast(RisksWon, 5)],
    },
    AchievementDef {
        id: "chaos_agent",
        title: "CHAOS AGENT",
        description: "Choose WILD 20 times",
        icon: "✨",
        conditions: &[AtLeast(WildChoices, 20)],
    },
    AchievementDef {
        id: "speedrunner",
        title: "SPEEDRUNNER",
        description: "Complete 10 scenarios without timeout",
        icon: "⚡",
        conditions: &[AtLeast(TotalDecisions, 10), Equals(Timeouts, 0)],
    },
    AchievementDef {
        id: "streak_god",
        title: "STREAK GOD",
        description: "Reach a 10 streak",
        icon: "🔥",
        conditions: &[AtLeast(HighestStreak, 10)],
    },
    AchievementDef {
        id: "grinder",
        title: "GRINDER",
        description: "Play 10 games",
        icon: "💪",
        conditions: &[AtLeast(TotalGamesPlayed, 10)],
    },
    AchievementDef {
        id: "no_life",
        title: "NO LIFE",
        description: "Play 50 games",
        icon: "🎮",
        conditions: &[AtLeast(TotalGamesPlayed, 50)],
    },
    AchievementDef {
        id: "dedication",
        title: "DEDICATION",
        description: "Play 3 days in a row",
        icon: "📅",
        conditions: &[AtLeast(ConsecutiveDays, 3)],
    },
    AchievementDef {
        id: "addiction",
        title: "ADDICTION",
        description: "Play 7 days in a row",
        icon: "🔗",
        conditions: &[AtLeast(ConsecutiveDays, 7)],
    },
    AchievementDef {
        id: "sigma_grindset",
        title: "SIGMA GRINDSET",
        description: "Reach SIGMA rank",
        icon: "🗿",
        conditions: &[AtLeast(TotalAuraGained, 20_000)],
    },
    AchievementDef {
        id: "gigachad",
        title: "GIGACHAD",
        description: "Reach GIGACHAD rank",
        icon: "💎",
        conditions: &[AtLeast(TotalAuraGained, 50_000)],
    },
    AchievementDef {
        id: "eldritch",
        title: "ELDRITCH ASCENSION",
        description: "Reach ELDRITCH GOD rank",
        icon: "👁️",
        conditions: &[AtLeast(TotalAuraGained, 100_000)],
    },
    AchievementDef {
        id: "safe_player",
        title: "PLAY IT SAFE",
        description: "Choose SAFE 30 times",
        icon: "🛡️",
        conditions: &[AtLeast(SafeChoices, 30)],
    },
    AchievementDef {
        id: "survivor",
        title: "SURVIVOR",
        description: "Complete a game without going negative",
        icon: "🏆",
        conditions: &[Equals(TotalAuraLost, 0), AtLeast(TotalDecisions, 10)],
    },
];

/// Look up an achievement definition by id.
#[must_use]
pub fn achievement_def(id: &str) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|def| def.id == id)
}

/// Template a day's challenge set is stamped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeTemplate {
    pub id: &'static str,
    pub description: &'static str,
    pub target: u64,
    pub reward: i64,
}

pub const CHALLENGE_TEMPLATES: &[ChallengeTemplate] = &[
    ChallengeTemplate {
        id: CHALLENGE_SCENARIOS,
        description: "Complete 10 scenarios",
        target: 10,
        reward: 500,
    },
    ChallengeTemplate {
        id: CHALLENGE_STREAK,
        description: "Reach a 5 streak",
        target: 5,
        reward: 1_000,
    },
    ChallengeTemplate {
        id: CHALLENGE_AURA,
        description: "Gain 2000 total Aura",
        target: 2_000,
        reward: 800,
    },
    ChallengeTemplate {
        id: CHALLENGE_RISKS,
        description: "Win 3 RISK choices",
        target: 3,
        reward: 1_500,
    },
];

/// Format a date the way challenge ids and `lastPlayedDate` carry it.
#[must_use]
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Fresh, zero-progress challenges for `date`.
///
/// Every day issues the leading templates in catalog order; only the date
/// stamp changes.
#[must_use]
pub fn generate_daily_challenges(date: NaiveDate) -> Vec<DailyChallenge> {
    let day = iso_date(date);
    CHALLENGE_TEMPLATES
        .iter()
        .take(DAILY_CHALLENGE_COUNT)
        .map(|tpl| DailyChallenge {
            id: format!("{}_{day}", tpl.id),
            description: tpl.description.to_string(),
            target: tpl.target,
            progress: 0,
            reward: tpl.reward,
            completed: false,
            date: day.clone(),
        })
        .collect()
}

/// Starting power-up inventory.
#[must_use]
pub fn default_power_ups() -> Vec<PowerUp> {
    vec![
        PowerUp {
            id: "shield".to_string(),
            name: "SHIELD".to_string(),
            description: "Protect from next negative outcome".to_string(),
            icon: "🛡️".to_string(),
            count: 1,
            effect: PowerUpEffect::NegateLoss,
        },
        PowerUp {
            id: "multiplier".to_string(),
            name: "2X MULTIPLIER".to_string(),
            description: "Double next Aura gain".to_string(),
            icon: "✨".to_string(),
            count: 1,
            effect: PowerUpEffect::DoubleGain,
        },
        PowerUp {
            id: "reroll".to_string(),
            name: "REROLL".to_string(),
            description: "Get a new scenario".to_string(),
            icon: "🔄".to_string(),
            count: 1,
            effect: PowerUpEffect::RerollScenario,
        },
    ]
}

/// Display label derived from an aura amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    Canceled,
    CringeLord,
    LMan,
    Npc,
    SideCharacter,
    MainCharacter,
    Sigma,
    Gigachad,
    EldritchGod,
}

impl Rank {
    #[must_use]
    pub const fn for_aura(aura: i64) -> Self {
        match aura {
            i64::MIN..=-20_000 => Self::Canceled,
            -19_999..=-5_000 => Self::CringeLord,
            -4_999..=-1 => Self::LMan,
            0..=999 => Self::Npc,
            1_000..=4_999 => Self::SideCharacter,
            5_000..=19_999 => Self::MainCharacter,
            20_000..=49_999 => Self::Sigma,
            50_000..=99_999 => Self::Gigachad,
            _ => Self::EldritchGod,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Canceled => "CANCELED",
            Self::CringeLord => "CRINGE LORD",
            Self::LMan => "L MAN",
            Self::Npc => "NPC",
            Self::SideCharacter => "SIDE CHARACTER",
            Self::MainCharacter => "MAIN CHARACTER",
            Self::Sigma => "SIGMA",
            Self::Gigachad => "GIGACHAD",
            Self::EldritchGod => "ELDRITCH GOD",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
