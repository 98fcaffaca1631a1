//! Weapon ability parsing: structured records or free rules text into a closed set of modifiers.
//!
//! Parsing is total. Text that matches no known rule is kept as
//! [`AbilityModifier::Unrecognized`] so it can be reported, never dropped.

use crate::dice::{dice_average, parse_threshold};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Melta bonus when a weapon lists "Melta" without a number.
pub const DEFAULT_MELTA_BONUS: u32 = 2;

/// One parsed weapon rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AbilityModifier {
    RerollHits,
    RerollWounds,
    RapidFire(u32),
    SustainedHits(u32),
    LethalHits,
    DevastatingWounds,
    Lance,
    Blast,
    Melta(Option<u32>),
    AntiKeyword { keyword: String, threshold: u8 },
    Heavy,
    Assault,
    TwinLinked,
    Torrent,
    IgnoresCover,
    ExtraAttacks,
    Unrecognized(String),
}

impl AbilityModifier {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, AbilityModifier::Unrecognized(_))
    }
}

impl fmt::Display for AbilityModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbilityModifier::RerollHits => write!(f, "Re-roll Hits"),
            AbilityModifier::RerollWounds => write!(f, "Re-roll Wounds"),
            AbilityModifier::RapidFire(n) => write!(f, "Rapid Fire {n}"),
            AbilityModifier::SustainedHits(n) => write!(f, "Sustained Hits {n}"),
            AbilityModifier::LethalHits => write!(f, "Lethal Hits"),
            AbilityModifier::DevastatingWounds => write!(f, "Devastating Wounds"),
            AbilityModifier::Lance => write!(f, "Lance"),
            AbilityModifier::Blast => write!(f, "Blast"),
            AbilityModifier::Melta(Some(n)) => write!(f, "Melta {n}"),
            AbilityModifier::Melta(None) => write!(f, "Melta"),
            AbilityModifier::AntiKeyword { keyword, threshold } => {
                write!(f, "Anti-{keyword} {threshold}+")
            }
            AbilityModifier::Heavy => write!(f, "Heavy"),
            AbilityModifier::Assault => write!(f, "Assault"),
            AbilityModifier::TwinLinked => write!(f, "Twin-linked"),
            AbilityModifier::Torrent => write!(f, "Torrent"),
            AbilityModifier::IgnoresCover => write!(f, "Ignores Cover"),
            AbilityModifier::ExtraAttacks => write!(f, "Extra Attacks"),
            AbilityModifier::Unrecognized(raw) => write!(f, "{raw}"),
        }
    }
}

/// Ability as supplied by a caller: a structured record or a line of rules text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AbilityInput {
    Record(AbilityRecord),
    Text(String),
}

/// Structured ability record, e.g. `{ "kind": "anti", "value": 4, "target_keyword": "INFANTRY" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityRecord {
    pub kind: String,
    #[serde(default)]
    pub value: Option<u32>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub target_keyword: Option<String>,
}

/// Validate a structured record. Unknown kinds or missing required fields become `Unrecognized`.
pub fn from_record(record: &AbilityRecord) -> AbilityModifier {
    let kind: String = record
        .kind
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    let value = record.value;
    match kind.as_str() {
        "rerollhits" => AbilityModifier::RerollHits,
        "rerollwounds" => AbilityModifier::RerollWounds,
        "rapidfire" => AbilityModifier::RapidFire(value.unwrap_or(1)),
        "sustainedhits" => AbilityModifier::SustainedHits(value.unwrap_or(1)),
        "lethalhits" => AbilityModifier::LethalHits,
        "devastatingwounds" => AbilityModifier::DevastatingWounds,
        "lance" => AbilityModifier::Lance,
        "blast" => AbilityModifier::Blast,
        "melta" => AbilityModifier::Melta(value),
        "anti" | "antikeyword" => {
            let keyword = record
                .target_keyword
                .as_deref()
                .or(record.condition.as_deref())
                .map(|k| k.trim().to_ascii_uppercase())
                .filter(|k| !k.is_empty());
            let threshold = value
                .and_then(|v| u8::try_from(v).ok())
                .filter(|t| (2..=6).contains(t));
            match (keyword, threshold) {
                (Some(keyword), Some(threshold)) => {
                    AbilityModifier::AntiKeyword { keyword, threshold }
                }
                _ => AbilityModifier::Unrecognized(record.kind.clone()),
            }
        }
        "heavy" => AbilityModifier::Heavy,
        "assault" => AbilityModifier::Assault,
        "twinlinked" => AbilityModifier::TwinLinked,
        "torrent" => AbilityModifier::Torrent,
        "ignorescover" => AbilityModifier::IgnoresCover,
        "extraattacks" => AbilityModifier::ExtraAttacks,
        _ => AbilityModifier::Unrecognized(record.kind.clone()),
    }
}

type Build = fn(&regex::Captures<'_>) -> Option<AbilityModifier>;

fn rule(pattern: &str, build: Build) -> (Regex, Build) {
    let re = Regex::new(&format!(r"(?i)^\s*{pattern}\s*$")).expect("static ability pattern compiles");
    (re, build)
}

fn count_value(caps: &regex::Captures<'_>) -> u32 {
    caps.get(1)
        .map(|m| dice_average(m.as_str()).round() as u32)
        .unwrap_or(1)
}

/// Matchers tried in order against each tag; first hit wins.
static MATCHERS: LazyLock<Vec<(Regex, Build)>> = LazyLock::new(|| {
    vec![
        rule(r"rapid[\s-]*fire(?:\s+(\w+))?", |c| {
            Some(AbilityModifier::RapidFire(count_value(c)))
        }),
        rule(r"sustained[\s-]*hits?(?:\s+(\w+))?", |c| {
            Some(AbilityModifier::SustainedHits(count_value(c)))
        }),
        rule(r"anti[\s-]+([a-z][a-z \-]*?)\s+(\d\+?)", |c| {
            let keyword = c.get(1)?.as_str().trim().to_ascii_uppercase();
            let threshold = parse_threshold(c.get(2)?.as_str()).filter(|t| (2..=6).contains(t))?;
            Some(AbilityModifier::AntiKeyword { keyword, threshold })
        }),
        rule(r"blast", |_| Some(AbilityModifier::Blast)),
        rule(r"melta(?:\s+(\d+))?", |c| {
            Some(AbilityModifier::Melta(
                c.get(1).and_then(|m| m.as_str().parse().ok()),
            ))
        }),
        rule(r"devastating[\s-]*wounds?", |_| {
            Some(AbilityModifier::DevastatingWounds)
        }),
        rule(r"lethal[\s-]*hits?", |_| Some(AbilityModifier::LethalHits)),
        rule(r"lance", |_| Some(AbilityModifier::Lance)),
        rule(r"heavy", |_| Some(AbilityModifier::Heavy)),
        rule(r"assault", |_| Some(AbilityModifier::Assault)),
        rule(r"twin[\s-]*linked", |_| Some(AbilityModifier::TwinLinked)),
        rule(r"torrent", |_| Some(AbilityModifier::Torrent)),
        rule(r"ignores?[\s-]*cover", |_| Some(AbilityModifier::IgnoresCover)),
        rule(r"extra[\s-]*attacks?", |_| Some(AbilityModifier::ExtraAttacks)),
        rule(r"re-?roll(?:\s+all)?\s+(?:the\s+)?hit(?:s|\s+rolls?)?", |_| {
            Some(AbilityModifier::RerollHits)
        }),
        rule(r"re-?roll(?:\s+all)?\s+(?:the\s+)?wound(?:s|\s+rolls?)?", |_| {
            Some(AbilityModifier::RerollWounds)
        }),
    ]
});

/// Parse a single tag such as "Rapid Fire 2" or "ANTI-VEHICLE 4+".
pub fn parse_tag(tag: &str) -> AbilityModifier {
    let tag = tag.trim();
    for (re, build) in MATCHERS.iter() {
        if let Some(caps) = re.captures(tag) {
            if let Some(m) = build(&caps) {
                return m;
            }
        }
    }
    AbilityModifier::Unrecognized(tag.to_string())
}

/// Split rules text on commas, semicolons and brackets, parsing each tag.
pub fn parse_text(text: &str) -> Vec<AbilityModifier> {
    let mut out = Vec::new();
    for tag in text.split([',', ';', '[', ']', '\n']) {
        let tag = tag.trim();
        if tag.is_empty() || tag == "-" {
            continue;
        }
        push_unique(&mut out, parse_tag(tag));
    }
    out
}

/// Recognized abilities carried as a bracketed suffix on a display name, e.g. "Chainsword [Extra Attacks]".
pub fn name_tags(name: &str) -> Vec<AbilityModifier> {
    let mut out = Vec::new();
    let mut rest = name;
    while let Some(open) = rest.find('[') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            break;
        };
        for m in parse_text(&after[..close]) {
            if m.is_recognized() {
                push_unique(&mut out, m);
            }
        }
        rest = &after[close + 1..];
    }
    out
}

/// Strip bracketed tags from a display name.
pub fn strip_name_tags(name: &str) -> String {
    match name.find('[') {
        Some(i) => name[..i].trim_end().to_string(),
        None => name.trim().to_string(),
    }
}

/// Normalize a weapon's ability inputs plus any tags on its name.
pub fn normalize(inputs: &[AbilityInput], weapon_name: &str) -> Vec<AbilityModifier> {
    let mut out = Vec::new();
    for input in inputs {
        match input {
            AbilityInput::Record(r) => push_unique(&mut out, from_record(r)),
            AbilityInput::Text(t) => {
                for m in parse_text(t) {
                    push_unique(&mut out, m);
                }
            }
        }
    }
    for m in name_tags(weapon_name) {
        push_unique(&mut out, m);
    }
    out
}

fn push_unique(out: &mut Vec<AbilityModifier>, m: AbilityModifier) {
    if !out.contains(&m) {
        out.push(m);
    }
}
