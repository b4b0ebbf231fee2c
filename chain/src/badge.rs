//! Proof-of-completion badge naming and off-chain metadata.

use checkin_types::{Address, DayNumber, HabitName, Lamports, TxSignature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::instruction::metadata::MAX_NAME_LEN;

pub const DEFAULT_SYMBOL: &str = "DCIN";
pub const DEFAULT_METADATA_BASE_URI: &str = "https://rose-smoggy-sparrow-317.mypinata.cloud/ipfs/bafybeibc3tx5ega3646dbmztvmaw3rb4ucssl2iiaz62rrb47nghpb3fau";
pub const DEFAULT_IMAGE_URI: &str = "https://rose-smoggy-sparrow-317.mypinata.cloud/ipfs/bafybeiad5qxyc23qb57xz362sybn5snzla253h355c4rcotjozinsdg5le";
pub const DEFAULT_EXTERNAL_URL: &str = "https://dailycheckin.app";
/// 5%.
pub const DEFAULT_ROYALTY_BASIS_POINTS: u16 = 500;

/// Presentation settings for minted badges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeSettings {
    pub symbol: String,
    /// Per-day JSON lives at `{metadata_base_uri}/day{N}.json`.
    pub metadata_base_uri: String,
    pub image_uri: String,
    pub external_url: String,
    pub royalty_basis_points: u16,
}

impl Default for BadgeSettings {
    fn default() -> Self {
        Self {
            symbol: DEFAULT_SYMBOL.to_string(),
            metadata_base_uri: DEFAULT_METADATA_BASE_URI.to_string(),
            image_uri: DEFAULT_IMAGE_URI.to_string(),
            external_url: DEFAULT_EXTERNAL_URL.to_string(),
            royalty_basis_points: DEFAULT_ROYALTY_BASIS_POINTS,
        }
    }
}

impl BadgeSettings {
    #[must_use]
    pub fn metadata_uri(&self, day: DayNumber) -> String {
        format!("{}/day{day}.json", self.metadata_base_uri.trim_end_matches('/'))
    }
}

/// `Day {N}: {habit}`.
#[must_use]
pub fn badge_name(day: DayNumber, habit: &HabitName) -> String {
    format!("Day {day}: {habit}")
}

#[must_use]
pub fn badge_description(day: DayNumber, habit: &HabitName) -> String {
    format!("Completed day {day} of the 12-day {habit} challenge")
}

/// Cut `name` to at most [`MAX_NAME_LEN`] bytes without splitting a
/// character.
#[must_use]
pub fn on_chain_name(name: &str) -> &str {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut end = MAX_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeAttribute {
    pub trait_type: String,
    pub value: String,
}

impl BadgeAttribute {
    fn new(trait_type: &str, value: impl Into<String>) -> Self {
        Self {
            trait_type: trait_type.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeFile {
    pub uri: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCreator {
    pub address: Address,
    pub share: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeProperties {
    pub files: Vec<BadgeFile>,
    pub category: String,
    pub creators: Vec<BadgeCreator>,
}

/// Off-chain JSON document in the widely used NFT metadata layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeMetadata {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    pub attributes: Vec<BadgeAttribute>,
    pub properties: BadgeProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_fee_basis_points: Option<u16>,
}

/// Inputs that vary per mint.
#[derive(Debug, Clone, Copy)]
pub struct BadgeContext<'a> {
    pub day: DayNumber,
    pub habit: &'a HabitName,
    pub fee: Lamports,
    pub owner: Address,
    pub treasury: Address,
    pub completed_at: DateTime<Utc>,
}

impl BadgeMetadata {
    #[must_use]
    pub fn generate(settings: &BadgeSettings, ctx: &BadgeContext<'_>) -> Self {
        Self {
            name: badge_name(ctx.day, ctx.habit),
            symbol: settings.symbol.clone(),
            description: badge_description(ctx.day, ctx.habit),
            image: settings.image_uri.clone(),
            external_url: Some(settings.external_url.clone()),
            attributes: vec![
                BadgeAttribute::new("Day", ctx.day.to_string()),
                BadgeAttribute::new("Habit", ctx.habit.as_str()),
                BadgeAttribute::new("Mint Fee", ctx.fee.to_string()),
                BadgeAttribute::new("Completed By", ctx.owner.to_string()),
                BadgeAttribute::new(
                    "Completed Date",
                    ctx.completed_at.date_naive().format("%Y-%m-%d").to_string(),
                ),
            ],
            properties: BadgeProperties {
                files: vec![BadgeFile {
                    uri: settings.image_uri.clone(),
                    mime_type: "image/png".to_string(),
                }],
                category: "image".to_string(),
                creators: vec![BadgeCreator {
                    address: ctx.treasury,
                    share: 100,
                }],
            },
            seller_fee_basis_points: Some(settings.royalty_basis_points),
        }
    }
}

/// Record of a badge minted by a confirmed check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintedBadge {
    pub day: DayNumber,
    pub mint_address: Address,
    pub transaction_signature: TxSignature,
    pub minted_at: DateTime<Utc>,
    pub metadata: BadgeMetadata,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn name(s: &str) -> HabitName {
        HabitName::new(s).unwrap()
    }

    #[test]
    fn naming_follows_day_and_habit() {
        let day = DayNumber::new(3).unwrap();
        assert_eq!(badge_name(day, &name("Read")), "Day 3: Read");
        assert_eq!(
            badge_description(day, &name("Read")),
            "Completed day 3 of the 12-day Read challenge"
        );
    }

    #[test]
    fn metadata_uri_per_day() {
        let settings = BadgeSettings {
            metadata_base_uri: "https://x/ipfs/cid/".into(),
            ..BadgeSettings::default()
        };
        assert_eq!(
            settings.metadata_uri(DayNumber::LAST),
            "https://x/ipfs/cid/day12.json"
        );
    }

    #[test]
    fn on_chain_name_truncates_at_char_boundary() {
        assert_eq!(on_chain_name("Day 1: Read"), "Day 1: Read");
        let long = format!("Day 12: {}", "é".repeat(20));
        let cut = on_chain_name(&long);
        assert!(cut.len() <= MAX_NAME_LEN);
        assert!(long.starts_with(cut));
        // "Day 12: " is 8 bytes, each é is 2: 8 + 12 * 2 = 32.
        assert_eq!(cut.len(), 32);
        let odd = format!("Day 1: {}", "é".repeat(20));
        // 7 bytes of prefix leaves an odd remainder; the cut backs off a byte.
        assert_eq!(on_chain_name(&odd).len(), 31);
    }

    #[test]
    fn metadata_document_shape() {
        let habit = name("Read");
        let ctx = BadgeContext {
            day: DayNumber::new(2).unwrap(),
            habit: &habit,
            fee: Lamports::new(16_400_000),
            owner: Address::new([1; 32]),
            treasury: Address::new([2; 32]),
            completed_at: Utc.with_ymd_and_hms(2024, 1, 2, 23, 59, 0).unwrap(),
        };
        let doc = BadgeMetadata::generate(&BadgeSettings::default(), &ctx);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["name"], "Day 2: Read");
        assert_eq!(json["symbol"], "DCIN");
        assert_eq!(json["attributes"][0]["value"], "2");
        assert_eq!(json["attributes"][2]["value"], "0.0164 SOL");
        assert_eq!(json["attributes"][4]["value"], "2024-01-02");
        assert_eq!(json["properties"]["files"][0]["type"], "image/png");
        assert_eq!(json["properties"]["category"], "image");
        assert_eq!(json["properties"]["creators"][0]["share"], 100);
        assert_eq!(json["seller_fee_basis_points"], 500);
    }
}
