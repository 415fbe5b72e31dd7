//! Built-in venue attribute catalog.

use super::types::{AttributeDefinition, DataType, Tier};

type Row = (&'static str, &'static str, &'static str, Tier, DataType, &'static str);

const CATALOG: &[Row] = &[
    (
        "rooftop_seating",
        "Rooftop Seating",
        "Dedicated rooftop or terrace seating area.",
        Tier::Tier1,
        DataType::Boolean,
        "true if the venue has a rooftop or terrace area for guests, otherwise false.",
    ),
    (
        "dance_floor",
        "Dance Floor",
        "Permanent dance floor available.",
        Tier::Tier1,
        DataType::Boolean,
        "true when dancing space is permanent or regularly offered (not ad-hoc).",
    ),
    (
        "live_music",
        "Live Music",
        "Regular live music performances.",
        Tier::Tier1,
        DataType::Boolean,
        "true when singers/bands perform live on a recurring schedule.",
    ),
    (
        "music_genres",
        "Music Genres",
        "Primary music styles featured.",
        Tier::Tier1,
        DataType::TagSet,
        "Array of lowercase genres (e.g., [\"bollywood\", \"rock\"]). Omit if unknown.",
    ),
    (
        "outdoor_seating",
        "Outdoor Seating",
        "Outdoor/patio seating.",
        Tier::Tier1,
        DataType::Boolean,
        "true for open-air patio or garden seating.",
    ),
    (
        "craft_beer",
        "Craft Beer / Microbrewery",
        "On-site brewery or craft beer taps.",
        Tier::Tier1,
        DataType::Boolean,
        "true if the venue brews or serves craft beer/microbrew specials.",
    ),
    (
        "stag_entry_policy",
        "Stag Entry Policy",
        "Entry rules for solo/men groups.",
        Tier::Tier1,
        DataType::Text,
        "Short sentence describing rules (e.g., \"Allowed with cover charge\").",
    ),
    (
        "happy_hour_schedule",
        "Happy Hour Schedule",
        "Recurring happy hour timing.",
        Tier::Tier1,
        DataType::Schedule,
        "Object with weekday keys (monday-sunday) each mapping to an array of \
         {\"start\",\"end\",\"label\"}. Only include actual happy hour days.",
    ),
    (
        "cost_for_two_range",
        "Cost for Two Range",
        "Average spend for two people (INR).",
        Tier::Tier1,
        DataType::IntegerRange,
        "{\"min\": number, \"max\": number} in INR. Use the same value for both if only one is known.",
    ),
    (
        "parking_available",
        "Parking Available",
        "Parking availability notes.",
        Tier::Tier1,
        DataType::Boolean,
        "true if on-site or valet parking is available, false otherwise.",
    ),
    (
        "food_quality_rating",
        "Food Quality Rating",
        "Curated 1-5 score for food.",
        Tier::Tier1,
        DataType::Rating,
        "Numeric rating 1-5 (decimals allowed). Omit if insufficient info.",
    ),
    (
        "cover_charge_range",
        "Cover Charge Range",
        "Typical cover charge (INR).",
        Tier::Tier1,
        DataType::IntegerRange,
        "{\"min\": number, \"max\": number} in INR for typical entry cover. Same value for both if fixed.",
    ),
    (
        "floor_count",
        "Number of Floors",
        "Distinct guest-facing levels.",
        Tier::Tier2,
        DataType::Integer,
        "Whole number count of customer-accessible floors. Omit if unknown.",
    ),
    (
        "theme_nights",
        "Theme Nights",
        "Recurring theme night schedule.",
        Tier::Tier2,
        DataType::Schedule,
        "Schedule object like happy hour, labels describe events (e.g., \"Ladies Night\").",
    ),
    (
        "view_type",
        "View Type",
        "Signature view from venue.",
        Tier::Tier2,
        DataType::TagSet,
        "Array of descriptors like [\"cityscape\", \"lake\", \"garden\"].",
    ),
    (
        "couples_entry_policy",
        "Couples Entry Policy",
        "Entry rules for couples.",
        Tier::Tier2,
        DataType::Text,
        "Short sentence, e.g., \"Complimentary entry most nights\".",
    ),
    (
        "free_entry_days",
        "Free Entry Days",
        "Days with waived cover.",
        Tier::Tier2,
        DataType::TagSet,
        "Array of lowercase weekday names (e.g., [\"wednesday\"]) when cover is waived.",
    ),
    (
        "cover_redeemable",
        "Redeemable Cover",
        "Cover charge redeemable on spends.",
        Tier::Tier2,
        DataType::Boolean,
        "true if the entry cover converts to food/drink credit.",
    ),
    (
        "beer_variety",
        "Beer Variety",
        "Available beer styles.",
        Tier::Tier2,
        DataType::TagSet,
        "Array of beer styles such as [\"lager\", \"ipa\", \"stout\"].",
    ),
    (
        "late_night_hours",
        "Operating Hours",
        "Extended operating hours summary.",
        Tier::Tier2,
        DataType::Text,
        "Summarise late-night schedule (e.g., \"Open till 1 AM on weekends\").",
    ),
    (
        "service_quality_rating",
        "Service Quality Rating",
        "Curated 1-5 score for service.",
        Tier::Tier2,
        DataType::Rating,
        "Numeric rating 1-5 (decimals allowed).",
    ),
    (
        "happy_hour_deals",
        "Happy Hour Deals",
        "Types of deals during happy hour.",
        Tier::Tier2,
        DataType::TagSet,
        "Array describing offers like [\"bogo cocktails\", \"2-for-1 beers\"].",
    ),
    (
        "sports_screening",
        "Sports Screening",
        "Live sports screenings.",
        Tier::Tier3,
        DataType::Boolean,
        "true if the venue regularly screens live sports on large displays.",
    ),
    (
        "karaoke",
        "Karaoke Available",
        "Dedicated karaoke setup.",
        Tier::Tier3,
        DataType::Boolean,
        "true when karaoke is available (dedicated room or stage).",
    ),
    (
        "buffet_options",
        "Buffet Options",
        "Buffet offerings.",
        Tier::Tier3,
        DataType::TagSet,
        "Array describing buffet types (e.g., [\"brunch\", \"weekend buffet\"]).",
    ),
    (
        "valet_service",
        "Valet Service",
        "Valet parking availability.",
        Tier::Tier3,
        DataType::Boolean,
        "true if valet parking is provided.",
    ),
    (
        "food_cuisines",
        "Food Cuisines",
        "Cuisine mix served.",
        Tier::Tier3,
        DataType::TagSet,
        "Array of cuisines such as [\"north indian\", \"continental\"].",
    ),
    (
        "crowd_profile",
        "Crowd Profile",
        "Typical age group / vibe.",
        Tier::Tier3,
        DataType::Text,
        "Short descriptor like \"Young professionals\".",
    ),
    (
        "wifi",
        "WiFi Availability",
        "Guest WiFi access.",
        Tier::Tier3,
        DataType::Boolean,
        "true if guest WiFi is offered.",
    ),
];

/// Definitions shipped with the crate, in catalog order.
pub fn builtin_definitions() -> Vec<AttributeDefinition> {
    CATALOG
        .iter()
        .map(|&(code, label, description, tier, data_type, guidance)| {
            AttributeDefinition::new(code, label, tier, data_type)
                .with_description(description)
                .with_guidance(guidance)
        })
        .collect()
}
