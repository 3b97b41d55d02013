use serde::{Deserialize, Serialize};

/// Closed set of user intents. Declaration order is priority order and
/// fixes ties in every classification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Sell,
    Fund,
    Balance,
    Card,
    Rates,
    Kyc,
    Activate,
    Help,
}

/// Keyword table consumed by the classifier. One row per intent; adding
/// a keyword here is the only change needed to extend matching.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (Intent::Greeting, &["hi", "hello", "hey", "start", "menu", "main menu"]),
    (Intent::Sell, &["sell", "sell crypto", "off-ramp"]),
    (Intent::Fund, &["fund", "deposit", "top up", "add funds"]),
    (Intent::Balance, &["balance", "check balance"]),
    (Intent::Card, &["card", "my card"]),
    (Intent::Rates, &["rates", "rate", "price", "view rates"]),
    (Intent::Kyc, &["kyc", "verify", "verification"]),
    (Intent::Activate, &["activate", "activation"]),
    (Intent::Help, &["help", "support"]),
];

/// Minimum normalized similarity for the fuzzy fallback pass.
const FUZZY_THRESHOLD: f64 = 0.85;

/// Map free-form text to an intent, or `None` if nothing matches.
///
/// Three ordered passes over the keyword table: exact match, substring
/// containment, then a Jaro-Winkler fuzzy fallback. Empty input counts
/// as a greeting so a bare ping still gets the menu.
pub fn classify(text: &str) -> Option<Intent> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return Some(Intent::Greeting);
    }

    for (intent, keywords) in INTENT_KEYWORDS {
        if keywords.iter().any(|k| *k == text) {
            return Some(*intent);
        }
    }

    for (intent, keywords) in INTENT_KEYWORDS {
        if keywords.iter().any(|k| text.contains(k)) {
            return Some(*intent);
        }
    }

    let mut best: Option<(Intent, f64)> = None;
    for (intent, keywords) in INTENT_KEYWORDS {
        for keyword in *keywords {
            let score = strsim::jaro_winkler(&text, keyword);
            if score >= FUZZY_THRESHOLD && best.is_none_or(|(_, b)| score > b) {
                best = Some((*intent, score));
            }
        }
    }
    best.map(|(intent, _)| intent)
}
