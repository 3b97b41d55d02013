use super::Action;
use crate::types::{ButtonOption, OutboundMessage, UserProfile};

// Quoted rates, pending a live price feed integration.
const USDT_RATE_NGN: f64 = 1455.0;
const BTC_RATE_NGN: f64 = 78_000_000.0;

fn opt(id: &str, label: &str) -> ButtonOption {
    ButtonOption::new(id, label)
}

fn menu_options() -> Vec<ButtonOption> {
    vec![
        opt("sell", "💰 Sell Crypto"),
        opt("balance", "📊 Check Balance"),
        opt("rates", "💱 View Rates"),
    ]
}

fn thousands(n: f64) -> String {
    let whole = n.trunc() as i64;
    let digits = whole.abs().to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if whole < 0 {
        format!("-{out}")
    } else {
        out
    }
}

/// Render the dispatcher's decision into a concrete outbound message.
///
/// Wording lives here and only here; the state machine never formats
/// text. `registration_url` comes from configuration.
pub fn render(
    action: &Action,
    profile: Option<&UserProfile>,
    recipient: &str,
    registration_url: &str,
) -> OutboundMessage {
    match action {
        Action::ShowMenu => OutboundMessage::buttons(
            recipient,
            "👋 *Welcome to Toki!*\n\nYour trusted partner for crypto off-ramping.\n\nSelect an option below to get started:",
            menu_options(),
        ),
        Action::UnknownInput => OutboundMessage::buttons(
            recipient,
            "🤔 I didn't understand that.\n\nType *menu* to see what I can do.",
            vec![
                opt("sell", "💰 Sell Crypto"),
                opt("rates", "💱 View Rates"),
                opt("help", "❓ Help"),
            ],
        ),
        Action::RegistrationRequired => OutboundMessage::text(
            recipient,
            format!(
                "🎉 *Welcome to Toki!*\n\nCreate your account in 2 minutes to get started:\n\n{registration_url}?phone={recipient}"
            ),
        ),
        Action::VerificationRequired => OutboundMessage::text(
            recipient,
            "⚠️ *Verification required*\n\nPlease complete the previous onboarding step first. Type *kyc* to check your status.",
        ),
        Action::PromptCoinChoice => OutboundMessage::buttons(
            recipient,
            "💰 *Ready to sell your crypto!*\n\nWhich coin are you selling today?",
            vec![opt("usdt", "USDT"), opt("btc", "BTC")],
        ),
        Action::RepromptCoinChoice => OutboundMessage::buttons(
            recipient,
            "Please pick one of the coins below:",
            vec![opt("usdt", "USDT"), opt("btc", "BTC")],
        ),
        Action::CoinSelected { coin } => OutboundMessage::text(
            recipient,
            format!(
                "✅ You're selling *{}*. We'll send your deposit instructions next.",
                coin.to_uppercase()
            ),
        ),
        Action::PromptFundingChoice => OutboundMessage::buttons(
            recipient,
            "💳 How would you like to fund your account?",
            vec![
                opt("bank_transfer", "🏦 Bank Transfer"),
                opt("crypto_deposit", "🪙 Crypto Deposit"),
            ],
        ),
        Action::RepromptFundingChoice => OutboundMessage::buttons(
            recipient,
            "Please pick one of the funding methods below:",
            vec![
                opt("bank_transfer", "🏦 Bank Transfer"),
                opt("crypto_deposit", "🪙 Crypto Deposit"),
            ],
        ),
        Action::FundingSelected { method } => OutboundMessage::text(
            recipient,
            format!("✅ Funding via *{method}* it is. We'll walk you through it now."),
        ),
        Action::AlreadyFunded => OutboundMessage::text(
            recipient,
            "✅ Your account is already funded. Type *activate* to activate your card.",
        ),
        // The pipeline resolves Activate into Activated or TryAgainLater
        // before rendering; falling through here just restates the menu.
        Action::Activate => OutboundMessage::buttons(
            recipient,
            "One moment while we activate your card…",
            menu_options(),
        ),
        Action::Activated => OutboundMessage::text(
            recipient,
            "💳 *Your card is now active!*\n\nType *card* anytime to check its status.",
        ),
        Action::AlreadyActivated => OutboundMessage::text(
            recipient,
            "💳 Your card is already active. Type *card* to check its status.",
        ),
        Action::KycPending => OutboundMessage::text(
            recipient,
            "🔍 Your KYC verification is in progress. You'll get notified once it's approved.",
        ),
        Action::KycComplete => OutboundMessage::text(
            recipient,
            "✅ KYC complete! Type *activate* to continue.",
        ),
        Action::BalanceReport => {
            let p = profile.cloned().unwrap_or_default();
            let remaining = (p.daily_limit - p.daily_limit_used).max(0.0);
            OutboundMessage::buttons(
                recipient,
                format!(
                    "💰 *Your Balance*\n\n₦{}\n\n📊 *Daily Limit*\nRemaining: ₦{}\nTotal: ₦{}",
                    thousands(p.balance),
                    thousands(remaining),
                    thousands(p.daily_limit)
                ),
                vec![opt("sell", "💰 Sell Crypto"), opt("rates", "💱 View Rates")],
            )
        }
        Action::CardStatus => {
            let issued = profile.is_some_and(|p| p.card_issued);
            let content = if issued {
                "💳 Your card is active and ready to use."
            } else {
                "💳 No card yet. Type *activate* once KYC and funding are complete."
            };
            OutboundMessage::text(recipient, content)
        }
        Action::RatesReport => OutboundMessage::buttons(
            recipient,
            format!(
                "💱 *Toki Live Rates*\n\n1 USDT = ₦{} _(You Receive)_\n1 BTC = ₦{} _(You Receive)_\n\n💡 Rates include our processing fee",
                thousands(USDT_RATE_NGN),
                thousands(BTC_RATE_NGN)
            ),
            vec![opt("sell", "💰 Sell Now"), opt("menu", "🏠 Main Menu")],
        ),
        Action::HelpMessage => OutboundMessage::buttons(
            recipient,
            "❓ *Need Help?*\n\n• Type *sell* to sell crypto\n• Type *balance* to check balance\n• Type *rates* to view rates\n• Type *menu* for the main menu",
            vec![opt("menu", "🏠 Main Menu")],
        ),
        Action::TryAgainLater => OutboundMessage::text(
            recipient,
            "⚠️ We're having trouble reaching your account right now. Please try again in a moment.",
        ),
    }
}

/// Out-of-session notification once a KYC review is approved.
pub fn kyc_approved(recipient: &str) -> OutboundMessage {
    OutboundMessage::template(recipient, "kyc_approved")
}

/// Out-of-session notification once a card payment is confirmed.
pub fn payment_confirmed(recipient: &str) -> OutboundMessage {
    OutboundMessage::template(recipient, "card_activated")
}
