pub mod reply;

use crate::intent::Intent;
use crate::session::{DialogState, Session};
use crate::types::UserProfile;

/// Coins offered in the sell flow.
pub const COIN_CHOICES: &[&str] = &["usdt", "btc"];

/// Funding methods offered in the funding flow.
pub const FUNDING_CHOICES: &[&str] = &["bank transfer", "crypto deposit"];

/// What the dispatcher decided to do in response to an inbound message.
///
/// `Activate` asks the pipeline to run the single account mutation;
/// `Activated` and `TryAgainLater` are produced by the pipeline itself
/// from the mutation outcome, never by `transition`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ShowMenu,
    UnknownInput,
    RegistrationRequired,
    VerificationRequired,
    PromptCoinChoice,
    RepromptCoinChoice,
    CoinSelected { coin: String },
    PromptFundingChoice,
    RepromptFundingChoice,
    FundingSelected { method: String },
    AlreadyFunded,
    Activate,
    Activated,
    AlreadyActivated,
    KycPending,
    KycComplete,
    BalanceReport,
    CardStatus,
    RatesReport,
    HelpMessage,
    TryAgainLater,
}

fn match_choice(input: &str, choices: &[&str]) -> Option<String> {
    let input = input.trim().to_lowercase();
    choices
        .iter()
        .find(|c| **c == input || input.contains(*c))
        .map(|c| c.to_string())
}

/// Decide the next session state and the action to take.
///
/// Pure: identical inputs always produce identical outputs. `profile`
/// is `None` for an unregistered sender; an unreachable account service
/// never gets this far (the pipeline short-circuits it).
pub fn transition(
    session: &Session,
    intent: Option<Intent>,
    input: &str,
    profile: Option<&UserProfile>,
) -> (Session, Action) {
    let mut next = session.clone();

    // A pending choice consumes its expected options before any intent.
    match session.state {
        DialogState::AwaitingCoinChoice => {
            if let Some(coin) = match_choice(input, COIN_CHOICES) {
                next.state = DialogState::Idle;
                next.context.insert("coin".to_string(), coin.clone());
                return (next, Action::CoinSelected { coin });
            }
            if intent.is_none() {
                return (next, Action::RepromptCoinChoice);
            }
        }
        DialogState::AwaitingFundingChoice => {
            if let Some(method) = match_choice(input, FUNDING_CHOICES) {
                next.state = DialogState::Idle;
                next.context
                    .insert("funding_method".to_string(), method.clone());
                return (next, Action::FundingSelected { method });
            }
            if intent.is_none() {
                return (next, Action::RepromptFundingChoice);
            }
        }
        DialogState::AwaitingRegistration => {
            // Registration observed out of band: continue with a clean slate.
            if profile.is_some() {
                next.reset();
            }
        }
        DialogState::AwaitingKyc => {
            if profile.is_some_and(|p| p.kyc_basic_completed) {
                next.state = DialogState::Idle;
            }
        }
        DialogState::Idle => {}
    }

    let Some(intent) = intent else {
        return (next, Action::UnknownInput);
    };

    match intent {
        Intent::Greeting => {
            next.reset();
            (next, Action::ShowMenu)
        }
        Intent::Sell => match profile {
            None => {
                next.state = DialogState::AwaitingRegistration;
                (next, Action::RegistrationRequired)
            }
            Some(p) if !p.kyc_basic_completed => (next, Action::VerificationRequired),
            Some(_) => {
                next.state = DialogState::AwaitingCoinChoice;
                (next, Action::PromptCoinChoice)
            }
        },
        Intent::Fund => match profile {
            None => {
                next.state = DialogState::AwaitingRegistration;
                (next, Action::RegistrationRequired)
            }
            Some(p) if !p.kyc_basic_completed => (next, Action::VerificationRequired),
            Some(p) if p.funding_completed => (next, Action::AlreadyFunded),
            Some(_) => {
                next.state = DialogState::AwaitingFundingChoice;
                (next, Action::PromptFundingChoice)
            }
        },
        Intent::Activate => match profile {
            None => {
                next.state = DialogState::AwaitingRegistration;
                (next, Action::RegistrationRequired)
            }
            Some(p) if !p.kyc_basic_completed => (next, Action::VerificationRequired),
            // Effect already reflected in the profile: do not mutate again.
            Some(p) if p.card_issued => (next, Action::AlreadyActivated),
            Some(_) => (next, Action::Activate),
        },
        Intent::Balance => match profile {
            None => (next, Action::RegistrationRequired),
            Some(_) => (next, Action::BalanceReport),
        },
        Intent::Card => match profile {
            None => (next, Action::RegistrationRequired),
            Some(_) => (next, Action::CardStatus),
        },
        Intent::Rates => (next, Action::RatesReport),
        Intent::Kyc => match profile {
            None => (next, Action::RegistrationRequired),
            Some(p) if p.kyc_basic_completed => (next, Action::KycComplete),
            Some(_) => {
                next.state = DialogState::AwaitingKyc;
                (next, Action::KycPending)
            }
        },
        Intent::Help => (next, Action::HelpMessage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::classify;

    fn registered(kyc: bool) -> UserProfile {
        UserProfile {
            registered: true,
            kyc_basic_completed: kyc,
            ..Default::default()
        }
    }

    fn dispatch(
        session: &Session,
        text: &str,
        profile: Option<&UserProfile>,
    ) -> (Session, Action) {
        transition(session, classify(text), text, profile)
    }

    #[test]
    fn test_greeting_resets_session() {
        let mut session = Session::new();
        session.state = DialogState::AwaitingCoinChoice;
        session.context.insert("coin".into(), "btc".into());

        let (next, action) = dispatch(&session, "hi", Some(&registered(true)));
        assert_eq!(action, Action::ShowMenu);
        assert_eq!(next.state, DialogState::Idle);
        assert!(next.context.is_empty());
    }

    #[test]
    fn test_sell_without_kyc_leaves_state_unchanged() {
        let session = Session::new();
        let (next, action) = dispatch(&session, "sell", Some(&registered(false)));
        assert_eq!(action, Action::VerificationRequired);
        assert_eq!(next.state, DialogState::Idle);
    }

    #[test]
    fn test_sell_unregistered_prompts_registration() {
        let session = Session::new();
        let (next, action) = dispatch(&session, "sell", None);
        assert_eq!(action, Action::RegistrationRequired);
        assert_eq!(next.state, DialogState::AwaitingRegistration);
    }

    #[test]
    fn test_sell_eligible_advances_to_coin_choice() {
        let session = Session::new();
        let (next, action) = dispatch(&session, "sell", Some(&registered(true)));
        assert_eq!(action, Action::PromptCoinChoice);
        assert_eq!(next.state, DialogState::AwaitingCoinChoice);
    }

    #[test]
    fn test_coin_choice_consumed() {
        let mut session = Session::new();
        session.state = DialogState::AwaitingCoinChoice;

        let (next, action) = dispatch(&session, "usdt", Some(&registered(true)));
        assert_eq!(
            action,
            Action::CoinSelected {
                coin: "usdt".into()
            }
        );
        assert_eq!(next.state, DialogState::Idle);
        assert_eq!(next.context.get("coin").map(String::as_str), Some("usdt"));
    }

    #[test]
    fn test_coin_choice_garbage_reprompts() {
        let mut session = Session::new();
        session.state = DialogState::AwaitingCoinChoice;

        let (next, action) = dispatch(&session, "qqqqzzzz", Some(&registered(true)));
        assert_eq!(action, Action::RepromptCoinChoice);
        assert_eq!(next.state, DialogState::AwaitingCoinChoice);
    }

    #[test]
    fn test_reactive_intent_keeps_pending_choice() {
        let mut session = Session::new();
        session.state = DialogState::AwaitingCoinChoice;

        let (next, action) = dispatch(&session, "balance", Some(&registered(true)));
        assert_eq!(action, Action::BalanceReport);
        assert_eq!(next.state, DialogState::AwaitingCoinChoice);
    }

    #[test]
    fn test_fund_already_funded_is_informational() {
        let profile = UserProfile {
            registered: true,
            kyc_basic_completed: true,
            funding_completed: true,
            ..Default::default()
        };
        let session = Session::new();
        let (next, action) = dispatch(&session, "fund", Some(&profile));
        assert_eq!(action, Action::AlreadyFunded);
        assert_eq!(next.state, DialogState::Idle);
    }

    #[test]
    fn test_fund_eligible_advances() {
        let session = Session::new();
        let (next, action) = dispatch(&session, "fund", Some(&registered(true)));
        assert_eq!(action, Action::PromptFundingChoice);
        assert_eq!(next.state, DialogState::AwaitingFundingChoice);
    }

    #[test]
    fn test_funding_choice_consumed() {
        let mut session = Session::new();
        session.state = DialogState::AwaitingFundingChoice;

        let (next, action) = dispatch(&session, "bank transfer", Some(&registered(true)));
        assert_eq!(
            action,
            Action::FundingSelected {
                method: "bank transfer".into()
            }
        );
        assert_eq!(next.state, DialogState::Idle);
        assert_eq!(
            next.context.get("funding_method").map(String::as_str),
            Some("bank transfer")
        );
    }

    #[test]
    fn test_activate_already_issued_does_not_mutate() {
        let profile = UserProfile {
            registered: true,
            kyc_basic_completed: true,
            card_issued: true,
            ..Default::default()
        };
        let session = Session::new();
        let (_, action) = dispatch(&session, "activate", Some(&profile));
        assert_eq!(action, Action::AlreadyActivated);
    }

    #[test]
    fn test_activate_eligible_requests_mutation() {
        let session = Session::new();
        let (_, action) = dispatch(&session, "activate", Some(&registered(true)));
        assert_eq!(action, Action::Activate);
    }

    #[test]
    fn test_kyc_flow() {
        let session = Session::new();
        let (next, action) = dispatch(&session, "kyc", Some(&registered(false)));
        assert_eq!(action, Action::KycPending);
        assert_eq!(next.state, DialogState::AwaitingKyc);

        // Next message observes KYC completed and exits the waiting state.
        let (next2, action2) = dispatch(&next, "balance", Some(&registered(true)));
        assert_eq!(action2, Action::BalanceReport);
        assert_eq!(next2.state, DialogState::Idle);
    }

    #[test]
    fn test_registration_observed_exits_waiting_state() {
        let mut session = Session::new();
        session.state = DialogState::AwaitingRegistration;

        let (next, action) = dispatch(&session, "sell", Some(&registered(true)));
        assert_eq!(action, Action::PromptCoinChoice);
        assert_eq!(next.state, DialogState::AwaitingCoinChoice);
    }

    #[test]
    fn test_unknown_intent_leaves_state_unchanged() {
        let session = Session::new();
        let (next, action) = dispatch(&session, "qqqqzzzz", Some(&registered(true)));
        assert_eq!(action, Action::UnknownInput);
        assert_eq!(next.state, DialogState::Idle);
    }

    #[test]
    fn test_balance_unregistered_stays_idle() {
        let session = Session::new();
        let (next, action) = dispatch(&session, "balance", None);
        assert_eq!(action, Action::RegistrationRequired);
        assert_eq!(next.state, DialogState::Idle);
    }
}
