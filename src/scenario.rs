//! Purpose: Run scripted ad scenarios against the simulated plugin.
//! Exports: `Scenario`, `Step`, `ScenarioReport`, `run_scenario`.
//! Role: Backing logic for `adslot simulate`.
//! Invariants: Steps execute strictly in order; each awaits completion before the next.
//! Invariants: The report lists plugin calls in the order they were issued.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use adslot::api::{
    AdService, AdStateSnapshot, CallKind, ConsentInfo, Error, ErrorKind, Host, InitOptions,
    PluginCall, Reward, ServiceConfig, SimulatedPlugin, SlotConfig,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Scenario {
    #[serde(default = "default_host")]
    pub host: Host,
    #[serde(default)]
    pub slots: HashMap<String, SlotConfig>,
    #[serde(default)]
    pub failures: Vec<InjectedFailure>,
    #[serde(default)]
    pub consent: Option<ConsentInfo>,
    #[serde(default)]
    pub reward: Option<Reward>,
    #[serde(default = "default_preload_delay_ms")]
    pub preload_delay_ms: u64,
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InjectedFailure {
    pub call: CallKind,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Initialize {
        #[serde(default)]
        options: InitOptions,
    },
    DefineSlot {
        id: String,
        slot: SlotConfig,
    },
    Show {
        slot: String,
        #[serde(default)]
        testing: Option<bool>,
    },
    Hide {
        slot: String,
    },
    Remove {
        slot: String,
    },
    Trigger {
        slot: String,
        #[serde(default)]
        testing: Option<bool>,
    },
    TriggerRewarded {
        slot: String,
        #[serde(default)]
        testing: Option<bool>,
    },
    PrepareInterstitial {
        slot: String,
        #[serde(default)]
        testing: Option<bool>,
    },
    SetAdsRemoved {
        removed: bool,
    },
    Fail {
        call: CallKind,
        message: String,
    },
    Recover {
        call: CallKind,
    },
    WaitMs {
        ms: u64,
    },
}

#[derive(Debug, Serialize)]
pub struct RewardOutcome {
    pub step: usize,
    pub slot: String,
    pub reward: Option<Reward>,
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub calls: Vec<PluginCall>,
    pub rewards: Vec<RewardOutcome>,
    pub state: AdStateSnapshot,
}

fn default_host() -> Host {
    Host::Native
}

fn default_preload_delay_ms() -> u64 {
    1000
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid scenario: {err}"))
                .with_hint("A scenario is an object with \"steps\": [{ \"op\": \"initialize\" }, ...].")
                .with_source(err)
        })
    }
}

pub async fn run_scenario(scenario: Scenario) -> ScenarioReport {
    let plugin = Arc::new(SimulatedPlugin::new());
    for failure in scenario.failures {
        plugin.fail(failure.call, failure.message);
    }
    if let Some(consent) = scenario.consent {
        plugin.set_consent(consent);
    }
    if let Some(reward) = scenario.reward {
        plugin.set_reward(reward);
    }

    let config = ServiceConfig::new()
        .with_preload_delay(Duration::from_millis(scenario.preload_delay_ms));
    let service = AdService::new(scenario.host, plugin.clone()).with_config(config);
    service.define_slots(scenario.slots);

    let mut rewards = Vec::new();
    for (index, step) in scenario.steps.into_iter().enumerate() {
        match step {
            Step::Initialize { options } => service.initialize(options).await,
            Step::DefineSlot { id, slot } => service.define_slot(id, slot),
            Step::Show { slot, testing } => service.show(&slot, testing).await,
            Step::Hide { slot } => service.hide(&slot).await,
            Step::Remove { slot } => service.remove(&slot).await,
            Step::Trigger { slot, testing } => service.trigger(&slot, testing).await,
            Step::TriggerRewarded { slot, testing } => {
                let reward = service.trigger_rewarded(&slot, testing).await;
                rewards.push(RewardOutcome {
                    step: index,
                    slot,
                    reward,
                });
            }
            Step::PrepareInterstitial { slot, testing } => {
                service.prepare_interstitial_slot(&slot, testing).await
            }
            Step::SetAdsRemoved { removed } => service.set_ads_removed(removed).await,
            Step::Fail { call, message } => plugin.fail(call, message),
            Step::Recover { call } => plugin.recover(call),
            Step::WaitMs { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
    }

    ScenarioReport {
        calls: plugin.calls(),
        rewards,
        state: service.snapshot(),
    }
}
