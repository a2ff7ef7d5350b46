//! Purpose: Define the ad slot configuration model and its resolution rules.
//! Exports: `SlotConfig`, `BannerSlot`, `AdUnitSlot`, `BannerPosition`, `BannerSize`,
//! `ResolvedBanner`, `SlotKind`, `resolve_testing`.
//! Role: Pure data shared by the registry, the service and the CLI.
//! Invariants: A slot's kind is fixed by its variant; redefining replaces the whole value.
//! Invariants: JSON field names follow the host-app convention (`adId`, `isTesting`).
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{Error, ErrorKind};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SlotConfig {
    Banner(BannerSlot),
    Interstitial(AdUnitSlot),
    Rewarded(AdUnitSlot),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerSlot {
    pub ad_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_testing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<BannerPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<BannerSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
}

/// Interstitial and rewarded slots carry only the common fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdUnitSlot {
    pub ad_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_testing: Option<bool>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerPosition {
    Top,
    #[default]
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerSize {
    Banner,
    FullBanner,
    LargeBanner,
    MediumRectangle,
    Leaderboard,
    #[default]
    Adaptive,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Banner,
    Interstitial,
    Rewarded,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotKind::Banner => "banner",
            SlotKind::Interstitial => "interstitial",
            SlotKind::Rewarded => "rewarded",
        };
        f.write_str(name)
    }
}

/// Banner placement after defaults have been applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedBanner {
    pub position: BannerPosition,
    pub size: BannerSize,
    pub margin: f64,
}

impl SlotConfig {
    pub fn banner(ad_id: impl Into<String>) -> Self {
        SlotConfig::Banner(BannerSlot {
            ad_id: ad_id.into(),
            ..BannerSlot::default()
        })
    }

    pub fn interstitial(ad_id: impl Into<String>) -> Self {
        SlotConfig::Interstitial(AdUnitSlot {
            ad_id: ad_id.into(),
            is_testing: None,
        })
    }

    pub fn rewarded(ad_id: impl Into<String>) -> Self {
        SlotConfig::Rewarded(AdUnitSlot {
            ad_id: ad_id.into(),
            is_testing: None,
        })
    }

    pub fn with_testing(mut self, is_testing: bool) -> Self {
        match &mut self {
            SlotConfig::Banner(banner) => banner.is_testing = Some(is_testing),
            SlotConfig::Interstitial(unit) | SlotConfig::Rewarded(unit) => {
                unit.is_testing = Some(is_testing)
            }
        }
        self
    }

    pub fn kind(&self) -> SlotKind {
        match self {
            SlotConfig::Banner(_) => SlotKind::Banner,
            SlotConfig::Interstitial(_) => SlotKind::Interstitial,
            SlotConfig::Rewarded(_) => SlotKind::Rewarded,
        }
    }

    pub fn ad_id(&self) -> &str {
        match self {
            SlotConfig::Banner(banner) => &banner.ad_id,
            SlotConfig::Interstitial(unit) | SlotConfig::Rewarded(unit) => &unit.ad_id,
        }
    }

    pub fn is_testing(&self) -> Option<bool> {
        match self {
            SlotConfig::Banner(banner) => banner.is_testing,
            SlotConfig::Interstitial(unit) | SlotConfig::Rewarded(unit) => unit.is_testing,
        }
    }

    /// Checks the fields the plugin cannot work without.
    ///
    /// The registry accepts anything; callers decide whether to validate.
    pub fn validate(&self) -> Result<(), Error> {
        if self.ad_id().trim().is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("adId must not be empty")
                .with_hint("Set adId to the ad unit id from the ad network console."));
        }
        if let SlotConfig::Banner(BannerSlot {
            margin: Some(margin),
            ..
        }) = self
        {
            if !margin.is_finite() || *margin < 0.0 {
                return Err(Error::new(ErrorKind::Usage).with_message(format!(
                    "banner margin must be a non-negative number, got {margin}"
                )));
            }
        }
        Ok(())
    }
}

impl BannerSlot {
    /// Fills in defaults only; range checks live in `SlotConfig::validate`.
    pub fn resolve(&self) -> ResolvedBanner {
        ResolvedBanner {
            position: self.position.unwrap_or_default(),
            size: self.size.unwrap_or_default(),
            margin: self.margin.unwrap_or(0.0),
        }
    }
}

/// Effective test flag for one ad request.
///
/// An explicit call-site value wins outright; otherwise the slot's own flag,
/// and `false` when neither is set.
pub fn resolve_testing(call_site: Option<bool>, slot: Option<bool>) -> bool {
    call_site.or(slot).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{
        BannerPosition, BannerSize, BannerSlot, ResolvedBanner, SlotConfig, SlotKind,
        resolve_testing,
    };
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn call_site_testing_flag_beats_slot_flag() {
        assert!(!resolve_testing(Some(false), Some(true)));
        assert!(resolve_testing(Some(true), Some(false)));
        assert!(resolve_testing(None, Some(true)));
        assert!(!resolve_testing(None, None));
    }

    #[test]
    fn banner_defaults_resolve_to_bottom_adaptive() {
        let banner = BannerSlot {
            ad_id: "ca-app-pub-1/1".to_string(),
            ..BannerSlot::default()
        };
        assert_eq!(
            banner.resolve(),
            ResolvedBanner {
                position: BannerPosition::Bottom,
                size: BannerSize::Adaptive,
                margin: 0.0,
            }
        );
    }

    #[test]
    fn resolve_applies_defaults_and_leaves_range_to_validate() {
        let banner = BannerSlot {
            ad_id: "x".to_string(),
            margin: Some(12.5),
            ..BannerSlot::default()
        };
        assert_eq!(banner.resolve().margin, 12.5);

        let negative = BannerSlot {
            margin: Some(-4.0),
            ..banner
        };
        let slot = SlotConfig::Banner(negative.clone());
        assert!(slot.validate().is_err());
        assert_eq!(negative.resolve().margin, -4.0);
    }

    #[test]
    fn parses_tagged_json() {
        let value = json!({
            "type": "banner",
            "adId": "ca-app-pub-1/2",
            "position": "top",
            "size": "medium_rectangle",
            "margin": 8,
            "isTesting": true
        });
        let slot: SlotConfig = serde_json::from_value(value).expect("slot");
        assert_eq!(slot.kind(), SlotKind::Banner);
        assert_eq!(slot.is_testing(), Some(true));
        let SlotConfig::Banner(banner) = slot else {
            panic!("expected banner");
        };
        assert_eq!(banner.position, Some(BannerPosition::Top));
        assert_eq!(banner.size, Some(BannerSize::MediumRectangle));
        assert_eq!(banner.margin, Some(8.0));

        let rewarded: SlotConfig =
            serde_json::from_value(json!({"type": "rewarded", "adId": "r"})).expect("rewarded");
        assert_eq!(rewarded, SlotConfig::rewarded("r"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = serde_json::from_value::<SlotConfig>(json!({"type": "native", "adId": "n"}))
            .expect_err("unknown variant");
        assert!(err.to_string().contains("native"));
    }

    #[test]
    fn validate_rejects_empty_ad_id_and_bad_margin() {
        let err = SlotConfig::interstitial("  ").validate().expect_err("empty");
        assert_eq!(err.kind(), ErrorKind::Usage);

        let slot = SlotConfig::Banner(BannerSlot {
            ad_id: "b".to_string(),
            margin: Some(f64::NAN),
            ..BannerSlot::default()
        });
        assert!(slot.validate().is_err());

        SlotConfig::banner("b").with_testing(true).validate().expect("valid");
    }
}
