use crate::intent::{Action, IntentMatcher, IntentMatcherResult};
use regex::{Captures, Regex};
use std::sync::LazyLock;

const MIN_HOUR: u32 = 0;
const MAX_HOUR: u32 = 23;
const MIN_MINUTE: u32 = 0;
const MAX_MINUTE: u32 = 59;
const HOURS_PER_PERIOD: u32 = 12;
const HOURS_PER_DAY: u32 = 24;

/// 时和分都有（有无上下午均可）
pub const CONFIDENCE_WITH_HM: f64 = 1.0;
/// 时 + 上下午，无分钟
pub const CONFIDENCE_WITH_HP: f64 = 0.95;
/// 只有时
pub const CONFIDENCE_WITH_H: f64 = 0.9;

pub const ALARM_INTENT: &str = "set alarm";
pub const ACTION_SET_ALARM: &str = "set_alarm";
pub const EXTRA_HOUR: &str = "hour";
pub const EXTRA_MINUTES: &str = "minutes";

// set alarm for 4:15 a.m.
static REGULAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)set alarm for (\d+)(?::(\d+))?(?:\s?([ap])\.?\s?m\.?)?$")
        .expect("Invalid regex")
});

// set alarm for 12 noon
static IRREGULAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)set alarm for (\d+)\s+(noon|midnight)$").expect("Invalid regex")
});

#[derive(Debug, Clone, Copy, PartialEq)]
enum Period {
    Unspecified,
    Am,
    Pm,
    Noon,
    Midnight,
}

impl Period {
    fn parse(text: &str) -> Self {
        match text.to_lowercase().as_str() {
            "a" => Period::Am,
            "p" => Period::Pm,
            "noon" => Period::Noon,
            "midnight" => Period::Midnight,
            _ => Period::Unspecified,
        }
    }
}

/// 把说出的小时换算为 24 小时制，不合法返回 None
fn calculate_hour(hour: u32, period: Period) -> Option<u32> {
    match period {
        Period::Pm => Some(hour % HOURS_PER_PERIOD + HOURS_PER_PERIOD),
        // 12 a.m. 是午夜
        Period::Am => Some(if hour == HOURS_PER_PERIOD { 0 } else { hour }),
        Period::Noon => (hour == HOURS_PER_PERIOD).then_some(HOURS_PER_PERIOD),
        Period::Midnight => (hour == HOURS_PER_PERIOD).then_some(0),
        Period::Unspecified => Some(if hour == HOURS_PER_DAY { 0 } else { hour }),
    }
}

/// 闹钟指令匹配器：直接用正则解析 "set alarm for H[:M][period]"
#[derive(Debug, Default)]
pub struct AlarmIntentMatcher;

impl AlarmIntentMatcher {
    pub fn new() -> Self {
        Self
    }

    fn match_captures(&self, caps: &Captures<'_>, transcript: &str) -> Option<IntentMatcherResult> {
        let hour_text = caps.get(1)?.as_str();
        let minutes_text = caps.get(2).map(|m| m.as_str());
        let period = caps
            .get(3)
            .map_or(Period::Unspecified, |m| Period::parse(m.as_str()));

        // 正则保证是数字，解析失败（如溢出）按不匹配处理
        let hour = calculate_hour(hour_text.parse().ok()?, period)?;
        let minutes = match minutes_text {
            Some(m) => m.parse().ok()?,
            None => 0,
        };
        if !(MIN_HOUR..=MAX_HOUR).contains(&hour) || !(MIN_MINUTE..=MAX_MINUTE).contains(&minutes)
        {
            log::debug!("闹钟时间越界: {hour}:{minutes} ({transcript})");
            return None;
        }

        let confidence = if minutes_text.is_some() {
            CONFIDENCE_WITH_HM
        } else if period != Period::Unspecified {
            CONFIDENCE_WITH_HP
        } else {
            CONFIDENCE_WITH_H
        };

        let action = Action::new(ACTION_SET_ALARM)
            .with_extra(EXTRA_HOUR, hour)
            .with_extra(EXTRA_MINUTES, minutes);
        Some(IntentMatcherResult::new(
            confidence,
            ALARM_INTENT,
            transcript,
            action,
        ))
    }
}

impl IntentMatcher for AlarmIntentMatcher {
    fn match_transcript(&self, transcript: &str) -> Vec<IntentMatcherResult> {
        [&*REGULAR, &*IRREGULAR]
            .iter()
            .filter_map(|regex| regex.captures(transcript))
            .filter_map(|caps| self.match_captures(&caps, transcript))
            .collect()
    }
}
