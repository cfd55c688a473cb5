use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Code carried by a [`FireResponse`] whose payload never decoded.
pub const UNSET_CODE: i64 = -999;

/// Substring of a ticket category that marks it as VIP.
pub const VIP_MARKER: &str = "VIP";

/// Follow-up reservation window attached to a slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextSlot {
    #[serde(rename = "reserve_begin_time", default)]
    pub open_time: i64,
    #[serde(rename = "is_vip_ticket", default)]
    pub vip_flag: i32,
}

impl NextSlot {
    /// A zero open time means no follow-up window is scheduled.
    pub fn is_scheduled(&self) -> bool {
        self.open_time != 0
    }
}

/// Which window of a slot governs eligibility and fire time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowSource {
    Current,
    Next,
}

/// The reservation window a racing task aims at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Open time in epoch seconds.
    pub open_time: i64,
    pub requires_vip: bool,
    pub source: WindowSource,
}

impl Window {
    pub fn open_time_millis(&self) -> i64 {
        self.open_time.saturating_mul(1000)
    }
}

/// A remote-defined reservable item, as listed in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservableSlot {
    #[serde(rename = "reserve_id")]
    pub id: i64,
    #[serde(rename = "act_title", default)]
    pub name: String,
    #[serde(rename = "reserve_begin_time", default)]
    pub open_time: i64,
    #[serde(rename = "next_reserve", default)]
    pub next: Option<NextSlot>,
    #[serde(rename = "is_vip_ticket", default)]
    pub vip_flag: i32,
}

impl ReservableSlot {
    /// The window that governs this slot: the follow-up window when one is
    /// scheduled, otherwise the slot's own.
    pub fn governing_window(&self) -> Window {
        match &self.next {
            Some(next) if next.is_scheduled() => Window {
                open_time: next.open_time,
                requires_vip: next.vip_flag != 0,
                source: WindowSource::Next,
            },
            _ => Window {
                open_time: self.open_time,
                requires_vip: self.vip_flag != 0,
                source: WindowSource::Current,
            },
        }
    }
}

/// A user-held ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(rename = "ticket")]
    pub id: String,
    /// Display category, e.g. "单日票 VIP".
    #[serde(rename = "sku_name", default)]
    pub category: String,
    /// Date / screening label, used in every log line about this ticket.
    #[serde(rename = "screen_name", default)]
    pub label: String,
}

impl Ticket {
    pub fn is_vip(&self) -> bool {
        self.category.contains(VIP_MARKER)
    }
}

/// `reserve_list` comes either as nested arrays or as arrays keyed by date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReserveList {
    Nested(Vec<Vec<ReservableSlot>>),
    ByDate(BTreeMap<String, Vec<ReservableSlot>>),
}

impl Default for ReserveList {
    fn default() -> Self {
        Self::Nested(Vec::new())
    }
}

impl ReserveList {
    pub fn slots(&self) -> Box<dyn Iterator<Item = &ReservableSlot> + '_> {
        match self {
            Self::Nested(groups) => Box::new(groups.iter().flatten()),
            Self::ByDate(groups) => Box::new(groups.values().flatten()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotData {
    #[serde(default)]
    pub reserve_list: ReserveList,
    #[serde(default)]
    pub user_ticket_info: Vec<Ticket>,
}

/// Envelope of the one-time snapshot fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<SnapshotData>,
}

/// Reply to a firing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireResponse {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub ttl: i64,
}

impl FireResponse {
    /// Reply standing in for a payload that failed to decode.
    pub fn unset() -> Self {
        Self {
            code: UNSET_CODE,
            message: String::new(),
            ttl: 0,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.code == UNSET_CODE
    }
}
