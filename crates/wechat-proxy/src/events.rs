//! Extended event schemas and the registry that selects them by event name.
//!
//! Events without an entry here (subscribe, SCAN, CLICK, ...) are represented
//! by [`crate::message::WxMessage`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ProxyError;
use crate::xml::{empty_as_default, empty_as_none, empty_string_as_none};

/// Header shared by every event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventBase {
    #[serde(default)]
    pub to_user_name: String,
    #[serde(default)]
    pub from_user_name: String,
    #[serde(default, deserialize_with = "empty_as_default")]
    pub create_time: u64,
    #[serde(default)]
    pub msg_type: String,
    #[serde(default)]
    pub event: String,
}

/// Card and membership lifecycle events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CardEvent {
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub card_id: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_card_code: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub outer_str: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub refuse_reason: Option<String>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_give_by_friend: Option<u32>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub friend_user_name: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub old_user_card_code: Option<String>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub outer_id: Option<u32>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_restore_member_card: Option<u32>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_recommend_by_friend: Option<u32>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_return_back: Option<u32>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_chat_room: Option<u32>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub consume_source: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub location_name: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub staff_open_id: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub verify_code: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub remark_amount: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub trans_id: Option<String>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub location_id: Option<u64>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub fee: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_fee: Option<String>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub modify_bonus: Option<i32>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub modify_balance: Option<i32>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub detail: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub order_id: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub create_order_time: Option<u64>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub pay_finish_time: Option<u64>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub desc: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub free_coin_count: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub pay_coin_count: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub refund_free_coin_count: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub refund_pay_coin_count: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub order_type: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub memo: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub receipt_info: Option<String>,
}

/// Product barcode scan events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProductEvent {
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_standard: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_str: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub country: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub province: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub city: Option<String>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub sex: Option<u32>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub scene: Option<u32>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub ext_info: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub region_code: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<String>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub reason_msg: Option<String>,
}

/// Account qualification and naming verification events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VerifyEvent {
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub expired_time: Option<u64>,
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub fail_time: Option<u64>,
    #[serde(
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub fail_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Beacon {
    pub uuid: String,
    pub major: String,
    pub minor: String,
    #[serde(deserialize_with = "empty_as_default")]
    pub distance: f64,
}

/// Shake-around (iBeacon) event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BeaconEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chosen_beacon: Option<Beacon>,
    #[serde(
        deserialize_with = "around_beacons",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub around_beacons: Vec<Beacon>,
}

/// `<AroundBeacons><AroundBeacon/>...</AroundBeacons>` collapses to a list.
fn around_beacons<'de, D>(deserializer: D) -> Result<Vec<Beacon>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(rename = "AroundBeacon", default)]
        beacons: Vec<Beacon>,
    }
    Ok(Wrapper::deserialize(deserializer)?.beacons)
}

/// Wi-Fi connection event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WifiEvent {
    #[serde(deserialize_with = "empty_as_default")]
    pub connect_time: u64,
    #[serde(deserialize_with = "empty_as_default")]
    pub expire_time: u64,
    pub vendor_id: String,
    pub shop_id: String,
    pub device_no: String,
}

/// Registry of events with an extended schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Card,
    Product,
    Verify,
    Beacon,
    Wifi,
}

impl EventKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "card_pass_check"
            | "card_not_pass_check"
            | "user_get_card"
            | "user_gifting_card"
            | "user_del_card"
            | "user_consume_card"
            | "user_pay_from_pay_cell"
            | "user_view_card"
            | "user_enter_session_from_card"
            | "update_member_card"
            | "card_sku_remind"
            | "card_pay_order"
            | "submit_membercard_user_info" => Some(Self::Card),
            "user_scan_product"
            | "user_scan_product_enter_session"
            | "user_scan_product_async"
            | "user_scan_product_verify_action" => Some(Self::Product),
            "qualification_verify_success"
            | "qualification_verify_fail"
            | "naming_verify_success"
            | "naming_verify_fail"
            | "annual_renew"
            | "verify_expired" => Some(Self::Verify),
            "ShakearoundUserShake" => Some(Self::Beacon),
            "WifiConnected" => Some(Self::Wifi),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Product => "product",
            Self::Verify => "verify",
            Self::Beacon => "beacon",
            Self::Wifi => "wifi",
        }
    }

    /// Re-parse `xml` with this kind's schema and serialize base plus
    /// extension fields as one flat JSON object.
    pub fn to_json(self, xml: &str) -> Result<Vec<u8>, ProxyError> {
        let base: EventBase = from_xml(xml)?;
        match self {
            Self::Card => extended::<CardEvent>(base, xml),
            Self::Product => extended::<ProductEvent>(base, xml),
            Self::Verify => extended::<VerifyEvent>(base, xml),
            Self::Beacon => extended::<BeaconEvent>(base, xml),
            Self::Wifi => extended::<WifiEvent>(base, xml),
        }
    }
}

#[derive(Serialize)]
struct Extended<E> {
    #[serde(flatten)]
    base: EventBase,
    #[serde(flatten)]
    ext: E,
}

fn extended<E>(base: EventBase, xml: &str) -> Result<Vec<u8>, ProxyError>
where
    E: DeserializeOwned + Serialize,
{
    let ext: E = from_xml(xml)?;
    serde_json::to_vec(&Extended { base, ext })
        .map_err(|e| ProxyError::Translation(format!("event json: {e}")))
}

fn from_xml<T: DeserializeOwned>(xml: &str) -> Result<T, ProxyError> {
    quick_xml::de::from_str(xml)
        .map_err(|e| ProxyError::Translation(format!("invalid event xml: {e}")))
}
