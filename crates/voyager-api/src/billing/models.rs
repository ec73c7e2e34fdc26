// Billing backend payloads
//
// The payment service speaks camelCase. Response structs default every
// field, since the service omits zero values and optional blocks freely.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// ── Enums ───────────────────────────────────────────────────────────

/// Store that processed a purchase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentPlatform {
    Apple,
    Google,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProductType {
    Consumable,
    NonConsumable,
    Subscription,
}

// ── Requests ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppleReceiptVerify<'a> {
    pub receipt_data: &'a str,
    pub sandbox: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GooglePurchase<'a> {
    pub purchase_token: &'a str,
    pub product_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlatformPurchase<'a> {
    pub platform: PaymentPlatform,
    pub purchase_token: &'a str,
    pub product_id: &'a str,
}

/// Real-time developer notification forwarded from Google Play.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoogleNotification {
    pub version: String,
    pub notification_type: String,
    pub event_time_millis: i64,
    pub subscription_id: String,
    pub package_name: String,
}

// ── Responses ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime: i64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppleReceipt {
    pub transaction_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub purchase_date: i64,
    pub original_transaction_id: String,
    pub is_trial_period: bool,
    pub is_in_intro_offer_period: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppleSubscriptionStatus {
    pub original_transaction_id: String,
    pub product_id: String,
    pub status: String,
    pub expires_date: i64,
    pub auto_renew_status: bool,
    pub is_trial_period: bool,
    pub is_in_intro_offer_period: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppleNotificationResult {
    pub notification_type: String,
    pub transaction_id: String,
    pub original_transaction_id: String,
    pub product_id: String,
    pub processed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GooglePurchaseReceipt {
    pub order_id: String,
    pub purchase_token: String,
    pub product_id: String,
    pub purchase_time: i64,
    pub purchase_state: i32,
    pub acknowledgement_state: i32,
    pub consumption_state: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoogleSubscriptionStatus {
    pub subscription_id: String,
    pub product_id: String,
    pub purchase_token: String,
    pub auto_renewing: bool,
    pub price_currency_code: String,
    pub price_amount_micros: i64,
    pub country_code: String,
    pub payment_state: i32,
    pub start_time_millis: i64,
    pub expiry_time_millis: i64,
    pub user_cancellation_time_millis: Option<i64>,
    pub cancel_reason: Option<i32>,
    pub order_id: String,
    pub linked_purchase_token: Option<String>,
    pub order_type: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoogleNotificationResult {
    pub notification_type: String,
    pub subscription_id: String,
    pub processed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AcknowledgeResult {
    pub acknowledged: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsumeResult {
    pub consumed: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncResult {
    pub synced_count: i32,
    pub total_count: i32,
    pub message: String,
}

// ── Products ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub product_id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub platform: String,
    pub price: f64,
    pub currency: String,
    pub featured: bool,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductList {
    pub products: Vec<Product>,
    pub total: i32,
    pub page: i32,
    pub page_size: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductDetail {
    pub product: Product,
    pub purchase_count: i32,
    pub revenue: f64,
    pub rating: f64,
    pub reviews: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductStats {
    pub total_products: i32,
    pub active_products: i32,
    pub total_revenue: f64,
    pub total_purchases: i32,
    pub top_products: Vec<Product>,
}

// ── Membership ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VipInfo {
    pub is_vip: bool,
    pub vip_level: i32,
    pub vip_type: String,
    /// Unix millis.
    pub start_date: i64,
    /// Unix millis.
    pub expire_date: i64,
    pub auto_renew: bool,
    pub remaining_days: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VipStatus {
    pub is_active: bool,
    pub status: String,
    pub message: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuotaInfo {
    pub daily_quota: i32,
    pub used_quota: i32,
    pub remaining_quota: i32,
    pub reset_time: i64,
    pub quota_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaxRoles {
    pub max_roles: i32,
    pub current_roles: i32,
    pub can_create_more: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaxContexts {
    pub max_contexts: i32,
    pub current_contexts: i32,
    pub can_create_more: bool,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn enums_use_wire_spelling() {
        assert_eq!(PaymentPlatform::Apple.as_ref(), "apple");
        assert_eq!(ProductType::NonConsumable.to_string(), "non_consumable");
        assert_eq!(
            PaymentPlatform::from_str("google").ok(),
            Some(PaymentPlatform::Google)
        );
        assert_eq!(
            serde_json::to_string(&ProductType::Subscription).ok().as_deref(),
            Some("\"subscription\"")
        );
    }

    #[test]
    fn quota_decodes_with_missing_fields() {
        let quota: QuotaInfo =
            serde_json::from_str(r#"{"dailyQuota":50,"usedQuota":12}"#).expect("decode");
        assert_eq!(quota.daily_quota, 50);
        assert_eq!(quota.remaining_quota, 0);
        assert!(quota.quota_type.is_empty());
    }
}
