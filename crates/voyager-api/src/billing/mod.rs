// Billing backend facade
//
// In-app purchase verification for both stores, product catalogue, and
// membership (VIP) status. Paths are relative to the service's
// `/api/vippay` base. Every verb requires a payload; a success envelope
// without `data` is reported as `Error::MissingData`.

pub mod models;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::client::{BackendConfig, ServiceClient};
use crate::credential::CredentialStore;
use crate::error::Error;
use crate::transport::RequestEnvelope;

use models::{AppleReceiptVerify, GooglePurchase, PlatformPurchase};
pub use models::{
    AcknowledgeResult, AppleNotificationResult, AppleReceipt, AppleSubscriptionStatus,
    ConsumeResult, GoogleNotification, GoogleNotificationResult, GooglePurchaseReceipt,
    GoogleSubscriptionStatus, HealthStatus, MaxContexts, MaxRoles, PaymentPlatform, Product,
    ProductDetail, ProductList, ProductStats, ProductType, QuotaInfo, SyncResult, VipInfo,
    VipStatus,
};

/// Filters for [`BillingService::products`].
#[derive(Debug, Clone, Copy)]
pub struct ProductQuery {
    pub platform: PaymentPlatform,
    pub product_type: Option<ProductType>,
    pub featured: Option<bool>,
}

impl ProductQuery {
    pub fn new(platform: PaymentPlatform) -> Self {
        Self {
            platform,
            product_type: None,
            featured: None,
        }
    }
}

/// Typed verbs for the billing backend.
#[derive(Debug, Clone)]
pub struct BillingService {
    client: ServiceClient,
}

impl BillingService {
    /// Connect with the default billing settings. `base_url` must include
    /// the `/api/vippay` prefix.
    pub fn new(base_url: Url, credentials: Arc<CredentialStore>) -> Result<Self, Error> {
        Ok(Self::from_client(ServiceClient::new(
            &BackendConfig::billing(base_url),
            credentials,
        )?))
    }

    pub fn from_client(client: ServiceClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    async fn call<T: DeserializeOwned>(&self, operation: &str, request: RequestEnvelope) -> Result<T, Error> {
        self.client.execute_required(operation, request).await
    }

    /// `GET /health`
    pub async fn health_check(&self) -> Result<HealthStatus, Error> {
        self.call("checkHealth", RequestEnvelope::get("/health")).await
    }

    // ── Apple ───────────────────────────────────────────────────────

    /// `POST /iap/apple/verify`
    pub async fn verify_apple_receipt(&self, receipt_data: &str, sandbox: bool) -> Result<AppleReceipt, Error> {
        debug!(sandbox, receipt_len = receipt_data.len(), "verifying apple receipt");
        let request = RequestEnvelope::post("/iap/apple/verify").json(&AppleReceiptVerify {
            receipt_data,
            sandbox,
        })?;
        self.call("verifyAppleReceipt", request).await
    }

    /// `POST /iap/apple/subscription-status`
    pub async fn apple_subscription_status(
        &self,
        original_transaction_id: &str,
    ) -> Result<AppleSubscriptionStatus, Error> {
        let request = RequestEnvelope::post("/iap/apple/subscription-status")
            .json(&json!({ "originalTransactionId": original_transaction_id }))?;
        self.call("getAppleSubscriptionStatus", request).await
    }

    /// Forward an App Store server notification.
    ///
    /// `POST /iap/apple/notification`
    pub async fn handle_apple_notification(&self, signed_payload: &str) -> Result<AppleNotificationResult, Error> {
        let request = RequestEnvelope::post("/iap/apple/notification")
            .json(&json!({ "signedPayload": signed_payload }))?;
        self.call("handleAppleNotification", request).await
    }

    // ── Google ──────────────────────────────────────────────────────

    /// `POST /iap/google/verify`
    pub async fn verify_google_purchase(
        &self,
        purchase_token: &str,
        product_id: &str,
    ) -> Result<GooglePurchaseReceipt, Error> {
        debug!(product_id, "verifying google purchase");
        let request = RequestEnvelope::post("/iap/google/verify").json(&GooglePurchase {
            purchase_token,
            product_id,
        })?;
        self.call("verifyGooglePurchase", request).await
    }

    /// `POST /iap/google/subscription-status`
    pub async fn google_subscription_status(
        &self,
        purchase_token: &str,
        product_id: &str,
    ) -> Result<GoogleSubscriptionStatus, Error> {
        let request = RequestEnvelope::post("/iap/google/subscription-status").json(&GooglePurchase {
            purchase_token,
            product_id,
        })?;
        self.call("getGoogleSubscriptionStatus", request).await
    }

    /// `POST /iap/google/notification`
    pub async fn handle_google_notification(
        &self,
        notification: &GoogleNotification,
    ) -> Result<GoogleNotificationResult, Error> {
        let request = RequestEnvelope::post("/iap/google/notification").json(notification)?;
        self.call("handleGoogleNotification", request).await
    }

    // ── Cross-platform purchase lifecycle ───────────────────────────

    /// `POST /iap/acknowledge`
    pub async fn acknowledge_purchase(
        &self,
        platform: PaymentPlatform,
        purchase_token: &str,
        product_id: &str,
    ) -> Result<AcknowledgeResult, Error> {
        debug!(%platform, product_id, "acknowledging purchase");
        let request = RequestEnvelope::post("/iap/acknowledge").json(&PlatformPurchase {
            platform,
            purchase_token,
            product_id,
        })?;
        self.call("acknowledgePurchase", request).await
    }

    /// `POST /iap/consume`
    pub async fn consume_purchase(
        &self,
        platform: PaymentPlatform,
        purchase_token: &str,
        product_id: &str,
    ) -> Result<ConsumeResult, Error> {
        debug!(%platform, product_id, "consuming purchase");
        let request = RequestEnvelope::post("/iap/consume").json(&PlatformPurchase {
            platform,
            purchase_token,
            product_id,
        })?;
        self.call("consumePurchase", request).await
    }

    /// `POST /iap/sync`
    pub async fn sync_subscription(&self, platform: PaymentPlatform) -> Result<SyncResult, Error> {
        let request = RequestEnvelope::post("/iap/sync").json(&json!({ "platform": platform }))?;
        self.call("syncSubscription", request).await
    }

    // ── Products ────────────────────────────────────────────────────

    /// `GET /iap/products?platform=..&type=..&featured=..`
    pub async fn products(&self, query: ProductQuery) -> Result<ProductList, Error> {
        let request = RequestEnvelope::get("/iap/products")
            .query("platform", query.platform)
            .query_opt("type", query.product_type)
            .query_opt("featured", query.featured);
        self.call("getProducts", request).await
    }

    /// `GET /iap/products/{id}`
    pub async fn product_detail(&self, id: i64) -> Result<ProductDetail, Error> {
        self.call("getProductDetail", RequestEnvelope::get(format!("/iap/products/{id}")))
            .await
    }

    /// `GET /iap/products/stats?platform=..`
    pub async fn product_stats(&self, platform: PaymentPlatform) -> Result<ProductStats, Error> {
        let request = RequestEnvelope::get("/iap/products/stats").query("platform", platform);
        self.call("getProductStats", request).await
    }

    // ── Membership ──────────────────────────────────────────────────

    /// `GET /vip/info`
    pub async fn vip_info(&self) -> Result<VipInfo, Error> {
        self.call("getVIPInfo", RequestEnvelope::get("/vip/info")).await
    }

    /// `GET /vip/check`
    pub async fn vip_status(&self) -> Result<VipStatus, Error> {
        self.call("checkVIPStatus", RequestEnvelope::get("/vip/check")).await
    }

    /// `GET /vip/quota`
    pub async fn quota(&self) -> Result<QuotaInfo, Error> {
        self.call("getQuotaInfo", RequestEnvelope::get("/vip/quota")).await
    }

    /// `GET /vip/max-roles`
    pub async fn max_roles(&self) -> Result<MaxRoles, Error> {
        self.call("getMaxRoles", RequestEnvelope::get("/vip/max-roles")).await
    }

    /// `GET /vip/max-contexts`
    pub async fn max_contexts(&self) -> Result<MaxContexts, Error> {
        self.call("getMaxContexts", RequestEnvelope::get("/vip/max-contexts"))
            .await
    }
}
