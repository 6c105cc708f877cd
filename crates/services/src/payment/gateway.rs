//! Payment gateway collaborator and the VNPay implementation.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use domain::Money;
use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::{Result, ServiceError};

type HmacSha512 = Hmac<Sha512>;

const SECURE_HASH: &str = "vnp_SecureHash";
const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

/// Parameters for one payment attempt.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub txn_ref: String,
    pub amount: Money,
    pub order_info: String,
    pub return_url: String,
    pub ip_addr: String,
    pub created_at: DateTime<Utc>,
}

/// Builds payment URLs and verifies the signed parameters a gateway sends back.
pub trait PaymentGateway: Send + Sync {
    fn build_payment_url(&self, request: &PaymentRequest) -> Result<String>;

    /// Returns true if `params` carry a valid signature.
    fn verify_return(&self, params: &BTreeMap<String, String>) -> bool;
}

#[derive(Debug, Clone)]
pub struct VnpayConfig {
    pub tmn_code: String,
    pub secure_secret: String,
    pub host: String,
}

/// VNPay gateway: HMAC-SHA512 over the sorted, form-encoded `vnp_*` parameters.
#[derive(Debug, Clone)]
pub struct VnpayGateway {
    config: VnpayConfig,
}

impl VnpayGateway {
    pub fn new(config: VnpayConfig) -> Self {
        Self { config }
    }

    fn mac(&self) -> Result<HmacSha512> {
        HmacSha512::new_from_slice(self.config.secure_secret.as_bytes())
            .map_err(|e| ServiceError::Gateway(e.to_string()))
    }

    /// Hex signature over `params`, which must already be sorted by key.
    pub fn sign(&self, params: &BTreeMap<String, String>) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(encode(params).as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

fn encode(params: &BTreeMap<String, String>) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

/// Gateway timestamps are in Vietnam local time (UTC+7).
fn gateway_timestamp(at: DateTime<Utc>) -> String {
    (at + Duration::hours(7)).format("%Y%m%d%H%M%S").to_string()
}

impl PaymentGateway for VnpayGateway {
    fn build_payment_url(&self, request: &PaymentRequest) -> Result<String> {
        let params: BTreeMap<String, String> = [
            ("vnp_Version", "2.1.0".to_string()),
            ("vnp_Command", "pay".to_string()),
            ("vnp_TmnCode", self.config.tmn_code.clone()),
            ("vnp_Locale", "vn".to_string()),
            ("vnp_CurrCode", "VND".to_string()),
            ("vnp_TxnRef", request.txn_ref.clone()),
            ("vnp_OrderInfo", request.order_info.clone()),
            ("vnp_OrderType", "other".to_string()),
            ("vnp_Amount", request.amount.cents().to_string()),
            ("vnp_ReturnUrl", request.return_url.clone()),
            ("vnp_IpAddr", request.ip_addr.clone()),
            ("vnp_CreateDate", gateway_timestamp(request.created_at)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let signature = self.sign(&params)?;
        Ok(format!(
            "{}/paymentv2/vpcpay.html?{}&{SECURE_HASH}={signature}",
            self.config.host.trim_end_matches('/'),
            encode(&params)
        ))
    }

    fn verify_return(&self, params: &BTreeMap<String, String>) -> bool {
        let Some(provided) = params.get(SECURE_HASH) else {
            return false;
        };
        let Ok(provided) = hex::decode(provided) else {
            return false;
        };

        let signed: BTreeMap<String, String> = params
            .iter()
            .filter(|(k, _)| k.as_str() != SECURE_HASH && k.as_str() != SECURE_HASH_TYPE)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(encode(&signed).as_bytes());
        mac.verify_slice(&provided).is_ok()
    }
}
