//! Payment-gateway webhook ingestion.
//!
//! Checkout sessions are created elsewhere. This module verifies the
//! signed webhook the gateway posts back, decodes the completed session and
//! turns it into an `Online` record. The facade makes ingestion idempotent
//! by session id.
//!
//! Signature header: `t=<unix seconds>,v1=<hex HMAC-SHA256 of "<t>.<payload>">`.
//! Several `v1` entries may be present during secret rotation; any match
//! is accepted.

use crate::{
    error::{LedgerError, LedgerResult},
    instrument::{NewOnline, Online, OnlineStatus, PaymentMethod},
};
use chrono::NaiveDate;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// A completed checkout session as delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutCompleted {
    #[serde(rename = "id")]
    pub session_id: String,
    #[serde(default)]
    pub payment_intent: Option<String>,
    /// Total in minor currency units (paise, cents).
    pub amount_total: i64,
    pub currency: String,
    pub payment_status: String,
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: serde_json::Value,
}

impl CheckoutCompleted {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Build the Online record for a paid session.
    pub fn into_online(&self, today: NaiveDate, minor_units: u32) -> LedgerResult<Online> {
        if minor_units == 0 {
            return Err(LedgerError::InvalidConfig(
                "gateway.minor_units must be positive".into(),
            ));
        }
        let client_name = self
            .metadata
            .client_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Unknown")
            .to_string();
        let method = self
            .metadata
            .payment_method
            .as_deref()
            .and_then(PaymentMethod::from_label)
            .unwrap_or(PaymentMethod::Card);

        Online::new(NewOnline {
            client_id: self.metadata.client_id.clone().filter(|id| !id.is_empty()),
            client_name,
            receipt_number: self
                .payment_intent
                .clone()
                .unwrap_or_else(|| self.session_id.clone()),
            method,
            amount: self.amount_total as f64 / minor_units as f64,
            date: today,
            status: Some(OnlineStatus::Success),
            verified: true,
            gateway_session_id: Some(self.session_id.clone()),
            gateway_intent_id: self.payment_intent.clone(),
            reference_number: Some(self.session_id.clone()),
            notes: None,
        })
    }
}

/// Decode a webhook body. Events other than a completed checkout yield `None`.
pub fn parse_checkout_event(payload: &str) -> LedgerResult<Option<CheckoutCompleted>> {
    let envelope: WebhookEnvelope = serde_json::from_str(payload)?;
    if envelope.event_type != CHECKOUT_COMPLETED {
        log::debug!("ignoring gateway event {}", envelope.event_type);
        return Ok(None);
    }
    let session = serde_json::from_value(envelope.data.object)?;
    Ok(Some(session))
}

/// Produce a signature header for `payload` at `timestamp`.
pub fn sign_payload(payload: &str, secret: &str, timestamp: i64) -> LedgerResult<String> {
    let mac = signed_mac(payload, secret, timestamp)?;
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check a signature header against `payload`.
///
/// Fails when the header is malformed, the timestamp is further than
/// `tolerance_secs` from `now`, or no `v1` signature matches.
pub fn verify_webhook_signature(
    payload: &str,
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> LedgerResult<()> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => {
                timestamp = Some(v.parse().map_err(|_| {
                    LedgerError::Signature(format!("bad timestamp '{v}'"))
                })?);
            }
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| LedgerError::Signature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(LedgerError::Signature("no v1 signature".into()));
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(LedgerError::Signature(format!(
            "timestamp {timestamp} outside {tolerance_secs}s tolerance"
        )));
    }

    let mac = signed_mac(payload, secret, timestamp)?;
    let matched = signatures.iter().any(|sig| match hex::decode(sig) {
        Ok(bytes) => mac.clone().verify_slice(&bytes).is_ok(),
        Err(_) => false,
    });
    if matched {
        Ok(())
    } else {
        Err(LedgerError::Signature("signature mismatch".into()))
    }
}

fn signed_mac(payload: &str, secret: &str, timestamp: i64) -> LedgerResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| LedgerError::Signature(format!("invalid key: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    Ok(mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &str = r#"{"type":"checkout.session.completed","data":{"object":{
        "id":"cs_test_1","payment_intent":"pi_1","amount_total":250000,"currency":"inr",
        "payment_status":"paid","metadata":{"clientId":"c-1","clientName":"Acme Traders"}}}}"#;

    #[test]
    fn signed_payload_verifies() {
        let header = sign_payload(BODY, SECRET, 1_700_000_000).unwrap();
        verify_webhook_signature(BODY, &header, SECRET, 1_700_000_100, 300).unwrap();
    }

    #[test]
    fn tampered_body_rejected() {
        let header = sign_payload(BODY, SECRET, 1_700_000_000).unwrap();
        let tampered = BODY.replace("250000", "350000");
        let err = verify_webhook_signature(&tampered, &header, SECRET, 1_700_000_000, 300);
        assert!(matches!(err, Err(LedgerError::Signature(_))));
    }

    #[test]
    fn stale_timestamp_rejected() {
        let header = sign_payload(BODY, SECRET, 1_700_000_000).unwrap();
        let err = verify_webhook_signature(BODY, &header, SECRET, 1_700_000_301, 300);
        assert!(matches!(err, Err(LedgerError::Signature(_))));
    }

    #[test]
    fn any_v1_entry_may_match() {
        let good = sign_payload(BODY, SECRET, 1_700_000_000).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t=1700000000,v1=deadbeef,v1={good_sig}");
        verify_webhook_signature(BODY, &header, SECRET, 1_700_000_000, 300).unwrap();
    }

    #[test]
    fn malformed_headers_rejected() {
        for header in ["", "v1=abcd", "t=xyz,v1=abcd", "t=1700000000"] {
            assert!(
                verify_webhook_signature(BODY, header, SECRET, 1_700_000_000, 300).is_err(),
                "{header}"
            );
        }
    }

    #[test]
    fn completed_session_becomes_online_record() {
        let session = parse_checkout_event(BODY).unwrap().unwrap();
        assert!(session.is_paid());
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let online = session.into_online(today, 100).unwrap();
        assert_eq!(online.amount, 2_500.0);
        assert_eq!(online.receipt_number, "pi_1");
        assert_eq!(online.client_id.as_deref(), Some("c-1"));
        assert_eq!(online.status, OnlineStatus::Success);
        assert_eq!(online.method, PaymentMethod::Card);
        assert!(online.verified);
        assert_eq!(online.gateway_session_id.as_deref(), Some("cs_test_1"));
    }

    #[test]
    fn missing_metadata_defaults_name_and_receipt() {
        let body = r#"{"type":"checkout.session.completed","data":{"object":{
            "id":"cs_test_2","amount_total":999,"currency":"inr","payment_status":"paid"}}}"#;
        let session = parse_checkout_event(body).unwrap().unwrap();
        let online = session
            .into_online(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 100)
            .unwrap();
        assert_eq!(online.client_name, "Unknown");
        assert_eq!(online.receipt_number, "cs_test_2");
        assert_eq!(online.amount, 9.99);
    }

    #[test]
    fn other_event_types_ignored() {
        let body = r#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_9"}}}"#;
        assert!(parse_checkout_event(body).unwrap().is_none());
    }
}
