//! Request, record and envelope types for inquiry extraction.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Company name used when neither the domain table nor the model knows it.
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

// ── Inbound request ─────────────────────────────────────────────────

/// An inbound email to be parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseEmailRequest {
    #[serde(default)]
    pub email_subject: String,
    /// Plain text or HTML.
    #[serde(default)]
    pub email_body: String,
    pub from_email: String,
    #[serde(default)]
    pub from_name: Option<String>,
}

impl ParseEmailRequest {
    /// Lowercased domain of the sender, if the address has one.
    ///
    /// Accepts bare addresses as well as `Name <addr@host>` forms.
    pub fn sender_domain(&self) -> Option<String> {
        let (_, host) = self.from_email.rsplit_once('@')?;
        let domain = host.trim().trim_end_matches('>').trim().to_lowercase();
        if domain.is_empty() { None } else { Some(domain) }
    }

    /// `from_name` with blank values treated as absent.
    pub fn sender_name(&self) -> Option<&str> {
        self.from_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

// ── Enums ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Urgency {
    /// Case-insensitive parse; unknown values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "normal" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" => Some(Self::Urgent),
            _ => None,
        }
    }
}

/// Coarse confidence tier shown to CRM users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

impl Confidence {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Document or quote the customer asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurposeIcon {
    Price,
    Coa,
    Msds,
    Sample,
}

impl PurposeIcon {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Coa => "coa",
            Self::Msds => "msds",
            Self::Sample => "sample",
        }
    }
}

impl fmt::Display for PurposeIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four document-request flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRequests {
    pub price: bool,
    pub coa: bool,
    pub msds: bool,
    pub sample: bool,
}

impl DocumentRequests {
    /// Tags for the set flags in fixed order, never empty.
    pub fn purpose_icons(&self) -> Vec<PurposeIcon> {
        let mut icons: Vec<PurposeIcon> = [
            (self.price, PurposeIcon::Price),
            (self.coa, PurposeIcon::Coa),
            (self.msds, PurposeIcon::Msds),
            (self.sample, PurposeIcon::Sample),
        ]
        .into_iter()
        .filter_map(|(set, icon)| set.then_some(icon))
        .collect();

        if icons.is_empty() {
            icons.push(PurposeIcon::Price);
        }
        icons
    }
}

// ── Parsed inquiry ──────────────────────────────────────────────────

/// Canonical inquiry record produced from one email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInquiry {
    pub product_name: String,
    pub specification: Option<String>,
    pub quantity: String,
    pub supplier_name: Option<String>,
    pub supplier_country: Option<String>,
    pub company_name: String,
    pub contact_person: Option<String>,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub coa_requested: bool,
    pub msds_requested: bool,
    pub sample_requested: bool,
    pub price_requested: bool,
    pub purpose_icons: Vec<PurposeIcon>,
    /// ISO `YYYY-MM-DD`.
    pub delivery_date_expected: Option<String>,
    pub urgency: Urgency,
    pub remarks: Option<String>,
    pub confidence: Confidence,
    pub confidence_score: f64,
    pub detected_language: String,
    pub auto_detected_company: bool,
    pub auto_detected_contact: bool,
}

impl ParsedInquiry {
    /// Minimal low-confidence record used when no model is available.
    pub fn fallback(
        request: &ParseEmailRequest,
        company_from_domain: Option<&str>,
        auto_detected_company: bool,
    ) -> Self {
        let requests = DocumentRequests {
            price: true,
            coa: false,
            msds: false,
            sample: false,
        };
        Self {
            product_name: String::new(),
            specification: None,
            quantity: String::new(),
            supplier_name: None,
            supplier_country: None,
            company_name: company_from_domain.unwrap_or(UNKNOWN_COMPANY).to_string(),
            contact_person: request.sender_name().map(String::from),
            contact_email: request.from_email.clone(),
            contact_phone: None,
            coa_requested: requests.coa,
            msds_requested: requests.msds,
            sample_requested: requests.sample,
            price_requested: requests.price,
            purpose_icons: requests.purpose_icons(),
            delivery_date_expected: None,
            urgency: Urgency::Medium,
            remarks: None,
            confidence: Confidence::Low,
            confidence_score: 0.3,
            detected_language: "unknown".to_string(),
            auto_detected_company,
            auto_detected_contact: false,
        }
    }

    /// Fields the CRM requires before an inquiry can be saved, in camelCase.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.product_name.trim().is_empty() {
            missing.push("productName");
        }
        if self.quantity.trim().is_empty() {
            missing.push("quantity");
        }
        if self.company_name.trim().is_empty() {
            missing.push("companyName");
        }
        missing
    }
}

// ── Outcome and envelopes ───────────────────────────────────────────

/// Result of running one email through the pipeline.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// The model was consulted. `raw` is its JSON object as returned.
    Parsed {
        data: ParsedInquiry,
        raw: serde_json::Value,
    },
    /// No model credential is configured.
    Unavailable {
        error: String,
        fallback: ParsedInquiry,
    },
}

/// Success envelope returned to HTTP callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEnvelope {
    pub success: bool,
    pub data: ParsedInquiry,
    pub raw_ai_response: serde_json::Value,
}

/// Failure envelope returned to HTTP callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_data: Option<ParsedInquiry>,
}

impl SuccessEnvelope {
    pub fn new(data: ParsedInquiry, raw_ai_response: serde_json::Value) -> Self {
        Self {
            success: true,
            data,
            raw_ai_response,
        }
    }
}

impl FailureEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            fallback_data: None,
        }
    }

    pub fn with_fallback(mut self, fallback: ParsedInquiry) -> Self {
        self.fallback_data = Some(fallback);
        self
    }
}
