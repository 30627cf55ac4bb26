//! Extraction service: turns one inbound email into a canonical inquiry.
//!
//! Flow:
//! 1. Domain lookup (learned company table) → may pre-fill the company
//! 2. No credential → degraded fallback record, no model call
//! 3. One JSON-object completion with the classification/extraction prompt
//! 4. Alias resolution + normalization → `ParsedInquiry`
//! 5. Opportunistically learn a new domain mapping
//!
//! Writes to the domain table are best-effort: failures are logged and
//! never fail the request.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{DatabaseError, ExtractionError};
use crate::extraction::aliases::{Field, ModelFields};
use crate::extraction::dates::normalize_delivery_date;
use crate::extraction::prompt::{SYSTEM_PROMPT, build_user_prompt};
use crate::extraction::types::{
    Confidence, DocumentRequests, ParseEmailRequest, ParseOutcome, ParsedInquiry, UNKNOWN_COMPANY,
    Urgency,
};
use crate::llm::create_provider;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider, ResponseFormat};
use crate::store::LibSqlBackend;
use crate::store::traits::{DomainStore, NewDomainMapping};

/// Temperature for extraction (biased toward deterministic output).
pub const EXTRACTION_TEMPERATURE: f32 = 0.3;

/// Score assumed when the model does not report one.
pub const DEFAULT_CONFIDENCE_SCORE: f64 = 0.7;

/// Scores below this mark the email as not a genuine inquiry.
pub const MIN_INQUIRY_SCORE: f64 = 0.4;

/// Score forced onto emails judged not to be inquiries.
pub const REJECTED_CONFIDENCE_SCORE: f64 = 0.1;

/// Error reported when no model credential is configured.
pub const MISSING_CREDENTIAL_ERROR: &str =
    "OpenAI API key not configured. Set OPENAI_API_KEY to enable AI extraction.";

/// Parses inbound emails into inquiry records.
pub struct ExtractionService {
    store: Arc<dyn DomainStore>,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl ExtractionService {
    /// `llm` is `None` when no credential is configured.
    pub fn new(store: Arc<dyn DomainStore>, llm: Option<Arc<dyn LlmProvider>>) -> Self {
        Self { store, llm }
    }

    /// Open the domain table and the model client described by `config`.
    pub async fn from_config(config: &ServiceConfig) -> crate::error::Result<Self> {
        let store: Arc<dyn DomainStore> = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);
        let llm = config.llm.as_ref().map(create_provider).transpose()?;
        if llm.is_none() {
            warn!("No LLM credential configured, parse requests will return 503");
        }
        Ok(Self::new(store, llm))
    }

    /// Run one email through the pipeline.
    pub async fn parse(&self, request: &ParseEmailRequest) -> Result<ParseOutcome, ExtractionError> {
        let domain = request.sender_domain();
        info!(
            sender = %request.from_email,
            domain = domain.as_deref().unwrap_or("-"),
            "Parsing inbound email"
        );

        let company_from_domain = match domain.as_deref() {
            Some(d) => self.known_company(d).await,
            None => None,
        };
        let auto_detected_company = company_from_domain.is_some();

        let Some(llm) = &self.llm else {
            warn!("No LLM credential configured, returning fallback record");
            return Ok(ParseOutcome::Unavailable {
                error: MISSING_CREDENTIAL_ERROR.to_string(),
                fallback: ParsedInquiry::fallback(
                    request,
                    company_from_domain.as_deref(),
                    auto_detected_company,
                ),
            });
        };

        let completion = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(request, company_from_domain.as_deref())),
        ])
        .with_temperature(EXTRACTION_TEMPERATURE)
        .with_response_format(ResponseFormat::JsonObject);

        let response = llm.complete(completion).await?;
        let raw = parse_model_object(&response.content)?;
        let Value::Object(object) = &raw else {
            return Err(ExtractionError::NotAnObject);
        };
        let fields = ModelFields::new(object);

        if company_from_domain.is_none() {
            if let (Some(domain), Some(company)) = (domain.as_deref(), fields.text(Field::CompanyName)) {
                let score = fields
                    .number(Field::ConfidenceScore)
                    .map(|s| s.clamp(0.0, 1.0))
                    .unwrap_or(DEFAULT_CONFIDENCE_SCORE);
                let mapping = NewDomainMapping::learned(domain, company, score);
                best_effort(
                    "insert_domain_mapping",
                    domain,
                    self.store.insert_domain_mapping(&mapping),
                )
                .await;
            }
        }

        let data = assemble_inquiry(request, &fields, company_from_domain);
        info!(
            product = %data.product_name,
            company = %data.company_name,
            confidence = ?data.confidence,
            score = data.confidence_score,
            "Email parsed"
        );

        Ok(ParseOutcome::Parsed { data, raw })
    }

    /// Company name learned for `domain`, recording the match if found.
    async fn known_company(&self, domain: &str) -> Option<String> {
        let mapping = match self.store.get_domain_mapping(domain).await {
            Ok(mapping) => mapping?,
            Err(e) => {
                warn!(domain, error = %e, "Domain lookup failed, treating as unknown");
                return None;
            }
        };

        debug!(domain, company = %mapping.company_name, "Domain mapping hit");
        if let Some(false) =
            best_effort("record_domain_match", domain, self.store.record_domain_match(domain)).await
        {
            debug!(domain, "Domain mapping vanished before match was recorded");
        }
        Some(mapping.company_name)
    }
}

/// Await a side-effect write whose failure must not fail the request.
async fn best_effort<T, F>(operation: &'static str, domain: &str, write: F) -> Option<T>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    match write.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation, domain, error = %e, "Best-effort domain mapping write failed");
            None
        }
    }
}

/// Build the canonical record from resolved model fields.
pub fn assemble_inquiry(
    request: &ParseEmailRequest,
    fields: &ModelFields<'_>,
    company_from_domain: Option<String>,
) -> ParsedInquiry {
    let product_name = fields.text(Field::ProductName);
    let score = fields
        .number(Field::ConfidenceScore)
        .map(|s| s.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE_SCORE);

    let is_valid_inquiry = fields.flag(Field::IsInquiry) != Some(false)
        && score >= MIN_INQUIRY_SCORE
        && product_name.is_some();

    let (confidence, confidence_score) = if is_valid_inquiry {
        let tier = fields
            .text(Field::Confidence)
            .and_then(|t| Confidence::parse(&t))
            .unwrap_or_default();
        (tier, score)
    } else {
        (Confidence::Low, REJECTED_CONFIDENCE_SCORE)
    };

    // Only an absent price flag defaults to true; an explicit false is kept.
    let requests = DocumentRequests {
        price: fields.flag(Field::PriceRequested).unwrap_or(true),
        coa: fields.flag(Field::CoaRequested).unwrap_or(false),
        msds: fields.flag(Field::MsdsRequested).unwrap_or(false),
        sample: fields.flag(Field::SampleRequested).unwrap_or(false),
    };

    let auto_detected_company = company_from_domain.is_some();
    let company_name = company_from_domain
        .or_else(|| fields.text(Field::CompanyName))
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());

    let extracted_contact = fields.text(Field::ContactPerson);
    let auto_detected_contact = extracted_contact.is_none() && request.sender_name().is_some();
    let contact_person = extracted_contact.or_else(|| request.sender_name().map(String::from));

    let delivery_date_expected = fields.text(Field::DeliveryDate).and_then(|raw| {
        let normalized = normalize_delivery_date(&raw);
        if normalized.is_none() {
            debug!(raw = %raw, "Dropping unparseable delivery date");
        }
        normalized
    });

    ParsedInquiry {
        product_name: product_name.unwrap_or_default(),
        specification: fields.text(Field::Specification),
        quantity: fields.text(Field::Quantity).unwrap_or_default(),
        supplier_name: fields.text(Field::SupplierName),
        supplier_country: fields.text(Field::SupplierCountry),
        company_name,
        contact_person,
        contact_email: request.from_email.clone(),
        contact_phone: fields.text(Field::ContactPhone),
        coa_requested: requests.coa,
        msds_requested: requests.msds,
        sample_requested: requests.sample,
        price_requested: requests.price,
        purpose_icons: requests.purpose_icons(),
        delivery_date_expected,
        urgency: fields
            .text(Field::Urgency)
            .and_then(|u| Urgency::parse(&u))
            .unwrap_or_default(),
        remarks: fields.text(Field::Remarks),
        confidence,
        confidence_score,
        detected_language: fields
            .text(Field::Language)
            .unwrap_or_else(|| "unknown".to_string()),
        auto_detected_company,
        auto_detected_contact,
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// Parse model output into a JSON object value.
fn parse_model_object(content: &str) -> Result<Value, ExtractionError> {
    let json_str = extract_json_object(content);
    let value: Value = serde_json::from_str(&json_str)
        .map_err(|e| ExtractionError::MalformedModelJson(e.to_string()))?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(ExtractionError::NotAnObject)
    }
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end > start {
            return trimmed[start..=end].to_string();
        }
    }

    trimmed.to_string()
}
