//! Ordered alias-key resolution over the model's JSON object.
//!
//! The model is not held to a contract on key names, so each logical field
//! is looked up through an ordered list of aliases and the first non-empty
//! value wins. `FIELD_ALIASES` is the single table of those lists.

use serde_json::{Map, Value};

/// A logical field of the extraction response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    IsInquiry,
    ProductName,
    Specification,
    Quantity,
    SupplierName,
    SupplierCountry,
    CompanyName,
    ContactPerson,
    ContactPhone,
    CoaRequested,
    MsdsRequested,
    SampleRequested,
    PriceRequested,
    DeliveryDate,
    Urgency,
    Remarks,
    Confidence,
    ConfidenceScore,
    Language,
}

/// Alias keys per field, in priority order.
pub static FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::IsInquiry, &["isInquiry"]),
    (Field::ProductName, &["productName", "product_name"]),
    (Field::Specification, &["specification", "spec", "grade"]),
    (Field::Quantity, &["quantity"]),
    (Field::SupplierName, &["supplierName", "supplier_name", "supplier"]),
    (Field::SupplierCountry, &["supplierCountry", "supplier_country", "country"]),
    (Field::CompanyName, &["companyName", "company_name", "company"]),
    (Field::ContactPerson, &["contactPerson", "contact_person", "contact"]),
    (Field::ContactPhone, &["contactPhone", "contact_phone", "phone", "whatsapp"]),
    (Field::CoaRequested, &["coaRequested", "coa_requested", "coa"]),
    (Field::MsdsRequested, &["msdsRequested", "msds_requested", "msds"]),
    (Field::SampleRequested, &["sampleRequested", "sample_requested", "sample"]),
    (Field::PriceRequested, &["priceRequested", "price_requested", "price"]),
    (Field::DeliveryDate, &["deliveryDateExpected", "delivery_date", "deliveryDate"]),
    (Field::Urgency, &["urgency"]),
    (Field::Remarks, &["remarks", "notes", "additional_info"]),
    (Field::Confidence, &["confidence"]),
    (Field::ConfidenceScore, &["confidenceScore", "confidence_score"]),
    (Field::Language, &["detectedLanguage", "language"]),
];

impl Field {
    pub fn aliases(self) -> &'static [&'static str] {
        FIELD_ALIASES
            .iter()
            .find(|(field, _)| *field == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }
}

/// Typed read access to a model response object.
pub struct ModelFields<'a> {
    object: &'a Map<String, Value>,
}

impl<'a> ModelFields<'a> {
    pub fn new(object: &'a Map<String, Value>) -> Self {
        Self { object }
    }

    /// First alias holding a value accepted by `convert`.
    fn first<T>(&self, field: Field, convert: impl Fn(&Value) -> Option<T>) -> Option<T> {
        field
            .aliases()
            .iter()
            .filter_map(|key| self.object.get(*key))
            .find_map(convert)
    }

    /// Non-blank string (trimmed). Numbers are rendered as text.
    pub fn text(&self, field: Field) -> Option<String> {
        self.first(field, |value| match value {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Boolean, also accepting `"true"`/`"false"`/`"yes"`/`"no"` strings
    /// and numbers (non-zero is true).
    pub fn flag(&self, field: Field) -> Option<bool> {
        self.first(field, |value| match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|v| v != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => Some(true),
                "false" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        })
    }

    /// Finite number, also accepting numeric strings.
    pub fn number(&self, field: Field) -> Option<f64> {
        self.first(field, |value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|n| n.is_finite())
    }
}
