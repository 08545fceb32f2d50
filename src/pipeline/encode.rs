//! Payload encoding: document bytes → base64 inline data.
//!
//! Gemini accepts documents up to its request-size limit as `inlineData`
//! parts carrying standard base64 and a MIME type. No size cap is enforced
//! here; the service rejects oversized payloads itself.

use crate::pipeline::input::SourceDocument;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use tracing::debug;

/// A document ready to be embedded in a generateContent request.
///
/// Serialises as Gemini's `inlineData` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineDocument {
    pub mime_type: String,
    pub data: String,
}

/// Base64-encode a resolved document.
pub fn encode_document(doc: &SourceDocument) -> InlineDocument {
    let data = STANDARD.encode(&doc.bytes);
    debug!(
        "Encoded '{}' → {} bytes base64 ({})",
        doc.name,
        data.len(),
        doc.mime_type
    );
    InlineDocument {
        mime_type: doc.mime_type.to_string(),
        data,
    }
}
