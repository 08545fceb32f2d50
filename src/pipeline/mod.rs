//! Pipeline stages for document-to-deck conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the extractor can be swapped without touching
//! rendering.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ postprocess ──▶ layout ──▶ pptx
//! (path/URL) (base64)  (Gemini) (cleanup)      (geometry)  (OOXML zip)
//! ```
//!
//! 1. [`input`]: read the path or download the URL, sniff the MIME type
//! 2. [`encode`]: base64-wrap the bytes as an inline-data part
//! 3. [`llm`]: one schema-constrained extraction call; the only stage
//!    with network I/O
//! 4. [`postprocess`]: deterministic cleanup of every extracted string
//! 5. [`layout`]: place title, questions and answers on 16:9 slides
//! 6. [`pptx`]: serialise the layout into a deterministic `.pptx` package

pub mod encode;
pub mod input;
pub mod layout;
pub mod llm;
pub mod postprocess;
pub mod pptx;
