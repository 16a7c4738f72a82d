use thiserror::Error;

/// The failure modes of the watermark compositor.
///
/// Every variant is terminal: the transformation is all-or-nothing and no
/// partial output is ever produced. Errors wrap the stringified source error
/// so that the caller always receives an explanation alongside the failure
/// class, without this crate re-exporting the underlying PDF library types.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// The input bytes do not constitute a structurally valid PDF, or a page
    /// is so malformed that its dimensions cannot be resolved.
    #[error("failed to parse the source document: {0}")]
    Parse(String),
    /// The document has no pages, so there are no first-page dimensions to
    /// derive the stamp size from.
    #[error("the document has no pages to derive the stamp size from")]
    EmptyDocument,
    /// The watermark font (or its transparency graphics state) could not be
    /// attached to the document, e.g. because a page object is not a
    /// dictionary. There is no fallback font.
    #[error("failed to embed the watermark font: {0}")]
    FontEmbed(String),
    /// The stamped document could not be serialized back to bytes.
    #[error("failed to serialize the watermarked document: {0}")]
    Serialize(String),
}
