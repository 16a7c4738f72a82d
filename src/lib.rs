//! stampr stamps a full-page tiling of repeated, rotated, semi-transparent
//! text across every page of an existing PDF document. It is a single pure
//! transformation: the caller hands in the raw bytes of a PDF and a watermark
//! string, and receives back the bytes of a new document with identical page
//! count, order and dimensions, plus the watermark layer. Nothing is cached
//! across calls and no I/O is performed by the library itself.
//!
//! The stamp size is derived once from the first page (6% of its shorter
//! edge) and reused across the whole document, while the tiling lattice is
//! recomputed from each page's own dimensions, so documents with mixed page
//! sizes come out with consistently sized text and per-page coverage down to
//! the corners.

/// The module where the watermark compositor is presented.
///
/// # Introduction
///
/// The entry point of this module (and of the whole crate) is the
/// `watermark_pdf` function, which performs the complete transformation in
/// one call: it parses the input bytes, derives the document-global
/// `WatermarkSpec` from the first page, embeds a single shared font and
/// transparency graphics state, computes a `TileGrid` for every page and
/// appends one stamp layer per page before re-serializing the document.
///
/// The operation is deliberately all-or-nothing. The failure classes are
/// enumerated in the `error` module and every one of them aborts the call
/// without partial output, so callers can treat the returned bytes as the
/// final artifact whenever the call succeeds.
pub mod compositor;

/// The caller-boundary configuration for resolving the default watermark
/// text. The compositor always receives an already-resolved, non-optional
/// string; substituting the configured default for an absent or empty request
/// happens here and only here.
pub mod configuration;

/// This module contains the `WatermarkError` type, the error taxonomy of the
/// compositor: `Parse` for inputs that are not structurally valid PDFs,
/// `EmptyDocument` for documents with no pages to derive the stamp size from,
/// `FontEmbed` for documents too corrupt to attach the watermark font to, and
/// `Serialize` for failures while writing the stamped document back out. No
/// variant is retried internally; every error is surfaced verbatim to the
/// immediate caller.
pub mod error;

/// The fixed watermark font: the standard Helvetica-Bold with its built-in
/// AFM advance widths, used both to measure the watermark text (which drives
/// the tiling geometry) and to encode it into the page content streams.
pub mod font;

/// The tiling geometry: per-page computation of the `TileGrid` lattice and of
/// the set of tile centers that could be visible on the padded page
/// rectangle. This module is pure arithmetic and knows nothing about PDF
/// objects.
pub mod geometry;
