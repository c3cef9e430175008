//! Cross-crate end-to-end scenarios for the ingestion toolkit.
//!
//! Each crate carries its own focused unit tests; this crate wires several
//! of them together the way a real extractor would, covering the scenarios
//! in spec.md §8 that span more than one component.
