//! Core library for the padc-processor command line application.
//!
//! The library locates each program's section inside a monthly attendance
//! workbook, extracts per-month per-grade attendance from those sections,
//! folds location variants into their parent programs and rolls everything up
//! into summary rows. Grid access lives under [`padc::processor::grid`],
//! boundary discovery in [`padc::processor::detect`], extraction in
//! [`padc::processor::extract`], consolidation and aggregation in their own
//! modules, workbook and report IO under [`padc::processor::io`], and the
//! stage orchestration in [`padc::processor::pipeline`].

pub mod padc;

pub use padc::processor::{
    ProcessorError, Result, aggregate, boundary, catalog, consolidate, detect, error, extract,
    grid, io, pipeline, profile, progress, report, store,
};
