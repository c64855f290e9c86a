//! Concrete adapter implementations for ports.

pub mod convert;
pub mod tradingview_adapter;
pub mod csv_repository;
pub mod display;
