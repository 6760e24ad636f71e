//! Ferretería — catalog client for a hardware-store back office.
//!
//! ARCHITECTURE
//! ============
//! Records live in hosted document collections (`categorias`, `productos`,
//! `Libros`, `chat`) and binary objects in hosted storage. The crate talks to
//! both over REST through the [`backend`] gateway traits; everything above
//! that seam is service-agnostic.
//!
//! - [`catalog`]: list/search/paginate plus authorized create/update/delete
//!   for categories, products and books
//! - [`chat`]: natural-language category registration through [`llm`]
//! - [`reports`]: PDF and XLSX exports of the product list
//! - [`auth`]: email/password session shared by every controller
//! - [`connectivity`]: online/offline detection for the banner

pub mod auth;
pub mod backend;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod connectivity;
pub mod listing;
pub mod llm;
pub mod models;
pub mod mutation;
pub mod reports;

#[cfg(test)]
mod testing;
