//! Crate `search` — cliente asíncrono de búsqueda por perfil
//!
//! Este crate define los tipos de dominio del cliente (consultas validadas,
//! jobs con máquina de estados explícita, DTOs crudos del resultado
//! anidado), el contrato `SearchService` y el motor `SearchEngine` que
//! implementa el sondeo con backoff, espera máxima y reintentos
//! transitorios. Incluye una implementación en memoria guionada
//! (`InMemorySearchService`) para pruebas y demos.
//!
//! Diseño resumido:
//! - Envío fire-and-forget: el estado del job sólo avanza vía `poll`.
//! - Fan-out transparente: si el servicio no soporta batching, el motor
//!   crea un job por par (consulta, base) y los resultados se fusionan
//!   aguas abajo como si vinieran de un solo job.
//! - Cancelación: el bucle de sondeo es cancel-safe; el handle del job
//!   sigue siendo válido tras soltar el futuro.
//!
//! Ejemplo rápido:
//! ```rust
//! use search::stubs::InMemorySearchService;
//! use search::{PollConfig, SearchEngine};
//! use std::sync::Arc;
//! let service = Arc::new(InMemorySearchService::new(Default::default()));
//! let engine = SearchEngine::new(service, PollConfig::default());
//! ```
pub mod domain;
pub mod engine;
pub mod errors;
pub mod service;
pub mod stubs;

pub use domain::*;
pub use engine::*;
pub use errors::*;
pub use service::*;
pub use stubs::*;
