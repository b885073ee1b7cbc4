//! Python virtual environment discovery
//!
//! - **`descriptor`**: [`VenvDescriptor`], the validated result type, and
//!   [`VenvKind`] (PEP 405 or conda layout).
//! - **`probe`**: [`Probe`], one variant per detection strategy.
//! - **`registry`**: [`ProbeRegistry`], the fixed priority table and lookup
//!   by name.
//! - **`resolver`**: [`VenvResolver`], the ancestor walk over probes.
//! - **`pyvenv_cfg`** / **`conda`**: metadata sources used to fill in the
//!   prompt and Python version.

pub mod conda;
pub mod descriptor;
pub mod probe;
pub mod pyvenv_cfg;
pub mod registry;
pub mod resolver;

pub use descriptor::{VenvDescriptor, VenvKind};
pub use probe::Probe;
pub use registry::ProbeRegistry;
pub use resolver::{Resolution, ResolveWarning, VenvResolver};
