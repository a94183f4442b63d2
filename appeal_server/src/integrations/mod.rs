//! Clients for the external collaborators the server talks to: the payment processor and the report renderer.
pub mod payments;
pub mod renderer;
