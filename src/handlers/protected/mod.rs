// handlers/protected/mod.rs - Protected handlers (verified bearer token required)
//
// Every route here sits behind `middleware::require_identity`, which puts an
// `AuthenticatedIdentity` in the request extensions before the handler runs.
// Handlers turn that identity into a user-scoped session and make exactly one
// repository call through it.

pub mod tasks;
