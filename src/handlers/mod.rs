// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer token verified by middleware)
pub mod public; // Tier 1: no authentication required (/)
pub mod protected; // Tier 2: verified identity required (/api/*)
