// Request context and shared reference-data rules
pub mod context;
pub mod reference;

// Reference data
pub mod asset_statuses;
pub mod categories;
pub mod locations;
pub mod organization_structure;
pub mod suppliers;

// Assets and approval workflow
pub mod assets;

// Accounts, profiles and roles
pub mod accounts;
pub mod profiles;
pub mod roles;

// Collaborators
pub mod email;
pub mod storage;
