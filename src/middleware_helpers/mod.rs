pub mod client_info;
pub mod request_id;

pub use client_info::ClientInfo;
pub use request_id::request_id_middleware;
