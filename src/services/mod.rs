pub mod bridge;
pub mod decode;
