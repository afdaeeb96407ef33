pub mod scenario;
pub mod teleport;
