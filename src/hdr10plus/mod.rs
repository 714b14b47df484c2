pub mod tools;

pub use tools::Hdr10PlusTool;
