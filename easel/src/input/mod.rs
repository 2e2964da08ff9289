pub mod events;
pub mod keys;
pub mod normalizer;
pub mod winit_adapter;

pub use events::*;
pub use normalizer::{InputNormalizer, NativeKey, NativePointer};
