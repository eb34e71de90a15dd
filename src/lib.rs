// Module naming follows project convention (Bundler = ring-buffer message bundler)
#[allow(non_snake_case)]
pub mod Bundler {
    mod builder;
    mod consumer;
    mod lifecycle;
    mod producer;

    pub use builder::BundlerBuilder;
    pub use lifecycle::RingBundler;
    pub use producer::SendOutcome;

    pub mod Buffer {
        #[allow(clippy::module_inception)]
        pub mod Buffer;
        pub mod Buffer_impl;
        pub mod layout;
        pub use Buffer::{is_consumed, RingBuffer, SlotState, DEFAULT_CAPACITY, MIN_CAPACITY}; // re-export for stable path
    }
    pub mod Structs {
        pub mod Buffer_Structs;
        pub use Buffer_Structs::{Address, Message}; // re-export for stable path
    }
}
#[allow(non_snake_case)]
pub mod Core;
#[allow(non_snake_case)]
pub mod Protocol;
#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}

pub use crate::Bundler::Structs::{Address, Message};
pub use crate::Bundler::{BundlerBuilder, RingBundler, SendOutcome};
pub use crate::Core::{BundlerError, Transport};
