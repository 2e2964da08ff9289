pub mod app;
pub mod events;
pub mod frame_clock;
pub mod pacer;
pub mod relay;
pub mod timer;
