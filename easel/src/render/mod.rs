pub mod blit;
pub mod capture;
pub mod context;
pub mod frame;
pub mod raster;
pub mod renderer;
pub mod shader;
