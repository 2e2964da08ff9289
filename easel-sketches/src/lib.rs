pub mod sketches;
