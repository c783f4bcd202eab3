pub mod batch;
pub mod color_sweep;
pub mod gamut;
pub mod light_ref;
pub mod light_state;
