pub mod capture;
pub mod compositing;
pub mod delivery;
pub mod detection;
pub mod geometry;
pub mod pipeline;
pub mod shared;
