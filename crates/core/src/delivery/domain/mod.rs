pub mod delivery_sink;
pub mod latest_frame_slot;
pub mod presence;
