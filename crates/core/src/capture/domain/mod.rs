pub mod capture_backend;
pub mod capture_preset;
pub mod capture_state;
pub mod frame_output;
pub mod session_error;
