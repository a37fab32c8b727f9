pub mod delivery_dispatcher;
pub mod png_snapshot_sink;
