pub mod cancel;
pub mod retry;
pub mod status;
