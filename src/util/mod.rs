pub mod cancel;
pub mod csv;
pub mod time;
