pub mod feature;
pub mod item;
pub mod request;
pub mod status;
