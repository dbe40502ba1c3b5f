pub mod contact;
pub mod gate;
