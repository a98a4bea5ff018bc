pub mod homework;
pub mod notification;
