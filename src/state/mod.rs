pub mod body;
pub mod item;
pub mod key_value;
pub mod request;
pub mod result;
pub mod tree;
