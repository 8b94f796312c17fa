//! Response module - output image encoding

pub mod png;
