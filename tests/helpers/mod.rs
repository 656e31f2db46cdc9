#![allow(dead_code)]

pub mod scripted_engine;
pub mod tls;
