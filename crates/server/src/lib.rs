//! HTTP front end for the camera price service

pub mod api;
pub mod config;
