//! Core engine-side types shared by the physics bridge

pub mod entity;
